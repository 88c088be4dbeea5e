use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A project as returned by `GET /projects`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GitLabProject {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub path_with_namespace: String,
    pub web_url: String,
    #[serde(default)]
    pub namespace: Option<GitLabNamespace>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GitLabNamespace {
    pub full_path: String,
}

/// A deployment as returned by `GET /projects/:id/deployments`.
///
/// Most nested objects are optional; GitLab returns `null` for a deployable
/// that was erased and omits timing for jobs that never ran.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GitLabDeployment {
    pub id: u64,
    pub status: String,
    #[serde(default)]
    pub environment: Option<GitLabEnvironment>,
    #[serde(default)]
    pub deployable: Option<GitLabDeployable>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GitLabEnvironment {
    pub name: String,
}

/// The CI job that performed the deployment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GitLabDeployable {
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub pipeline: Option<GitLabPipelineRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GitLabPipelineRef {
    pub id: u64,
}

impl GitLabDeployment {
    pub fn environment_name(&self) -> &str {
        self.environment.as_ref().map_or("", |env| env.name.as_str())
    }
}
