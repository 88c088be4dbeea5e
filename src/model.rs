use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A source-control project, keyed by its external identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Stable external identifier, the sole upsert key
    pub id: u64,
    /// Display name
    pub name: String,
    /// URL slug of the project (e.g., "api")
    pub path: String,
    /// Full namespaced path (e.g., "platform/backend/api")
    pub path_with_namespace: String,
    /// Full path of the owning group or user namespace
    pub namespace: String,
    /// Browser URL of the project
    pub web_url: String,
}

/// Outcome of a deployment as reported by the source.
///
/// Only [`DeploymentStatus::Success`] and [`DeploymentStatus::Failed`] are
/// resolved outcomes; everything else is discarded before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Success,
    Failed,
    Pending,
    Other(String),
}

impl DeploymentStatus {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Pending => "pending",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for DeploymentStatus {
    fn from(status: &str) -> Self {
        match status {
            "success" => Self::Success,
            "failed" => Self::Failed,
            "created" | "running" | "blocked" | "pending" => Self::Pending,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A finished production deployment.
///
/// Carries a snapshot of the owning project's descriptive fields taken at
/// collection time, not a live reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: u64,
    pub status: DeploymentStatus,
    pub environment_name: String,
    pub project_id: u64,
    pub project_name: String,
    pub project_path: String,
    pub project_namespace: String,
    pub pipeline_id: Option<u64>,
    /// `None` for deployments whose job never finished
    pub finished_at: Option<DateTime<Utc>>,
    /// Seconds; 0.0 when unknown
    pub duration: f64,
}

impl Deployment {
    /// Composite upsert key. Deployment ids are only guaranteed unique per project.
    pub fn key(&self) -> (u64, u64) {
        (self.project_id, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_gitlab_strings() {
        assert_eq!(DeploymentStatus::from("success"), DeploymentStatus::Success);
        assert_eq!(DeploymentStatus::from("failed"), DeploymentStatus::Failed);
        assert_eq!(DeploymentStatus::from("running"), DeploymentStatus::Pending);
        assert_eq!(DeploymentStatus::from("created"), DeploymentStatus::Pending);
        assert_eq!(
            DeploymentStatus::from("canceled"),
            DeploymentStatus::Other("canceled".to_string())
        );
    }

    #[test]
    fn test_only_success_and_failed_are_resolved() {
        assert!(DeploymentStatus::Success.is_resolved());
        assert!(DeploymentStatus::Failed.is_resolved());
        assert!(!DeploymentStatus::Pending.is_resolved());
        assert!(!DeploymentStatus::Other("skipped".into()).is_resolved());
    }

    #[test]
    fn test_status_as_str_matches_source_vocabulary() {
        assert_eq!(DeploymentStatus::Success.as_str(), "success");
        assert_eq!(DeploymentStatus::Other("canceled".into()).as_str(), "canceled");
    }
}
