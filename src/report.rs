use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one collection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_projects: usize,
    pub total_deployments_saved: usize,
    pub projects: Vec<ProjectSummary>,
    pub warnings: Vec<RunWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: u64,
    pub path_with_namespace: String,
    /// Raw records returned by the source
    pub deployments_fetched: usize,
    /// Records left after the environment/status filter
    pub deployments_retained: usize,
    pub deployments_saved: usize,
}

/// A non-fatal failure recorded during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunWarning {
    pub kind: WarningKind,
    pub project_id: Option<u64>,
    pub deployment_id: Option<u64>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    DeploymentFetch,
    ProjectSave,
    DeploymentSave,
}

impl RunReport {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            started_at: Utc::now(),
            finished_at: None,
            total_projects: 0,
            total_deployments_saved: 0,
            projects: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, warning: RunWarning) {
        self.warnings.push(warning);
    }

    pub fn record_project(&mut self, summary: ProjectSummary) {
        self.total_deployments_saved += summary.deployments_saved;
        self.projects.push(summary);
    }

    pub fn finish(&mut self) {
        self.total_projects = self.projects.len();
        self.finished_at = Some(Utc::now());
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &RunWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}
