//! End-to-end collection run: projects, then production deployments per
//! project, filtered and upserted through a [`Repository`].

pub mod filter;

use std::future::Future;
use std::time::Duration;

use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::error::{MetrixError, Result};
use crate::model::Project;
use crate::output::PhaseProgress;
use crate::providers::gitlab::{PageOptions, SourceClient, DEFAULT_PER_PAGE};
use crate::report::{ProjectSummary, RunReport, RunWarning, WarningKind};
use crate::storage::Repository;

pub const PRODUCTION: &str = "production";

#[derive(Debug, Clone)]
pub struct CollectorOptions {
    /// Environment a deployment must target to be kept
    pub environment: String,
    pub per_page: u32,
    /// Retries for transient storage failures, per record
    pub storage_retries: u32,
    /// First retry delay; doubles on each further attempt
    pub storage_backoff: Duration,
    pub show_progress: bool,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            environment: PRODUCTION.to_string(),
            per_page: DEFAULT_PER_PAGE,
            storage_retries: 3,
            storage_backoff: Duration::from_millis(500),
            show_progress: false,
        }
    }
}

pub struct Collector<S> {
    source: S,
    source_name: String,
    options: CollectorOptions,
    cancel: CancellationToken,
}

impl<S: SourceClient> Collector<S> {
    pub fn new(source: S, source_name: impl Into<String>, options: CollectorOptions) -> Self {
        Self {
            source,
            source_name: source_name.into(),
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops the run before the next project once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs one collection pass and persists the results into `repository`.
    ///
    /// Projects and their deployments are processed strictly sequentially.
    /// A failure to list deployments for a single project is logged, recorded
    /// as a [`RunWarning`] and treated as zero deployments; persistence
    /// failures that survive retries are handled the same way per record.
    ///
    /// # Errors
    ///
    /// * `Collection` if the project listing fails
    /// * `Cancelled` if the cancellation token fires mid-run
    pub async fn refresh_data(&self, repository: &dyn Repository) -> Result<RunReport> {
        if self.cancel.is_cancelled() {
            return Err(MetrixError::Cancelled);
        }

        let mut report = RunReport::new(self.source_name.clone());
        info!("Starting collection run against {}", self.source_name);

        let progress = PhaseProgress::start_phase_1(self.options.show_progress);

        let projects = match self.update_projects(repository, &mut report).await {
            Ok(projects) => projects,
            Err(e) => {
                progress.abandon();
                error!("Failed to list projects: {e}");
                return Err(match e {
                    MetrixError::Cancelled => e,
                    other => MetrixError::Collection(Box::new(other)),
                });
            }
        };

        let progress = progress.finish_phase_1_start_phase_2(projects.len());

        for project in &projects {
            if self.cancel.is_cancelled() {
                progress.abandon();
                warn!("Collection cancelled before project {}", project.id);
                return Err(MetrixError::Cancelled);
            }

            if let Err(e) = self.update_deployments(project, repository, &mut report).await {
                progress.abandon();
                return Err(e);
            }
            progress.project_done();
        }

        report.finish();
        progress.finish_phase_2(report.total_deployments_saved);

        if report.has_warnings() {
            warn!(
                "Collection finished with {} warnings",
                report.warnings.len()
            );
        }
        info!(
            "Collected {} deployments across {} projects",
            report.total_deployments_saved, report.total_projects
        );

        Ok(report)
    }

    /// Fetches all projects and upserts them one by one. Only the listing is fatal.
    async fn update_projects(
        &self,
        repository: &dyn Repository,
        report: &mut RunReport,
    ) -> Result<Vec<Project>> {
        let projects: Vec<Project> = self
            .source
            .list_projects(PageOptions::with_per_page(self.options.per_page))
            .await?
            .into_iter()
            .map(filter::to_project)
            .collect();

        for project in &projects {
            let record = std::slice::from_ref(project);
            if let Err(e) = self
                .with_storage_retry("project", move || repository.save_projects(record))
                .await
            {
                error!(
                    "Failed to save project {} ({}): {e}",
                    project.id, project.path_with_namespace
                );
                report.warn(RunWarning {
                    kind: WarningKind::ProjectSave,
                    project_id: Some(project.id),
                    deployment_id: None,
                    message: e.to_string(),
                });
            }
        }

        Ok(projects)
    }

    /// Collects one project's deployments. Only cancellation propagates.
    async fn update_deployments(
        &self,
        project: &Project,
        repository: &dyn Repository,
        report: &mut RunReport,
    ) -> Result<()> {
        let environment = self.options.environment.as_str();

        let raw = match self
            .source
            .list_deployments(
                project.id,
                environment,
                PageOptions::with_per_page(self.options.per_page),
            )
            .await
        {
            Ok(raw) => raw,
            Err(MetrixError::Cancelled) => return Err(MetrixError::Cancelled),
            Err(e) => {
                warn!(
                    "Skipping deployments for project {} ({}): {e}",
                    project.id, project.path_with_namespace
                );
                report.warn(RunWarning {
                    kind: WarningKind::DeploymentFetch,
                    project_id: Some(project.id),
                    deployment_id: None,
                    message: e.to_string(),
                });
                Vec::new()
            }
        };

        let retained = filter::relevant(&raw, environment);
        let mut saved = 0;

        for source_deployment in &retained {
            let deployment = filter::to_deployment(source_deployment, project);
            let record = &deployment;
            match self
                .with_storage_retry("deployment", move || repository.save_deployment(record))
                .await
            {
                Ok(()) => saved += 1,
                Err(e) => {
                    error!(
                        "Failed to save deployment {} of project {}: {e}",
                        deployment.id, project.id
                    );
                    report.warn(RunWarning {
                        kind: WarningKind::DeploymentSave,
                        project_id: Some(project.id),
                        deployment_id: Some(deployment.id),
                        message: e.to_string(),
                    });
                }
            }
        }

        report.record_project(ProjectSummary {
            id: project.id,
            path_with_namespace: project.path_with_namespace.clone(),
            deployments_fetched: raw.len(),
            deployments_retained: retained.len(),
            deployments_saved: saved,
        });

        Ok(())
    }

    /// Retries `op` with exponential backoff while it fails with a retryable error.
    async fn with_storage_retry<F, Fut>(&self, what: &str, mut op: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.options.storage_retries => {
                    let delay = self
                        .options
                        .storage_backoff
                        .saturating_mul(2_u32.saturating_pow(attempt));
                    warn!(
                        "Transient storage failure saving {what} ({e}), retrying in {delay:?} ({}/{})",
                        attempt + 1,
                        self.options.storage_retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
