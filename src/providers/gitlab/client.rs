mod core;
mod deployments;
mod projects;

use async_trait::async_trait;

pub use self::core::{ClientOptions, GitLabClient};

use super::pagination::PageOptions;
use super::types::{GitLabDeployment, GitLabProject};
use crate::error::Result;

/// Paginated read access to the source API.
///
/// Implementations return every record across all pages, in source order.
#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn list_projects(&self, opts: PageOptions) -> Result<Vec<GitLabProject>>;

    async fn list_deployments(
        &self,
        project_id: u64,
        environment: &str,
        opts: PageOptions,
    ) -> Result<Vec<GitLabDeployment>>;
}

#[async_trait]
impl SourceClient for GitLabClient {
    async fn list_projects(&self, opts: PageOptions) -> Result<Vec<GitLabProject>> {
        self.fetch_projects(opts).await
    }

    async fn list_deployments(
        &self,
        project_id: u64,
        environment: &str,
        opts: PageOptions,
    ) -> Result<Vec<GitLabDeployment>> {
        self.fetch_deployments(project_id, environment, opts).await
    }
}
