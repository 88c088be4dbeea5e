//! Persistence port for collected records and its implementations.

mod memory;
mod mongo;

use async_trait::async_trait;

pub use memory::InMemoryRepository;
pub use mongo::{MongoRepository, DEFAULT_DATABASE};

use crate::error::Result;
use crate::model::{Deployment, Project};

/// Write-only store for collected records.
///
/// Both operations are upserts: calling either twice with logically
/// identical input must leave exactly one stored record per key. Projects are
/// keyed by `id`, deployments by `(project_id, id)`.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn save_projects(&self, projects: &[Project]) -> Result<()>;

    async fn save_deployment(&self, deployment: &Deployment) -> Result<()>;
}
