use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use indexmap::IndexMap;

use super::Repository;
use crate::error::{MetrixError, Result};
use crate::model::{Deployment, Project};

/// Process-local repository with the same upsert semantics as MongoDB.
///
/// Backs `--dry-run` and serves as the test double for the collector.
/// Insertion order is kept so reports list records in collection order.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    projects: Mutex<IndexMap<u64, Project>>,
    deployments: Mutex<IndexMap<(u64, u64), Deployment>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projects(&self) -> Result<Vec<Project>> {
        Ok(lock(&self.projects)?.values().cloned().collect())
    }

    pub fn deployments(&self) -> Result<Vec<Deployment>> {
        Ok(lock(&self.deployments)?.values().cloned().collect())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|e| MetrixError::Storage {
        message: format!("in-memory store poisoned: {e}"),
        retryable: false,
    })
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn save_projects(&self, projects: &[Project]) -> Result<()> {
        let mut stored = lock(&self.projects)?;
        for project in projects {
            stored.insert(project.id, project.clone());
        }
        Ok(())
    }

    async fn save_deployment(&self, deployment: &Deployment) -> Result<()> {
        lock(&self.deployments)?.insert(deployment.key(), deployment.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeploymentStatus;

    fn project(id: u64, name: &str) -> Project {
        Project {
            id,
            name: name.to_string(),
            path: name.to_string(),
            path_with_namespace: format!("group/{name}"),
            namespace: "group".to_string(),
            web_url: format!("https://gitlab.example.com/group/{name}"),
        }
    }

    fn deployment(project_id: u64, id: u64) -> Deployment {
        Deployment {
            id,
            status: DeploymentStatus::Success,
            environment_name: "production".to_string(),
            project_id,
            project_name: "api".to_string(),
            project_path: "api".to_string(),
            project_namespace: "group".to_string(),
            pipeline_id: Some(id * 10),
            finished_at: None,
            duration: 0.0,
        }
    }

    #[tokio::test]
    async fn test_save_project_twice_keeps_latest_values() {
        let repo = InMemoryRepository::new();
        repo.save_projects(&[project(1, "before")]).await.unwrap();
        repo.save_projects(&[project(1, "after")]).await.unwrap();

        let stored = repo.projects().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "after");
    }

    #[tokio::test]
    async fn test_save_deployment_is_idempotent() {
        let repo = InMemoryRepository::new();
        let dep = deployment(1, 5);
        repo.save_deployment(&dep).await.unwrap();
        repo.save_deployment(&dep).await.unwrap();

        assert_eq!(repo.deployments().unwrap(), vec![dep]);
    }

    #[tokio::test]
    async fn test_same_deployment_id_in_two_projects_is_kept_apart() {
        let repo = InMemoryRepository::new();
        repo.save_deployment(&deployment(1, 5)).await.unwrap();
        repo.save_deployment(&deployment(2, 5)).await.unwrap();

        let keys: Vec<_> = repo
            .deployments()
            .unwrap()
            .iter()
            .map(Deployment::key)
            .collect();
        assert_eq!(keys, vec![(1, 5), (2, 5)]);
    }
}
