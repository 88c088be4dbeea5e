use async_trait::async_trait;
use log::{debug, info};
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};

use super::Repository;
use crate::error::{MetrixError, Result};
use crate::model::{Deployment, Project};

pub const DEFAULT_DATABASE: &str = "metrix";
const PROJECTS: &str = "projects";
const DEPLOYMENTS: &str = "deployments";

/// MongoDB-backed repository.
///
/// Owns a single connected [`Client`]; construct it once at startup with
/// [`MongoRepository::connect`] and release it with [`MongoRepository::shutdown`].
pub struct MongoRepository {
    client: Client,
    projects: Collection<Document>,
    deployments: Collection<Document>,
}

impl MongoRepository {
    /// Connects to `conn_str` and ensures the unique upsert-key indexes exist.
    ///
    /// # Errors
    ///
    /// Returns a `Storage` error if the connection string is invalid or the
    /// server cannot be reached to create indexes.
    pub async fn connect(conn_str: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(conn_str).await?;
        let db = client.database(database);

        let repo = Self {
            projects: db.collection(PROJECTS),
            deployments: db.collection(DEPLOYMENTS),
            client,
        };
        repo.ensure_indexes().await?;

        info!("Connected to MongoDB database '{database}'");
        Ok(repo)
    }

    async fn ensure_indexes(&self) -> Result<()> {
        let unique = IndexOptions::builder().unique(true).build();

        self.projects
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "project_id": 1 })
                    .options(unique.clone())
                    .build(),
            )
            .await?;

        self.deployments
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "project_id": 1, "deployment_id": 1 })
                    .options(unique)
                    .build(),
            )
            .await?;

        Ok(())
    }

    pub async fn shutdown(self) {
        self.client.shutdown().await;
        debug!("MongoDB client shut down");
    }
}

fn to_bson_id(id: u64) -> Result<i64> {
    i64::try_from(id).map_err(|_| MetrixError::Storage {
        message: format!("identifier {id} does not fit in a BSON int64"),
        retryable: false,
    })
}

fn project_filter(project: &Project) -> Result<Document> {
    Ok(doc! { "project_id": to_bson_id(project.id)? })
}

fn project_update(project: &Project) -> Result<Document> {
    Ok(doc! {
        "$set": {
            "project_id": to_bson_id(project.id)?,
            "name": project.name.clone(),
            "path": project.path.clone(),
            "path_with_namespace": project.path_with_namespace.clone(),
            "namespace": project.namespace.clone(),
            "web_url": project.web_url.clone(),
        }
    })
}

fn deployment_filter(deployment: &Deployment) -> Result<Document> {
    Ok(doc! {
        "project_id": to_bson_id(deployment.project_id)?,
        "deployment_id": to_bson_id(deployment.id)?,
    })
}

fn deployment_update(deployment: &Deployment) -> Result<Document> {
    let pipeline_id = deployment.pipeline_id.map(to_bson_id).transpose()?;
    let finished_at = deployment
        .finished_at
        .map(|ts| BsonDateTime::from_millis(ts.timestamp_millis()));

    Ok(doc! {
        "$set": {
            "deployment_id": to_bson_id(deployment.id)?,
            "status": deployment.status.as_str(),
            "environment_name": deployment.environment_name.clone(),
            "project_id": to_bson_id(deployment.project_id)?,
            "project_name": deployment.project_name.clone(),
            "project_path": deployment.project_path.clone(),
            "project_namespace": deployment.project_namespace.clone(),
            "pipeline_id": pipeline_id,
            "finished_at": finished_at,
            "duration": deployment.duration,
        }
    })
}

#[async_trait]
impl Repository for MongoRepository {
    async fn save_projects(&self, projects: &[Project]) -> Result<()> {
        for project in projects {
            self.projects
                .update_one(project_filter(project)?, project_update(project)?)
                .upsert(true)
                .await?;
        }
        debug!("Upserted {} projects", projects.len());
        Ok(())
    }

    async fn save_deployment(&self, deployment: &Deployment) -> Result<()> {
        self.deployments
            .update_one(deployment_filter(deployment)?, deployment_update(deployment)?)
            .upsert(true)
            .await?;
        Ok(())
    }
}
