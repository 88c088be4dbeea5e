use crate::model::{Deployment, DeploymentStatus, Project};
use crate::providers::gitlab::{GitLabDeployment, GitLabProject};

/// A deployment counts towards delivery metrics only when it ran against
/// `environment` and reached a final success/failed outcome.
pub fn is_relevant(deployment: &GitLabDeployment, environment: &str) -> bool {
    deployment.environment_name() == environment
        && DeploymentStatus::from(deployment.status.as_str()).is_resolved()
}

/// Retained subset of `deployments`, in source order.
pub fn relevant<'a>(
    deployments: &'a [GitLabDeployment],
    environment: &str,
) -> Vec<&'a GitLabDeployment> {
    deployments
        .iter()
        .filter(|d| is_relevant(d, environment))
        .collect()
}

pub fn to_project(raw: GitLabProject) -> Project {
    Project {
        id: raw.id,
        name: raw.name,
        path: raw.path,
        path_with_namespace: raw.path_with_namespace,
        namespace: raw.namespace.map(|ns| ns.full_path).unwrap_or_default(),
        web_url: raw.web_url,
    }
}

/// Flattens a raw deployment and stamps it with a snapshot of `project`.
pub fn to_deployment(raw: &GitLabDeployment, project: &Project) -> Deployment {
    let deployable = raw.deployable.as_ref();

    Deployment {
        id: raw.id,
        status: DeploymentStatus::from(raw.status.as_str()),
        environment_name: raw.environment_name().to_string(),
        project_id: project.id,
        project_name: project.name.clone(),
        project_path: project.path.clone(),
        project_namespace: project.namespace.clone(),
        pipeline_id: deployable.and_then(|d| d.pipeline.as_ref()).map(|p| p.id),
        finished_at: deployable.and_then(|d| d.finished_at),
        duration: deployable.and_then(|d| d.duration).unwrap_or(0.0),
    }
}
