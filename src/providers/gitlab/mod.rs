mod client;
mod pagination;
mod types;

pub use client::{ClientOptions, GitLabClient, SourceClient};
pub use pagination::{PageOptions, DEFAULT_PER_PAGE};
pub use types::{
    GitLabDeployable, GitLabDeployment, GitLabEnvironment, GitLabNamespace, GitLabPipelineRef,
    GitLabProject,
};
