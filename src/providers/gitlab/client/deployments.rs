use log::debug;

use super::core::{GitLabClient, Resource};
use crate::error::Result;
use crate::providers::gitlab::pagination::PageOptions;
use crate::providers::gitlab::types::GitLabDeployment;

impl GitLabClient {
    /// Lists every deployment of a project, filtered server-side to
    /// `environment` (no filter when empty).
    ///
    /// Returns raw records; status filtering is left to the caller.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`GitLabClient::fetch_projects`], plus
    /// `NotFound` if the project no longer exists.
    pub async fn fetch_deployments(
        &self,
        project_id: u64,
        environment: &str,
        opts: PageOptions,
    ) -> Result<Vec<GitLabDeployment>> {
        let deployments: Vec<GitLabDeployment> = self
            .fetch_all(
                Resource::Deployments {
                    project_id,
                    environment,
                },
                opts,
            )
            .await?;
        debug!(
            "Fetched {} deployments for project {project_id}",
            deployments.len()
        );
        Ok(deployments)
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};

    use super::*;
    use crate::error::MetrixError;
    use crate::providers::gitlab::client::ClientOptions;

    const DEPLOYMENT_PAGE_1: &str = r#"[{
        "id": 1,
        "status": "success",
        "environment": {"name": "production"},
        "deployable": {
            "finished_at": "2020-10-06T15:30:53.355Z",
            "duration": 123.45,
            "pipeline": {"id": 1}
        }
    }]"#;

    const DEPLOYMENT_PAGE_2: &str = r#"[{
        "id": 2,
        "status": "success",
        "environment": {"name": "production"},
        "deployable": {
            "finished_at": "2020-10-06T15:30:53.355Z",
            "duration": 123.45,
            "pipeline": {"id": 2}
        }
    }]"#;

    fn test_client(url: &str) -> GitLabClient {
        GitLabClient::new(url, None, ClientOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_deployments_passes_environment_filter() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/1/deployments")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("environment".into(), "production".into()),
            ]))
            .with_body(DEPLOYMENT_PAGE_1)
            .create_async()
            .await;

        let deployments = test_client(&server.url())
            .fetch_deployments(1, "production", PageOptions::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(deployments.len(), 1);
        assert_eq!(deployments[0].status, "success");
    }

    #[tokio::test]
    async fn test_fetch_deployments_multiple_pages() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/1/deployments")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_header("x-page", "1")
            .with_header("x-total-pages", "2")
            .with_header("x-next-page", "2")
            .with_body(DEPLOYMENT_PAGE_1)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v4/projects/1/deployments")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_header("x-page", "2")
            .with_header("x-total-pages", "2")
            .with_body(DEPLOYMENT_PAGE_2)
            .create_async()
            .await;

        let deployments = test_client(&server.url())
            .fetch_deployments(1, "production", PageOptions::default())
            .await
            .unwrap();

        let ids: Vec<u64> = deployments.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_fetch_deployments_malformed_second_page_is_decode_error() {
        let mut server = Server::new_async().await;
        let page1 = server
            .mock("GET", "/api/v4/projects/1/deployments")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_header("x-page", "1")
            .with_header("x-total-pages", "2")
            .with_body(DEPLOYMENT_PAGE_1)
            .expect(1)
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/api/v4/projects/1/deployments")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_header("x-page", "2")
            .with_header("x-total-pages", "2")
            .with_body(r#"[{"id": "two"}"#)
            .expect(1)
            .create_async()
            .await;

        let result = test_client(&server.url())
            .fetch_deployments(1, "production", PageOptions::default())
            .await;

        page1.assert_async().await;
        page2.assert_async().await;
        assert!(matches!(result, Err(MetrixError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_fetch_deployments_missing_project_is_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/42/deployments")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"404 Project Not Found"}"#)
            .create_async()
            .await;

        let result = test_client(&server.url())
            .fetch_deployments(42, "production", PageOptions::default())
            .await;

        assert!(matches!(result, Err(MetrixError::NotFound(42))));
    }

    #[tokio::test]
    async fn test_fetch_deployments_forbidden_is_auth_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/5/deployments")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let result = test_client(&server.url())
            .fetch_deployments(5, "production", PageOptions::default())
            .await;

        assert!(matches!(result, Err(MetrixError::Auth { status: 403 })));
    }
}
