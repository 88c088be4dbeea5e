use log::info;

use super::core::{GitLabClient, Resource};
use crate::error::Result;
use crate::providers::gitlab::pagination::PageOptions;
use crate::providers::gitlab::types::GitLabProject;

impl GitLabClient {
    /// Lists every project visible to the token, following all pages.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * A request fails after retries (`Transport`)
    /// * The token is rejected (`Auth`)
    /// * A page body is not a project array (`Decode`)
    pub async fn fetch_projects(&self, opts: PageOptions) -> Result<Vec<GitLabProject>> {
        let projects: Vec<GitLabProject> = self.fetch_all(Resource::Projects, opts).await?;
        info!("Fetched {} projects", projects.len());
        Ok(projects)
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};

    use super::*;
    use crate::error::MetrixError;
    use crate::providers::gitlab::client::ClientOptions;

    fn project_json(id: u64) -> String {
        format!(
            r#"{{"id": {id}, "name": "test", "path": "test", "path_with_namespace": "test/test",
                "web_url": "http://test.com/test/test", "namespace": {{"full_path": "test"}}}}"#
        )
    }

    fn test_client(url: &str) -> GitLabClient {
        let options = ClientOptions {
            max_retries: 1,
            retry_delay: std::time::Duration::ZERO,
            ..ClientOptions::default()
        };
        GitLabClient::new(url, Some("glpat-test".into()), options).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_projects_single_page_without_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .match_header("private-token", "glpat-test")
            .with_body(format!("[{}]", project_json(1)))
            .create_async()
            .await;

        let projects = test_client(&server.url())
            .fetch_projects(PageOptions::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].path_with_namespace, "test/test");
        assert_eq!(
            projects[0].namespace.as_ref().map(|n| n.full_path.as_str()),
            Some("test")
        );
    }

    #[tokio::test]
    async fn test_fetch_projects_follows_pages_in_order() {
        let mut server = Server::new_async().await;
        let page1 = server
            .mock("GET", "/api/v4/projects")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("per_page".into(), "20".into()),
                Matcher::UrlEncoded("simple".into(), "false".into()),
            ]))
            .with_header("x-page", "1")
            .with_header("x-total-pages", "2")
            .with_header("x-next-page", "2")
            .with_body(format!("[{}]", project_json(1)))
            .expect(1)
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/api/v4/projects")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_header("x-page", "2")
            .with_header("x-total-pages", "2")
            .with_header("x-next-page", "2")
            .with_body(format!("[{},{}]", project_json(2), project_json(3)))
            .expect(1)
            .create_async()
            .await;

        let projects = test_client(&server.url())
            .fetch_projects(PageOptions::default())
            .await
            .unwrap();

        page1.assert_async().await;
        page2.assert_async().await;
        let ids: Vec<u64> = projects.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_projects_unauthorized_is_auth_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"message":"401 Unauthorized"}"#)
            .create_async()
            .await;

        let result = test_client(&server.url())
            .fetch_projects(PageOptions::default())
            .await;

        assert!(matches!(result, Err(MetrixError::Auth { status: 401 })));
    }

    #[tokio::test]
    async fn test_fetch_projects_auth_failure_on_second_page_discards_first() {
        let mut server = Server::new_async().await;
        let page1 = server
            .mock("GET", "/api/v4/projects")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_header("x-page", "1")
            .with_header("x-total-pages", "2")
            .with_body(format!("[{}]", project_json(1)))
            .expect(1)
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/api/v4/projects")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let result = test_client(&server.url())
            .fetch_projects(PageOptions::default())
            .await;

        page1.assert_async().await;
        page2.assert_async().await;
        assert!(matches!(result, Err(MetrixError::Auth { status: 401 })));
    }

    #[tokio::test]
    async fn test_fetch_projects_malformed_body_is_decode_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects")
            .match_query(Matcher::Any)
            .with_body(r#"{"not": "an array"}"#)
            .create_async()
            .await;

        let result = test_client(&server.url())
            .fetch_projects(PageOptions::default())
            .await;

        assert!(matches!(result, Err(MetrixError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_fetch_projects_retries_server_errors_then_fails() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let result = test_client(&server.url())
            .fetch_projects(PageOptions::default())
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(MetrixError::Transport(_))));
    }

    #[tokio::test]
    async fn test_fetch_projects_aborts_at_page_cap() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects")
            .match_query(Matcher::Any)
            .with_header("x-next-page", "999")
            .with_body("[]")
            .create_async()
            .await;

        let options = ClientOptions {
            max_pages: 3,
            ..ClientOptions::default()
        };
        let client = GitLabClient::new(&server.url(), None, options).unwrap();
        let result = client.fetch_projects(PageOptions::default()).await;

        assert!(matches!(
            result,
            Err(MetrixError::PageLimitExceeded { limit: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_projects_cancelled_before_first_page() {
        let server = Server::new_async().await;
        let cancel = tokio_util::sync::CancellationToken::new();
        cancel.cancel();

        let client = test_client(&server.url()).with_cancellation(cancel);
        let result = client.fetch_projects(PageOptions::default()).await;

        assert!(matches!(result, Err(MetrixError::Cancelled)));
    }

    #[tokio::test]
    async fn test_fetch_projects_cancelled_during_retry_backoff() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects")
            .match_query(Matcher::Any)
            .with_status(429)
            .expect(1)
            .create_async()
            .await;

        let options = ClientOptions {
            max_retries: 3,
            retry_delay: std::time::Duration::from_secs(60),
            ..ClientOptions::default()
        };
        let cancel = tokio_util::sync::CancellationToken::new();
        let client = GitLabClient::new(&server.url(), None, options)
            .unwrap()
            .with_cancellation(cancel.clone());

        let trigger = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            cancel.cancel();
        });

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            client.fetch_projects(PageOptions::default()),
        )
        .await
        .expect("backoff should stop once cancelled");

        trigger.await.unwrap();
        mock.assert_async().await;
        assert!(matches!(result, Err(MetrixError::Cancelled)));
    }
}
