use std::fmt;
use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::Token;
use crate::error::{MetrixError, Result};
use crate::providers::gitlab::pagination::{PageInfo, PageOptions};

const USER_AGENT: &str = concat!("metrix/", env!("CARGO_PKG_VERSION"));

/// Transport tuning for [`GitLabClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Applied to every outbound request
    pub timeout: Duration,
    /// Retries for connect/timeout errors, 429 and 5xx responses
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Upper bound on pages fetched for a single listing
    pub max_pages: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            max_pages: 1000,
        }
    }
}

/// A paginated REST listing.
#[derive(Debug, Clone, Copy)]
pub(super) enum Resource<'a> {
    Projects,
    Deployments {
        project_id: u64,
        environment: &'a str,
    },
}

impl Resource<'_> {
    fn path(&self) -> String {
        match self {
            Self::Projects => "projects".to_string(),
            Self::Deployments { project_id, .. } => format!("projects/{project_id}/deployments"),
        }
    }

    fn query(&self, opts: PageOptions) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("page", opts.page.to_string()),
            ("per_page", opts.per_page.to_string()),
        ];
        match self {
            Self::Projects => query.push(("simple", "false".to_string())),
            Self::Deployments { environment, .. } => {
                if !environment.is_empty() {
                    query.push(("environment", (*environment).to_string()));
                }
            }
        }
        query
    }

    fn not_found(&self) -> MetrixError {
        match self {
            Self::Projects => MetrixError::Transport("projects endpoint returned 404".to_string()),
            Self::Deployments { project_id, .. } => MetrixError::NotFound(*project_id),
        }
    }
}

impl fmt::Display for Resource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Projects => f.write_str("projects"),
            Self::Deployments { project_id, .. } => write!(f, "deployments of project {project_id}"),
        }
    }
}

pub struct GitLabClient {
    client: Client,
    api_url: Url,
    token: Option<Token>,
    options: ClientOptions,
    cancel: CancellationToken,
}

impl GitLabClient {
    pub fn new(base_url: &str, token: Option<Token>, options: ClientOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(options.timeout)
            .build()
            .map_err(|e| MetrixError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut base = Url::parse(base_url)
            .map_err(|e| MetrixError::Config(format!("Invalid base URL: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let api_url = base
            .join("api/v4/")
            .map_err(|e| MetrixError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token,
            options,
            cancel: CancellationToken::new(),
        })
    }

    /// Aborts in-progress listings at the next page boundary once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.header("PRIVATE-TOKEN", token.as_str())
        } else {
            request
        }
    }

    /// Fetches every page of `resource` starting at `opts.page`.
    ///
    /// Requests page `current + 1` until the server reports `current >= total`.
    pub(super) async fn fetch_all<T>(&self, resource: Resource<'_>, opts: PageOptions) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut all_records = Vec::new();
        let mut opts = opts;
        let mut pages_fetched = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(MetrixError::Cancelled);
            }

            if pages_fetched >= self.options.max_pages {
                return Err(MetrixError::PageLimitExceeded {
                    resource: resource.to_string(),
                    limit: self.options.max_pages,
                });
            }

            let (records, info) = self.get_page::<T>(resource, opts).await?;
            pages_fetched += 1;

            debug!(
                "Fetched page {}/{} of {resource} ({} records)",
                info.current,
                info.total.map_or_else(|| "?".to_string(), |t| t.to_string()),
                records.len()
            );

            all_records.extend(records);

            match info.next_page() {
                Some(next) => opts.page = next,
                None => break,
            }
        }

        Ok(all_records)
    }

    /// Waits `retry_delay` before the next attempt, unless the run is cancelled.
    async fn backoff(&self) -> Result<()> {
        tokio::select! {
            () = self.cancel.cancelled() => Err(MetrixError::Cancelled),
            () = tokio::time::sleep(self.options.retry_delay) => Ok(()),
        }
    }

    /// Execute a single page request with retry on network errors, rate limits and 5xx.
    async fn get_page<T>(&self, resource: Resource<'_>, opts: PageOptions) -> Result<(Vec<T>, PageInfo)>
    where
        T: DeserializeOwned,
    {
        let url = self
            .api_url
            .join(&resource.path())
            .map_err(|e| MetrixError::Config(format!("Invalid {resource} URL: {e}")))?;
        let query = resource.query(opts);

        let mut retry_count = 0;
        loop {
            let request = self.auth_request(self.client.get(url.clone()).query(&query));

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    if retry_count >= self.options.max_retries {
                        return Err(e.into());
                    }
                    warn!(
                        "Network error fetching {resource} ({e}), retrying in {:?} ({}/{})...",
                        self.options.retry_delay,
                        retry_count + 1,
                        self.options.max_retries
                    );
                    self.backoff().await?;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if retry_count >= self.options.max_retries {
                    return Err(MetrixError::Transport(format!(
                        "{resource}: status {status} after {} retries",
                        self.options.max_retries
                    )));
                }
                warn!(
                    "GitLab API error (status {status}) fetching {resource}. Waiting {:?} before retry {}/{}...",
                    self.options.retry_delay,
                    retry_count + 1,
                    self.options.max_retries
                );
                self.backoff().await?;
                retry_count += 1;
                continue;
            }

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(MetrixError::Auth {
                    status: status.as_u16(),
                });
            }

            if status == StatusCode::NOT_FOUND {
                return Err(resource.not_found());
            }

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                return Err(MetrixError::Transport(format!(
                    "{resource}: status {status}: {error_text}"
                )));
            }

            let info = PageInfo::from_headers(response.headers(), opts.page);
            let body = response.text().await?;
            let records = serde_json::from_str(&body).map_err(|e| MetrixError::Decode {
                resource: resource.to_string(),
                message: e.to_string(),
            })?;

            return Ok((records, info));
        }
    }
}
