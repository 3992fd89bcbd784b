//! HTTP plumbing for the Meilisearch REST API.

use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, Response, Url};
use search_sink::TaskHandle;
use serde::Deserialize;
use std::time::Duration;

/// Interval between two `GET /tasks/{uid}` polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Connection settings for a Meilisearch instance.
#[derive(Debug, Clone)]
pub struct MeilisearchConfig {
    /// Base URL, e.g. `http://localhost:7700`
    pub host: String,
    /// Sent as a bearer token when set
    pub api_key: Option<String>,
    /// How long to sleep between task status polls
    pub poll_interval: Duration,
}

impl Default for MeilisearchConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:7700".to_string(),
            api_key: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Response body of every enqueueing endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EnqueuedTask {
    pub task_uid: TaskHandle,
}

/// Response body of `GET /version`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub pkg_version: String,
    #[serde(default)]
    pub commit_sha: Option<String>,
}

/// Meilisearch client implementing `IndexWriter`.
pub struct MeilisearchSink {
    pub(crate) http: reqwest::Client,
    base: Url,
    api_key: Option<String>,
    pub(crate) poll_interval: Duration,
}

impl MeilisearchSink {
    /// Create a client. No request is made until the first call.
    pub fn new(config: MeilisearchConfig) -> Result<Self> {
        let base = Url::parse(&config.host)
            .with_context(|| format!("Invalid Meilisearch host: {}", config.host))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Meilisearch host cannot be used as a base URL: {}", config.host);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base,
            api_key: config.api_key.filter(|k| !k.is_empty()),
            poll_interval: config.poll_interval,
        })
    }

    /// Fetch the server version. Used as a reachability check at startup.
    pub async fn version(&self) -> Result<VersionInfo> {
        let response = self.send(self.request(Method::GET, &["version"])?).await?;
        Ok(response.json().await?)
    }

    /// Build a URL from path segments, percent-encoding each one.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Meilisearch host cannot be used as a base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.url(segments)?;
        let mut builder = self.http.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        Ok(builder)
    }

    /// Send a request and turn non-2xx responses into errors carrying the
    /// response body.
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build()?;
        let method = request.method().clone();
        let url = request.url().clone();

        let response = self
            .http
            .execute(request)
            .await
            .with_context(|| format!("Meilisearch request {method} {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Meilisearch request {method} {url} failed with status {status}: {body}");
        }

        Ok(response)
    }

    /// Send a request to an enqueueing endpoint and return the task handle.
    pub(crate) async fn enqueue(&self, builder: RequestBuilder) -> Result<TaskHandle> {
        let response = self.send(builder).await?;
        let task: EnqueuedTask = response
            .json()
            .await
            .context("Failed to decode Meilisearch task response")?;
        Ok(task.task_uid)
    }
}
