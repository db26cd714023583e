//! Network collaborator used by the delivery engine.

use crate::error::HttpError;
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, Method, Url};
use std::time::Duration;
use tracing::debug;

/// Issues one HTTP request and reports the response status.
///
/// Implementations must not follow redirects: a 3xx status is a result, not
/// a hop. The response body is ignored.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, method: &str, url: &str, timeout: Duration) -> Result<u16, HttpError>;
}

/// [`HttpExecutor`] backed by a single shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    pub fn new() -> Result<Self, HttpError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(|e| HttpError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, method: &str, url: &str, timeout: Duration) -> Result<u16, HttpError> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| HttpError::InvalidRequest(format!("bad method {method:?}: {e}")))?;
        let url = Url::parse(url).map_err(|e| HttpError::InvalidRequest(format!("bad URL {url:?}: {e}")))?;

        let response = self
            .client
            .request(method, url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HttpError::Timeout(timeout)
                } else if e.is_builder() {
                    HttpError::InvalidRequest(e.to_string())
                } else {
                    HttpError::Transport(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        // body is never read
        drop(response);

        debug!(status, "HTTP response received");
        Ok(status)
    }
}
