//! HTTP implementation of [`FabricBackend`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use super::{ChatReply, ChatRequest, FabricBackend, HealthReport};
use crate::error::{ConsoleError, Result, extract_error_message};

/// HTTP client for the fabric backend.
///
/// # Example
///
/// ```rust,no_run
/// use fabric_console::client::{FabricBackend, HttpBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = HttpBackend::new("http://localhost:5000")?;
/// let health = backend.health().await?;
/// println!("backend is {}", health.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpBackend {
    /// Create a client with default settings.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(base_url, http)
    }

    /// Create a client with a custom reqwest client.
    pub fn with_client(base_url: impl AsRef<str>, http: reqwest::Client) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self { base_url, http })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn error_from(response: reqwest::Response) -> ConsoleError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ConsoleError::Api {
            status: status.as_u16(),
            message: extract_error_message(status, &body),
        }
    }
}

#[async_trait]
impl FabricBackend for HttpBackend {
    async fn health(&self) -> Result<HealthReport> {
        let response = self.http.get(self.url("/api/health")?).send().await?;
        let status = response.status();

        // A degraded backend answers 503 but still describes itself.
        if status.is_success() || status == StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await?;
            return match serde_json::from_str::<HealthReport>(&body) {
                Ok(report) => Ok(report),
                Err(_) if !status.is_success() => Err(ConsoleError::Api {
                    status: status.as_u16(),
                    message: extract_error_message(status, &body),
                }),
                Err(err) => Err(err.into()),
            };
        }

        Err(Self::error_from(response).await)
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        tracing::debug!(
            message_length = request.message.len(),
            files = request.files.len(),
            "Posting chat message"
        );

        let response = self
            .http
            .post(self.url("/api/chat")?)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn clear_chat(&self) -> Result<()> {
        let response = self.http.post(self.url("/api/chat/clear")?).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        let backend = HttpBackend::new("http://localhost:5000/").unwrap();
        assert_eq!(
            backend.url("/api/health").unwrap().as_str(),
            "http://localhost:5000/api/health"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpBackend::new("not a url"),
            Err(ConsoleError::InvalidUrl(_))
        ));
    }
}
