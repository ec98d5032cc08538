use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

/// Bytes retrieved from an evidence link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPayload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("{0}")]
    Transport(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Retrieves evidence payloads by URL.
#[async_trait]
pub trait EvidenceFetcher: Debug + Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPayload, FetchError>;
}

/// reqwest-backed fetcher used by the service.
#[derive(Debug, Clone)]
pub struct HttpEvidenceFetcher {
    client: Client,
}

impl HttpEvidenceFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("evidence-desk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EvidenceFetcher for HttpEvidenceFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPayload, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        Ok(FetchedPayload {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
