use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use crate::hub::HubError;

/// Fetches a JSON document by URL. The hub only talks to sources through
/// this trait.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<Value, HubError>;
}

/// Reads `http(s)://` URLs over the network and `file://` URLs or plain
/// paths from disk.
pub struct SourceFetcher {
    client: Client,
}

impl SourceFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tokscope/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("falling back to default http client: {}", e);
                Client::new()
            });
        Self { client }
    }

    async fn fetch_http(&self, url: &str) -> Result<Value, HubError> {
        let response = self.client.get(url).send().await.map_err(|e| HubError::Fetch {
            url: url.to_string(),
            status: "request error".to_string(),
            body: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HubError::Fetch {
                url: url.to_string(),
                status: status.to_string(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| HubError::Io {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        parse_json(url, &bytes)
    }

    async fn fetch_file(&self, url: &str, path: PathBuf) -> Result<Value, HubError> {
        let bytes = tokio::fs::read(&path).await.map_err(|e| HubError::Io {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        parse_json(url, &bytes)
    }
}

impl Default for SourceFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[async_trait]
impl JsonFetcher for SourceFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, HubError> {
        tracing::debug!("fetching {}", url);
        match url::Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => self.fetch_http(url).await,
            Ok(parsed) if parsed.scheme() == "file" => {
                let path = parsed.to_file_path().map_err(|_| HubError::Io {
                    url: url.to_string(),
                    message: "not a local file path".to_string(),
                })?;
                self.fetch_file(url, path).await
            }
            Ok(parsed) if parsed.scheme().len() > 1 => Err(HubError::Io {
                url: url.to_string(),
                message: format!("unsupported scheme {}", parsed.scheme()),
            }),
            // Relative paths, and Windows drive letters parsed as a scheme.
            _ => self.fetch_file(url, PathBuf::from(url)).await,
        }
    }
}

pub fn parse_json(url: &str, bytes: &[u8]) -> Result<Value, HubError> {
    serde_json::from_slice(bytes).map_err(|e| HubError::Parse {
        url: url.to_string(),
        message: e.to_string(),
    })
}
