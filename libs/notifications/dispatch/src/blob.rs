//! Attachment downloads.

use crate::config::BlobConfig;
use crate::error::SendError;
use async_trait::async_trait;
use http::StatusCode;
use reqwest::Client;
use tracing::debug;

const STORAGE_API_VERSION: &str = "2023-11-03";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Content of the blob at `uri`, or `None` when it does not exist.
    async fn fetch(&self, uri: &str) -> Result<Option<Vec<u8>>, SendError>;
}

/// Plain HTTP GET against a blob URI. Works with SAS URLs as well as
/// bearer-authenticated storage accounts.
pub struct HttpBlobStore {
    client: Client,
    config: BlobConfig,
}

impl HttpBlobStore {
    pub fn new(config: BlobConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn fetch(&self, uri: &str) -> Result<Option<Vec<u8>>, SendError> {
        let mut request = self.client.get(uri);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token).header("x-ms-version", STORAGE_API_VERSION);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(uri, "Blob not found");
                Ok(None)
            }
            status if status.is_success() => Ok(Some(response.bytes().await?.to_vec())),
            status => Err(SendError::Transport(format!(
                "blob download {uri} failed with {status}"
            ))),
        }
    }
}

/// File name an attachment is sent under: the last path segment of its URI.
pub fn attachment_filename(uri: &str) -> &str {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}
