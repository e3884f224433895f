use crate::config::schema::StoreConfig;
use crate::error::{MarmotError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Category listing: category name to available versions
pub type Categories = HashMap<String, Vec<u32>>;

/// Remote model store
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// List categories and their versions
    async fn categories(&self) -> Result<Categories>;

    /// Upload a packaged candidate under `name`
    async fn upload(&self, name: &str, archive_path: &Path) -> Result<()>;

    /// Download the archive of a published module
    async fn download(&self, module: &str) -> Result<Vec<u8>>;
}

/// Model store reached over HTTP
pub struct HttpModelStore {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for HttpModelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpModelStore")
            .field("client", &"Client { ... }")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpModelStore {
    #[must_use]
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/models{path}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| MarmotError::Store(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        tracing::error!("Model store responded with {status}: {error_body}");
        Err(MarmotError::Store(format!("HTTP {status}: {error_body}")))
    }
}

#[async_trait]
impl ModelStore for HttpModelStore {
    async fn categories(&self) -> Result<Categories> {
        let response = self.send(self.client.get(self.url(""))).await?;
        response
            .json()
            .await
            .map_err(|e| MarmotError::Store(format!("Failed to parse category listing: {e}")))
    }

    async fn upload(&self, name: &str, archive_path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(archive_path).await?;
        let file_name = archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{name}.zip"));

        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/zip")
            .map_err(|e| MarmotError::Store(format!("Failed to set MIME type: {e}")))?;
        let form = reqwest::multipart::Form::new().part("file", file_part);

        let url = self.url(&format!("/{name}"));
        tracing::info!("Uploading {} to {url}", archive_path.display());
        self.send(self.client.post(&url).multipart(form)).await?;

        Ok(())
    }

    async fn download(&self, module: &str) -> Result<Vec<u8>> {
        let response = self
            .send(self.client.get(self.url(&format!("/{module}"))))
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| MarmotError::Store(format!("Failed to read archive: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_store() -> HttpModelStore {
        HttpModelStore::new(&StoreConfig {
            base_url: "http://127.0.0.1:1/".to_string(),
            timeout_secs: 5,
        })
    }

    #[test]
    fn test_urls() {
        let store = unreachable_store();
        assert_eq!(store.base_url(), "http://127.0.0.1:1");
        assert_eq!(store.url(""), "http://127.0.0.1:1/models");
        assert_eq!(store.url("/fuel"), "http://127.0.0.1:1/models/fuel");
    }

    #[test]
    fn test_debug_hides_client() {
        let debug = format!("{:?}", unreachable_store());
        assert!(debug.contains("Client { ... }"));
        assert!(debug.contains("127.0.0.1:1"));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_store_error() {
        let store = unreachable_store();
        assert!(matches!(
            store.categories().await,
            Err(MarmotError::Store(_))
        ));
        assert!(matches!(
            store.download("fuel").await,
            Err(MarmotError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_missing_archive_is_io_error() {
        let store = unreachable_store();
        let result = store
            .upload("fuel", Path::new("/nonexistent/fuel.zip"))
            .await;
        assert!(matches!(result, Err(MarmotError::Io(_))));
    }
}
