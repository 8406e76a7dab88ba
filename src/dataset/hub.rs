//! HuggingFace Hub file client for dataset downloads.
//!
//! Resolves files through the Hub `resolve/main` endpoint and keeps a local
//! copy under a cache directory so repeated runs do not download twice.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tokio::io::AsyncWriteExt;

use crate::config::DEFAULT_HF_ENDPOINT;
use crate::error::DatasetError;

/// Request timeout for a single file download.
const DOWNLOAD_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub endpoint: String,
    pub token: Option<String>,
    pub cache_dir: PathBuf,
}

impl HubConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            endpoint: DEFAULT_HF_ENDPOINT.to_string(),
            token: None,
            cache_dir: cache_dir.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }
}

pub struct HubClient {
    client: Client,
    config: HubConfig,
}

impl HubClient {
    pub fn new(config: HubConfig) -> Result<Self, DatasetError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .map_err(|e| DatasetError::RequestFailed(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// URL of a file in a dataset repository.
    pub fn file_url(&self, repo_id: &str, filename: &str) -> String {
        format!(
            "{}/datasets/{}/resolve/main/{}",
            self.config.endpoint, repo_id, filename
        )
    }

    /// Local cache path for a dataset file.
    pub fn cache_path(&self, repo_id: &str, filename: &str) -> PathBuf {
        let repo_dir = format!("datasets--{}", repo_id.replace('/', "--"));
        self.config.cache_dir.join(repo_dir).join(filename)
    }

    /// Download a dataset file, returning its local path.
    ///
    /// A cached copy is returned as-is. Fresh downloads are streamed into a
    /// temporary file next to the target and renamed into place once complete.
    pub async fn download(&self, repo_id: &str, filename: &str) -> Result<PathBuf, DatasetError> {
        let target = self.cache_path(repo_id, filename);
        if target.is_file() {
            tracing::debug!(path = %target.display(), "Using cached hub file");
            return Ok(target);
        }

        let url = self.file_url(repo_id, filename);
        tracing::info!(repo = repo_id, file = filename, "Downloading from HuggingFace");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let mut resp = request
            .send()
            .await
            .map_err(|e| DatasetError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(DatasetError::DownloadFailed {
                repo: repo_id.to_string(),
                file: filename.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let parent = target.parent().unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(parent).await?;

        let staging = tempfile::NamedTempFile::new_in(parent)?;
        let (std_file, staging_path) = staging.into_parts();
        let mut file = tokio::fs::File::from_std(std_file);
        let mut size = 0usize;
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| DatasetError::RequestFailed(e.to_string()))?
        {
            size += chunk.len();
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        staging_path
            .persist(&target)
            .map_err(|e| DatasetError::Io(e.error))?;

        tracing::debug!(path = %target.display(), size, "Hub file cached");
        Ok(target)
    }
}
