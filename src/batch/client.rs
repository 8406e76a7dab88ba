//! Batch inference API client.
//!
//! [`BatchApi`] is the seam the submit, watch and process stages talk to.
//! [`OpenAiBatchClient`] implements it against the OpenAI-compatible
//! `/files` and `/batches` endpoints.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::request::CHAT_COMPLETIONS_ENDPOINT;
use super::status::{Batch, FileObject};
use crate::config::DEFAULT_OPENAI_BASE_URL;
use crate::error::BatchError;

/// Maximum number of attempts for transient failures.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff in milliseconds.
const BASE_RETRY_DELAY_MS: u64 = 1000;

/// Sleep before retry `attempt` (1-based): 1s, then 2s.
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(BASE_RETRY_DELAY_MS << attempt.saturating_sub(1))
}

/// Request timeout in seconds. Uploads of large request files need headroom.
const REQUEST_TIMEOUT_SECS: u64 = 600;

/// Completion window requested for new batches.
pub const COMPLETION_WINDOW: &str = "24h";

/// Operations of a hosted batch inference service.
#[async_trait]
pub trait BatchApi: Send + Sync {
    /// Upload a JSONL request file with purpose `batch`.
    async fn upload_file(&self, path: &Path) -> Result<FileObject, BatchError>;

    /// Create a batch over a previously uploaded file.
    async fn create_batch(&self, input_file_id: &str) -> Result<Batch, BatchError>;

    async fn retrieve_batch(&self, batch_id: &str) -> Result<Batch, BatchError>;

    /// Raw content of an output or error file.
    async fn file_content(&self, file_id: &str) -> Result<String, BatchError>;
}

#[derive(Debug, Serialize)]
struct CreateBatchRequest<'a> {
    input_file_id: &'a str,
    endpoint: &'a str,
    completion_window: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub struct OpenAiBatchClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiBatchClient {
    pub fn new(api_key: String) -> Result<Self, BatchError> {
        Self::with_base_url(api_key, DEFAULT_OPENAI_BASE_URL.to_string())
    }

    /// Client for an OpenAI-compatible endpoint (proxies, tests).
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, BatchError> {
        if api_key.trim().is_empty() {
            return Err(BatchError::MissingApiKey);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| BatchError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the API key (for debugging, returns masked value).
    pub fn api_key_masked(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 8 {
            "*".repeat(chars.len())
        } else {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", head, tail)
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request built by `make` with exponential backoff on transient errors.
    ///
    /// `make` is called once per attempt because multipart bodies cannot be
    /// replayed.
    async fn execute_with_retry<F>(&self, make: F) -> Result<reqwest::Response, BatchError>
    where
        F: Fn() -> Result<RequestBuilder, BatchError>,
    {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = retry_delay(attempt);
                tokio::time::sleep(delay).await;
                tracing::debug!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying batch API request after transient failure"
                );
            }

            match self.execute_request(make()?).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if is_transient_error(&err) {
                        tracing::warn!(
                            attempt = attempt + 1,
                            max_retries = MAX_RETRIES,
                            error = %err,
                            "Transient error, will retry"
                        );
                        last_error = Some(err);
                    } else {
                        return Err(err);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BatchError::RequestFailed("Max retries exceeded with no error captured".to_string())
        }))
    }

    /// Execute a single request (no retry logic).
    async fn execute_request(&self, request: RequestBuilder) -> Result<reqwest::Response, BatchError> {
        let http_response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| BatchError::RequestFailed(describe_send_error(&e)))?;

        let status = http_response.status();
        if status.is_success() {
            return Ok(http_response);
        }

        let status_code = status.as_u16();
        let error_text = http_response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());

        let message = serde_json::from_str::<ApiErrorResponse>(&error_text)
            .map(|r| r.error.message)
            .unwrap_or(error_text);

        if status_code == 429 {
            return Err(BatchError::RateLimited(message));
        }
        Err(BatchError::ApiError {
            code: status_code,
            message,
        })
    }

    async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BatchError> {
        response
            .json()
            .await
            .map_err(|e| BatchError::ParseError(e.to_string()))
    }
}

/// reqwest's Display hides the cause; tag timeouts and connect failures so
/// they are recognised as transient.
fn describe_send_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timeout: {}", error)
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    }
}

/// Check if an error is transient and should be retried.
fn is_transient_error(error: &BatchError) -> bool {
    match error {
        BatchError::RequestFailed(msg) => {
            let msg = msg.to_lowercase();
            msg.contains("timeout")
                || msg.contains("timed out")
                || msg.contains("connection")
                || msg.contains("temporarily")
        }
        BatchError::RateLimited(_) => true,
        BatchError::ApiError { code, .. } => *code >= 500 || *code == 429,
        _ => false,
    }
}

#[async_trait]
impl BatchApi for OpenAiBatchClient {
    async fn upload_file(&self, path: &Path) -> Result<FileObject, BatchError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "batch_input.jsonl".to_string());
        let url = self.url("/files");

        tracing::info!(path = %path.display(), size = bytes.len(), "Uploading batch input file");
        let response = self
            .execute_with_retry(|| {
                let part = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str("application/jsonl")
                    .map_err(|e| BatchError::RequestFailed(e.to_string()))?;
                let form = Form::new().text("purpose", "batch").part("file", part);
                Ok(self.client.post(&url).multipart(form))
            })
            .await?;
        Self::parse_json(response).await
    }

    async fn create_batch(&self, input_file_id: &str) -> Result<Batch, BatchError> {
        let url = self.url("/batches");
        let body = CreateBatchRequest {
            input_file_id,
            endpoint: CHAT_COMPLETIONS_ENDPOINT,
            completion_window: COMPLETION_WINDOW,
        };
        let response = self
            .execute_with_retry(|| Ok(self.client.post(&url).json(&body)))
            .await?;
        Self::parse_json(response).await
    }

    async fn retrieve_batch(&self, batch_id: &str) -> Result<Batch, BatchError> {
        let url = self.url(&format!("/batches/{}", batch_id));
        let response = self
            .execute_with_retry(|| Ok(self.client.get(&url)))
            .await?;
        Self::parse_json(response).await
    }

    async fn file_content(&self, file_id: &str) -> Result<String, BatchError> {
        let url = self.url(&format!("/files/{}/content", file_id));
        let response = self
            .execute_with_retry(|| Ok(self.client.get(&url)))
            .await?;
        response
            .text()
            .await
            .map_err(|e| BatchError::RequestFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_defaults() {
        let client = OpenAiBatchClient::new("sk-1234567890abcdef".to_string()).expect("client");
        assert_eq!(client.base_url(), DEFAULT_OPENAI_BASE_URL);
        assert_eq!(client.api_key_masked(), "sk-1...cdef");
    }

    #[test]
    fn test_client_requires_key() {
        assert!(matches!(
            OpenAiBatchClient::new("  ".to_string()),
            Err(BatchError::MissingApiKey)
        ));
    }

    #[test]
    fn test_custom_base_url_trimmed() {
        let client =
            OpenAiBatchClient::with_base_url("key".to_string(), "http://proxy.local/v1/".to_string())
                .expect("client");
        assert_eq!(client.url("/batches"), "http://proxy.local/v1/batches");
        assert_eq!(client.api_key_masked(), "***");
    }

    #[test]
    fn test_is_transient_error() {
        assert!(is_transient_error(&BatchError::RateLimited("slow down".to_string())));
        assert!(is_transient_error(&BatchError::ApiError {
            code: 503,
            message: "unavailable".to_string(),
        }));
        assert!(!is_transient_error(&BatchError::ApiError {
            code: 404,
            message: "no such batch".to_string(),
        }));
        assert!(is_transient_error(&BatchError::RequestFailed(
            "Connection refused".to_string()
        )));
        assert!(!is_transient_error(&BatchError::ParseError("bad".to_string())));
    }

    #[test]
    fn test_retry_delays() {
        let delays: Vec<Duration> = (1..MAX_RETRIES).map(retry_delay).collect();
        assert_eq!(delays, vec![Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[test]
    fn test_api_key_masked_non_ascii() {
        let client = OpenAiBatchClient::new("ключ-секрет-доступа".to_string()).expect("client");
        assert_eq!(client.api_key_masked(), "ключ...тупа");

        let short = OpenAiBatchClient::new("sk-é".to_string()).expect("client");
        assert_eq!(short.api_key_masked(), "****");
    }

    #[tokio::test]
    async fn test_retrieve_connection_error() {
        let client = OpenAiBatchClient::with_base_url(
            "test-key".to_string(),
            "http://localhost:65535".to_string(),
        )
        .expect("client");
        let result = client.retrieve_batch("batch_1").await;
        assert!(matches!(result, Err(BatchError::RequestFailed(_))));
    }
}
