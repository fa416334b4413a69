use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use super::document::Document;

#[derive(Debug, Error)]
pub(super) enum UploadError {
    #[error("index rejected batch ({status}): {message}")]
    Status { status: u16, message: String },
    #[error("upload timed out: {0}")]
    Timeout(String),
    #[error("upload transport error: {0}")]
    Transport(String),
}

impl UploadError {
    /// Failures worth re-sending the same batch for.
    pub(super) fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout(_) | Self::Transport(_) => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum UploadReceipt {
    Accepted(Value),
    Skipped,
}

/// Destination for completed document batches.
pub(super) trait DocumentSink {
    fn upload(&self, documents: &[Document]) -> Result<UploadReceipt, UploadError>;
}

#[derive(Debug, Clone)]
pub(super) struct SearchIndexConfig {
    pub(super) host: String,
    pub(super) index: String,
    pub(super) api_key: String,
    pub(super) timeout: Duration,
    pub(super) accept_invalid_certs: bool,
}

pub(super) struct SearchIndexClient {
    client: HttpClient,
    url: String,
    headers: HeaderMap,
}

impl SearchIndexClient {
    pub(super) fn new(config: &SearchIndexConfig) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .context("failed to build search index http client")?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .context("api key is not a valid header value")?,
        );

        Ok(Self {
            client,
            url: documents_url(&config.host, &config.index),
            headers,
        })
    }
}

pub(super) fn documents_url(host: &str, index: &str) -> String {
    let host = host
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    format!("https://{host}/indexes/{index}/documents")
}

impl DocumentSink for SearchIndexClient {
    fn upload(&self, documents: &[Document]) -> Result<UploadReceipt, UploadError> {
        if documents.is_empty() {
            return Ok(UploadReceipt::Skipped);
        }

        let response = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .json(documents)
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().map_err(transport_error)?;
        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        let receipt = serde_json::from_str(&body).unwrap_or(Value::String(body));
        Ok(UploadReceipt::Accepted(receipt))
    }
}

fn transport_error(err: reqwest::Error) -> UploadError {
    if err.is_timeout() {
        UploadError::Timeout(err.to_string())
    } else {
        UploadError::Transport(err.to_string())
    }
}

/// Logs what would be sent and reports every batch as skipped.
pub(super) struct DryRunSink;

impl DocumentSink for DryRunSink {
    fn upload(&self, documents: &[Document]) -> Result<UploadReceipt, UploadError> {
        let Some(first) = documents.first() else {
            return Ok(UploadReceipt::Skipped);
        };

        info!(documents = documents.len(), "dry run, would upload batch");
        match serde_json::to_string_pretty(first) {
            Ok(sample) => info!(sample = %sample, "example document"),
            Err(err) => info!(error = %err, "example document not renderable"),
        }
        Ok(UploadReceipt::Skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_url_normalizes_host() {
        assert_eq!(
            documents_url("search.example.ph", "barangays"),
            "https://search.example.ph/indexes/barangays/documents"
        );
        assert_eq!(
            documents_url("https://search.example.ph/", "brgy"),
            "https://search.example.ph/indexes/brgy/documents"
        );
    }

    #[test]
    fn empty_batch_short_circuits_without_network() {
        let client = SearchIndexClient::new(&SearchIndexConfig {
            host: "127.0.0.1:9".to_string(),
            index: "barangays".to_string(),
            api_key: "secret".to_string(),
            timeout: Duration::from_millis(50),
            accept_invalid_certs: false,
        })
        .expect("client builds");

        let receipt = client.upload(&[]).expect("empty upload succeeds");
        assert_eq!(receipt, UploadReceipt::Skipped);
    }

    #[test]
    fn server_errors_and_throttling_are_retryable() {
        let server = UploadError::Status {
            status: 500,
            message: "boom".to_string(),
        };
        let rejected = UploadError::Status {
            status: 400,
            message: "bad document".to_string(),
        };
        assert!(server.is_retryable());
        assert!(!rejected.is_retryable());
        assert!(UploadError::Timeout("slow".to_string()).is_retryable());
    }
}
