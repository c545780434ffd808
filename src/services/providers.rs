// Perplexity Provider Service
// Adapter boundary to the external language model that scores text perplexity

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Characters sent to the model; longer texts are truncated.
pub const MAX_MODEL_INPUT_CHARS: usize = 4000;
/// Perplexity values above this are capped.
pub const PERPLEXITY_CAP: f64 = 1000.0;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("perplexity model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    #[error("model call cancelled")]
    Cancelled,
}

/// Scores text perplexity. Implementations are shared across concurrent
/// analyses and must not hold per-request state.
#[async_trait]
pub trait PerplexityScorer: Send + Sync {
    async fn score(&self, text: &str) -> Result<f64, ProviderError>;

    fn name(&self) -> &str;
}

/// Used when no model endpoint is configured; every call degrades.
pub struct UnconfiguredScorer;

#[async_trait]
impl PerplexityScorer for UnconfiguredScorer {
    async fn score(&self, _text: &str) -> Result<f64, ProviderError> {
        Err(ProviderError::ModelUnavailable(
            "no model endpoint configured".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}

#[derive(Debug, Serialize)]
struct PerplexityRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct PerplexityResponse {
    perplexity: Option<f64>,
}

/// Client for a perplexity service exposing `POST {base_url}/perplexity`.
pub struct HttpPerplexityScorer {
    client: Client,
    endpoint: String,
}

impl HttpPerplexityScorer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/perplexity", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PerplexityScorer for HttpPerplexityScorer {
    async fn score(&self, text: &str) -> Result<f64, ProviderError> {
        let request = PerplexityRequest {
            text: truncate_chars(text, MAX_MODEL_INPUT_CHARS),
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::ModelUnavailable(e.to_string())
                } else {
                    ProviderError::HttpError(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("[PERPLEXITY] Model returned status {}", status.as_u16());
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: PerplexityResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let value = validate_perplexity(data.perplexity)?;
        debug!(
            "[PERPLEXITY] Scored {} chars in {}ms: {:.4}",
            request.text.chars().count(),
            start.elapsed().as_millis(),
            value
        );
        Ok(value)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Reject missing and non-positive values; cap very large ones.
pub fn validate_perplexity(value: Option<f64>) -> Result<f64, ProviderError> {
    match value {
        None => Err(ProviderError::InvalidResponse(
            "perplexity missing from response".to_string(),
        )),
        Some(v) if !v.is_finite() || v <= 0.0 => Err(ProviderError::InvalidResponse(format!(
            "perplexity must be positive and finite, got {}",
            v
        ))),
        Some(v) => Ok(v.min(PERPLEXITY_CAP)),
    }
}

/// Longest prefix of at most `max` characters, cut on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_perplexity() {
        assert_eq!(validate_perplexity(Some(35.5)).unwrap(), 35.5);
        assert_eq!(validate_perplexity(Some(5000.0)).unwrap(), PERPLEXITY_CAP);
        assert!(matches!(
            validate_perplexity(None),
            Err(ProviderError::InvalidResponse(_))
        ));
        assert!(validate_perplexity(Some(0.0)).is_err());
        assert!(validate_perplexity(Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("żółw", 2), "żó");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let scorer = HttpPerplexityScorer::new("http://localhost:8090/", Duration::from_secs(1)).unwrap();
        assert_eq!(scorer.endpoint(), "http://localhost:8090/perplexity");
    }

    #[tokio::test]
    async fn test_unconfigured_scorer_is_unavailable() {
        let result = UnconfiguredScorer.score("anything").await;
        assert!(matches!(result, Err(ProviderError::ModelUnavailable(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_without_panicking() {
        // Port 9 (discard) is closed on test machines
        let scorer = HttpPerplexityScorer::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        assert!(scorer.score("some text").await.is_err());
    }
}
