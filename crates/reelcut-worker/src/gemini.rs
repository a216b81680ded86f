//! Gemini client for engagement analysis.
//!
//! Tries a configured list of models in order and retries transient HTTP
//! failures on each before moving to the next model.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::GeminiConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::retry::{retry_async, RetryConfig};
use crate::scoring::{AnalysisRequest, EngagementAnalyzer};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini API client.
pub struct GeminiAnalyzer {
    api_key: String,
    models: Vec<String>,
    client: Client,
    retry: RetryConfig,
}

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// A failed call to one model.
#[derive(Debug)]
struct CallFailure {
    message: String,
    transient: bool,
}

impl std::fmt::Display for CallFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl CallFailure {
    fn transient(message: String) -> Self {
        Self {
            message,
            transient: true,
        }
    }

    fn permanent(message: String) -> Self {
        Self {
            message,
            transient: false,
        }
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

impl GeminiAnalyzer {
    /// Create a client from configuration; fails without an API key.
    pub fn new(config: &GeminiConfig) -> WorkerResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| WorkerError::config_error("GEMINI_API_KEY not set"))?;
        if config.models.is_empty() {
            return Err(WorkerError::config_error("no Gemini models configured"));
        }

        Ok(Self {
            api_key,
            models: config.models.clone(),
            client: Client::new(),
            retry: RetryConfig::new("gemini"),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn call_model(&self, model: &str, prompt: &str) -> Result<String, CallFailure> {
        let url = format!("{API_BASE}/{model}:generateContent");

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CallFailure::transient(format!("Gemini API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = format!("Gemini API returned {status}: {error_text}");
            return Err(if is_transient_status(status) {
                CallFailure::transient(message)
            } else {
                CallFailure::permanent(message)
            });
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| CallFailure::permanent(format!("Failed to parse Gemini response: {e}")))?;

        let text: String = body
            .candidates
            .first()
            .map(|c| c.content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(CallFailure::permanent("No content in Gemini response".to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl EngagementAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> WorkerResult<String> {
        let prompt = request.prompt();
        let mut last_error = None;

        for model in &self.models {
            info!(model = %model, segments = request.segments.len(), "Requesting engagement analysis");
            let result = retry_async(
                &self.retry,
                || self.call_model(model, &prompt),
                |e: &CallFailure| e.transient,
            )
            .await
            .into_result();

            match result {
                Ok(text) => {
                    info!(model = %model, "Received engagement analysis");
                    return Ok(text);
                }
                Err(e) => {
                    warn!(model = %model, error = %e, "Engagement analysis failed with model");
                    last_error = Some(e);
                }
            }
        }

        Err(WorkerError::signal_unavailable(match last_error {
            Some(e) => format!("all Gemini models failed, last error: {e}"),
            None => "all Gemini models failed".to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let config = GeminiConfig {
            api_key: None,
            models: vec!["gemini-2.5-flash".into()],
        };
        assert!(matches!(GeminiAnalyzer::new(&config), Err(WorkerError::ConfigError(_))));

        let config = GeminiConfig {
            api_key: Some("key".into()),
            models: Vec::new(),
        };
        assert!(GeminiAnalyzer::new(&config).is_err());
    }

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_transient_status(StatusCode::BAD_REQUEST));
        assert!(!is_transient_status(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_response_text_joins_parts() {
        let body: GeminiResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{\"segments\": "}, {"text": "[]}"}]}}]}"#,
        )
        .unwrap();
        let text: String = body.candidates[0].content.parts.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(text, r#"{"segments": []}"#);
    }
}
