// src/services/openai.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::common::config::OpenAIConfig;
use crate::services::oracle::{
    build_prompt, parse_oracle_response, ExtractionOracle, OracleError, OracleMode,
    StructuredCandidate, LEGACY_SYSTEM_PROMPT, VALIDATING_SYSTEM_PROMPT,
};

/// Resume text is cut to this many characters before it is sent
const MAX_PROMPT_CHARS: usize = 24_000;
const MAX_RESPONSE_TOKENS: u32 = 2_000;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    total_tokens: u32,
}

/// Chat-completions client acting as the extraction oracle
pub struct OpenAIOracle {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIOracle {
    pub fn new(config: OpenAIConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client with timeout, using defaults");
                Client::new()
            });

        Self { client, config }
    }

    pub fn mode(&self) -> OracleMode {
        self.config.mode
    }

    fn build_request(&self, resume_text: &str) -> ChatCompletionRequest {
        let system_prompt = match self.config.mode {
            OracleMode::Validating => VALIDATING_SYSTEM_PROMPT,
            OracleMode::Legacy => LEGACY_SYSTEM_PROMPT,
        };

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(self.config.mode, truncate_chars(resume_text, MAX_PROMPT_CHARS)),
                },
            ],
            temperature: 0.0,
            max_tokens: MAX_RESPONSE_TOKENS,
            response_format: ResponseFormat { kind: "json_object" },
        }
    }

    /// Make API request with retry logic
    async fn make_request_with_retry(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OracleError> {
        let max_retries = 3;
        let mut last_error = None;

        for attempt in 1..=max_retries {
            match self.make_request(api_key, request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(
                        attempt = attempt,
                        max_retries = max_retries,
                        error = %e,
                        "OpenAI API request failed, retrying..."
                    );
                    last_error = Some(e);

                    // Exponential backoff
                    if attempt < max_retries {
                        let delay = std::time::Duration::from_millis(1000 * 2_u64.pow(attempt - 1));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| OracleError::RequestFailed("Unknown error".to_string())))
    }

    /// Make a single API request
    async fn make_request(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OracleError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| OracleError::RequestFailed(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(OracleError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "OpenAI API request failed");
            return Err(OracleError::RequestFailed(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| OracleError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl ExtractionOracle for OpenAIOracle {
    async fn extract_structured(&self, resume_text: &str) -> Result<StructuredCandidate, OracleError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(OracleError::NotConfigured)?;

        let request = self.build_request(resume_text);

        debug!(
            model = %request.model,
            mode = ?self.config.mode,
            text_length = resume_text.len(),
            "Sending resume text to extraction model"
        );

        let response = self.make_request_with_retry(api_key, &request).await?;

        if let Some(usage) = &response.usage {
            info!(
                model = %request.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Extraction model usage"
            );
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::MalformedResponse("No choices in response".to_string()))?;

        if choice.finish_reason.as_deref() == Some("length") {
            warn!("Extraction response was truncated by the token limit");
        }

        parse_oracle_response(&choice.message.content, self.config.mode)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(api_key: Option<&str>, mode: OracleMode) -> OpenAIConfig {
        OpenAIConfig {
            api_key: api_key.map(str::to_string),
            base_url: "http://127.0.0.1:9".to_string(),
            model: "gpt-4o-mini".to_string(),
            mode,
            request_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_is_not_configured() {
        let oracle = OpenAIOracle::new(config(None, OracleMode::Validating));
        let result = oracle.extract_structured("Jane Doe").await;
        assert!(matches!(result, Err(OracleError::NotConfigured)));
    }

    #[test]
    fn test_request_uses_mode_prompts() {
        let oracle = OpenAIOracle::new(config(Some("k"), OracleMode::Legacy));
        let request = oracle.build_request("Jane Doe, Rust developer");

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].content, LEGACY_SYSTEM_PROMPT);
        assert!(request.messages[1].content.contains("Jane Doe, Rust developer"));
        assert!(!request.messages[1].content.contains("document_type"));

        let oracle = OpenAIOracle::new(config(Some("k"), OracleMode::Validating));
        let request = oracle.build_request("x");
        assert!(request.messages[1].content.contains("document_type"));
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
