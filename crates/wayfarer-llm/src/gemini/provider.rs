//! Gemini provider implementation

use super::config::GeminiConfig;
use super::convert::{convert_messages, convert_tool_choice, convert_tools, extract_turn};
use super::types::*;
use crate::error::{Error, Result};
use crate::provider::LlmProvider;
use crate::turn::{TurnReply, TurnRequest};
use crate::util::truncate_safe;
use reqwest::Client;
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const MAX_ERROR_BODY: usize = 300;

/// Google Gemini provider
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Provider configuration
    #[must_use]
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    pub(super) fn build_request(&self, request: &TurnRequest) -> GeminiRequest {
        let (system_instruction, contents) = convert_messages(&request.messages);
        let generation_config = GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens.unwrap_or(self.config.default_max_tokens),
        };

        let (tools, tool_config) = if request.tools.is_empty() {
            (None, None)
        } else {
            (
                Some(convert_tools(&request.tools)),
                Some(convert_tool_choice(request.tool_choice)),
            )
        };

        GeminiRequest {
            contents,
            system_instruction,
            generation_config,
            tools,
            tool_config,
        }
    }

    /// Send with retries on rate limits and server errors
    async fn send_request(&self, model: &str, request: &GeminiRequest) -> Result<GeminiResponse> {
        let mut attempt: u32 = 0;
        loop {
            match self.send_request_once(model, request).await {
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay_secs = 2 + u64::from(attempt) * 3;
                    warn!(
                        attempt = attempt + 1,
                        model,
                        delay_secs,
                        error = %e,
                        "Gemini request failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn send_request_once(&self, model: &str, request: &GeminiRequest) -> Result<GeminiResponse> {
        // The URL carries the key, so only the model is logged
        debug!(model, "Sending request to Gemini");

        let url = format!("{}/models/{}:generateContent", self.config.base_url, model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.expose_secret())])
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(self.config.timeout.as_millis() as u64)
                } else {
                    Error::Network(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.without_url().to_string()))?;

        if !status.is_success() {
            warn!(status = %status, "Gemini API error response");
            let detail = serde_json::from_str::<GeminiError>(&body)
                .map(|e| format!("{} ({}): {}", e.error.status, e.error.code, e.error.message))
                .unwrap_or_else(|_| format!("HTTP {status}: {}", truncate_safe(&body, MAX_ERROR_BODY)));

            return Err(match status.as_u16() {
                429 => Error::RateLimit,
                s if s >= 500 => Error::ServerError(detail),
                _ => Error::Api(detail),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::InvalidResponse(format!("{e}: {}", truncate_safe(&body, MAX_ERROR_BODY)))
        })
    }
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.model, tools = request.tools.len()))]
    async fn complete_turn(&self, request: TurnRequest) -> Result<TurnReply> {
        let model = self.resolve_model(&request.model).to_string();
        let response = self.send_request(&model, &self.build_request(&request)).await?;

        if let Some(usage) = &response.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count,
                total_tokens = usage.total_token_count,
                "Gemini token usage"
            );
        }

        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| Error::InvalidResponse("No candidates in response".to_string()))?;
        let reply = extract_turn(candidate);

        if reply.content.is_none() && reply.tool_calls.is_empty() {
            warn!(finish_reason = ?reply.finish_reason, "Gemini returned an empty turn");
        }
        Ok(reply)
    }
}
