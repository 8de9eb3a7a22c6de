//! Gemini API client implementation
//!
//! Implements the LlmClient trait against the Google Generative Language
//! REST API with support for both blocking and streaming (SSE) responses.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{
    ContentBlock, GenerateRequest, GenerateResponse, LlmClient, LlmError, Message, MessageContent, StopReason,
    StreamChunk, TokenUsage, ToolCall,
};
use crate::config::LlmConfig;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Gemini generateContent API client
pub struct GeminiClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl GeminiClient {
    /// Create a new client from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, "GeminiClient::from_config: called");
        let api_key = config
            .get_api_key()
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            http,
            max_tokens: config.max_tokens,
        })
    }

    /// Build the request body for the generateContent API
    fn build_request_body(&self, request: &GenerateRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");
        let mut generation_config = serde_json::json!({
            "maxOutputTokens": request.max_tokens.min(self.max_tokens),
        });
        if request.json_output {
            debug!("build_request_body: structured output requested");
            generation_config["responseMimeType"] = serde_json::json!("application/json");
        }

        let mut body = serde_json::json!({
            "contents": self.convert_messages(&request.messages),
            "generationConfig": generation_config,
        });

        if let Some(instruction) = &request.system_instruction {
            debug!("build_request_body: adding system instruction");
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": instruction }],
            });
        }

        if !request.tools.is_empty() {
            debug!(tool_count = request.tools.len(), "build_request_body: adding tools");
            body["tools"] = serde_json::json!([{
                "functionDeclarations": request
                    .tools
                    .iter()
                    .map(|t| t.to_function_declaration())
                    .collect::<Vec<_>>(),
            }]);
        }

        body
    }

    /// Convert internal Message types to Gemini content format
    fn convert_messages(&self, messages: &[Message]) -> Vec<serde_json::Value> {
        debug!(message_count = %messages.len(), "convert_messages: called");
        messages
            .iter()
            .map(|msg| {
                let parts = match &msg.content {
                    MessageContent::Text(text) => vec![serde_json::json!({ "text": text })],
                    MessageContent::Blocks(blocks) => blocks.iter().map(|b| self.convert_content_block(b)).collect(),
                };

                serde_json::json!({
                    "role": msg.role,
                    "parts": parts,
                })
            })
            .collect()
    }

    /// Convert a ContentBlock to a Gemini part
    fn convert_content_block(&self, block: &ContentBlock) -> serde_json::Value {
        match block {
            ContentBlock::Text { text } => serde_json::json!({ "text": text }),
            ContentBlock::ToolUse { name, input } => serde_json::json!({
                "functionCall": { "name": name, "args": input },
            }),
            ContentBlock::ToolResult { name, content, is_error } => serde_json::json!({
                "functionResponse": {
                    "name": name,
                    "response": { "content": content, "is_error": is_error },
                },
            }),
        }
    }

    /// Parse a Gemini API response body
    fn parse_response(&self, api_response: GeminiResponse) -> Result<GenerateResponse, LlmError> {
        debug!("parse_response: called");
        let candidate = api_response
            .candidates
            .into_iter()
            .flatten()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("Response contained no candidates".to_string()))?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();

        if let Some(candidate_content) = candidate.content {
            for part in candidate_content.parts {
                if let Some(text) = part.text {
                    content.push_str(&text);
                }
                if let Some(call) = part.function_call {
                    debug!(name = %call.name, "parse_response: function call part");
                    tool_calls.push(ToolCall {
                        name: call.name,
                        input: call.args,
                    });
                }
            }
        }

        let finish_reason = candidate.finish_reason.unwrap_or_default();
        let stop_reason = StopReason::from_finish_reason(&finish_reason, !tool_calls.is_empty());

        let usage = api_response
            .usage_metadata
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                response_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        Ok(GenerateResponse {
            content: if content.is_empty() { None } else { Some(content) },
            tool_calls,
            stop_reason,
            usage,
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "generate: called");
        let url = self.generate_url();
        let body = self.build_request_body(&request);

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "generate: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self
                .http
                .post(url.clone())
                .header("x-goog-api-key", self.api_key.clone())
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "generate: network error");
                    last_error = Some(LlmError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if status == 429 {
                debug!("generate: rate limited (429)");
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);

                return Err(LlmError::RateLimited {
                    retry_after: Duration::from_secs(retry_after),
                });
            }

            if is_retryable_status(status) && attempt < MAX_RETRIES {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "generate: retryable error");
                last_error = Some(LlmError::ApiError { status, message: text });
                continue;
            }

            if !response.status().is_success() {
                debug!(%status, "generate: API error");
                let text = response.text().await.unwrap_or_default();
                return Err(LlmError::ApiError { status, message: text });
            }

            debug!("generate: success");
            let api_response: GeminiResponse = response.json().await?;
            return self.parse_response(api_response);
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
    }

    async fn stream(
        &self,
        request: GenerateRequest,
        chunk_tx: mpsc::Sender<StreamChunk>,
    ) -> Result<GenerateResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "stream: called");
        let body = self.build_request_body(&request);

        let http_request = self
            .http
            .post(self.stream_url())
            .header("x-goog-api-key", self.api_key.clone())
            .header("content-type", "application/json")
            .json(&body);

        let mut es = EventSource::new(http_request).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let mut full_content = String::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();
        let mut stop_reason = StopReason::EndTurn;
        let mut usage = TokenUsage::default();

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => {
                    debug!("stream: connection open");
                }
                Ok(Event::Message(msg)) => {
                    let chunk: GeminiResponse = serde_json::from_str(&msg.data).map_err(LlmError::Json)?;

                    if let Some(u) = chunk.usage_metadata {
                        usage.prompt_tokens = u.prompt_token_count;
                        usage.response_tokens = u.candidates_token_count;
                    }

                    for candidate in chunk.candidates.into_iter().flatten() {
                        if let Some(reason) = candidate.finish_reason {
                            stop_reason = StopReason::from_finish_reason(&reason, false);
                        }
                        let Some(content) = candidate.content else { continue };
                        for part in content.parts {
                            if let Some(text) = part.text {
                                full_content.push_str(&text);
                                let _ = chunk_tx.send(StreamChunk::TextDelta(text)).await;
                            }
                            if let Some(call) = part.function_call {
                                debug!(name = %call.name, "stream: function call part");
                                tool_calls.push(ToolCall {
                                    name: call.name,
                                    input: call.args,
                                });
                            }
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    debug!("stream: stream ended");
                    break;
                }
                Err(e) => {
                    debug!(%e, "stream: event error");
                    let _ = chunk_tx.send(StreamChunk::Error(e.to_string())).await;
                    return Err(LlmError::InvalidResponse(e.to_string()));
                }
            }
        }

        if !tool_calls.is_empty() {
            stop_reason = StopReason::ToolUse;
        }

        debug!(content_len = full_content.len(), "stream: complete");
        let _ = chunk_tx
            .send(StreamChunk::Done {
                stop_reason: stop_reason.clone(),
                usage,
            })
            .await;

        Ok(GenerateResponse {
            content: if full_content.is_empty() { None } else { Some(full_content) },
            tool_calls,
            stop_reason,
            usage,
        })
    }
}

// Gemini API response types

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
    #[serde(rename = "functionCall")]
    function_call: Option<GeminiFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u64,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u64,
}
