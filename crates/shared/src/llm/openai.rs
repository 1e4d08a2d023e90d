use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::gateway::{
    ChatMessage, LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmGatewayRequest,
    LlmGatewayResponse, LlmTokenUsage,
};
use crate::config::ConfigError;
use crate::config_env::{optional_trimmed_env, parse_u32_env, parse_u64_env, require_non_empty_env};

const DEFAULT_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MAX_RETRIES: u32 = 0;
const DEFAULT_RETRY_BASE_BACKOFF_MS: u64 = 250;

#[derive(Debug, Clone)]
pub struct OpenAiGatewayConfig {
    pub chat_completions_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_backoff_ms: u64,
}

impl OpenAiGatewayConfig {
    pub fn from_env() -> Result<Self, OpenAiConfigError> {
        let config = Self {
            chat_completions_url: optional_trimmed_env("OPENAI_CHAT_COMPLETIONS_URL")
                .unwrap_or_else(|| DEFAULT_CHAT_COMPLETIONS_URL.to_string()),
            api_key: require_non_empty_env("OPENAI_API_KEY")?,
            model: optional_trimmed_env("OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_ms: parse_u64_env("OPENAI_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
            max_retries: parse_u32_env("OPENAI_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            retry_base_backoff_ms: parse_u64_env(
                "OPENAI_RETRY_BASE_BACKOFF_MS",
                DEFAULT_RETRY_BASE_BACKOFF_MS,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), OpenAiConfigError> {
        if !self.chat_completions_url.starts_with("http://")
            && !self.chat_completions_url.starts_with("https://")
        {
            return Err(OpenAiConfigError::InvalidConfiguration(
                "OPENAI_CHAT_COMPLETIONS_URL must start with http:// or https://".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(OpenAiConfigError::InvalidConfiguration(
                "OPENAI_MODEL must not be empty".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(OpenAiConfigError::InvalidConfiguration(
                "OPENAI_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum OpenAiConfigError {
    #[error(transparent)]
    Env(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build OpenAI http client: {0}")]
    HttpClient(String),
}

#[derive(Clone)]
pub struct OpenAiGateway {
    client: reqwest::Client,
    config: OpenAiGatewayConfig,
}

impl OpenAiGateway {
    pub fn new(config: OpenAiGatewayConfig) -> Result<Self, OpenAiConfigError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| OpenAiConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn send_with_retries(
        &self,
        request: &LlmGatewayRequest,
    ) -> Result<LlmGatewayResponse, LlmGatewayError> {
        let mut attempt = 0_u32;

        loop {
            match self.send_once(request).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if err.retryable && attempt < self.config.max_retries {
                        let backoff_multiplier = 2_u64.saturating_pow(attempt);
                        let backoff_ms = self
                            .config
                            .retry_base_backoff_ms
                            .saturating_mul(backoff_multiplier);
                        warn!(
                            attempt = attempt + 1,
                            backoff_ms,
                            error_type = err.error.kind(),
                            "retrying chat completion request"
                        );
                        sleep(Duration::from_millis(backoff_ms)).await;
                        attempt = attempt.saturating_add(1);
                        continue;
                    }

                    return Err(err.error);
                }
            }
        }
    }

    async fn send_once(
        &self,
        request: &LlmGatewayRequest,
    ) -> Result<LlmGatewayResponse, SendAttemptError> {
        let request_body = ChatCompletionRequestBody {
            model: &self.config.model,
            messages: &request.messages,
            temperature: 0,
            user: request.requester_id.as_deref(),
        };

        let response = self
            .client
            .post(&self.config.chat_completions_url)
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    SendAttemptError::retryable(LlmGatewayError::Timeout)
                } else {
                    SendAttemptError::retryable(LlmGatewayError::ProviderFailure(
                        "request_unavailable".to_string(),
                    ))
                }
            })?;

        let status = response.status();
        let header_request_id = header_request_id(response.headers());
        let body = response.text().await.map_err(|_| {
            SendAttemptError::non_retryable(LlmGatewayError::InvalidProviderPayload(
                "response_body_read_failed".to_string(),
            ))
        })?;

        if !status.is_success() {
            let provider_code = parse_provider_error_code(&body);
            debug!(status = status.as_u16(), provider_code, "chat completion rejected");
            return Err(SendAttemptError {
                error: LlmGatewayError::ProviderFailure(format!(
                    "status={} code={provider_code}",
                    status.as_u16()
                )),
                retryable: is_retryable_status(status),
            });
        }

        let parsed: ChatCompletionSuccessResponse = serde_json::from_str(&body).map_err(|_| {
            SendAttemptError::non_retryable(LlmGatewayError::InvalidProviderPayload(
                "response_json_parse_failed".to_string(),
            ))
        })?;

        let content = parsed
            .choices
            .first()
            .ok_or_else(|| {
                SendAttemptError::non_retryable(LlmGatewayError::InvalidProviderPayload(
                    "missing_choice".to_string(),
                ))
            })?
            .message
            .content
            .clone();

        let content = match content {
            Some(Value::String(text)) if !text.trim().is_empty() => text,
            Some(Value::String(_)) | None | Some(Value::Null) => {
                return Err(SendAttemptError::non_retryable(
                    LlmGatewayError::InvalidProviderPayload("empty_content".to_string()),
                ));
            }
            Some(_) => {
                return Err(SendAttemptError::non_retryable(
                    LlmGatewayError::InvalidProviderPayload(
                        "unsupported_content_shape".to_string(),
                    ),
                ));
            }
        };

        Ok(LlmGatewayResponse {
            model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
            provider_request_id: header_request_id.or(parsed.id),
            content,
            usage: parsed.usage.map(|usage| LlmTokenUsage {
                prompt_tokens: clamp_u64_to_u32(usage.prompt_tokens.unwrap_or(0)),
                completion_tokens: clamp_u64_to_u32(usage.completion_tokens.unwrap_or(0)),
                total_tokens: clamp_u64_to_u32(usage.total_tokens.unwrap_or(0)),
            }),
        })
    }
}

impl LlmGateway for OpenAiGateway {
    fn generate<'a>(&'a self, request: LlmGatewayRequest) -> LlmGatewayFuture<'a> {
        Box::pin(async move { self.send_with_retries(&request).await })
    }
}

#[derive(Debug)]
struct SendAttemptError {
    error: LlmGatewayError,
    retryable: bool,
}

impl SendAttemptError {
    fn retryable(error: LlmGatewayError) -> Self {
        Self {
            error,
            retryable: true,
        }
    }

    fn non_retryable(error: LlmGatewayError) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionSuccessResponse {
    id: Option<String>,
    model: Option<String>,
    choices: Vec<ChatCompletionChoice>,
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn header_request_id(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

fn parse_provider_error_code(body: &str) -> String {
    #[derive(Deserialize)]
    struct ProviderErrorEnvelope {
        error: Option<ProviderErrorDetails>,
    }

    #[derive(Deserialize)]
    struct ProviderErrorDetails {
        code: Option<Value>,
        #[serde(rename = "type")]
        error_type: Option<String>,
    }

    let Some(details) = serde_json::from_str::<ProviderErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
    else {
        return "unknown".to_string();
    };

    match details.code {
        Some(Value::String(code)) => code,
        Some(Value::Number(code)) => code.to_string(),
        _ => details.error_type.unwrap_or_else(|| "unknown".to_string()),
    }
}

fn clamp_u64_to_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}
