use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::{AssistantAction, LlmGateway, LlmGatewayError, LlmGatewayRequest, LlmGatewayResponse};

#[derive(Debug, Clone, PartialEq)]
pub struct LlmTelemetryEvent {
    pub action: &'static str,
    pub outcome: &'static str,
    pub latency_ms: u64,
    pub message_count: usize,
    pub model: Option<String>,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
    pub estimated_cost_usd: Option<f64>,
    pub error_type: Option<&'static str>,
}

impl LlmTelemetryEvent {
    /// Emits the event without prompt or response text.
    pub fn log(&self) {
        if self.error_type.is_some() {
            warn!(
                action = self.action,
                outcome = self.outcome,
                latency_ms = self.latency_ms,
                message_count = self.message_count,
                error_type = self.error_type,
                "llm completion failed"
            );
            return;
        }

        info!(
            action = self.action,
            outcome = self.outcome,
            latency_ms = self.latency_ms,
            message_count = self.message_count,
            model = self.model.as_deref(),
            prompt_tokens = self.prompt_tokens,
            completion_tokens = self.completion_tokens,
            total_tokens = self.total_tokens,
            estimated_cost_usd = self.estimated_cost_usd,
            "llm completion succeeded"
        );
    }
}

pub async fn complete_with_telemetry(
    llm_gateway: &dyn LlmGateway,
    action: AssistantAction,
    request: LlmGatewayRequest,
) -> (
    Result<LlmGatewayResponse, LlmGatewayError>,
    LlmTelemetryEvent,
) {
    let message_count = request.messages.len();
    let started_at = Instant::now();
    let result = llm_gateway
        .generate(request)
        .await
        .and_then(reject_empty_content);
    let telemetry = telemetry_for_result(action, message_count, started_at.elapsed(), &result);
    (result, telemetry)
}

/// Whitespace-only content never becomes a turn, so it is reported as a failure.
pub(crate) fn reject_empty_content(
    response: LlmGatewayResponse,
) -> Result<LlmGatewayResponse, LlmGatewayError> {
    if response.content.trim().is_empty() {
        return Err(LlmGatewayError::InvalidProviderPayload(
            "empty_content".to_string(),
        ));
    }
    Ok(response)
}

pub(crate) fn telemetry_for_result(
    action: AssistantAction,
    message_count: usize,
    latency: Duration,
    result: &Result<LlmGatewayResponse, LlmGatewayError>,
) -> LlmTelemetryEvent {
    let latency_ms = duration_to_millis(latency);
    match result {
        Ok(response) => {
            let usage = response.usage.clone().unwrap_or_default();
            let has_usage = response.usage.is_some();
            let estimated_cost_usd = if has_usage {
                estimate_cost_usd(
                    &response.model,
                    usage.prompt_tokens,
                    usage.completion_tokens,
                )
            } else {
                None
            };

            LlmTelemetryEvent {
                action: action.as_str(),
                outcome: "success",
                latency_ms,
                message_count,
                model: Some(response.model.clone()),
                prompt_tokens: has_usage.then_some(usage.prompt_tokens),
                completion_tokens: has_usage.then_some(usage.completion_tokens),
                total_tokens: has_usage.then_some(usage.total_tokens),
                estimated_cost_usd,
                error_type: None,
            }
        }
        Err(err) => LlmTelemetryEvent {
            action: action.as_str(),
            outcome: "failure",
            latency_ms,
            message_count,
            model: None,
            prompt_tokens: None,
            completion_tokens: None,
            total_tokens: None,
            estimated_cost_usd: None,
            error_type: Some(err.kind()),
        },
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    let millis = duration.as_millis();
    u64::try_from(millis).unwrap_or(u64::MAX)
}

fn estimate_cost_usd(model: &str, prompt_tokens: u32, completion_tokens: u32) -> Option<f64> {
    let pricing = pricing_for_model(model)?;
    let prompt = f64::from(prompt_tokens);
    let completion = f64::from(completion_tokens);
    let total = (prompt * pricing.input_per_million + completion * pricing.output_per_million)
        / 1_000_000.0;
    Some((total * 1_000_000.0).round() / 1_000_000.0)
}

#[derive(Debug, Clone, Copy)]
struct ModelPricing {
    input_per_million: f64,
    output_per_million: f64,
}

fn pricing_for_model(model: &str) -> Option<ModelPricing> {
    let normalized = model.trim().to_ascii_lowercase();
    if normalized.starts_with("gpt-3.5-turbo") {
        return Some(ModelPricing {
            input_per_million: 0.50,
            output_per_million: 1.50,
        });
    }

    if normalized.starts_with("gpt-4o-mini") {
        return Some(ModelPricing {
            input_per_million: 0.15,
            output_per_million: 0.60,
        });
    }

    None
}
