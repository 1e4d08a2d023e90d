pub mod gateway;
pub mod observability;
pub mod openai;
pub mod prompts;

pub use gateway::{
    ChatMessage, ChatRole, LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmGatewayRequest,
    LlmGatewayResponse, LlmTokenUsage,
};
pub use observability::{LlmTelemetryEvent, complete_with_telemetry};
pub use openai::{OpenAiConfigError, OpenAiGateway, OpenAiGatewayConfig};
pub use prompts::{
    AssistantAction, DEFAULT_RESPONSE_LANGUAGE, PromptTemplate, template_for_action,
};
