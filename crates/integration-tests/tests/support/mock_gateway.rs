use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shared::llm::{
    LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmGatewayRequest, LlmGatewayResponse,
};

#[derive(Clone, Default)]
pub struct MockGateway {
    replies: Arc<Mutex<VecDeque<Result<String, LlmGatewayError>>>>,
    seen_requests: Arc<Mutex<Vec<LlmGatewayRequest>>>,
    delay: Option<Duration>,
}

impl MockGateway {
    pub fn with_replies(replies: Vec<Result<&str, LlmGatewayError>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(
                replies
                    .into_iter()
                    .map(|reply| reply.map(ToString::to_string))
                    .collect(),
            )),
            ..Self::default()
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn seen_requests(&self) -> Vec<LlmGatewayRequest> {
        self.seen_requests
            .lock()
            .expect("request log lock should not be poisoned")
            .clone()
    }
}

impl LlmGateway for MockGateway {
    fn generate<'a>(&'a self, request: LlmGatewayRequest) -> LlmGatewayFuture<'a> {
        Box::pin(async move {
            self.seen_requests
                .lock()
                .expect("request log lock should not be poisoned")
                .push(request);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let content = self
                .replies
                .lock()
                .expect("reply lock should not be poisoned")
                .pop_front()
                .unwrap_or_else(|| Err(LlmGatewayError::ProviderFailure("no_reply".to_string())))?;

            Ok(LlmGatewayResponse {
                model: "mock-model".to_string(),
                provider_request_id: None,
                content,
                usage: None,
            })
        })
    }
}
