use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::assembler::assemble_messages;
use super::input::{PromptInput, ValidationError};
use super::transcript::{Transcript, Turn};
use crate::config::SessionConfig;
use crate::dataset::{DataFormatError, DatasetSummary, SummaryOutcome, Table, summarize};
use crate::llm::observability::reject_empty_content;
use crate::llm::{
    AssistantAction, LlmGateway, LlmGatewayError, LlmGatewayRequest, LlmGatewayResponse,
    complete_with_telemetry, template_for_action,
};

const ABANDONED_REASON: &str = "completion was abandoned before it finished";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingCompletion { action: AssistantAction },
    Error { reason: String },
}

impl SessionState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingCompletion { .. } => "awaiting_completion",
            Self::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    DataFormat(#[from] DataFormatError),
    #[error(transparent)]
    Completion(#[from] LlmGatewayError),
    #[error("a completion is already in flight for this session")]
    Busy,
    #[error("completion does not belong to the submission in flight")]
    StaleCompletion,
}

/// A submission that left `Idle` and is waiting on the completion client.
#[derive(Debug, Clone)]
pub struct PendingCompletion {
    ticket: u64,
    action: AssistantAction,
    request_text: String,
    request: LlmGatewayRequest,
}

impl PendingCompletion {
    pub fn action(&self) -> AssistantAction {
        self.action
    }

    pub fn request_text(&self) -> &str {
        &self.request_text
    }

    pub fn request(&self) -> &LlmGatewayRequest {
        &self.request
    }
}

/// Owns everything scoped to one interactive session: state, transcript and the
/// cleaned dataset summary. Hosts keep one controller per session.
#[derive(Debug)]
pub struct SessionController {
    session_id: Uuid,
    config: SessionConfig,
    state: SessionState,
    transcript: Transcript,
    dataset: Option<DatasetSummary>,
    current_ticket: u64,
}

impl SessionController {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_session_id(Uuid::new_v4(), config)
    }

    pub fn with_session_id(session_id: Uuid, config: SessionConfig) -> Self {
        Self {
            session_id,
            config,
            state: SessionState::Idle,
            transcript: Transcript::new(),
            dataset: None,
            current_ticket: 0,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn dataset(&self) -> Option<&DatasetSummary> {
        self.dataset.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, SessionState::AwaitingCompletion { .. })
    }

    /// Summarizes `table` and caches the cleaned excerpt for insight requests.
    ///
    /// An insufficient dataset drops any previously cached excerpt; a parse failure
    /// upstream leaves it untouched.
    pub fn load_dataset(&mut self, table: &Table) -> Result<SummaryOutcome, SessionError> {
        self.ensure_not_busy()?;
        let outcome = summarize(table)?;

        match &outcome {
            SummaryOutcome::Ready(summary) => {
                info!(
                    session_id = %self.session_id,
                    raw_rows = summary.raw_row_count,
                    rows = summary.row_count,
                    columns = summary.column_count,
                    truncated = summary.truncated,
                    "dataset loaded"
                );
                self.dataset = Some(summary.clone());
            }
            SummaryOutcome::InsufficientData { raw_row_count, .. } => {
                warn!(
                    session_id = %self.session_id,
                    raw_rows = raw_row_count,
                    "dataset has no complete rows"
                );
                self.dataset = None;
            }
        }

        Ok(outcome)
    }

    pub fn load_dataset_csv(&mut self, raw: &str) -> Result<SummaryOutcome, SessionError> {
        self.ensure_not_busy()?;
        let table = Table::from_csv_str(raw)?;
        self.load_dataset(&table)
    }

    /// Parses an uploaded file as-is; bytes that are not UTF-8 are a `DataFormatError`.
    pub fn load_dataset_bytes(&mut self, raw: &[u8]) -> Result<SummaryOutcome, SessionError> {
        self.ensure_not_busy()?;
        let table = Table::from_csv_reader(raw)?;
        self.load_dataset(&table)
    }

    pub fn clear_dataset(&mut self) -> Result<(), SessionError> {
        self.ensure_not_busy()?;
        self.dataset = None;
        Ok(())
    }

    /// Empties the transcript. Clearing from `Error` also acknowledges it.
    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.ensure_not_busy()?;
        let cleared_turns = self.transcript.len();
        self.transcript.clear();
        self.state = SessionState::Idle;
        info!(session_id = %self.session_id, cleared_turns, "transcript cleared");
        Ok(())
    }

    /// Moves `Error` back to `Idle`; no-op in any other state.
    pub fn acknowledge(&mut self) {
        if matches!(self.state, SessionState::Error { .. }) {
            self.state = SessionState::Idle;
        }
    }

    /// Validates the input, assembles the outbound messages and enters `AwaitingCompletion`.
    ///
    /// Validation failures leave state and transcript unchanged and never reach the
    /// completion client.
    pub fn begin_submission(
        &mut self,
        action: AssistantAction,
        manual_text: Option<&str>,
    ) -> Result<PendingCompletion, SessionError> {
        self.ensure_not_busy()?;

        let tabular_excerpt = if action.uses_dataset() {
            self.dataset.as_ref().map(|summary| summary.excerpt.clone())
        } else {
            None
        };
        let input = PromptInput {
            manual_text: manual_text.map(ToString::to_string),
            tabular_excerpt,
        };
        let request_text = input.combined().inspect_err(|_| {
            debug!(
                session_id = %self.session_id,
                action = action.as_str(),
                "submission rejected by validation"
            );
        })?;

        let template = template_for_action(action, &self.config.response_language);
        let history: &[Turn] =
            if action.always_replays_history() || self.config.replay_history_on_interpret {
                self.transcript.recent(self.config.max_history_turns)
            } else {
                &[]
            };
        let replayed_turns = history.len();
        let messages = assemble_messages(
            &template.system_prompt,
            history,
            &request_text,
            self.config.history_replay_role,
        );

        self.current_ticket = self.current_ticket.wrapping_add(1);
        self.state = SessionState::AwaitingCompletion { action };
        info!(
            session_id = %self.session_id,
            action = action.as_str(),
            replayed_turns,
            message_count = messages.len(),
            "submission awaiting completion"
        );

        Ok(PendingCompletion {
            ticket: self.current_ticket,
            action,
            request_text,
            request: LlmGatewayRequest::new(messages)
                .with_requester_id(self.session_id.to_string()),
        })
    }

    /// Resolves the in-flight submission. Only a non-empty response creates a turn.
    pub fn finish_submission(
        &mut self,
        pending: PendingCompletion,
        result: Result<LlmGatewayResponse, LlmGatewayError>,
    ) -> Result<Turn, SessionError> {
        if !self.is_busy() || pending.ticket != self.current_ticket {
            return Err(SessionError::StaleCompletion);
        }

        let result = result.and_then(reject_empty_content);

        match result {
            Ok(response) => {
                let turn = Turn::new(
                    pending.action,
                    pending.request_text,
                    response.content,
                    Utc::now(),
                );
                self.transcript.append(turn.clone());
                self.state = SessionState::Idle;
                info!(
                    session_id = %self.session_id,
                    action = pending.action.as_str(),
                    turns = self.transcript.len(),
                    "turn appended"
                );
                Ok(turn)
            }
            Err(err) => {
                warn!(
                    session_id = %self.session_id,
                    action = pending.action.as_str(),
                    error_type = err.kind(),
                    "completion failed; transcript unchanged"
                );
                self.state = SessionState::Error {
                    reason: err.to_string(),
                };
                Err(SessionError::Completion(err))
            }
        }
    }

    /// Gives up on a submission that will never be finished, moving the session to
    /// `Error`. Ignored unless `pending` is the submission in flight.
    pub fn abandon(&mut self, pending: &PendingCompletion) {
        self.abandon_ticket(pending.ticket);
    }

    fn abandon_ticket(&mut self, ticket: u64) {
        if !self.is_busy() || ticket != self.current_ticket {
            return;
        }

        warn!(session_id = %self.session_id, "completion abandoned before it finished");
        self.state = SessionState::Error {
            reason: ABANDONED_REASON.to_string(),
        };
    }

    /// Runs one full submission against `gateway`. On failure the controller is left
    /// in `Error` until [`SessionController::acknowledge`] or the next submission.
    /// Dropping the future mid-flight leaves it in `Error` as well.
    pub async fn submit(
        &mut self,
        gateway: &dyn LlmGateway,
        action: AssistantAction,
        manual_text: Option<&str>,
    ) -> Result<Turn, SessionError> {
        let pending = self.begin_submission(action, manual_text)?;
        let timeout = self.config.completion_timeout();
        let in_flight = InFlight {
            controller: self,
            ticket: pending.ticket,
        };
        let result = run_completion(gateway, &pending, timeout).await;
        in_flight.controller.finish_submission(pending, result)
    }

    pub async fn interpret(
        &mut self,
        gateway: &dyn LlmGateway,
        text: &str,
    ) -> Result<Turn, SessionError> {
        self.submit(gateway, AssistantAction::Interpret, Some(text))
            .await
    }

    pub async fn generate_insights(
        &mut self,
        gateway: &dyn LlmGateway,
        notes: Option<&str>,
    ) -> Result<Turn, SessionError> {
        self.submit(gateway, AssistantAction::Insights, notes).await
    }

    pub async fn ask_follow_up(
        &mut self,
        gateway: &dyn LlmGateway,
        question: &str,
    ) -> Result<Turn, SessionError> {
        self.submit(gateway, AssistantAction::FollowUp, Some(question))
            .await
    }

    fn ensure_not_busy(&self) -> Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        Ok(())
    }
}

/// Keeps a dropped [`SessionController::submit`] future from stranding the session
/// in `AwaitingCompletion`.
struct InFlight<'a> {
    controller: &'a mut SessionController,
    ticket: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.controller.abandon_ticket(self.ticket);
    }
}

/// Sends a pending submission with a bounded wait. Dropping the returned future
/// abandons the provider call; pair that with [`SessionController::abandon`].
pub async fn run_completion(
    gateway: &dyn LlmGateway,
    pending: &PendingCompletion,
    timeout: Duration,
) -> Result<LlmGatewayResponse, LlmGatewayError> {
    let completion = complete_with_telemetry(gateway, pending.action, pending.request.clone());

    match tokio::time::timeout(timeout, completion).await {
        Ok((result, telemetry)) => {
            telemetry.log();
            result
        }
        Err(_) => {
            warn!(
                action = pending.action.as_str(),
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "llm completion exceeded session timeout"
            );
            Err(LlmGatewayError::Timeout)
        }
    }
}
