use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dataset::DatasetSummary;
use crate::llm::AssistantAction;
use crate::session::{SessionController, SessionState, Turn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpretRequest {
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsightsRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnView {
    pub position: usize,
    pub action: AssistantAction,
    pub request: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

impl TurnView {
    pub fn from_turn(position: usize, turn: &Turn) -> Self {
        Self {
            position,
            action: turn.action(),
            request: turn.request().to_string(),
            response: turn.response().to_string(),
            created_at: turn.created_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetView {
    pub raw_row_count: usize,
    pub complete_row_count: usize,
    pub row_count: usize,
    pub column_count: usize,
    pub truncated: bool,
    pub columns: Vec<String>,
    pub rendered_summary: String,
}

impl From<&DatasetSummary> for DatasetView {
    fn from(summary: &DatasetSummary) -> Self {
        Self {
            raw_row_count: summary.raw_row_count,
            complete_row_count: summary.complete_row_count,
            row_count: summary.row_count,
            column_count: summary.column_count,
            truncated: summary.truncated,
            columns: summary.columns.clone(),
            rendered_summary: summary.render(),
        }
    }
}

/// Session snapshot. `turns` is newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
    pub turns: Vec<TurnView>,
    #[serde(default)]
    pub dataset: Option<DatasetView>,
}

impl From<&SessionController> for SessionView {
    fn from(controller: &SessionController) -> Self {
        let error = match controller.state() {
            SessionState::Error { reason } => Some(reason.clone()),
            _ => None,
        };

        Self {
            session_id: controller.session_id(),
            status: controller.state().as_str().to_string(),
            error,
            turns: controller
                .transcript()
                .display_entries()
                .into_iter()
                .map(|entry| TurnView::from_turn(entry.position, entry.turn))
                .collect(),
            dataset: controller.dataset().map(DatasetView::from),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub turn: TurnView,
    pub turn_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetLoadedResponse {
    pub dataset: DatasetView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}
