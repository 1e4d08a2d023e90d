pub mod assembler;
pub mod controller;
pub mod input;
pub mod transcript;

pub use assembler::{HistoryReplayRole, assemble_messages};
pub use controller::{
    PendingCompletion, SessionController, SessionError, SessionState, run_completion,
};
pub use input::{PromptInput, TABULAR_SECTION_LABEL, TEXT_SECTION_LABEL, ValidationError};
pub use transcript::{DisplayEntry, Transcript, Turn};
