use serde::{Deserialize, Serialize};

use super::transcript::Turn;
use crate::llm::{ChatMessage, ChatRole};

/// Role used when a prior response is replayed as context.
///
/// `User` reproduces the historical wire format, where both halves of a turn are
/// sent as user messages. `Assistant` sends prior responses under the assistant role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryReplayRole {
    #[default]
    User,
    Assistant,
}

impl HistoryReplayRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }

    pub const fn chat_role(self) -> ChatRole {
        match self {
            Self::User => ChatRole::User,
            Self::Assistant => ChatRole::Assistant,
        }
    }
}

/// Produces `1 + 2 * history.len() + 1` messages: the system instruction, each turn
/// as request then response, and finally the new input. No truncation happens here.
pub fn assemble_messages(
    system_instruction: &str,
    history: &[Turn],
    new_input: &str,
    replay_role: HistoryReplayRole,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(ChatMessage::system(system_instruction));

    for turn in history {
        messages.push(ChatMessage::user(turn.request()));
        messages.push(ChatMessage {
            role: replay_role.chat_role(),
            content: turn.response().to_string(),
        });
    }

    messages.push(ChatMessage::user(new_input));
    messages
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{HistoryReplayRole, assemble_messages};
    use crate::llm::{AssistantAction, ChatMessage, ChatRole};
    use crate::session::Turn;

    fn history(count: u32) -> Vec<Turn> {
        (0..count)
            .map(|index| {
                Turn::new(
                    AssistantAction::Interpret,
                    format!("q{index}"),
                    format!("a{index}"),
                    Utc.with_ymd_and_hms(2026, 2, 15, 10, 0, index)
                        .single()
                        .expect("valid timestamp"),
                )
            })
            .collect()
    }

    #[test]
    fn empty_history_yields_system_and_new_input() {
        let messages = assemble_messages(
            "instruction",
            &[],
            "Average sales: 1245, April sales down 15%",
            HistoryReplayRole::User,
        );

        assert_eq!(
            messages,
            vec![
                ChatMessage::system("instruction"),
                ChatMessage::user("Average sales: 1245, April sales down 15%"),
            ]
        );
    }

    #[test]
    fn history_is_replayed_in_order_with_user_role_by_default() {
        let turns = history(3);

        let messages = assemble_messages("instruction", &turns, "next", HistoryReplayRole::User);

        assert_eq!(messages.len(), 1 + 2 * turns.len() + 1);
        let contents = messages
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            contents,
            ["instruction", "q0", "a0", "q1", "a1", "q2", "a2", "next"]
        );
        assert!(
            messages[1..]
                .iter()
                .all(|message| message.role == ChatRole::User)
        );
    }

    #[test]
    fn assistant_replay_role_marks_prior_responses() {
        let turns = history(2);

        let messages =
            assemble_messages("instruction", &turns, "next", HistoryReplayRole::Assistant);

        assert_eq!(messages[1].role, ChatRole::User);
        assert_eq!(messages[2].role, ChatRole::Assistant);
        assert_eq!(messages[4].role, ChatRole::Assistant);
        assert_eq!(messages[5].role, ChatRole::User);
    }

    #[test]
    fn assembly_is_deterministic() {
        let turns = history(4);

        let first = assemble_messages("instruction", &turns, "next", HistoryReplayRole::User);
        let second = assemble_messages("instruction", &turns, "next", HistoryReplayRole::User);

        assert_eq!(first, second);
    }

    #[test]
    fn parses_replay_role_case_insensitively() {
        assert_eq!(
            HistoryReplayRole::parse(" Assistant "),
            Some(HistoryReplayRole::Assistant)
        );
        assert_eq!(HistoryReplayRole::parse("user"), Some(HistoryReplayRole::User));
        assert_eq!(HistoryReplayRole::parse("system"), None);
    }
}
