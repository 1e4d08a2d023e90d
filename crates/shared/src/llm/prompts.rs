use serde::{Deserialize, Serialize};

pub const DEFAULT_RESPONSE_LANGUAGE: &str = "Spanish";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantAction {
    Interpret,
    Insights,
    FollowUp,
}

impl AssistantAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interpret => "interpret",
            Self::Insights => "insights",
            Self::FollowUp => "follow_up",
        }
    }

    /// Only insight requests carry the loaded dataset excerpt.
    pub const fn uses_dataset(self) -> bool {
        matches!(self, Self::Insights)
    }

    /// Follow-up questions only make sense against the earlier turns.
    pub const fn always_replays_history(self) -> bool {
        matches!(self, Self::FollowUp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub action: AssistantAction,
    pub system_prompt: String,
}

pub fn template_for_action(action: AssistantAction, response_language: &str) -> PromptTemplate {
    let task = match action {
        AssistantAction::Interpret => {
            "You are a data analysis expert. You will receive statistical results, business \
             metrics or dashboard summaries.\n\
             Your task is to explain clearly and briefly:\n\
             1. What the data indicates.\n\
             2. Whether anything is unusual.\n\
             3. Any conclusion that can be drawn."
        }
        AssistantAction::Insights => {
            "You are a data analysis expert. You will receive a tabulated dataset excerpt in CSV \
             form, optionally followed by additional notes from the user.\n\
             Your task is to produce concise insights:\n\
             1. The main patterns and trends in the data.\n\
             2. Outliers or values that look unusual.\n\
             3. Practical conclusions or next steps the data supports."
        }
        AssistantAction::FollowUp => {
            "You are a data analysis expert continuing a conversation about data the user \
             already shared. Answer the new question using the earlier messages as context. \
             If the earlier context does not contain the answer, say so instead of guessing."
        }
    };

    PromptTemplate {
        action,
        system_prompt: format!("{task}\n\nRespond in {response_language}, in an orderly way."),
    }
}

#[cfg(test)]
mod tests {
    use super::{AssistantAction, DEFAULT_RESPONSE_LANGUAGE, template_for_action};

    #[test]
    fn templates_carry_the_response_language() {
        for action in [
            AssistantAction::Interpret,
            AssistantAction::Insights,
            AssistantAction::FollowUp,
        ] {
            let template = template_for_action(action, DEFAULT_RESPONSE_LANGUAGE);
            assert_eq!(template.action, action);
            assert!(template.system_prompt.ends_with("Respond in Spanish, in an orderly way."));
        }
    }

    #[test]
    fn only_follow_up_forces_history_replay() {
        assert!(AssistantAction::FollowUp.always_replays_history());
        assert!(!AssistantAction::Interpret.always_replays_history());
        assert!(!AssistantAction::Insights.always_replays_history());
    }
}
