use thiserror::Error;

pub const TABULAR_SECTION_LABEL: &str = "Tabulated data:";
pub const TEXT_SECTION_LABEL: &str = "Additional text:";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please paste some content or load a dataset before submitting")]
    EmptyInput,
}

/// What the user supplied for one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptInput {
    pub manual_text: Option<String>,
    pub tabular_excerpt: Option<String>,
}

impl PromptInput {
    pub fn manual(text: impl Into<String>) -> Self {
        Self {
            manual_text: Some(text.into()),
            tabular_excerpt: None,
        }
    }

    pub fn with_tabular_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.tabular_excerpt = Some(excerpt.into());
        self
    }

    fn manual_text(&self) -> Option<&str> {
        self.manual_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    fn tabular_excerpt(&self) -> Option<&str> {
        self.tabular_excerpt
            .as_deref()
            .map(str::trim_end)
            .filter(|excerpt| !excerpt.trim().is_empty())
    }

    /// Builds the single request string sent as the newest user message.
    ///
    /// Manual text on its own is passed through unchanged; once a dataset excerpt is
    /// present both parts are labelled.
    pub fn combined(&self) -> Result<String, ValidationError> {
        match (self.tabular_excerpt(), self.manual_text()) {
            (None, None) => Err(ValidationError::EmptyInput),
            (None, Some(text)) => Ok(text.to_string()),
            (Some(excerpt), None) => Ok(format!("{TABULAR_SECTION_LABEL}\n{excerpt}")),
            (Some(excerpt), Some(text)) => Ok(format!(
                "{TABULAR_SECTION_LABEL}\n{excerpt}\n\n{TEXT_SECTION_LABEL}\n{text}"
            )),
        }
    }
}
