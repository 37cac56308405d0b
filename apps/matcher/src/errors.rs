use thiserror::Error;

use crate::llm_client::LlmError;

/// Error type shared by every matching and scoring stage.
///
/// Pure components (statistics, keywords) only raise `Validation`. The
/// extraction adapter raises `Extraction` with the collaborator's raw output
/// attached, and collaborator failures surface unchanged as `Collaborator`.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Extraction error ({document}): {message}")]
    Extraction {
        document: String,
        message: String,
        /// The collaborator output that failed to parse, verbatim.
        raw: String,
    },

    #[error("{stage} failed: {source}")]
    Collaborator {
        stage: String,
        #[source]
        source: LlmError,
    },
}

impl MatchError {
    pub(crate) fn collaborator(stage: impl Into<String>, source: LlmError) -> Self {
        MatchError::Collaborator {
            stage: stage.into(),
            source,
        }
    }

    /// Raw collaborator payload for extraction failures, if any.
    pub fn raw_payload(&self) -> Option<&str> {
        match self {
            MatchError::Extraction { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_error_keeps_raw_payload() {
        let err = MatchError::Extraction {
            document: "resume".to_string(),
            message: "expected 5 critical_requirements, found 4".to_string(),
            raw: "{\"critical_requirements\": {}}".to_string(),
        };
        assert_eq!(err.raw_payload(), Some("{\"critical_requirements\": {}}"));
        assert!(err.to_string().contains("resume"));
    }

    #[test]
    fn test_collaborator_error_names_stage() {
        let err = MatchError::collaborator("job extraction", LlmError::EmptyContent);
        assert_eq!(
            err.to_string(),
            "job extraction failed: LLM returned empty content"
        );
        assert!(err.raw_payload().is_none());
    }
}
