use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to the reviewer. None of these end the session; the console
/// prints them and waits for the next command.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("could not read {file}: {cause}")]
    Extraction { file: String, cause: String },

    #[error("could not interpret AI response: {reason}")]
    AiResponseParse { reason: String, raw: String },

    #[error("AI request failed: {0}")]
    Ai(String),

    #[error("archival warning ({target}): {cause}")]
    Archival { target: &'static str, cause: String },

    #[error("configuration error: {message}\n{remediation}")]
    Configuration {
        message: String,
        remediation: String,
    },

    #[error("timed out after {attempts} attempts ({elapsed:?}) waiting for {what}")]
    Timeout {
        what: String,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("please complete all fields: missing {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("cannot {action} while in step {step}")]
    InvalidTransition { action: &'static str, step: u8 },
}

impl ReviewError {
    pub fn extraction(file: impl Into<String>, cause: impl ToString) -> Self {
        Self::Extraction {
            file: file.into(),
            cause: cause.to_string(),
        }
    }

    pub fn archival(target: &'static str, cause: impl ToString) -> Self {
        Self::Archival {
            target,
            cause: cause.to_string(),
        }
    }

    pub fn configuration(message: impl Into<String>, remediation: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            remediation: remediation.into(),
        }
    }

    /// Raw model output for manual inspection, when the error carries one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::AiResponseParse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
