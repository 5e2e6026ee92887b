//! Error types for the turnout bot.

use crate::survey::steps::StepName;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// Session-scoped survey errors. None of these are fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurveyError {
    #[error("Malformed selection payload: {payload:?}")]
    MalformedSelection { payload: String },

    #[error("Item {id} not found for step {step}")]
    UnknownItem { step: StepName, id: i64 },

    #[error("No conversation state recorded")]
    MissingState,

    #[error("Not enough data to build an incident")]
    InsufficientData,

    #[error("Unrecognized answer: {payload:?}")]
    UnknownAnswer { payload: String },
}

impl SurveyError {
    /// Text shown to the operator when this error occurs.
    pub fn user_notice(&self) -> &'static str {
        match self {
            Self::MalformedSelection { .. } => "Не удалось распознать выбор.",
            Self::UnknownItem { .. } => "Элемент не найден.",
            Self::MissingState => "Ошибка состояния. Начните /start заново.",
            Self::InsufficientData => {
                "Недостаточно данных для формирования инцидента. Начните /start заново."
            }
            Self::UnknownAnswer { .. } => "Неизвестный ответ.",
        }
    }

    /// Whether the session is cleared after this error.
    pub fn ends_conversation(&self) -> bool {
        matches!(self, Self::MissingState | Self::InsufficientData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors_keep_the_conversation() {
        let retryable = [
            SurveyError::MalformedSelection {
                payload: "driver:x".into(),
            },
            SurveyError::UnknownItem {
                step: StepName::Reason,
                id: 42,
            },
            SurveyError::UnknownAnswer {
                payload: "maybe".into(),
            },
        ];
        for err in retryable {
            assert!(!err.ends_conversation(), "{err} should be retryable");
        }
    }

    #[test]
    fn terminal_errors_end_the_conversation() {
        assert!(SurveyError::MissingState.ends_conversation());
        assert!(SurveyError::InsufficientData.ends_conversation());
    }

    #[test]
    fn notices_match_error_kind() {
        assert_eq!(
            SurveyError::UnknownItem {
                step: StepName::Driver,
                id: 9
            }
            .user_notice(),
            "Элемент не найден."
        );
        assert!(SurveyError::MissingState.user_notice().contains("/start"));
    }

    #[test]
    fn display_includes_context() {
        let err = SurveyError::UnknownItem {
            step: StepName::Norm,
            id: 7,
        };
        assert_eq!(err.to_string(), "Item 7 not found for step norm");
    }
}
