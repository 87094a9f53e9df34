//! Error types for mediatask.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Template rendering and condition evaluation are total and never produce
//! these errors; they come from configuration loading, task actions, and export
//! delivery.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for mediatask operations.
#[derive(Error, Debug)]
pub enum MediaTaskError {
    /// User provided invalid arguments or unreadable input.
    #[error("{0}")]
    UserError(String),

    /// Pipeline configuration failed to parse or validate.
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// A task action failed (model invocation, post-processor, sub-workflow).
    #[error("action failed: {0}")]
    ActionFailed(String),

    /// An export could not be planned or delivered.
    #[error("export failed: {0}")]
    ExportFailed(String),

    /// A condition evaluated to false (only surfaced when explicitly requested).
    #[error("condition evaluated to false")]
    ConditionFalse,
}

impl MediaTaskError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            MediaTaskError::UserError(_) => exit_codes::USER_ERROR,
            MediaTaskError::ConfigError(_) => exit_codes::CONFIG_INVALID,
            MediaTaskError::ActionFailed(_) => exit_codes::ACTION_FAILURE,
            MediaTaskError::ExportFailed(_) => exit_codes::EXPORT_FAILURE,
            MediaTaskError::ConditionFalse => exit_codes::CONDITION_FALSE,
        }
    }
}

/// Result type alias for mediatask operations.
pub type Result<T> = std::result::Result<T, MediaTaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_error_has_correct_exit_code() {
        let err = MediaTaskError::UserError("bad argument".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn config_error_has_correct_exit_code() {
        let err = MediaTaskError::ConfigError("duplicate task name".to_string());
        assert_eq!(err.exit_code(), exit_codes::CONFIG_INVALID);
    }

    #[test]
    fn action_failed_has_correct_exit_code() {
        let err = MediaTaskError::ActionFailed("upscale exited with 1".to_string());
        assert_eq!(err.exit_code(), exit_codes::ACTION_FAILURE);
    }

    #[test]
    fn export_failed_has_correct_exit_code() {
        let err = MediaTaskError::ExportFailed("destination missing".to_string());
        assert_eq!(err.exit_code(), exit_codes::EXPORT_FAILURE);
    }

    #[test]
    fn condition_false_has_correct_exit_code() {
        assert_eq!(
            MediaTaskError::ConditionFalse.exit_code(),
            exit_codes::CONDITION_FALSE
        );
    }

    #[test]
    fn error_messages_are_user_friendly() {
        let err = MediaTaskError::ConfigError("task 'x' references unknown export 'y'".to_string());
        assert_eq!(
            err.to_string(),
            "invalid configuration: task 'x' references unknown export 'y'"
        );

        let err = MediaTaskError::UserError("data file not found".to_string());
        assert_eq!(err.to_string(), "data file not found");
    }
}
