// ============================================================================
// spark-rx - Errors
// Recoverable failures surfaced as values
// ============================================================================
//
// Stream faults are not represented here: an unhandled stream error panics.
// ============================================================================

use thiserror::Error;

/// Why a declared binding was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    /// The declared value was null/absent
    Null,
    /// The declared value is not observable
    NotObservable { type_name: &'static str },
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidReason::Null => f.write_str("value is null"),
            InvalidReason::NotObservable { type_name } => {
                write!(f, "value of type `{type_name}` is not an observable")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RxError {
    #[error("Invalid Observable found in subscriptions option with key \"{key}\": {reason}")]
    InvalidObservable { key: String, reason: InvalidReason },

    #[error("method `{name}` is not defined on the instance")]
    MethodNotFound { name: String },

    #[error("method `{name}` does not have the signature `{expected}`")]
    MethodSignature { name: String, expected: &'static str },

    #[error("instance {instance} has no render tree yet")]
    RenderUnavailable { instance: String },
}

pub type Result<T> = std::result::Result<T, RxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_observable_message_names_key() {
        let err = RxError::InvalidObservable {
            key: "count".into(),
            reason: InvalidReason::NotObservable { type_name: "i32" },
        };
        let message = err.to_string();
        assert!(message.contains("\"count\""));
        assert!(message.contains("`i32`"));
    }

    #[test]
    fn null_reason_display() {
        assert_eq!(InvalidReason::Null.to_string(), "value is null");
    }
}
