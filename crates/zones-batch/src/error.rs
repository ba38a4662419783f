use thiserror::Error;
use zones_core::ValidationError;
use zones_store::StoreError;

/// Terminal outcome of a failed batch.
#[derive(Error, Debug)]
pub enum BatchError {
    /// The batch was rejected before any work started.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A worker could not obtain a connection.
    #[error("failed to acquire connection: {0}")]
    Acquire(#[source] StoreError),

    /// The store failed while evaluating one entry.
    #[error("query {key} failed: {source}")]
    Evaluate { key: String, source: StoreError },

    /// The caller's token fired (disconnect or deadline) before every entry
    /// was answered.
    #[error("batch cancelled")]
    Cancelled,

    /// A worker task panicked or was aborted.
    #[error("worker failed: {0}")]
    Worker(String),
}

impl BatchError {
    /// Short label used for the failure counter.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Acquire(_) => "acquire",
            Self::Evaluate { .. } => "evaluate",
            Self::Cancelled => "cancelled",
            Self::Worker(_) => "worker",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn validation_errors_display_unchanged() {
        let err = BatchError::from(ValidationError::DuplicateKey { key: "a".into() });
        assert_eq!(err.to_string(), "duplicate key");
        assert_eq!(err.reason(), "validation");
    }

    #[test]
    fn evaluate_error_names_the_key_and_keeps_the_source() {
        let err = BatchError::Evaluate {
            key: "k7".into(),
            source: StoreError::Query("boom".into()),
        };
        assert_eq!(err.to_string(), "query k7 failed: query error: boom");
        assert!(err.source().is_some());
        assert_eq!(err.reason(), "evaluate");
    }

    #[test]
    fn reasons_are_distinct() {
        let reasons = [
            BatchError::Acquire(StoreError::Connection("x".into())).reason(),
            BatchError::Cancelled.reason(),
            BatchError::Worker("x".into()).reason(),
        ];
        assert_eq!(reasons, ["acquire", "cancelled", "worker"]);
    }
}
