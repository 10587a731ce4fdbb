//! Matching engine error types

use thiserror::Error;

/// Errors surfaced by the matching engine.
///
/// Liquidity rejects (fill-or-kill prechecks that fail) are deliberately not
/// errors: the order is returned accepted with zero fills. Subscriber
/// delivery failures never surface here either; the failing subscriber is
/// evicted instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The order request failed validation; no state was changed.
    #[error("invalid order: {message}")]
    InvalidOrder {
        /// Description of the failed precondition.
        message: String,
    },

    /// The order id is neither resting on a book nor pending as a trigger.
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// Reading or writing the state snapshot failed.
    #[error("persistence error: {message}")]
    Persistence {
        /// Underlying I/O or decode error message.
        message: String,
    },

    /// A payload could not be encoded as JSON.
    #[error("serialization error: {message}")]
    Serialization {
        /// Underlying encoder error message.
        message: String,
    },
}

impl EngineError {
    /// Shorthand for a validation failure.
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidOrder {
            message: message.into(),
        }
    }
}
