//! Fatal error taxonomy
//!
//! SweepFeed distinguishes two classes of fatal errors. Configuration errors
//! are caused by user-supplied settings that cannot produce a correct run
//! (e.g., a randomization range smaller than the largest chunk). Invariant
//! errors indicate corrupted internal state (e.g., a broken permutation);
//! continuing after either risks silently training on misaligned data, so
//! both abort the run.
//!
//! Operational conditions that are suboptimal but correct (uneven rank
//! splits, a rank receiving a zero-width share) are warnings printed once,
//! not errors. End of epoch is an expected terminal condition and is never
//! reported through this type.

use thiserror::Error;

/// Fatal errors raised by the staging and randomization core
#[derive(Debug, Error)]
pub enum FeedError {
    /// User configuration that cannot produce a correct run
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Corrupted internal state; indicates a bug, not bad input
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// A collective operation failed (peer gone, group torn down)
    #[error("communication error: {0}")]
    Communication(String),
}

impl FeedError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        FeedError::Configuration(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        FeedError::Invariant(msg.into())
    }

    pub fn communication(msg: impl Into<String>) -> Self {
        FeedError::Communication(msg.into())
    }
}
