use thiserror::Error;

pub mod clock;
pub mod queue;
pub mod scheduling;

/// Error type for all primitives
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlarumError {
    #[error("No pending events, nothing to remove")]
    NoItems,
    #[error("Scheduled action panicked: {0}")]
    ActionPanicked(String),
}
