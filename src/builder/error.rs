//! Build errors for engine and back-stack builders.

use thiserror::Error;

/// Errors that can occur when building engines and back-stacks.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) or use .uninitialized()")]
    MissingInitialState,

    #[error("Transition log capacity must be at least 1")]
    ZeroLogCapacity,

    #[error("State stream capacity must be at least 1")]
    ZeroStreamCapacity,

    #[error("Engine label must not be empty")]
    EmptyLabel,

    #[error("Sameness comparer not specified. Call .same_when(f) or .same_by(key)")]
    MissingSamenessComparer,
}
