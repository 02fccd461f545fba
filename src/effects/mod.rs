//! The state engine and everything it consumes or produces.
//!
//! This module is the imperative shell around the pure core: it owns the
//! worker task, the transition queue and the current-state stream.
//!
//! # Key Concepts
//!
//! - **Transitions**: single-use requests, synchronous or asynchronous,
//!   optionally guarded by a precondition
//! - **State Engine**: applies transitions one at a time in submission order
//! - **State Stream**: replays the latest state, then forwards every new one
//! - **Transition Log**: bounded record of applied and failed transitions

mod engine;
mod log;
mod stream;
mod transition;

pub use engine::{EngineError, StateEngine, WorkerHandle, DEFAULT_LABEL, DEFAULT_LOG_CAPACITY};
pub use log::{TransitionLog, TransitionOutcome, TransitionRecord};
pub use stream::{StateStream, DEFAULT_STREAM_CAPACITY};
pub use transition::{
    AsyncTransitionFn, BoxError, SyncTransitionFn, Transition, TransitionError, TransitionKind,
};
