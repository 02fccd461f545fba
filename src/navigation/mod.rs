//! Navigation layered on top of the state engine.
//!
//! A [`WorkflowBackStack`] follows an engine's current-state stream, keeps
//! an ordered history of the states it emitted and turns "back" and
//! "clear" requests into transitions submitted to the same engine.

mod back_stack;

pub use back_stack::{BackDisabledFn, BackOutcome, FollowHandle, SamenessFn, WorkflowBackStack};
