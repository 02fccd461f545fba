//! Core workflow types and logic.
//!
//! This module contains the pure part of the crate:
//! - State definitions via the `State` trait
//! - Guard predicates for transition preconditions
//! - Navigation history with collapse-on-revisit
//!
//! Nothing in this module spawns tasks or touches channels.

mod guard;
mod history;
mod state;

pub use guard::Guard;
pub use history::StateHistory;
pub use state::State;
