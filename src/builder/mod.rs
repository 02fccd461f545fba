//! Builder API for ergonomic engine and back-stack construction.
//!
//! This module provides fluent builders, shorthand transition constructors
//! and the `state_enum!` macro.

pub mod back_stack;
pub mod engine;
pub mod error;
pub mod macros;

pub use back_stack::BackStackBuilder;
pub use engine::EngineBuilder;
pub use error::BuildError;

use crate::core::State;
use crate::effects::Transition;

/// Create an unconditional transition to `to`, labelled with its name.
///
/// # Example
///
/// ```
/// use stepwise::builder::goto;
/// use stepwise::state_enum;
///
/// state_enum! {
///     enum MyState {
///         Start,
///         End,
///     }
///     final: [End]
/// }
///
/// let transition = goto(MyState::End);
/// assert_eq!(transition.label(), "goto End");
/// ```
pub fn goto<S: State>(to: S) -> Transition<S> {
    let label = format!("goto {}", to.name());
    Transition::to(to).named(label)
}

/// Create a transition to `to` that is only allowed when `guard` holds for
/// the current state.
///
/// # Example
///
/// ```
/// use stepwise::builder::guarded_goto;
/// use stepwise::core::State;
/// use stepwise::state_enum;
///
/// state_enum! {
///     enum MyState {
///         Start,
///         Middle,
///         End,
///     }
///     final: [End]
/// }
///
/// let transition = guarded_goto(MyState::Middle, |s: &MyState| !s.is_final());
///
/// assert!(transition.can_execute(&MyState::Start));
/// assert!(!transition.can_execute(&MyState::End));
/// ```
pub fn guarded_goto<S, F>(to: S, guard: F) -> Transition<S>
where
    S: State,
    F: Fn(&S) -> bool + Send + Sync + 'static,
{
    goto(to).when(guard)
}
