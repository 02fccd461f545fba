//! Core State trait for workflow states.
//!
//! The engine is generic over an application-defined state value and never
//! looks inside it. The trait only asks for what the engine needs to copy,
//! share across tasks, and describe a state in diagnostics.

use std::fmt::Debug;

/// Trait for workflow states.
///
/// States are immutable values. The engine clones them when publishing to
/// subscribers and when the back-stack records them, so they should be cheap
/// to clone (wrap large payloads in `Arc` if needed).
///
/// # Required Traits
///
/// - `Clone`: states are handed to every subscriber and kept in history
/// - `Debug`: states appear in diagnostics
/// - `Send + Sync + 'static`: states cross into the worker task
///
/// # Example
///
/// ```rust
/// use stepwise::core::State;
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum BookingState {
///     PickupSelection,
///     DestinationSelection { pickup: String },
///     Confirmed,
/// }
///
/// impl State for BookingState {
///     fn name(&self) -> &str {
///         match self {
///             Self::PickupSelection => "PickupSelection",
///             Self::DestinationSelection { .. } => "DestinationSelection",
///             Self::Confirmed => "Confirmed",
///         }
///     }
///
///     fn is_final(&self) -> bool {
///         matches!(self, Self::Confirmed)
///     }
/// }
///
/// let state = BookingState::DestinationSelection { pickup: "Home".into() };
/// assert_eq!(state.name(), "DestinationSelection");
/// assert!(!state.is_final());
/// ```
pub trait State: Clone + Debug + Send + Sync + 'static {
    /// Get the state's name for logging.
    ///
    /// Names identify the step, not the payload: two states of the same
    /// variant with different data usually share a name.
    fn name(&self) -> &str;

    /// Check if this is a terminal state of the workflow.
    ///
    /// The engine itself has no terminal state; this is a hint for
    /// collaborators that close the workflow once it is reached.
    ///
    /// Default implementation returns `false`.
    fn is_final(&self) -> bool {
        false
    }
}
