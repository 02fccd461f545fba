//! Stepwise: serialized state transitions for wizard-style workflows
//!
//! Stepwise coordinates a single current state under concurrent UI and
//! network events. Transitions, synchronous or asynchronous, are applied
//! one at a time in submission order, and every resulting state is
//! published on a stream that replays the latest value to late observers.
//! A workflow back-stack follows that stream to provide deduplicated back
//! navigation.
//!
//! # Core Concepts
//!
//! - **State**: application-defined value via the `State` trait
//! - **Transition**: single-use request producing the next state, optionally
//!   guarded by a precondition
//! - **State Engine**: applies transitions strictly one at a time; failures
//!   are logged and leave the state unchanged
//! - **Workflow Back-Stack**: history of emitted states with collapse on
//!   revisit, back navigation and back-disabled states
//!
//! # Example
//!
//! ```rust
//! use stepwise::builder::{goto, BackStackBuilder, EngineBuilder};
//! use stepwise::navigation::BackOutcome;
//! use stepwise::state_enum;
//!
//! state_enum! {
//!     pub enum Booking {
//!         Pickup,
//!         Destination,
//!         Searching,
//!     }
//! }
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! runtime.block_on(async {
//!     let engine = EngineBuilder::new()
//!         .label("booking")
//!         .initial(Booking::Pickup)
//!         .build()
//!         .unwrap();
//!     let back_stack = BackStackBuilder::new()
//!         .same_when(|a: &Booking, b: &Booking| a == b)
//!         .back_disabled_when(|s| *s == Booking::Searching)
//!         .build()
//!         .unwrap();
//!
//!     let _following = back_stack.follow(&engine);
//!     let _worker = engine.start().unwrap();
//!     let mut states = engine.observe_current_state();
//!     assert_eq!(states.next_state().await, Some(Booking::Pickup));
//!
//!     engine.submit(goto(Booking::Destination));
//!     assert_eq!(states.next_state().await, Some(Booking::Destination));
//!     assert_eq!(back_stack.len(), 2);
//!
//!     assert_eq!(back_stack.back(|| {}), BackOutcome::Navigated(Booking::Pickup));
//!     assert_eq!(states.next_state().await, Some(Booking::Pickup));
//! });
//! ```

pub mod builder;
pub mod core;
pub mod effects;
pub mod navigation;

// Re-export commonly used types
pub use crate::builder::{BackStackBuilder, BuildError, EngineBuilder};
pub use crate::core::{Guard, State, StateHistory};
pub use crate::effects::{
    EngineError, StateEngine, StateStream, Transition, TransitionError, WorkerHandle,
};
pub use crate::navigation::{BackOutcome, FollowHandle, WorkflowBackStack};
