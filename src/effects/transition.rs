//! Transition requests and their errors.

use crate::core::{Guard, State};
use futures::future::{self, BoxFuture, FutureExt};
use std::borrow::Cow;
use std::fmt;
use std::future::Future;

/// Boxed error carried by a failed asynchronous operation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while applying a transition.
///
/// Neither variant is fatal to the engine: both are logged and the current
/// state is republished unchanged.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("Invalid state transition from '{state}'")]
    InvalidStateTransition { state: String },

    #[error("Transition operation failed: {0}")]
    Operation(#[source] BoxError),
}

impl TransitionError {
    /// Reject a transition because `state` does not permit it.
    pub fn invalid<S: State>(state: &S) -> Self {
        TransitionError::InvalidStateTransition {
            state: state.name().to_string(),
        }
    }

    /// Wrap a runtime failure of an in-flight operation.
    ///
    /// Accepts any error type as well as plain `&str`/`String` messages.
    pub fn operation<E: Into<BoxError>>(error: E) -> Self {
        TransitionError::Operation(error.into())
    }

    /// Whether a precondition rejected the current state.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, TransitionError::InvalidStateTransition { .. })
    }
}

/// Synchronous transition body.
pub type SyncTransitionFn<S> = Box<dyn FnOnce(&S) -> Result<S, TransitionError> + Send>;

/// Asynchronous transition body. Receives a snapshot of the current state.
pub type AsyncTransitionFn<S> =
    Box<dyn FnOnce(S) -> BoxFuture<'static, Result<S, TransitionError>> + Send>;

/// The two shapes a transition body can take.
pub enum TransitionKind<S> {
    Sync(SyncTransitionFn<S>),
    Async(AsyncTransitionFn<S>),
}

/// A single-use request to move the engine from its current state to the
/// next one.
///
/// # Example
///
/// ```rust
/// use stepwise::core::State;
/// use stepwise::effects::{Transition, TransitionError};
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum Shift {
///     Offline,
///     Online,
///     Driving,
/// }
///
/// impl State for Shift {
///     fn name(&self) -> &str {
///         match self {
///             Self::Offline => "Offline",
///             Self::Online => "Online",
///             Self::Driving => "Driving",
///         }
///     }
/// }
///
/// let go_online = Transition::to(Shift::Online)
///     .named("go_online")
///     .when(|s: &Shift| *s == Shift::Offline);
///
/// assert!(go_online.can_execute(&Shift::Offline));
/// assert!(!go_online.can_execute(&Shift::Driving));
///
/// let accept_trip = Transition::asynchronous(|current: Shift| async move {
///     match current {
///         Shift::Online => Ok(Shift::Driving),
///         other => Err(TransitionError::invalid(&other)),
///     }
/// });
/// assert!(accept_trip.is_async());
/// ```
pub struct Transition<S: State> {
    label: Cow<'static, str>,
    guard: Option<Guard<S>>,
    kind: TransitionKind<S>,
}

impl<S: State> Transition<S> {
    /// Synchronous transition that may reject the current state.
    pub fn sync<F>(f: F) -> Self
    where
        F: FnOnce(&S) -> Result<S, TransitionError> + Send + 'static,
    {
        Self::from_kind("sync", TransitionKind::Sync(Box::new(f)))
    }

    /// Synchronous transition that always succeeds.
    pub fn map<F>(f: F) -> Self
    where
        F: FnOnce(&S) -> S + Send + 'static,
    {
        Self::from_kind("map", TransitionKind::Sync(Box::new(move |s| Ok(f(s)))))
    }

    /// Unconditionally replace the current state with `next`.
    pub fn to(next: S) -> Self {
        Self::from_kind("goto", TransitionKind::Sync(Box::new(move |_| Ok(next))))
    }

    /// Transition whose next state is produced by a future.
    ///
    /// The engine does not start another transition until the future
    /// resolves.
    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: FnOnce(S) -> Fut + Send + 'static,
        Fut: Future<Output = Result<S, TransitionError>> + Send + 'static,
    {
        Self::from_kind(
            "async",
            TransitionKind::Async(Box::new(move |s| f(s).boxed())),
        )
    }

    fn from_kind(label: &'static str, kind: TransitionKind<S>) -> Self {
        Self {
            label: Cow::Borrowed(label),
            guard: None,
            kind,
        }
    }

    /// Set the label used in logs and transition records.
    pub fn named(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    /// Add a precondition using a closure.
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.guarded(Guard::new(predicate))
    }

    /// Add a precondition. Repeated guards must all hold.
    pub fn guarded(mut self, guard: Guard<S>) -> Self {
        self.guard = Some(match self.guard.take() {
            Some(existing) => existing.and(guard),
            None => guard,
        });
        self
    }

    /// Get the transition label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the body is asynchronous.
    pub fn is_async(&self) -> bool {
        matches!(self.kind, TransitionKind::Async(_))
    }

    /// Get the transition body.
    pub fn kind(&self) -> &TransitionKind<S> {
        &self.kind
    }

    /// Check the precondition against `current` (pure).
    pub fn can_execute(&self, current: &S) -> bool {
        self.guard.as_ref().is_none_or(|g| g.check(current))
    }

    /// Apply the transition to `current`.
    ///
    /// Both shapes come out as a future: a guard rejection or a synchronous
    /// body resolves immediately, an asynchronous body resolves when its
    /// operation does. The body never runs when the guard rejects.
    pub fn run(self, current: S) -> BoxFuture<'static, Result<S, TransitionError>> {
        if !self.can_execute(&current) {
            return future::ready(Err(TransitionError::invalid(&current))).boxed();
        }

        match self.kind {
            TransitionKind::Sync(f) => future::ready(f(&current)).boxed(),
            TransitionKind::Async(f) => f(current),
        }
    }
}

impl<S: State> fmt::Debug for Transition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("label", &self.label)
            .field("async", &self.is_async())
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}
