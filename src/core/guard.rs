//! Guard predicates for gating transitions.
//!
//! A guard is a pure boolean function over the current state. A transition
//! carrying a guard is rejected before any of its work begins when the
//! guard does not hold, which is how callers say "only allowed from X or Y".

use super::state::State;
use std::fmt;
use std::sync::Arc;

/// Pure predicate that decides whether a transition may run.
///
/// Guards are cheap to clone; clones share the same predicate.
///
/// # Example
///
/// ```rust
/// use stepwise::core::{Guard, State};
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum TaskState {
///     Pending,
///     Running,
///     Complete,
/// }
///
/// impl State for TaskState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Pending => "Pending",
///             Self::Running => "Running",
///             Self::Complete => "Complete",
///         }
///     }
///
///     fn is_final(&self) -> bool {
///         matches!(self, Self::Complete)
///     }
/// }
///
/// let can_advance = Guard::new(|state: &TaskState| !state.is_final());
///
/// assert!(can_advance.check(&TaskState::Pending));
/// assert!(can_advance.check(&TaskState::Running));
/// assert!(!can_advance.check(&TaskState::Complete));
/// ```
pub struct Guard<S: State> {
    predicate: Arc<dyn Fn(&S) -> bool + Send + Sync>,
}

impl<S: State> Guard<S> {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be deterministic and free of side effects; the
    /// engine may evaluate it on its worker task.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Check if the guard allows a transition from this state.
    pub fn check(&self, state: &S) -> bool {
        (self.predicate)(state)
    }

    /// Combine two guards; the result holds only when both hold.
    ///
    /// `other` is not evaluated when `self` already rejects.
    pub fn and(self, other: Guard<S>) -> Self {
        Guard::new(move |state: &S| self.check(state) && other.check(state))
    }
}

impl<S: State> Clone for Guard<S> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<S: State> fmt::Debug for Guard<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, PartialEq, Debug)]
    enum TestState {
        Initial,
        Processing,
        Complete,
        Failed,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Initial => "Initial",
                Self::Processing => "Processing",
                Self::Complete => "Complete",
                Self::Failed => "Failed",
            }
        }

        fn is_final(&self) -> bool {
            matches!(self, Self::Complete | Self::Failed)
        }
    }

    #[test]
    fn guard_allows_matching_states() {
        let guard = Guard::new(|s: &TestState| matches!(s, TestState::Initial));

        assert!(guard.check(&TestState::Initial));
        assert!(!guard.check(&TestState::Processing));
    }

    #[test]
    fn guard_checks_non_final_states() {
        let guard = Guard::new(|s: &TestState| !s.is_final());

        assert!(guard.check(&TestState::Initial));
        assert!(guard.check(&TestState::Processing));
        assert!(!guard.check(&TestState::Complete));
        assert!(!guard.check(&TestState::Failed));
    }

    #[test]
    fn and_requires_both_guards() {
        let not_final = Guard::new(|s: &TestState| !s.is_final());
        let not_initial = Guard::new(|s: &TestState| *s != TestState::Initial);
        let guard = not_final.and(not_initial);

        assert!(!guard.check(&TestState::Initial));
        assert!(guard.check(&TestState::Processing));
        assert!(!guard.check(&TestState::Complete));
    }

    #[test]
    fn and_short_circuits_on_first_rejection() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let guard = Guard::new(|_: &TestState| false).and(Guard::new(move |_: &TestState| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        }));

        assert!(!guard.check(&TestState::Initial));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cloned_guard_shares_predicate() {
        let guard = Guard::new(|s: &TestState| matches!(s, TestState::Processing));
        let cloned = guard.clone();

        assert_eq!(
            guard.check(&TestState::Processing),
            cloned.check(&TestState::Processing)
        );
        assert_eq!(
            guard.check(&TestState::Failed),
            cloned.check(&TestState::Failed)
        );
    }
}
