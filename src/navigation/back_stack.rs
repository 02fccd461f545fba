//! Workflow back-stack driven by an engine's published states.

use crate::core::{State, StateHistory};
use crate::effects::{StateEngine, Transition};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

/// Decides whether two states count as the same workflow step.
pub type SamenessFn<S> = Arc<dyn Fn(&S, &S) -> bool + Send + Sync>;

/// Decides whether back navigation is blocked while in a state.
pub type BackDisabledFn<S> = Arc<dyn Fn(&S) -> bool + Send + Sync>;

/// Result of a [`WorkflowBackStack::back`] request.
#[derive(Clone, Debug, PartialEq)]
pub enum BackOutcome<S> {
    /// The current step blocks back navigation; nothing changed.
    Disabled,
    /// Fewer than two entries; `on_empty` was invoked.
    Empty,
    /// The top entry was popped and a transition to this state submitted.
    Navigated(S),
    /// No engine is being followed, so there is nothing to navigate.
    Detached,
}

/// The engine currently followed and the observer registered on it.
struct Attachment<S: State> {
    engine: StateEngine<S>,
    observer: u64,
}

struct Inner<S: State> {
    history: Mutex<StateHistory<S>>,
    same: SamenessFn<S>,
    back_disabled: BackDisabledFn<S>,
    attachment: Mutex<Option<Attachment<S>>>,
}

impl<S: State> Inner<S> {
    fn observe(&self, state: S) {
        let name = state.name().to_string();
        let mut history = self.history.lock();
        let collapsed = history.record(state, |a, b| (self.same)(a, b));
        trace!(
            state = %name,
            collapsed,
            depth = history.len(),
            "Back-stack recorded state"
        );
    }
}

/// Ordered history of the states an engine has emitted, with collapse on
/// revisit and back navigation fed back into the engine.
///
/// States are recorded synchronously while the engine publishes them, so
/// the top entry is always the engine's latest state by the time any
/// [`StateStream`](crate::effects::StateStream) sees it. Clones share the
/// same history.
///
/// # Example
///
/// ```rust
/// use stepwise::core::State;
/// use stepwise::effects::{StateEngine, Transition};
/// use stepwise::navigation::{BackOutcome, WorkflowBackStack};
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum Step {
///     Pickup,
///     Destination,
/// }
///
/// impl State for Step {
///     fn name(&self) -> &str {
///         match self {
///             Self::Pickup => "Pickup",
///             Self::Destination => "Destination",
///         }
///     }
/// }
///
/// let runtime = tokio::runtime::Runtime::new().unwrap();
/// runtime.block_on(async {
///     let engine = StateEngine::new();
///     let back_stack = WorkflowBackStack::new(|a: &Step, b: &Step| a == b, |_: &Step| false);
///     let _following = back_stack.follow(&engine);
///
///     engine.initialize(Step::Pickup);
///     let _worker = engine.start().unwrap();
///     let mut states = engine.observe_current_state();
///     states.next_state().await;
///
///     engine.submit(Transition::to(Step::Destination));
///     states.next_state().await;
///     assert_eq!(back_stack.len(), 2);
///
///     assert_eq!(back_stack.back(|| {}), BackOutcome::Navigated(Step::Pickup));
///     assert_eq!(states.next_state().await, Some(Step::Pickup));
/// });
/// ```
pub struct WorkflowBackStack<S: State> {
    inner: Arc<Inner<S>>,
}

impl<S: State> Clone for WorkflowBackStack<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: State> WorkflowBackStack<S> {
    /// Create an empty back-stack.
    ///
    /// `same` decides when a newly emitted state revisits an earlier entry;
    /// `back_disabled` blocks back navigation while the top entry matches.
    /// Both are called on the engine's publish path and must be pure; they
    /// must not call back into the engine.
    pub fn new<F, G>(same: F, back_disabled: G) -> Self
    where
        F: Fn(&S, &S) -> bool + Send + Sync + 'static,
        G: Fn(&S) -> bool + Send + Sync + 'static,
    {
        Self::from_parts(Arc::new(same), Arc::new(back_disabled))
    }

    pub(crate) fn from_parts(same: SamenessFn<S>, back_disabled: BackDisabledFn<S>) -> Self {
        Self {
            inner: Arc::new(Inner {
                history: Mutex::new(StateHistory::new()),
                same,
                back_disabled,
                attachment: Mutex::new(None),
            }),
        }
    }

    /// Start recording every state `engine` emits and route back
    /// navigation into it.
    ///
    /// The engine's latest state, if any, is recorded before this returns.
    /// Following a new engine stops following the previous one.
    pub fn follow(&self, engine: &StateEngine<S>) -> FollowHandle<S> {
        let weak = Arc::downgrade(&self.inner);
        let observer = engine.add_observer(Box::new(move |state: &S| {
            if let Some(inner) = weak.upgrade() {
                inner.observe(state.clone());
            }
        }));

        let previous = self.inner.attachment.lock().replace(Attachment {
            engine: engine.clone(),
            observer,
        });
        if let Some(previous) = previous {
            previous.engine.remove_observer(previous.observer);
        }

        debug!(
            engine = engine.label(),
            engine_id = %engine.id(),
            "Back-stack following engine"
        );

        FollowHandle {
            inner: Arc::clone(&self.inner),
            engine: engine.clone(),
            observer,
        }
    }

    /// Navigate to the previous history entry.
    ///
    /// Ignored while the top entry is back-disabled. With fewer than two
    /// entries `on_empty` is invoked instead and no transition is submitted.
    /// Otherwise the top entry is popped and a transition to the new top is
    /// submitted to the followed engine.
    pub fn back<F>(&self, on_empty: F) -> BackOutcome<S>
    where
        F: FnOnce(),
    {
        let mut history = self.inner.history.lock();

        if history.top().is_some_and(|top| (self.inner.back_disabled)(top)) {
            debug!(depth = history.len(), "Back navigation disabled");
            return BackOutcome::Disabled;
        }

        if history.len() < 2 {
            drop(history);
            debug!("Back navigation reached an empty history");
            on_empty();
            return BackOutcome::Empty;
        }

        let Some(engine) = self
            .inner
            .attachment
            .lock()
            .as_ref()
            .map(|attachment| attachment.engine.clone())
        else {
            debug!("Back navigation requested without a followed engine");
            return BackOutcome::Detached;
        };

        history.pop();
        let Some(target) = history.top().cloned() else {
            return BackOutcome::Empty;
        };
        drop(history);

        debug!(
            engine = engine.label(),
            to = target.name(),
            "Navigating back"
        );
        engine.submit(Transition::to(target.clone()).named("back"));
        BackOutcome::Navigated(target)
    }

    /// Discard all history. States recorded afterwards are not compared
    /// against anything recorded before.
    pub fn clear(&self) {
        self.inner.history.lock().clear();
        debug!("Back-stack cleared");
    }

    /// Whether a `back` request right now would navigate.
    pub fn can_go_back(&self) -> bool {
        let history = self.inner.history.lock();
        history.len() >= 2
            && !history
                .top()
                .is_some_and(|top| (self.inner.back_disabled)(top))
    }

    /// Entries oldest first.
    pub fn history(&self) -> Vec<S> {
        self.inner.history.lock().entries().to_vec()
    }

    /// Copy of the history, e.g. for persisting with serde.
    pub fn snapshot(&self) -> StateHistory<S> {
        self.inner.history.lock().clone()
    }

    /// Most recent entry; the engine's latest state while following.
    pub fn top(&self) -> Option<S> {
        self.inner.history.lock().top().cloned()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.history.lock().len()
    }

    /// Whether no entries have been recorded since creation or `clear`.
    pub fn is_empty(&self) -> bool {
        self.inner.history.lock().is_empty()
    }

    /// Whether an engine is attached for recording and back navigation.
    pub fn is_following(&self) -> bool {
        self.inner.attachment.lock().is_some()
    }
}

/// Keeps a back-stack following an engine.
///
/// Dropping the handle stops recording emissions and detaches the engine;
/// the engine itself keeps running and the history is kept.
pub struct FollowHandle<S: State> {
    inner: Arc<Inner<S>>,
    engine: StateEngine<S>,
    observer: u64,
}

impl<S: State> FollowHandle<S> {
    /// Stop following now. Same as dropping the handle.
    pub fn stop(self) {}
}

impl<S: State> Drop for FollowHandle<S> {
    fn drop(&mut self) {
        // A no-op when a later `follow` already replaced this observer.
        self.engine.remove_observer(self.observer);

        let mut attachment = self.inner.attachment.lock();
        let current = attachment.as_ref().is_some_and(|attached| {
            attached.observer == self.observer && attached.engine.id() == self.engine.id()
        });
        if current {
            attachment.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::discriminant;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::timeout;

    #[derive(Clone, PartialEq, Debug)]
    enum Screen {
        Pickup,
        Destination(&'static str),
        Vehicle,
        Searching,
    }

    impl State for Screen {
        fn name(&self) -> &str {
            match self {
                Self::Pickup => "Pickup",
                Self::Destination(_) => "Destination",
                Self::Vehicle => "Vehicle",
                Self::Searching => "Searching",
            }
        }
    }

    struct Fixture {
        engine: StateEngine<Screen>,
        back_stack: WorkflowBackStack<Screen>,
        _following: FollowHandle<Screen>,
        _worker: crate::effects::WorkerHandle,
    }

    fn fixture(initial: Screen) -> Fixture {
        let engine = StateEngine::new();
        let back_stack = WorkflowBackStack::new(
            |a: &Screen, b: &Screen| discriminant(a) == discriminant(b),
            |s: &Screen| matches!(s, Screen::Searching),
        );
        let following = back_stack.follow(&engine);
        engine.initialize(initial);
        let worker = engine.start().unwrap();
        Fixture {
            engine,
            back_stack,
            _following: following,
            _worker: worker,
        }
    }

    async fn wait_for_history(back_stack: &WorkflowBackStack<Screen>, expected: &[Screen]) {
        let settled = timeout(Duration::from_secs(2), async {
            while back_stack.history() != expected {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await;
        assert!(
            settled.is_ok(),
            "history {:?} never became {:?}",
            back_stack.history(),
            expected
        );
    }

    fn visit(f: &Fixture, screen: Screen) {
        f.engine.submit(Transition::to(screen));
    }

    #[tokio::test]
    async fn records_emitted_states_in_order() {
        let f = fixture(Screen::Pickup);
        visit(&f, Screen::Destination("Home"));
        visit(&f, Screen::Vehicle);

        wait_for_history(
            &f.back_stack,
            &[Screen::Pickup, Screen::Destination("Home"), Screen::Vehicle],
        )
        .await;
        assert!(f.back_stack.can_go_back());
    }

    #[tokio::test]
    async fn revisit_collapses_to_latest_copy() {
        let f = fixture(Screen::Pickup);
        visit(&f, Screen::Destination("Home"));
        visit(&f, Screen::Vehicle);
        visit(&f, Screen::Pickup);

        wait_for_history(&f.back_stack, &[Screen::Pickup]).await;
        assert_eq!(f.back_stack.len(), 1);
    }

    #[tokio::test]
    async fn back_navigates_to_previous_entry() {
        let f = fixture(Screen::Pickup);
        visit(&f, Screen::Destination("Home"));
        wait_for_history(&f.back_stack, &[Screen::Pickup, Screen::Destination("Home")]).await;

        let outcome = f.back_stack.back(|| panic!("history is not empty"));

        assert_eq!(outcome, BackOutcome::Navigated(Screen::Pickup));
        wait_for_history(&f.back_stack, &[Screen::Pickup]).await;
        assert_eq!(f.engine.current_state(), Some(Screen::Pickup));
        let log = f.engine.recent_transitions();
        assert_eq!(log.last().map(|r| r.label.as_str()), Some("back"));
    }

    #[tokio::test]
    async fn back_disabled_state_blocks_navigation() {
        let f = fixture(Screen::Pickup);
        visit(&f, Screen::Searching);
        wait_for_history(&f.back_stack, &[Screen::Pickup, Screen::Searching]).await;
        let applied_before = f.engine.recent_transitions().len();

        let empty_calls = AtomicUsize::new(0);
        let outcome = f.back_stack.back(|| {
            empty_calls.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(outcome, BackOutcome::Disabled);
        assert_eq!(empty_calls.load(Ordering::SeqCst), 0);
        assert!(!f.back_stack.can_go_back());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(f.engine.recent_transitions().len(), applied_before);
        assert_eq!(f.engine.current_state(), Some(Screen::Searching));
        assert_eq!(f.back_stack.len(), 2);
    }

    #[tokio::test]
    async fn single_entry_invokes_on_empty_once() {
        let f = fixture(Screen::Pickup);
        wait_for_history(&f.back_stack, &[Screen::Pickup]).await;

        let empty_calls = AtomicUsize::new(0);
        let outcome = f.back_stack.back(|| {
            empty_calls.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(outcome, BackOutcome::Empty);
        assert_eq!(empty_calls.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(f.engine.recent_transitions().is_empty());
        assert_eq!(f.back_stack.history(), vec![Screen::Pickup]);
    }

    #[tokio::test]
    async fn clear_stops_deduplication_against_old_entries() {
        let f = fixture(Screen::Pickup);
        visit(&f, Screen::Destination("Home"));
        visit(&f, Screen::Vehicle);
        wait_for_history(
            &f.back_stack,
            &[Screen::Pickup, Screen::Destination("Home"), Screen::Vehicle],
        )
        .await;

        f.back_stack.clear();
        assert!(f.back_stack.is_empty());

        visit(&f, Screen::Destination("Work"));
        wait_for_history(&f.back_stack, &[Screen::Destination("Work")]).await;
    }

    #[tokio::test]
    async fn back_without_engine_is_detached() {
        let f = fixture(Screen::Pickup);
        visit(&f, Screen::Vehicle);
        wait_for_history(&f.back_stack, &[Screen::Pickup, Screen::Vehicle]).await;

        let Fixture {
            engine,
            back_stack,
            _following,
            _worker,
        } = f;
        drop(_following);

        assert!(!back_stack.is_following());
        assert_eq!(back_stack.back(|| {}), BackOutcome::Detached);
        assert_eq!(back_stack.len(), 2);

        engine.submit(Transition::to(Screen::Destination("Gym")));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(back_stack.len(), 2);
    }

    #[tokio::test]
    async fn following_a_new_engine_replaces_the_old_one() {
        let f = fixture(Screen::Pickup);
        wait_for_history(&f.back_stack, &[Screen::Pickup]).await;

        let second = StateEngine::new();
        let _second_following = f.back_stack.follow(&second);
        second.initialize(Screen::Vehicle);
        wait_for_history(&f.back_stack, &[Screen::Pickup, Screen::Vehicle]).await;

        f.engine.submit(Transition::to(Screen::Searching));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(f.back_stack.history(), vec![Screen::Pickup, Screen::Vehicle]);
        assert!(f.back_stack.is_following());
    }

    fn screens() -> (StateEngine<Screen>, WorkflowBackStack<Screen>) {
        let engine = StateEngine::new();
        let back_stack = WorkflowBackStack::new(
            |a: &Screen, b: &Screen| discriminant(a) == discriminant(b),
            |s: &Screen| matches!(s, Screen::Searching),
        );
        (engine, back_stack)
    }

    #[test]
    fn history_is_current_as_soon_as_state_is_published() {
        let (engine, back_stack) = screens();
        let _following = back_stack.follow(&engine);

        engine.initialize(Screen::Pickup);
        engine.initialize(Screen::Destination("Home"));
        engine.initialize(Screen::Vehicle);

        assert_eq!(back_stack.top(), engine.current_state());
        assert_eq!(
            back_stack.back(|| panic!("history has three entries")),
            BackOutcome::Navigated(Screen::Destination("Home"))
        );
        assert_eq!(
            back_stack.history(),
            vec![Screen::Pickup, Screen::Destination("Home")]
        );
    }

    #[test]
    fn follow_replays_latest_state_without_a_runtime() {
        let (engine, back_stack) = screens();
        engine.initialize(Screen::Vehicle);

        let following = back_stack.follow(&engine);

        assert_eq!(back_stack.history(), vec![Screen::Vehicle]);
        assert!(back_stack.is_following());

        following.stop();
        engine.initialize(Screen::Pickup);
        assert!(!back_stack.is_following());
        assert_eq!(back_stack.history(), vec![Screen::Vehicle]);
    }

    #[tokio::test]
    async fn back_right_after_observing_a_state_targets_the_previous_one() {
        let f = fixture(Screen::Pickup);
        let mut states = f.engine.observe_current_state();
        assert_eq!(states.next_state().await, Some(Screen::Pickup));

        visit(&f, Screen::Destination("Home"));
        visit(&f, Screen::Vehicle);
        assert_eq!(states.next_state().await, Some(Screen::Destination("Home")));
        assert_eq!(states.next_state().await, Some(Screen::Vehicle));

        assert_eq!(
            f.back_stack.back(|| {}),
            BackOutcome::Navigated(Screen::Destination("Home"))
        );
        assert_eq!(states.next_state().await, Some(Screen::Destination("Home")));
    }

    #[test]
    fn stale_handle_does_not_detach_newer_follow() {
        let (first, back_stack) = screens();
        let second = StateEngine::new();
        let stale = back_stack.follow(&first);
        let _current = back_stack.follow(&second);

        drop(stale);
        second.initialize(Screen::Pickup);

        assert!(back_stack.is_following());
        assert_eq!(back_stack.history(), vec![Screen::Pickup]);
    }
}
