//! State engine that applies transitions one at a time.

use crate::core::State;
use crate::effects::log::{TransitionLog, TransitionOutcome};
use crate::effects::stream::{CurrentValue, Observer, StateStream, DEFAULT_STREAM_CAPACITY};
use crate::effects::transition::{Transition, TransitionError};
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Label used when none is configured.
pub const DEFAULT_LABEL: &str = "engine";

/// Number of transition records kept by default.
pub const DEFAULT_LOG_CAPACITY: usize = 32;

/// Errors returned by engine lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine '{0}' already has a running worker")]
    AlreadyRunning(String),

    #[error("No Tokio runtime available to run the worker")]
    NoRuntime,
}

struct Shared<S: State> {
    id: Uuid,
    label: String,
    current: Mutex<CurrentValue<S>>,
    queue: mpsc::UnboundedSender<Transition<S>>,
    /// Receiving end of the queue while no worker owns it.
    idle_queue: Mutex<Option<mpsc::UnboundedReceiver<Transition<S>>>>,
    initialized: Notify,
    log: Mutex<TransitionLog<S>>,
}

/// Holds one current state and serializes every transition against it.
///
/// Transitions may be submitted from any thread at any time; a single
/// worker task applies them strictly in submission order, waiting for each
/// asynchronous operation to finish before dequeuing the next. A failed or
/// rejected transition leaves the state as it was and republishes it.
///
/// Cloning the engine yields another handle to the same state and queue.
///
/// # Example
///
/// ```rust
/// use stepwise::core::State;
/// use stepwise::effects::{StateEngine, Transition};
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum Shift {
///     Offline,
///     Online,
/// }
///
/// impl State for Shift {
///     fn name(&self) -> &str {
///         match self {
///             Self::Offline => "Offline",
///             Self::Online => "Online",
///         }
///     }
/// }
///
/// let runtime = tokio::runtime::Runtime::new().unwrap();
/// runtime.block_on(async {
///     let engine = StateEngine::new();
///     engine.initialize(Shift::Offline);
///     let worker = engine.start().unwrap();
///
///     let mut states = engine.observe_current_state();
///     assert_eq!(states.next_state().await, Some(Shift::Offline));
///
///     engine.submit(Transition::to(Shift::Online).when(|s| *s == Shift::Offline));
///     assert_eq!(states.next_state().await, Some(Shift::Online));
///
///     worker.stop().await;
/// });
/// ```
pub struct StateEngine<S: State> {
    shared: Arc<Shared<S>>,
}

impl<S: State> Clone for StateEngine<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: State> Default for StateEngine<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateEngine<S> {
    /// Create an engine with no current state and no running worker.
    pub fn new() -> Self {
        Self::with_settings(
            DEFAULT_LABEL.to_string(),
            DEFAULT_LOG_CAPACITY,
            DEFAULT_STREAM_CAPACITY,
        )
    }

    /// Both capacities must be non-zero; the builder checks this.
    pub(crate) fn with_settings(label: String, log_capacity: usize, stream_capacity: usize) -> Self {
        let (queue, receiver) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                label,
                current: Mutex::new(CurrentValue::new(stream_capacity)),
                queue,
                idle_queue: Mutex::new(Some(receiver)),
                initialized: Notify::new(),
                log: Mutex::new(TransitionLog::with_capacity(log_capacity)),
            }),
        }
    }

    /// Unique id attached to this engine's log events.
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Human-readable name attached to this engine's log events.
    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Set the current state directly and publish it.
    ///
    /// Bypasses the transition queue. Calling it again overwrites the
    /// current state, which is how a workflow is re-entered.
    pub fn initialize(&self, state: S) {
        debug!(
            engine = %self.shared.label,
            engine_id = %self.shared.id,
            state = state.name(),
            "Engine initialized"
        );
        self.shared.current.lock().publish(state);
        self.shared.initialized.notify_one();
    }

    /// Queue a transition. Never blocks; the result shows up on the
    /// current-state stream once the worker gets to it.
    pub fn submit(&self, transition: Transition<S>) {
        trace!(
            engine = %self.shared.label,
            transition = transition.label(),
            "Transition queued"
        );
        if self.shared.queue.send(transition).is_err() {
            warn!(
                engine = %self.shared.label,
                engine_id = %self.shared.id,
                "Transition queue closed; request dropped"
            );
        }
    }

    /// Queue an asynchronous transition built from `f`.
    pub fn submit_async<F, Fut>(&self, f: F)
    where
        F: FnOnce(S) -> Fut + Send + 'static,
        Fut: Future<Output = Result<S, TransitionError>> + Send + 'static,
    {
        self.submit(Transition::asynchronous(f));
    }

    /// Start the worker that drains the queue.
    ///
    /// Must be called from within a Tokio runtime. Transitions queued
    /// before the engine is initialized wait until it is.
    pub fn start(&self) -> Result<WorkerHandle, EngineError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        let queue = self
            .shared
            .idle_queue
            .lock()
            .take()
            .ok_or_else(|| EngineError::AlreadyRunning(self.shared.label.clone()))?;

        let lease = QueueLease {
            shared: Arc::clone(&self.shared),
            queue,
        };
        let (stop, stop_rx) = watch::channel(false);
        let task = runtime.spawn(run_worker(lease, stop_rx));

        Ok(WorkerHandle {
            stop,
            task: Some(task),
        })
    }

    /// Whether a worker currently owns the queue.
    pub fn is_running(&self) -> bool {
        self.shared.idle_queue.lock().is_none()
    }

    /// Latest applied or initialized state.
    pub fn current_state(&self) -> Option<S> {
        self.shared.current.lock().latest().cloned()
    }

    /// Stream of states: the latest one first (if any), then the states
    /// the engine publishes afterwards, in order.
    ///
    /// Each stream buffers at most the configured stream capacity; one
    /// that falls further behind skips ahead to the oldest buffered state.
    pub fn observe_current_state(&self) -> StateStream<S> {
        self.shared.current.lock().subscribe()
    }

    /// Number of live [`StateStream`]s.
    pub fn subscriber_count(&self) -> usize {
        self.shared.current.lock().subscriber_count()
    }

    /// Run `observer` on the latest state now and on every later publish,
    /// synchronously and under the state lock. It must not call back into
    /// this engine.
    pub(crate) fn add_observer(&self, observer: Observer<S>) -> u64 {
        self.shared.current.lock().add_observer(observer)
    }

    pub(crate) fn remove_observer(&self, id: u64) -> bool {
        self.shared.current.lock().remove_observer(id)
    }

    /// Snapshot of the most recent transition records.
    pub fn recent_transitions(&self) -> TransitionLog<S> {
        self.shared.log.lock().clone()
    }
}

impl<S: State> Shared<S> {
    /// Apply one transition against `current` and publish the outcome.
    async fn apply(&self, transition: Transition<S>, current: S) {
        let label = transition.label().to_string();

        match run_isolated(transition, current.clone()).await {
            Ok(next) => {
                debug!(
                    engine = %self.label,
                    transition = %label,
                    from = current.name(),
                    to = next.name(),
                    "Transition applied"
                );
                self.log
                    .lock()
                    .record(label, current, next.clone(), TransitionOutcome::Applied);
                self.current.lock().publish(next);
            }
            Err(error) => {
                warn!(
                    engine = %self.label,
                    engine_id = %self.id,
                    transition = %label,
                    state = current.name(),
                    error = %error,
                    "Transition failed; keeping current state"
                );
                let outcome = if error.is_invalid_transition() {
                    TransitionOutcome::Rejected
                } else {
                    TransitionOutcome::Failed {
                        reason: error.to_string(),
                    }
                };
                self.log
                    .lock()
                    .record(label, current.clone(), current, outcome);
                self.current.lock().republish();
            }
        }
    }
}

/// Run a transition, turning a panic in its body into a failure.
async fn run_isolated<S: State>(transition: Transition<S>, current: S) -> Result<S, TransitionError> {
    let future = std::panic::catch_unwind(AssertUnwindSafe(|| transition.run(current)))
        .map_err(panic_error)?;

    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(panic_error)?
}

fn panic_error(payload: Box<dyn Any + Send>) -> TransitionError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    TransitionError::operation(format!("transition panicked: {message}"))
}

/// Worker's claim on the transition queue. Hands the queue back to the
/// engine when dropped, including when the runtime cancels the worker.
struct QueueLease<S: State> {
    shared: Arc<Shared<S>>,
    queue: mpsc::UnboundedReceiver<Transition<S>>,
}

impl<S: State> Drop for QueueLease<S> {
    fn drop(&mut self) {
        let (_, closed) = mpsc::unbounded_channel();
        let queue = std::mem::replace(&mut self.queue, closed);
        *self.shared.idle_queue.lock() = Some(queue);
    }
}

async fn run_worker<S: State>(mut lease: QueueLease<S>, mut stop: watch::Receiver<bool>) {
    let shared = Arc::clone(&lease.shared);
    info!(engine = %shared.label, engine_id = %shared.id, "Worker started");

    loop {
        if *stop.borrow() {
            break;
        }

        // Nothing is dequeued until there is a state to apply it to.
        let current = shared.current.lock().latest().cloned();
        let Some(current) = current else {
            tokio::select! {
                biased;
                _ = stop.changed() => break,
                _ = shared.initialized.notified() => {}
            }
            continue;
        };

        let transition = tokio::select! {
            biased;
            _ = stop.changed() => break,
            next = lease.queue.recv() => match next {
                Some(transition) => transition,
                None => break,
            },
        };

        // The state may have been re-initialized while waiting on the queue.
        let current = shared.current.lock().latest().cloned().unwrap_or(current);
        shared.apply(transition, current).await;
    }

    drop(lease);
    info!(engine = %shared.label, engine_id = %shared.id, "Worker stopped");
}

/// Handle to a running worker.
///
/// Dropping the handle tells the worker to stop dequeuing; a transition
/// already in flight still completes. Use [`WorkerHandle::stop`] to also
/// wait for the worker to exit.
#[derive(Debug)]
pub struct WorkerHandle {
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Stop the worker and wait until it has exited. Transitions still in
    /// the queue stay there for the next `start`.
    pub async fn stop(mut self) {
        self.stop.send_replace(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Worker task ended abnormally");
            }
        }
    }

    /// Whether the worker task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop.send_replace(true);
    }
}
