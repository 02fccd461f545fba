//! Current-state stream.
//!
//! Subscribers share one bounded broadcast ring. On subscribe the latest
//! value (if any) is yielded first, then every later publish in order. A
//! subscriber that falls more than the ring's capacity behind skips ahead
//! to the oldest value still buffered, so an idle stream never holds more
//! than that many states.
//!
//! Synchronous observers are called inside `publish` itself, before any
//! stream sees the value.

use futures::{FutureExt, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::trace;

/// Default number of states buffered for a slow stream subscriber.
pub const DEFAULT_STREAM_CAPACITY: usize = 64;

/// Receiving end of the current-state stream.
///
/// Yields `None` once the engine that produced it has been dropped.
pub struct StateStream<S> {
    replay: Option<S>,
    updates: BroadcastStream<S>,
}

impl<S: Clone + Send + 'static> StateStream<S> {
    /// Wait for the next published state.
    pub async fn next_state(&mut self) -> Option<S> {
        self.next().await
    }

    /// Take an already published state without waiting.
    pub fn try_next_state(&mut self) -> Option<S> {
        self.next().now_or_never().flatten()
    }
}

impl<S: Clone + Send + 'static> Stream for StateStream<S> {
    type Item = S;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S>> {
        if let Some(state) = self.replay.take() {
            return Poll::Ready(Some(state));
        }

        loop {
            match self.updates.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(state))) => return Poll::Ready(Some(state)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    trace!(skipped, "State stream lagged; skipping to oldest buffered state");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

// The replayed value is never pinned in place.
impl<S> Unpin for StateStream<S> {}

impl<S> std::fmt::Debug for StateStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStream")
            .field("has_replay", &self.replay.is_some())
            .finish()
    }
}

/// Callback run synchronously on every publish.
pub(crate) type Observer<S> = Box<dyn Fn(&S) + Send + Sync>;

/// Latest value, the synchronous observers and the broadcast ring that
/// feeds every stream.
///
/// Callers hold this behind one lock so that subscribing and publishing
/// never interleave: a new subscriber sees the replayed value followed by
/// exactly the publishes that happen after it.
pub(crate) struct CurrentValue<S> {
    latest: Option<S>,
    sender: broadcast::Sender<S>,
    observers: Vec<(u64, Observer<S>)>,
    next_observer: u64,
}

impl<S: Clone + Send + 'static> CurrentValue<S> {
    /// `capacity` must be non-zero.
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            latest: None,
            sender,
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    pub(crate) fn latest(&self) -> Option<&S> {
        self.latest.as_ref()
    }

    /// Store `state` as the latest value, run every observer on it, then
    /// forward it to the streams.
    pub(crate) fn publish(&mut self, state: S) {
        for (_, observer) in &self.observers {
            observer(&state);
        }
        // No live receivers is fine; the value is still kept as latest.
        let _ = self.sender.send(state.clone());
        self.latest = Some(state);
    }

    /// Forward the latest value again without changing it.
    pub(crate) fn republish(&mut self) {
        if let Some(state) = self.latest.clone() {
            self.publish(state);
        }
    }

    pub(crate) fn subscribe(&self) -> StateStream<S> {
        StateStream {
            replay: self.latest.clone(),
            updates: BroadcastStream::new(self.sender.subscribe()),
        }
    }

    /// Register an observer, replaying the latest value to it first.
    /// Returns the id used to remove it.
    pub(crate) fn add_observer(&mut self, observer: Observer<S>) -> u64 {
        if let Some(state) = &self.latest {
            observer(state);
        }
        let id = self.next_observer;
        self.next_observer += 1;
        self.observers.push((id, observer));
        id
    }

    pub(crate) fn remove_observer(&mut self, id: u64) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[cfg(test)]
    pub(crate) fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl<S> std::fmt::Debug for CurrentValue<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentValue")
            .field("has_latest", &self.latest.is_some())
            .field("subscribers", &self.sender.receiver_count())
            .field("observers", &self.observers.len())
            .finish()
    }
}
