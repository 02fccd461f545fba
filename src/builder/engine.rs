//! Builder for constructing state engines.

use crate::builder::error::BuildError;
use crate::core::State;
use crate::effects::{StateEngine, DEFAULT_LABEL, DEFAULT_LOG_CAPACITY, DEFAULT_STREAM_CAPACITY};

/// Builder for configuring a [`StateEngine`] with a fluent API.
pub struct EngineBuilder<S: State> {
    label: String,
    initial: Option<S>,
    require_initial: bool,
    log_capacity: usize,
    stream_capacity: usize,
}

impl<S: State> EngineBuilder<S> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            initial: None,
            require_initial: true,
            log_capacity: DEFAULT_LOG_CAPACITY,
            stream_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }

    /// Name used for this engine in logs.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the initial state (required unless `uninitialized` is called).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self.require_initial = true;
        self
    }

    /// Build without an initial state; the caller initializes later.
    pub fn uninitialized(mut self) -> Self {
        self.initial = None;
        self.require_initial = false;
        self
    }

    /// Number of transition records to keep.
    pub fn log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Number of states a slow [`StateStream`](crate::effects::StateStream)
    /// may fall behind before it skips ahead.
    pub fn stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity;
        self
    }

    /// Build the engine. The worker is not started.
    pub fn build(self) -> Result<StateEngine<S>, BuildError> {
        if self.label.trim().is_empty() {
            return Err(BuildError::EmptyLabel);
        }
        if self.log_capacity == 0 {
            return Err(BuildError::ZeroLogCapacity);
        }
        if self.stream_capacity == 0 {
            return Err(BuildError::ZeroStreamCapacity);
        }
        if self.require_initial && self.initial.is_none() {
            return Err(BuildError::MissingInitialState);
        }

        let engine = StateEngine::with_settings(self.label, self.log_capacity, self.stream_capacity);
        if let Some(initial) = self.initial {
            engine.initialize(initial);
        }
        Ok(engine)
    }
}

impl<S: State> Default for EngineBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug)]
    enum TestState {
        Idle,
        Busy,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Idle => "Idle",
                Self::Busy => "Busy",
            }
        }
    }

    #[test]
    fn builder_requires_initial_state() {
        let result = EngineBuilder::<TestState>::new().build();

        assert!(matches!(result, Err(BuildError::MissingInitialState)));
    }

    #[test]
    fn uninitialized_engine_has_no_state() {
        let engine = EngineBuilder::<TestState>::new()
            .uninitialized()
            .build()
            .unwrap();

        assert!(engine.current_state().is_none());
    }

    #[test]
    fn builder_rejects_zero_log_capacity() {
        let result = EngineBuilder::new()
            .initial(TestState::Idle)
            .log_capacity(0)
            .build();

        assert!(matches!(result, Err(BuildError::ZeroLogCapacity)));
    }

    #[test]
    fn builder_rejects_zero_stream_capacity() {
        let result = EngineBuilder::new()
            .initial(TestState::Idle)
            .stream_capacity(0)
            .build();

        assert!(matches!(result, Err(BuildError::ZeroStreamCapacity)));
    }

    #[test]
    fn builder_rejects_blank_label() {
        let result = EngineBuilder::new().initial(TestState::Idle).label("  ").build();

        assert!(matches!(result, Err(BuildError::EmptyLabel)));
    }

    #[test]
    fn fluent_api_builds_engine() {
        let engine = EngineBuilder::new()
            .label("driver-shift")
            .initial(TestState::Busy)
            .log_capacity(4)
            .build()
            .unwrap();

        assert_eq!(engine.label(), "driver-shift");
        assert_eq!(engine.current_state(), Some(TestState::Busy));
        assert_eq!(engine.recent_transitions().capacity(), 4);
        assert!(!engine.is_running());
    }
}
