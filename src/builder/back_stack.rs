//! Builder for constructing workflow back-stacks.

use crate::builder::error::BuildError;
use crate::core::State;
use crate::navigation::{BackDisabledFn, SamenessFn, WorkflowBackStack};
use std::sync::Arc;

/// Builder for configuring a [`WorkflowBackStack`].
pub struct BackStackBuilder<S: State> {
    same: Option<SamenessFn<S>>,
    back_disabled: Option<BackDisabledFn<S>>,
}

impl<S: State> BackStackBuilder<S> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            same: None,
            back_disabled: None,
        }
    }

    /// Set the sameness comparer (required).
    pub fn same_when<F>(mut self, same: F) -> Self
    where
        F: Fn(&S, &S) -> bool + Send + Sync + 'static,
    {
        self.same = Some(Arc::new(same));
        self
    }

    /// Treat two states as the same step when `key` maps them to equal
    /// values, e.g. the step's name.
    pub fn same_by<K, F>(self, key: F) -> Self
    where
        K: PartialEq,
        F: Fn(&S) -> K + Send + Sync + 'static,
    {
        self.same_when(move |a, b| key(a) == key(b))
    }

    /// Block back navigation while the top entry matches (optional,
    /// defaults to never blocked).
    pub fn back_disabled_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.back_disabled = Some(Arc::new(predicate));
        self
    }

    /// Build the back-stack. A sameness comparer is required.
    pub fn build(self) -> Result<WorkflowBackStack<S>, BuildError> {
        let same = self.same.ok_or(BuildError::MissingSamenessComparer)?;
        let back_disabled: BackDisabledFn<S> = match self.back_disabled {
            Some(predicate) => predicate,
            None => Arc::new(|_: &S| false),
        };

        Ok(WorkflowBackStack::from_parts(same, back_disabled))
    }
}

impl<S: State> Default for BackStackBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
