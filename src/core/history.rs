//! Navigation history for workflow back-stacks.
//!
//! Holds the ordered record of visited states and implements the
//! collapse-on-revisit rule: arriving at a state that matches an earlier
//! entry truncates the history back to that entry instead of appending a
//! duplicate path.

use serde::{Deserialize, Serialize};

/// Ordered history of visited states, oldest first.
///
/// Entries are addressed by index rather than treated as a strict stack
/// because a revisit truncates at an arbitrary depth.
///
/// # Example
///
/// ```rust
/// use stepwise::core::StateHistory;
///
/// let same = |a: &&str, b: &&str| a == b;
/// let mut history = StateHistory::new();
///
/// history.record("A", same);
/// history.record("B", same);
/// history.record("C", same);
/// assert_eq!(history.len(), 3);
///
/// // Revisiting A undoes the excursion through B and C.
/// let collapsed = history.record("A", same);
/// assert_eq!(collapsed, 3);
/// assert_eq!(history.entries(), &["A"]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateHistory<S> {
    entries: Vec<S>,
}

impl<S> Default for StateHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateHistory<S> {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record a newly visited state.
    ///
    /// The history is scanned from the most recent entry downward with
    /// `same`. When an entry at depth `k` matches, `k + 1` entries are
    /// removed before `state` is pushed, so the new state replaces the
    /// revisited entry and everything recorded after it.
    ///
    /// Returns the number of entries removed by the collapse.
    pub fn record<F>(&mut self, state: S, same: F) -> usize
    where
        F: Fn(&S, &S) -> bool,
    {
        let collapsed = match self.entries.iter().rposition(|entry| same(entry, &state)) {
            Some(index) => {
                let removed = self.entries.len() - index;
                self.entries.truncate(index);
                removed
            }
            None => 0,
        };
        self.entries.push(state);
        collapsed
    }

    /// Remove and return the most recent entry.
    pub fn pop(&mut self) -> Option<S> {
        self.entries.pop()
    }

    /// Most recent entry.
    pub fn top(&self) -> Option<&S> {
        self.entries.last()
    }

    /// Drop every entry. Later records are not compared against anything
    /// recorded before the clear.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[S] {
        &self.entries
    }
}
