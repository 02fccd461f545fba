//! Bounded record of what the engine did with each transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// What happened to a dequeued transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionOutcome {
    /// The produced state became current.
    Applied,
    /// The precondition did not hold; the body never ran.
    Rejected,
    /// The body ran and failed.
    Failed { reason: String },
}

/// Record of a single dequeued transition.
///
/// For rejected and failed transitions `to` equals `from`, since the
/// current state was republished unchanged.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionRecord<S> {
    /// Position in the engine's processing order, starting at 1.
    pub sequence: u64,
    pub label: String,
    pub from: S,
    pub to: S,
    pub outcome: TransitionOutcome,
    pub timestamp: DateTime<Utc>,
}

impl<S> TransitionRecord<S> {
    /// Whether the transition changed the state.
    pub fn is_applied(&self) -> bool {
        self.outcome == TransitionOutcome::Applied
    }
}

/// Ring of the most recent transition records, oldest first.
///
/// Once `capacity` records are held, each new record evicts the oldest.
/// Sequence numbers keep counting across evictions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionLog<S> {
    records: VecDeque<TransitionRecord<S>>,
    capacity: usize,
    next_sequence: u64,
}

impl<S> TransitionLog<S> {
    /// Create an empty log keeping at most `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            next_sequence: 1,
        }
    }

    /// Append a record, evicting the oldest one when full.
    ///
    /// Returns the sequence number assigned to the record.
    pub fn record(
        &mut self,
        label: impl Into<String>,
        from: S,
        to: S,
        outcome: TransitionOutcome,
    ) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        if self.capacity == 0 {
            return sequence;
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(TransitionRecord {
            sequence,
            label: label.into(),
            from,
            to,
            outcome,
            timestamp: Utc::now(),
        });
        sequence
    }

    /// Records oldest first.
    pub fn records(&self) -> impl Iterator<Item = &TransitionRecord<S>> {
        self.records.iter()
    }

    /// Most recent record.
    pub fn last(&self) -> Option<&TransitionRecord<S>> {
        self.records.back()
    }

    /// States the engine moved through, starting from the `from` of the
    /// oldest retained applied record. Rejected and failed records are
    /// skipped.
    pub fn path(&self) -> Vec<&S> {
        let mut applied = self.records.iter().filter(|r| r.is_applied()).peekable();
        let mut path = Vec::new();
        if let Some(first) = applied.peek().copied() {
            path.push(&first.from);
        }
        for record in applied {
            path.push(&record.to);
        }
        path
    }

    /// Time between the oldest and newest retained records.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.records.front()?, self.records.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    /// Number of kept records with an `Applied` outcome.
    pub fn applied_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_applied()).count()
    }

    /// Number of kept records that were rejected or failed.
    pub fn failed_count(&self) -> usize {
        self.records.len() - self.applied_count()
    }

    /// Number of kept records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are kept.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum number of records kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum Phase {
        One,
        Two,
        Three,
    }

    #[test]
    fn new_log_is_empty() {
        let log: TransitionLog<Phase> = TransitionLog::with_capacity(4);
        assert!(log.is_empty());
        assert!(log.path().is_empty());
        assert!(log.duration().is_none());
    }

    #[test]
    fn path_follows_applied_records() {
        let mut log = TransitionLog::with_capacity(8);
        log.record("advance", Phase::One, Phase::Two, TransitionOutcome::Applied);
        log.record("skip", Phase::Two, Phase::Two, TransitionOutcome::Rejected);
        log.record("advance", Phase::Two, Phase::Three, TransitionOutcome::Applied);

        assert_eq!(log.path(), vec![&Phase::One, &Phase::Two, &Phase::Three]);
        assert_eq!(log.applied_count(), 2);
        assert_eq!(log.failed_count(), 1);
    }

    #[test]
    fn full_log_evicts_oldest() {
        let mut log = TransitionLog::with_capacity(2);
        log.record("a", Phase::One, Phase::Two, TransitionOutcome::Applied);
        log.record("b", Phase::Two, Phase::Three, TransitionOutcome::Applied);
        let sequence = log.record("c", Phase::Three, Phase::One, TransitionOutcome::Applied);

        assert_eq!(sequence, 3);
        assert_eq!(log.len(), 2);
        let labels: Vec<&str> = log.records().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "c"]);
    }

    #[test]
    fn zero_capacity_still_counts_sequence() {
        let mut log = TransitionLog::with_capacity(0);
        assert_eq!(
            log.record("a", Phase::One, Phase::Two, TransitionOutcome::Applied),
            1
        );
        assert_eq!(
            log.record("b", Phase::Two, Phase::Three, TransitionOutcome::Applied),
            2
        );
        assert!(log.is_empty());
    }

    #[test]
    fn single_record_has_duration_zero() {
        let mut log = TransitionLog::with_capacity(2);
        log.record("a", Phase::One, Phase::Two, TransitionOutcome::Applied);

        assert_eq!(log.duration(), Some(Duration::from_secs(0)));
    }

    #[test]
    fn failure_reason_is_recorded() {
        let mut log = TransitionLog::with_capacity(2);
        log.record(
            "quote",
            Phase::One,
            Phase::One,
            TransitionOutcome::Failed {
                reason: "timeout".into(),
            },
        );

        let last = log.last().unwrap();
        assert!(!last.is_applied());
        assert_eq!(last.from, last.to);
        assert_eq!(
            last.outcome,
            TransitionOutcome::Failed {
                reason: "timeout".into()
            }
        );
    }

    #[test]
    fn log_serializes_correctly() {
        let mut log = TransitionLog::with_capacity(4);
        log.record("advance", Phase::One, Phase::Two, TransitionOutcome::Applied);

        let json = serde_json::to_string(&log).unwrap();
        let deserialized: TransitionLog<Phase> = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.len(), 1);
        assert_eq!(deserialized.capacity(), 4);
        assert_eq!(deserialized.path(), log.path());
    }
}
