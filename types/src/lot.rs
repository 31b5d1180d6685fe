//! Session-unique lot numbers.
//!
//! Submission is not idempotent on the remote side: reusing a lot number
//! within a session can create a duplicate batch. The source here guarantees
//! pairwise-distinct numbers for the lifetime of one client by seeding an
//! atomic counter from the clock at construction and incrementing from
//! there. Uniqueness across processes is the caller's concern.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Batch identifier of the form `lote{N}` where `N` is the lot number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    /// Prefix mandated by the remote schema for batch ids.
    pub const PREFIX: &'static str = "lote";

    #[must_use]
    pub fn from_lot_number(lot_number: u64) -> Self {
        Self(format!("{}{lot_number}", Self::PREFIX))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric lot number this id was derived from.
    #[must_use]
    pub fn lot_number(&self) -> Option<u64> {
        self.0.strip_prefix(Self::PREFIX)?.parse().ok()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monotonic lot number source, unique within one session.
#[derive(Debug)]
pub struct LotSequence {
    next: AtomicU64,
}

impl LotSequence {
    /// Seeds the sequence from the Unix clock so restarts within the same
    /// second are the only collision window across process lifetimes.
    #[must_use]
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(1);
        Self::starting_at(seed)
    }

    /// Starts the sequence at a fixed value. Used by tests for determinism.
    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Returns the next lot number. Never returns the same value twice for
    /// one instance.
    pub fn next_lot_number(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for LotSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{BatchId, LotSequence};

    #[test]
    fn batch_id_format_and_round_trip() {
        let id = BatchId::from_lot_number(42);
        assert_eq!(id.as_str(), "lote42");
        assert_eq!(id.lot_number(), Some(42));
    }

    #[test]
    fn lot_numbers_are_pairwise_distinct() {
        let seq = LotSequence::starting_at(7);
        let drawn: Vec<u64> = (0..100).map(|_| seq.next_lot_number()).collect();
        for (i, a) in drawn.iter().enumerate() {
            for b in &drawn[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn sequence_is_monotonic() {
        let seq = LotSequence::starting_at(1);
        assert_eq!(seq.next_lot_number(), 1);
        assert_eq!(seq.next_lot_number(), 2);
        assert_eq!(seq.next_lot_number(), 3);
    }
}
