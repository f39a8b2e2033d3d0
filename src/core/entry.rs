//! Comparator-keyed heap entries.
//!
//! `KeyedEntry` lets arbitrary payloads live in a `BinaryHeap` ordered by an
//! injected three-way comparison instead of the payload's own `Ord`.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Shared three-way comparison used to order queue payloads.
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Which end of the comparator's ordering a queue pops first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueOrder {
    /// Smallest entry first (earliest deadline first).
    #[default]
    Min,
    /// Largest entry first.
    Max,
}

/// A payload paired with the comparator that orders it.
///
/// Entries are immutable once built. `Ord` is implemented so that the entry
/// to pop first under the configured [`QueueOrder`] is the heap maximum.
pub struct KeyedEntry<T> {
    payload: T,
    comparator: Comparator<T>,
    order: QueueOrder,
}

impl<T> KeyedEntry<T> {
    /// Wrap `payload` with a comparator and pop order.
    pub fn new(payload: T, comparator: Comparator<T>, order: QueueOrder) -> Self {
        Self {
            payload,
            comparator,
            order,
        }
    }

    /// Borrow the wrapped payload.
    pub const fn payload(&self) -> &T {
        &self.payload
    }

    /// Unwrap the payload, discarding the comparator.
    pub fn into_payload(self) -> T {
        self.payload
    }

    // Payload order only; `Ord` applies the pop direction.
    fn compare_payload(&self, other: &Self) -> Ordering {
        (self.comparator)(&self.payload, &other.payload)
    }
}

impl<T> PartialEq for KeyedEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for KeyedEntry<T> {}

impl<T> PartialOrd for KeyedEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for KeyedEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse for min-first queues.
        match self.order {
            QueueOrder::Max => self.compare_payload(other),
            QueueOrder::Min => other.compare_payload(self),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for KeyedEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedEntry")
            .field("payload", &self.payload)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}
