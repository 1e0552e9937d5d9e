//! In-memory press counts
//!
//! [`CounterStore`] is the only handle that can change counts and is owned by
//! the capture loop. Everyone else reads through a [`CounterView`], which hands
//! out [`Snapshot`] copies taken under the same lock the writer uses, so a
//! snapshot never sees half of an update.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identifier to press count
pub type Counts = BTreeMap<String, u64>;

type Shared = Arc<Mutex<Counts>>;

fn lock(shared: &Shared) -> MutexGuard<'_, Counts> {
    // A panicking reader cannot leave the map half-written
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Writable counter store
#[derive(Debug, Default)]
pub struct CounterStore {
    counts: Shared,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from previously persisted counts
    pub fn from_counts(counts: Counts) -> Self {
        Self {
            counts: Arc::new(Mutex::new(counts)),
        }
    }

    /// Add one press for `id`, returning its new count
    pub fn increment(&mut self, id: &str) -> u64 {
        let mut counts = lock(&self.counts);
        match counts.get_mut(id) {
            Some(count) => {
                *count = count.saturating_add(1);
                *count
            }
            None => {
                counts.insert(id.to_string(), 1);
                1
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            counts: lock(&self.counts).clone(),
        }
    }

    /// Read-only handle sharing this store
    pub fn view(&self) -> CounterView {
        CounterView {
            counts: Arc::clone(&self.counts),
        }
    }
}

/// Read-only handle to a [`CounterStore`]
#[derive(Debug, Clone)]
pub struct CounterView {
    counts: Shared,
}

impl CounterView {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            counts: lock(&self.counts).clone(),
        }
    }

    /// Current count for one key without copying the whole map
    pub fn get(&self, id: &str) -> u64 {
        lock(&self.counts).get(id).copied().unwrap_or(0)
    }
}

/// Point-in-time copy of the counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    counts: Counts,
}

impl Snapshot {
    pub fn get(&self, id: &str) -> u64 {
        self.counts.get(id).copied().unwrap_or(0)
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.counts
            .values()
            .fold(0u64, |acc, count| acc.saturating_add(*count))
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(id, count)| (id.as_str(), *count))
    }

    /// Entries by count, highest first; ties in identifier order
    pub fn ranked(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// The `n` most pressed keys
    pub fn top(&self, n: usize) -> Vec<(&str, u64)> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }

    pub fn as_map(&self) -> &Counts {
        &self.counts
    }

    pub fn into_map(self) -> Counts {
        self.counts
    }
}

impl From<Counts> for Snapshot {
    fn from(counts: Counts) -> Self {
        Self { counts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn increment_creates_then_adds() {
        let mut store = CounterStore::new();
        assert_eq!(store.increment("a"), 1);
        assert_eq!(store.increment("a"), 2);
        assert_eq!(store.increment("space"), 1);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.get("a"), 2);
        assert_eq!(snapshot.get("space"), 1);
        assert_eq!(snapshot.get("missing"), 0);
        assert_eq!(snapshot.total(), 3);
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut store = CounterStore::new();
        store.increment("a");
        let before = store.snapshot();
        store.increment("a");
        assert_eq!(before.get("a"), 1);
        assert_eq!(store.snapshot().get("a"), 2);
    }

    #[test]
    fn view_sees_writer_updates() {
        let mut store = CounterStore::new();
        let view = store.view();
        store.increment("x");
        assert_eq!(view.get("x"), 1);
        assert_eq!(view.snapshot().total(), 1);
    }

    #[test]
    fn counts_saturate() {
        let mut counts = Counts::new();
        counts.insert("a".to_string(), u64::MAX);
        let mut store = CounterStore::from_counts(counts);
        assert_eq!(store.increment("a"), u64::MAX);
    }

    #[test]
    fn ranked_orders_by_count_then_name() {
        let mut store = CounterStore::new();
        for id in ["b", "a", "c", "c", "a", "c"] {
            store.increment(id);
        }
        let snapshot = store.snapshot();
        assert_eq!(snapshot.ranked(), vec![("c", 3), ("a", 2), ("b", 1)]);
        assert_eq!(snapshot.top(1), vec![("c", 3)]);
        assert_eq!(snapshot.top(10).len(), 3);
    }

    #[test]
    fn concurrent_readers_never_lose_increments() {
        let mut store = CounterStore::new();
        let view = store.view();

        let reader = thread::spawn(move || {
            let mut last = 0;
            for _ in 0..1000 {
                let total = view.snapshot().total();
                assert!(total >= last);
                last = total;
            }
        });

        for i in 0..1000 {
            store.increment(if i % 2 == 0 { "even" } else { "odd" });
        }
        reader.join().unwrap();

        assert_eq!(store.snapshot().total(), 1000);
    }

    #[test]
    fn snapshot_serializes_as_plain_map() {
        let snapshot = Snapshot::from(Counts::from([("a".to_string(), 2)]));
        assert_eq!(serde_json::to_string(&snapshot).unwrap(), r#"{"a":2}"#);
    }
}
