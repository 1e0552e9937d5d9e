//! Change notification toward consumers
//!
//! Notifications carry no payload. Observers react by reading a fresh
//! snapshot, so receiving the same notification twice is harmless.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Mutex, PoisonError};

type Observer = Arc<dyn Fn() + Send + Sync>;

/// Fan-out of "counts changed" to registered observers
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    observers: Arc<Mutex<Vec<Observer>>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback, run on the capture thread after each change
    pub fn on_change(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(callback));
    }

    /// Register a channel that receives `()` per change
    pub fn subscribe(&self) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel();
        self.on_change(move || {
            let _ = tx.send(());
        });
        rx
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Notify every observer. A panicking observer is logged and skipped.
    pub fn emit(&self) {
        // Call outside the lock so observers may register others
        let observers: Vec<Observer> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for observer in observers {
            if panic::catch_unwind(AssertUnwindSafe(|| (*observer)())).is_err() {
                log::error!("change observer panicked");
            }
        }
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("observers", &self.observer_count())
            .finish()
    }
}
