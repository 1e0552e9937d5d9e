//! Counting, persistence and change notification

mod error;
mod notify;
mod persist;
mod recorder;
mod store;

pub use error::{PersistError, RecorderError};
pub use notify::ChangeNotifier;
pub use persist::{LoadOutcome, LoadStatus, PersistenceGateway};
pub use recorder::{Recorder, RecorderState, RecorderStatus, StopReason};
pub use store::{CounterStore, CounterView, Counts, Snapshot};
