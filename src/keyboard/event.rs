//! Raw key events, the key source contract, and the polling source

use super::KeyCode;
use device_query::{DeviceQuery, DeviceState};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// Modifier state in effect when a key went down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Either shift key held
    pub shift: bool,
    /// Caps lock engaged
    pub caps_lock: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        caps_lock: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        caps_lock: false,
    };
}

/// A single key press as delivered by a key source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    /// The key code
    pub key: KeyCode,
    /// Modifiers held at press time
    pub modifiers: Modifiers,
    /// Character the source resolved itself, if it knows one
    pub text: Option<char>,
}

impl RawKeyEvent {
    pub fn new(key: KeyCode, modifiers: Modifiers) -> Self {
        Self {
            key,
            modifiers,
            text: None,
        }
    }

    /// A press with no modifiers held
    pub fn plain(key: KeyCode) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    /// A press whose character is already known
    pub fn with_text(key: KeyCode, text: char) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
            text: Some(text),
        }
    }
}

/// Tracks shift and caps-lock across a stream of presses and releases.
///
/// Caps lock is assumed off when tracking begins.
#[derive(Debug, Clone, Default)]
pub struct ModifierTracker {
    left_shift: bool,
    right_shift: bool,
    caps_lock: bool,
}

impl ModifierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key going down and return the modifiers in effect for it
    pub fn press(&mut self, key: KeyCode) -> Modifiers {
        match key {
            KeyCode::LEFT_SHIFT => self.left_shift = true,
            KeyCode::RIGHT_SHIFT => self.right_shift = true,
            KeyCode::CAPS_LOCK => self.caps_lock = !self.caps_lock,
            _ => {}
        }
        self.current()
    }

    /// Record a key going up
    pub fn release(&mut self, key: KeyCode) {
        match key {
            KeyCode::LEFT_SHIFT => self.left_shift = false,
            KeyCode::RIGHT_SHIFT => self.right_shift = false,
            _ => {}
        }
    }

    pub fn current(&self) -> Modifiers {
        Modifiers {
            shift: self.left_shift || self.right_shift,
            caps_lock: self.caps_lock,
        }
    }
}

/// Error type for key source operations
#[derive(Debug, Error)]
pub enum SourceError {
    /// No keyboard devices found
    #[error("No keyboard devices found")]
    NoDevices,
    /// Permission denied accessing a device
    #[error("Permission denied accessing {0}")]
    PermissionDenied(String),
    /// The OS hook cannot be installed in this environment
    #[error("Key source unavailable: {0}")]
    Unavailable(String),
    /// subscribe() called on a source that is already delivering
    #[error("Key source is already subscribed")]
    AlreadySubscribed,
    /// IO error
    #[error("IO error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for SourceError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::PermissionDenied {
            SourceError::PermissionDenied("device".to_string())
        } else {
            SourceError::Io(e)
        }
    }
}

/// Something that produces raw key presses.
///
/// A subscribed source sends presses on the given channel from its own
/// thread. Dropping every clone of the sender ends the event sequence, which
/// the recorder treats as the source going away.
pub trait KeySource: Send {
    /// Short name for logs and status lines
    fn name(&self) -> &'static str;

    /// Start delivering key presses on `sink`
    fn subscribe(&mut self, sink: mpsc::Sender<RawKeyEvent>) -> Result<(), SourceError>;

    /// Stop delivering. Once this returns the sink has been released.
    fn unsubscribe(&mut self);
}

/// Keyboard source that polls the held-key set through `device_query`
pub struct PollingSource {
    interval: Duration,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl PollingSource {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Get the polling interval
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl KeySource for PollingSource {
    fn name(&self) -> &'static str {
        "device_query"
    }

    fn subscribe(&mut self, sink: mpsc::Sender<RawKeyEvent>) -> Result<(), SourceError> {
        if self.worker.is_some() {
            return Err(SourceError::AlreadySubscribed);
        }

        // device_query talks to X11 on Linux and aborts without a display
        #[cfg(target_os = "linux")]
        if std::env::var_os("DISPLAY").is_none() {
            return Err(SourceError::Unavailable(
                "no X11 DISPLAY for device_query".to_string(),
            ));
        }

        let stop = Arc::new(AtomicBool::new(false));
        self.stop = Arc::clone(&stop);
        let interval = self.interval;

        let worker = thread::Builder::new()
            .name("key-poll".into())
            .spawn(move || poll_keys(interval, &stop, sink))
            .map_err(SourceError::Io)?;

        self.worker = Some(worker);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("key-poll thread panicked");
            }
        }
    }
}

impl Drop for PollingSource {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

fn poll_keys(interval: Duration, stop: &AtomicBool, sink: mpsc::Sender<RawKeyEvent>) {
    let device_state = DeviceState::new();
    let mut tracker = ModifierTracker::new();
    let mut last_keys: Vec<device_query::Keycode> = Vec::new();

    while !stop.load(Ordering::SeqCst) {
        let current_keys = device_state.get_keys();

        for key in &last_keys {
            if !current_keys.contains(key) {
                tracker.release(KeyCode::from(*key));
            }
        }

        // Shift keys first so a shift+letter chord seen in one poll still
        // resolves to the shifted character
        let mut pressed: Vec<KeyCode> = current_keys
            .iter()
            .filter(|key| !last_keys.contains(*key))
            .map(|key| KeyCode::from(*key))
            .collect();
        pressed.sort_by_key(|code| !code.is_shift());

        for code in pressed {
            let modifiers = tracker.press(code);
            if sink.send(RawKeyEvent::new(code, modifiers)).is_err() {
                return;
            }
        }

        last_keys = current_keys;
        thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_reports_shift_while_held() {
        let mut tracker = ModifierTracker::new();
        assert_eq!(tracker.press(KeyCode(30)), Modifiers::NONE);

        tracker.press(KeyCode::LEFT_SHIFT);
        assert_eq!(tracker.press(KeyCode(30)), Modifiers::SHIFT);

        tracker.release(KeyCode::LEFT_SHIFT);
        assert_eq!(tracker.press(KeyCode(30)), Modifiers::NONE);
    }

    #[test]
    fn tracker_needs_both_shifts_released() {
        let mut tracker = ModifierTracker::new();
        tracker.press(KeyCode::LEFT_SHIFT);
        tracker.press(KeyCode::RIGHT_SHIFT);
        tracker.release(KeyCode::LEFT_SHIFT);
        assert!(tracker.current().shift);
        tracker.release(KeyCode::RIGHT_SHIFT);
        assert!(!tracker.current().shift);
    }

    #[test]
    fn tracker_toggles_caps_lock_on_press() {
        let mut tracker = ModifierTracker::new();
        assert!(tracker.press(KeyCode::CAPS_LOCK).caps_lock);
        tracker.release(KeyCode::CAPS_LOCK);
        assert!(tracker.current().caps_lock);
        assert!(!tracker.press(KeyCode::CAPS_LOCK).caps_lock);
    }

    #[test]
    fn permission_denied_io_error_maps_to_variant() {
        let err = SourceError::from(io::Error::new(io::ErrorKind::PermissionDenied, "nope"));
        assert!(matches!(err, SourceError::PermissionDenied(_)));

        let err = SourceError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(matches!(err, SourceError::Io(_)));
    }

    #[test]
    fn polling_source_unsubscribe_without_subscribe_is_harmless() {
        let mut source = PollingSource::new(Duration::from_millis(10));
        source.unsubscribe();
        assert_eq!(source.interval(), Duration::from_millis(10));
    }
}
