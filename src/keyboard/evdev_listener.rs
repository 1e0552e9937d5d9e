//! Raw evdev-based key source for Linux
//!
//! Reads `/dev/input/event*` directly, so it works without a display server
//! and sees every keyboard attached to the machine. Needs read access to the
//! device nodes (root, or membership of the `input` group).

use super::event::{KeySource, ModifierTracker, RawKeyEvent, SourceError};
use super::KeyCode;
use evdev::{Device, EventType, InputEvent, Key};
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use std::fs;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const KEY_RELEASE: i32 = 0;
const KEY_PRESS: i32 = 1;
const KEY_REPEAT: i32 = 2;

/// Whether a device exposes enough of a keyboard to be worth reading
fn is_keyboard(device: &Device) -> bool {
    device.supported_keys().is_some_and(|keys| {
        keys.contains(Key::KEY_A) && keys.contains(Key::KEY_Z) && keys.contains(Key::KEY_ENTER)
    })
}

/// Open every keyboard device under `/dev/input`
fn open_keyboard_devices() -> Result<Vec<(PathBuf, Device)>, SourceError> {
    let input_dir = Path::new("/dev/input");
    if !input_dir.exists() {
        return Err(SourceError::Unavailable(
            "/dev/input does not exist".to_string(),
        ));
    }

    let mut keyboards = Vec::new();
    let mut denied = Vec::new();

    for entry in fs::read_dir(input_dir)?.flatten() {
        let path = entry.path();
        let is_event_node = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("event"));
        if !is_event_node {
            continue;
        }

        match Device::open(&path) {
            Ok(device) if is_keyboard(&device) => keyboards.push((path, device)),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                denied.push(path.display().to_string());
            }
            Err(e) => log::debug!("skipping {}: {}", path.display(), e),
        }
    }

    if keyboards.is_empty() {
        if !denied.is_empty() {
            return Err(SourceError::PermissionDenied(format!(
                "{}. Try running with sudo or add user to 'input' group.",
                denied.join(", ")
            )));
        }
        return Err(SourceError::NoDevices);
    }

    // Deterministic order keeps logs stable across runs
    keyboards.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(keyboards)
}

fn set_nonblocking(device: &Device) -> io::Result<()> {
    let fd = device.as_raw_fd();
    let flags = OFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFL).map_err(io::Error::from)?);
    fcntl(fd, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK)).map_err(io::Error::from)?;
    Ok(())
}

/// Evdev-based key source
pub struct EvdevSource {
    interval: Duration,
    count_repeats: bool,
    device_paths: Vec<PathBuf>,
    /// Devices opened ahead of `subscribe`, consumed by it
    preopened: Vec<(PathBuf, Device)>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl EvdevSource {
    pub fn new(interval: Duration, count_repeats: bool) -> Self {
        Self {
            interval,
            count_repeats,
            device_paths: Vec::new(),
            preopened: Vec::new(),
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Open the keyboards now, so auto selection and `subscribe` share one scan
    pub fn scan(interval: Duration, count_repeats: bool) -> Result<Self, SourceError> {
        let mut source = Self::new(interval, count_repeats);
        source.preopened = open_keyboard_devices()?;
        Ok(source)
    }

    /// Device paths opened by the current subscription
    pub fn device_paths(&self) -> &[PathBuf] {
        &self.device_paths
    }
}

impl KeySource for EvdevSource {
    fn name(&self) -> &'static str {
        "evdev"
    }

    fn subscribe(&mut self, sink: mpsc::Sender<RawKeyEvent>) -> Result<(), SourceError> {
        if self.worker.is_some() {
            return Err(SourceError::AlreadySubscribed);
        }

        let opened = if self.preopened.is_empty() {
            open_keyboard_devices()?
        } else {
            std::mem::take(&mut self.preopened)
        };
        let mut devices = Vec::with_capacity(opened.len());
        self.device_paths.clear();
        for (path, device) in opened {
            set_nonblocking(&device)?;
            log::info!(
                "reading keyboard {} ({})",
                path.display(),
                device.name().unwrap_or("unnamed")
            );
            self.device_paths.push(path);
            devices.push(device);
        }

        let stop = Arc::new(AtomicBool::new(false));
        self.stop = Arc::clone(&stop);
        let reader = DeviceReader {
            devices,
            tracker: ModifierTracker::new(),
            count_repeats: self.count_repeats,
            interval: self.interval,
        };

        let worker = thread::Builder::new()
            .name("evdev-read".into())
            .spawn(move || reader.run(&stop, sink))
            .map_err(SourceError::Io)?;

        self.worker = Some(worker);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("evdev-read thread panicked");
            }
        }
    }
}

impl Drop for EvdevSource {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

struct DeviceReader {
    devices: Vec<Device>,
    tracker: ModifierTracker,
    count_repeats: bool,
    interval: Duration,
}

impl DeviceReader {
    fn run(mut self, stop: &AtomicBool, sink: mpsc::Sender<RawKeyEvent>) {
        while !stop.load(Ordering::SeqCst) {
            let mut index = 0;
            while index < self.devices.len() {
                let fetched: io::Result<Vec<InputEvent>> = self.devices[index]
                    .fetch_events()
                    .map(|events| events.collect());
                let events = match fetched {
                    Ok(events) => events,
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => Vec::new(),
                    Err(e) => {
                        // Unplugged keyboards report ENODEV here
                        log::warn!("dropping keyboard device: {}", e);
                        self.devices.swap_remove(index);
                        continue;
                    }
                };

                for event in events {
                    if let Some(raw) = self.translate(&event) {
                        if sink.send(raw).is_err() {
                            return;
                        }
                    }
                }
                index += 1;
            }

            if self.devices.is_empty() {
                log::error!("no keyboard devices left to read");
                return;
            }
            thread::sleep(self.interval);
        }
    }

    fn translate(&mut self, event: &InputEvent) -> Option<RawKeyEvent> {
        if event.event_type() != EventType::KEY {
            return None;
        }
        let key = KeyCode::new(event.code());
        match event.value() {
            KEY_PRESS => Some(RawKeyEvent::new(key, self.tracker.press(key))),
            KEY_REPEAT if self.count_repeats => Some(RawKeyEvent::new(key, self.tracker.current())),
            KEY_RELEASE => {
                self.tracker.release(key);
                None
            }
            _ => None,
        }
    }
}

/// Get a status message about evdev availability
pub fn evdev_status() -> String {
    describe_scan(&open_keyboard_devices().map(|devices| devices.len()))
}

/// Status text for the outcome of one device scan
pub fn describe_scan(scan: &Result<usize, SourceError>) -> String {
    match scan {
        Ok(count) => format!("{} keyboard device(s) found", count),
        Err(SourceError::NoDevices) => "No keyboard devices found".to_string(),
        Err(SourceError::PermissionDenied(_)) => {
            "Permission denied - run with sudo or add user to 'input' group".to_string()
        }
        Err(e) => format!("Error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evdev_status_is_never_empty() {
        // Depends on the machine; only the shape is checked
        let status = evdev_status();
        assert!(!status.is_empty());
    }

    #[test]
    fn scan_outcomes_are_described() {
        assert_eq!(describe_scan(&Ok(2)), "2 keyboard device(s) found");
        assert_eq!(
            describe_scan(&Err(SourceError::NoDevices)),
            "No keyboard devices found"
        );
        let denied = describe_scan(&Err(SourceError::PermissionDenied(
            "/dev/input/event3".to_string(),
        )));
        assert!(denied.starts_with("Permission denied"));
    }

    #[test]
    fn scan_agrees_with_status() {
        // One scan each; both must land on the same side
        let scanned = EvdevSource::scan(Duration::from_millis(5), false);
        let status = evdev_status();
        match scanned {
            Ok(source) => {
                assert!(status.ends_with("keyboard device(s) found"));
                assert!(!source.preopened.is_empty());
            }
            Err(e) => assert_eq!(describe_scan(&Err(e)), status),
        }
    }

    #[test]
    fn unsubscribe_before_subscribe_is_harmless() {
        let mut source = EvdevSource::new(Duration::from_millis(5), false);
        source.unsubscribe();
        assert!(source.device_paths().is_empty());
    }
}
