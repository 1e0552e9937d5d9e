//! Keyboard capture: key sources, key naming and device information

mod event;
#[cfg(target_os = "linux")]
mod evdev_listener;
pub mod keymap;
pub mod model;
pub mod normalize;
mod scripted;

pub use event::{KeySource, ModifierTracker, Modifiers, PollingSource, RawKeyEvent, SourceError};
#[cfg(target_os = "linux")]
pub use evdev_listener::{describe_scan, evdev_status, EvdevSource};
pub use keymap::{get_key_info, KeyCode, KeyInfo, KEYMAP};
pub use normalize::normalize;
pub use scripted::{ScriptedFeed, ScriptedSource};

use crate::config::{CaptureBackend, CaptureConfig};

/// Build the key source selected by the capture settings
pub fn open_source(capture: &CaptureConfig) -> Box<dyn KeySource> {
    let interval = capture.poll_interval();

    #[cfg(target_os = "linux")]
    {
        match capture.backend {
            CaptureBackend::Evdev => {
                return Box::new(EvdevSource::new(interval, capture.count_repeats));
            }
            CaptureBackend::Poll => {}
            CaptureBackend::Auto => match EvdevSource::scan(interval, capture.count_repeats) {
                Ok(source) => return Box::new(source),
                Err(e) => {
                    log::info!("evdev: {}; falling back to polling", describe_scan(&Err(e)));
                }
            },
        }
    }

    #[cfg(not(target_os = "linux"))]
    if capture.backend == CaptureBackend::Evdev {
        log::warn!("evdev backend is Linux-only; using polling");
    }

    Box::new(PollingSource::new(interval))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_backend_always_polls() {
        let capture = CaptureConfig {
            backend: CaptureBackend::Poll,
            ..CaptureConfig::default()
        };
        let source = open_source(&capture);
        assert_eq!(source.name(), "device_query");
    }
}
