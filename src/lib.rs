//! Keystroke Tally - counts how often each key is pressed
//!
//! Presses are captured system-wide, reduced to a stable key identifier,
//! counted, and saved to a JSON file after every press. Only the counts are
//! kept, never the typed text.

pub mod config;
pub mod keyboard;
pub mod logging;
pub mod report;
pub mod tally;
pub mod ui;

pub use config::Config;
pub use tally::Recorder;
