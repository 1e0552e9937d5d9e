//! Main application state and logic

use crate::config::Config;
use crate::report::{self, StatsReport};
use crate::tally::{Recorder, RecorderStatus, Snapshot};
use super::theme::ThemeColors;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How long a status message stays visible
const STATUS_TTL: Duration = Duration::from_secs(3);

/// Current view/tab in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    Counts,
    Chart,
    Help,
}

impl AppView {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Counts => "Counts",
            Self::Chart => "Chart",
            Self::Help => "Help",
        }
    }

    pub fn all() -> &'static [AppView] {
        &[Self::Counts, Self::Chart, Self::Help]
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Counts => 0,
            Self::Chart => 1,
            Self::Help => 2,
        }
    }

    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Counts,
            1 => Self::Chart,
            _ => Self::Help,
        }
    }
}

/// Application running state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Running,
    Quitting,
}

/// Main application
pub struct App {
    /// Current view
    pub view: AppView,
    /// Application state
    pub state: AppState,
    /// Configuration
    pub config: Config,
    /// Active palette
    pub colors: ThemeColors,
    /// Detected keyboard name
    pub keyboard: String,
    /// Counts as of the last refresh
    pub snapshot: Snapshot,
    /// Recorder health as of the last refresh
    pub recorder_status: RecorderStatus,
    /// First visible row of the counts list
    pub scroll: usize,
    /// Directory exports are written to
    pub export_dir: PathBuf,
    recorder: Recorder,
    status_message: Option<String>,
    status_time: Option<Instant>,
}

impl App {
    pub fn new(config: Config, recorder: Recorder, keyboard: impl Into<String>) -> Self {
        let snapshot = recorder.snapshot();
        let recorder_status = recorder.status();
        Self {
            view: AppView::Counts,
            state: AppState::Running,
            colors: ThemeColors::from_theme(config.ui.theme),
            config,
            keyboard: keyboard.into(),
            snapshot,
            recorder_status,
            scroll: 0,
            export_dir: PathBuf::from("."),
            recorder,
            status_message: None,
            status_time: None,
        }
    }

    /// Start counting; a refused key source is reported in the status line
    pub fn start_recording(&mut self) {
        match self.recorder.start() {
            Ok(()) => {
                let msg = format!("Counting via {}", self.recorder.source_name());
                self.set_status(msg);
            }
            Err(e) => self.set_status(format!("Not counting: {}", e)),
        }
        self.refresh();
    }

    /// Pull the latest counts and status from the recorder
    pub fn refresh(&mut self) {
        self.snapshot = self.recorder.snapshot();
        let status = self.recorder.status();

        // Surface a new write failure once
        if let Some(err) = &status.last_save_error {
            if status.failed_saves > self.recorder_status.failed_saves {
                self.set_status(format!("Save failed: {}", err));
            }
        }
        self.recorder_status = status;

        let max_scroll = self.snapshot.len().saturating_sub(1);
        self.scroll = self.scroll.min(max_scroll);
    }

    /// Pick up state changes that come without a counted press
    pub fn sync_status(&mut self) {
        let state = self.recorder.state();
        if state != self.recorder_status.state {
            self.refresh();
        }
    }

    /// Switch to the next view
    pub fn next_view(&mut self) {
        let current = self.view.index();
        let next = (current + 1) % AppView::all().len();
        self.view = AppView::from_index(next);
    }

    /// Switch to the previous view
    pub fn prev_view(&mut self) {
        let current = self.view.index();
        let prev = if current == 0 {
            AppView::all().len() - 1
        } else {
            current - 1
        };
        self.view = AppView::from_index(prev);
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        if self.scroll + 1 < self.snapshot.len() {
            self.scroll += 1;
        }
    }

    /// Stop counting and request quit
    pub fn quit(&mut self) {
        self.recorder.stop();
        self.refresh();
        self.state = AppState::Quitting;
    }

    /// Set a status message
    pub fn set_status(&mut self, message: String) {
        self.status_message = Some(message);
        self.status_time = Some(Instant::now());
    }

    /// Get status message if still valid
    pub fn get_status(&self) -> Option<&str> {
        match (&self.status_message, self.status_time) {
            (Some(msg), Some(time)) if time.elapsed() < STATUS_TTL => Some(msg),
            _ => None,
        }
    }

    /// Label for the status bar
    pub fn state_label(&self) -> &'static str {
        self.recorder_status.state.label()
    }

    /// Export the current counts as `key: count` text; the outcome lands in the status line
    pub fn export_text(&mut self) {
        let path = self.export_path("txt");
        let result = report::export_text(&self.snapshot, &path);
        self.finish_export(path, result)
    }

    /// Export the current counts as a JSON report
    pub fn export_json(&mut self) {
        let path = self.export_path("json");
        let result = StatsReport::new(&self.snapshot, self.keyboard.as_str()).export_json(&path);
        self.finish_export(path, result)
    }

    fn export_path(&self, extension: &str) -> PathBuf {
        Path::new(&self.export_dir).join(report::default_export_name(extension))
    }

    fn finish_export(&mut self, path: PathBuf, result: std::io::Result<()>) {
        match result {
            Ok(()) => {
                log::info!("statistics exported to {}", path.display());
                self.set_status(format!("Exported to {}", path.display()));
            }
            Err(e) => {
                log::warn!("export to {} failed: {}", path.display(), e);
                self.set_status(format!("Export failed: {}", e));
            }
        }
    }
}
