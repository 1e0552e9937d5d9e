//! A key source driven from code
//!
//! Used by the integration tests and handy for replaying recorded input.
//! The [`ScriptedFeed`] half pushes presses; they only reach the recorder
//! while the [`ScriptedSource`] half is subscribed.

use super::event::{KeySource, RawKeyEvent, SourceError};
use std::sync::{mpsc, Arc, Mutex};

type SharedSink = Arc<Mutex<Option<mpsc::Sender<RawKeyEvent>>>>;

/// Key source whose events come from a [`ScriptedFeed`]
pub struct ScriptedSource {
    sink: SharedSink,
    refusal: Option<String>,
}

/// Producer handle for a [`ScriptedSource`]
#[derive(Clone)]
pub struct ScriptedFeed {
    sink: SharedSink,
}

impl ScriptedSource {
    /// Create a connected source/feed pair
    pub fn new() -> (Self, ScriptedFeed) {
        let sink: SharedSink = Arc::new(Mutex::new(None));
        let source = Self {
            sink: Arc::clone(&sink),
            refusal: None,
        };
        (source, ScriptedFeed { sink })
    }

    /// A source that refuses every subscription, like a hook without permission
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            sink: Arc::new(Mutex::new(None)),
            refusal: Some(reason.into()),
        }
    }
}

impl KeySource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn subscribe(&mut self, sink: mpsc::Sender<RawKeyEvent>) -> Result<(), SourceError> {
        if let Some(reason) = &self.refusal {
            return Err(SourceError::Unavailable(reason.clone()));
        }
        let mut slot = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return Err(SourceError::AlreadySubscribed);
        }
        *slot = Some(sink);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.sink.lock().unwrap_or_else(|e| e.into_inner()).take();
    }
}

impl ScriptedFeed {
    /// Deliver a press. Returns false when nobody is subscribed.
    pub fn press(&self, event: RawKeyEvent) -> bool {
        let slot = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some(sink) => sink.send(event).is_ok(),
            None => false,
        }
    }

    /// Deliver several presses in order, returning how many got through
    pub fn press_all(&self, events: impl IntoIterator<Item = RawKeyEvent>) -> usize {
        events.into_iter().filter(|event| self.press(*event)).count()
    }

    /// End the event sequence as if the OS hook had gone away
    pub fn end(&self) {
        self.sink.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    pub fn is_subscribed(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}
