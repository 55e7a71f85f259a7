//! Window event log read by filesystem clients (`new`, `focus`, `del`).

use crate::window::WindowId;
use serde::Serialize;
use std::fmt;
use tokio::sync::broadcast;

const LOG_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    New,
    Focus,
    Del,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventKind::New => "new",
            EventKind::Focus => "focus",
            EventKind::Del => "del",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowEvent {
    pub window: WindowId,
    pub kind: EventKind,
    /// File name at the time of the event
    pub name: String,
}

impl fmt::Display for WindowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.window, self.kind, self.name)
    }
}

impl WindowEvent {
    /// One JSON object per event, for clients that want structured records.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Broadcasts window events; slow readers lose the oldest entries.
#[derive(Debug)]
pub struct EventLog {
    tx: broadcast::Sender<WindowEvent>,
}

impl Default for EventLog {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(LOG_CAPACITY);
        Self { tx }
    }
}

impl EventLog {
    pub fn log(&self, window: WindowId, kind: EventKind, name: impl Into<String>) {
        let event = WindowEvent {
            window,
            kind,
            name: name.into(),
        };
        crate::debug_trace!("EVENT", "{}", event);
        // No readers is fine.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WindowEvent> {
        self.tx.subscribe()
    }
}
