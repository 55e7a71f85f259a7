//! Seams to the services the editor core does not implement itself.
//!
//! The core drives windows, commands and sessions; drawing, raw input
//! devices, the plumber and process creation belong to collaborators.
//! These traits and message types document the contracts between them and
//! let the integration tests run the whole core against in-memory doubles
//! without a live display.

use crate::geometry::{Point, Rect};
use std::sync::Arc;
use tokio::sync::mpsc;

// ── Display ──────────────────────────────────────────────────────────────────

/// Fixed-cell text metrics used for hit-testing and scrolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    /// Width of one character cell in pixels
    pub char_width: i32,
    /// Height of one line in pixels
    pub line_height: i32,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            char_width: 8,
            line_height: 16,
        }
    }
}

/// One window's connection to the drawing service.
///
/// All methods take `&self`; implementations serialise access internally.
pub trait Display: Send + Sync {
    /// Push pending drawing to the screen.
    fn flush(&self);

    /// Re-attach after the screen was resized.
    fn attach(&self) -> anyhow::Result<()>;

    /// Current screen rectangle.
    fn screen_rect(&self) -> Rect;

    /// Warp the pointer.
    fn move_cursor(&self, p: Point);
}

/// A pointer sample: position, button mask and timestamp.
///
/// Buttons 1, 2, 4 are the physical buttons; 8 and 16 are wheel up and down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mouse {
    pub point: Point,
    pub buttons: u32,
    pub msec: u32,
}

/// Event streams and drawing handle for one window.
pub struct DisplaySession {
    pub display: Arc<dyn Display>,
    /// Pointer samples
    pub pointer: mpsc::Receiver<Mouse>,
    /// Resize notifications; the new size is read from `display.screen_rect()`
    pub resize: mpsc::Receiver<()>,
    /// Typed runes
    pub keys: mpsc::Receiver<char>,
}

/// Factory for per-window display sessions.
pub trait DisplayDevice: Send + Sync {
    /// Open a display session for a new window.
    fn open(&self, title: &str) -> anyhow::Result<DisplaySession>;

    /// The screen rectangle windows are tiled into.
    fn screen_rect(&self) -> Rect;

    /// Metrics of the default font.
    fn metrics(&self) -> Metrics;
}

// ── Plumber ─────────────────────────────────────────────────────────────────

/// An inbound message from the inter-application plumber.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlumbMessage {
    pub src: String,
    pub dst: String,
    pub dir: String,
    /// Message type; only `text` messages are handled
    pub kind: String,
    pub attrs: Vec<(String, String)>,
    pub data: String,
}

impl PlumbMessage {
    /// Value of the named attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

// ── Processes ────────────────────────────────────────────────────────────────

/// Control over a running external process.
pub trait ProcessControl: Send {
    /// Ask the process to terminate.
    fn kill(&mut self) -> std::io::Result<()>;
}
