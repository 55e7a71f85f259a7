//! Session document format for the winrow editor.
//!
//! A dump captures everything needed to rebuild the editor's window layout:
//! the working directory, the two fonts, the row and column tags, and one
//! [`Window`] record per restorable window. Documents are stored as
//! pretty-printed JSON; see [`storage`] for file I/O.

pub mod storage;

use serde::{Deserialize, Serialize};

pub use storage::DumpfileError;

/// Top-level session document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Working directory at the time of the dump
    pub current_dir: String,
    /// Variable-width font name
    #[serde(default)]
    pub var_font: String,
    /// Fixed-width font name
    #[serde(default)]
    pub fixed_font: String,
    /// Row tag text
    #[serde(default)]
    pub row_tag: Text,
    /// Column descriptors, left to right
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Window descriptors in row iteration order
    #[serde(default)]
    pub windows: Vec<Window>,
}

/// A text snapshot with its selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    #[serde(default)]
    pub buffer: String,
    #[serde(default)]
    pub q0: usize,
    #[serde(default)]
    pub q1: usize,
}

impl Text {
    /// Snapshot with an empty selection at the start.
    pub fn new(buffer: impl Into<String>) -> Self {
        Self {
            buffer: buffer.into(),
            q0: 0,
            q1: 0,
        }
    }
}

/// A column descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Left edge as a percentage of the row width, in `[0, 100)`
    pub position: f64,
    /// Column tag text
    #[serde(default)]
    pub tag: Text,
}

/// How a window is reconstructed on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowType {
    /// A clean file on disk; reloaded from its path.
    Saved,
    /// A modified buffer; the full text is embedded in the dump.
    Unsaved,
    /// A second view of a file already opened by an earlier window.
    Zerox,
    /// Output of an external command; the command is re-run on load.
    Exec,
    /// A kind written by a newer version; rejected entry by entry.
    #[serde(other)]
    Unknown,
}

/// A window descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// Index into [`Content::columns`]
    #[serde(default)]
    pub column: usize,
    /// Body snapshot; the buffer is only filled for [`WindowType::Unsaved`]
    #[serde(default)]
    pub body: Text,
    /// Vertical position within the column, as a percentage
    #[serde(default)]
    pub position: f64,
    /// Body font
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub font: String,
    /// Reconstruction kind
    #[serde(rename = "type")]
    pub kind: WindowType,
    /// Directory to run [`Window::exec_command`] in
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub exec_dir: String,
    /// Command line re-run for [`WindowType::Exec`] windows
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub exec_command: String,
    /// Tag snapshot
    #[serde(default)]
    pub tag: Text,
}

impl Window {
    /// A descriptor of the given kind with empty snapshots.
    pub fn new(kind: WindowType) -> Self {
        Self {
            column: 0,
            body: Text::default(),
            position: 0.0,
            font: String::new(),
            kind,
            exec_dir: String::new(),
            exec_command: String::new(),
            tag: Text::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_window_type_deserializes() {
        let json = r#"{"type": "Hologram", "tag": {"buffer": "x |", "q0": 0, "q1": 0}}"#;
        let win: Window = serde_json::from_str(json).unwrap();
        assert_eq!(win.kind, WindowType::Unknown);
        assert_eq!(win.tag.buffer, "x |");
    }

    #[test]
    fn test_exec_fields_skipped_when_empty() {
        let json = serde_json::to_string(&Window::new(WindowType::Saved)).unwrap();
        assert!(!json.contains("exec_dir"));
        assert!(!json.contains("exec_command"));
    }

    #[test]
    fn test_minimal_document() {
        let content: Content = serde_json::from_str(r#"{"current_dir": "/tmp"}"#).unwrap();
        assert_eq!(content.current_dir, "/tmp");
        assert!(content.columns.is_empty());
        assert!(content.windows.is_empty());
    }
}
