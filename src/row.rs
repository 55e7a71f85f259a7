//! The row: root of the window tree and home of pointer focus state.
//!
//! The row is guarded by the editor's structural lock; everything here
//! assumes the caller holds it.

use crate::column::Column;
use crate::file::File;
use crate::geometry::{Point, Rect};
use crate::text::{Text, TextKind};
use crate::traits::{Display, Metrics};
use crate::window::{LockOwner, TextRef, Window, WindowId};
use std::path::PathBuf;
use std::sync::Arc;

/// Commands shown in the row tag
pub const ROW_TAG: &str = "Newcol Kill Putall Dump Exit ";
/// Commands shown in the column tag
pub const COLUMN_TAG: &str = "New Cut Paste Snarf Sort Zerox Delcol ";

#[derive(Clone)]
struct SavedPointer {
    window: WindowId,
    point: Point,
    display: Option<Arc<dyn Display>>,
}

/// Which texts the pointer and selection currently refer to.
#[derive(Default)]
pub struct Focus {
    /// Text under the pointer
    pub mouse_text: Option<TextRef>,
    /// Text typed into when click-to-focus is on
    pub bart_text: Option<TextRef>,
    /// Text of the last button-1 selection
    pub arg_text: Option<TextRef>,
    pub sel_text: Option<TextRef>,
    /// Window whose body was last selected in
    pub active: Option<Arc<Window>>,
    /// Last pointer position seen by any window
    pub last_point: Point,
    /// Display the last pointer event came from
    pub last_display: Option<Arc<dyn Display>>,
    saved: Option<SavedPointer>,
}

impl Focus {
    /// Remember where the pointer was before a new window moved it.
    pub fn save_pointer(&mut self, window: WindowId) {
        self.saved = Some(SavedPointer {
            window,
            point: self.last_point,
            display: self.last_display.clone(),
        });
    }

    /// Put the pointer back if it was saved on behalf of `window`.
    pub fn restore_pointer(&mut self, window: WindowId) -> bool {
        let restored = match &self.saved {
            Some(saved) if saved.window == window => {
                if let Some(display) = &saved.display {
                    display.move_cursor(saved.point);
                }
                true
            }
            _ => false,
        };
        self.saved = None;
        restored
    }

    /// Forget the saved pointer position.
    pub fn clear_pointer(&mut self) {
        self.saved = None;
    }

    /// Drop every reference to `window`.
    pub fn forget(&mut self, window: WindowId) {
        let keep = |t: &Option<TextRef>| t.as_ref().is_some_and(|t| t.window.id() != window);
        if !keep(&self.mouse_text) {
            self.mouse_text = None;
        }
        if !keep(&self.bart_text) {
            self.bart_text = None;
        }
        if !keep(&self.arg_text) {
            self.arg_text = None;
        }
        if !keep(&self.sel_text) {
            self.sel_text = None;
        }
        if self.active.as_ref().is_some_and(|w| w.id() == window) {
            self.active = None;
        }
    }

    pub fn clear(&mut self) {
        *self = Focus {
            last_point: self.last_point,
            last_display: self.last_display.take(),
            ..Focus::default()
        };
    }
}

/// The root of the window tree. Exactly one column.
pub struct Row {
    pub column: Column,
    pub focus: Focus,
    pub tag: Text,
    /// Working directory recorded in dumps
    pub wdir: String,
    pub var_font: String,
    pub fixed_font: String,
    pub home: PathBuf,
}

impl Row {
    pub fn new(rect: Rect, metrics: Metrics) -> Self {
        let mut tag = Text::new(TextKind::Tag, File::new().shared());
        tag.set_contents(ROW_TAG);
        Self {
            column: Column::new(rect, metrics),
            focus: Focus::default(),
            tag,
            wdir: std::env::current_dir()
                .map(|d| d.to_string_lossy().to_string())
                .unwrap_or_default(),
            var_font: String::new(),
            fixed_font: String::new(),
            home: dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")),
        }
    }

    /// Route a typed rune to the text under `p`, or to the click-to-focus
    /// text when `click_to_focus` is set. Returns the text typed into.
    pub fn type_key(&mut self, r: char, p: Point, click_to_focus: bool) -> Option<TextRef> {
        let r = if r == '\0' { char::REPLACEMENT_CHARACTER } else { r };
        self.focus.clear_pointer();
        let target = if click_to_focus {
            self.focus.bart_text.clone()
        } else {
            self.column
                .which(p)
                .map(|(window, kind)| TextRef { window, kind })
        }?;
        let window = Arc::clone(&target.window);
        let mut w = window.lock(LockOwner::Keyboard);
        if target.kind == TextKind::Tag && w.tag.scroll_rect().contains(p) {
            return None;
        }
        let autoindent = w.autoindent;
        w.text_mut(target.kind).type_rune(r, autoindent);
        match target.kind {
            TextKind::Tag => {
                if r == '\n' {
                    let lines = w.tag.line_count();
                    self.column.set_tag_lines(&mut w, lines);
                }
            }
            TextKind::Body => w.set_tag(),
        }
        Some(target)
    }

    pub fn lookup(&self, id: WindowId) -> Option<Arc<Window>> {
        self.column.lookup(id).cloned()
    }

    /// The first window showing the file `name`.
    pub fn lookfile(&self, name: &str) -> Option<Arc<Window>> {
        let name = name.trim_end_matches('/');
        self.column
            .windows()
            .find(|w| w.file().lock().name().trim_end_matches('/') == name)
            .cloned()
    }

    pub fn all_windows(&self, mut f: impl FnMut(&Arc<Window>)) {
        for w in self.column.windows() {
            f(w);
        }
    }

    /// True if no window holds edits worth keeping.
    pub fn clean(&self) -> bool {
        self.column.clean()
    }

    /// Names of windows with unsaved edits.
    pub fn dirty_names(&self) -> Vec<String> {
        self.column
            .windows()
            .filter(|w| !w.lock(LockOwner::Editor).is_clean())
            .map(|w| w.file().lock().name().to_string())
            .collect()
    }
}
