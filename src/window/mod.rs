//! Windows: a tag line plus a body, each a [`Text`], behind a per-window lock.

mod ctl;
mod lock;

pub use ctl::CtlError;
pub use lock::{LockOwner, WindowGuard};

use crate::file::{File, FileRef};
use crate::geometry::{Point, Rect};
use crate::text::{Text, TextId, TextKind};
use crate::traits::{Display, Metrics};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicU8;
use tokio::sync::watch;

pub type WindowId = u64;

/// Suffix given to a tag that has none yet
pub const DEFAULT_TAG_SUFFIX: &str = " Look ";

/// Everything about a window that is guarded by its lock.
#[derive(Debug)]
pub struct WindowState {
    pub tag: Text,
    pub body: Text,
    /// Whole window rectangle (tag and body)
    pub rect: Rect,
    /// Lines given to the tag
    pub tag_lines: usize,
    /// False once the window has been removed from its column
    pub in_column: bool,
    /// Directory an exec-launched window's command ran in, set by the
    /// client through a `dumpdir` control message
    pub dump_dir: String,
    /// Command line that recreates this window, set by the client through
    /// a `dump` control message. Loading the dump re-runs it and leaves
    /// making the window to the command.
    pub dump_command: String,
    /// Open event streams held by external clients
    pub event_opens: usize,
    /// Include directories searched by Look
    pub incl: Vec<String>,
    pub autoindent: bool,
    /// Body font name; empty means the row's variable-width font
    pub font: String,
    /// Pointer should be moved to the tag's Del after a neighbour closed
    pub show_del: bool,
}

impl WindowState {
    pub fn text(&self, kind: TextKind) -> &Text {
        match kind {
            TextKind::Tag => &self.tag,
            TextKind::Body => &self.body,
        }
    }

    pub fn text_mut(&mut self, kind: TextKind) -> &mut Text {
        match kind {
            TextKind::Tag => &mut self.tag,
            TextKind::Body => &mut self.body,
        }
    }

    /// Name of the file shown in the body.
    pub fn name(&self) -> String {
        self.body.file().lock().name().to_string()
    }

    /// Rename the body's file and rebuild the tag.
    pub fn set_name(&mut self, name: &str) {
        self.body.file().lock().set_name(name);
        self.set_tag();
    }

    /// Text after the first `|` of the tag, if any.
    pub fn tag_suffix(&self) -> Option<String> {
        let tag = self.tag.contents();
        tag.split_once('|').map(|(_, suffix)| suffix.to_string())
    }

    /// Rebuild the part of the tag before `|` from the body's state,
    /// keeping the user's suffix.
    pub fn set_tag(&mut self) {
        self.tag.commit();
        let (name, is_dir, dirty, can_undo, can_redo) = {
            let file = self.body.file().lock();
            (
                file.name().to_string(),
                file.is_dir(),
                file.dirty(),
                file.can_undo(),
                file.can_redo(),
            )
        };
        let mut prefix = format!("{} Del Snarf", name);
        if can_undo {
            prefix.push_str(" Undo");
        }
        if can_redo {
            prefix.push_str(" Redo");
        }
        if is_dir {
            prefix.push_str(" Get");
        } else if dirty && !name.starts_with('+') && !name.is_empty() {
            prefix.push_str(" Put");
        }
        let suffix = self
            .tag_suffix()
            .unwrap_or_else(|| DEFAULT_TAG_SUFFIX.to_string());
        let new = format!("{} |{}", prefix, suffix);
        let old = self.tag.contents();
        if new == old {
            return;
        }
        let old_bar = old.find('|').map(|i| old[..i].chars().count());
        let new_bar = prefix.chars().count() + 1;
        let (q0, q1) = self.tag.selection();
        self.tag.set_contents(&new);
        match old_bar {
            // keep a selection inside the suffix anchored to it
            Some(bar) if q0 > bar => {
                let shift = |q: usize| q - bar + new_bar;
                self.tag.set_select(shift(q0), shift(q1));
            }
            _ => self.tag.set_select(q0, q1),
        }
    }

    /// Drop everything after the tag's `|`.
    pub fn clear_tag(&mut self) {
        self.tag.commit();
        let tag = self.tag.contents();
        if let Some(i) = tag.find('|') {
            let bar = tag[..i].chars().count();
            let n = tag.chars().count();
            self.tag.delete(bar + 1, n);
        }
    }

    /// Commit pending typing in `kind`. A committed tag whose first word no
    /// longer matches the file name renames the file.
    pub fn commit(&mut self, kind: TextKind) {
        if !self.text_mut(kind).commit() || kind != TextKind::Tag {
            return;
        }
        let tag = self.tag.contents();
        let first = tag.split([' ', '\t', '|']).next().unwrap_or("").to_string();
        if first != self.name() {
            self.body.file().lock().set_name(first);
            self.set_tag();
        }
    }

    /// Directory commands run from this window should start in.
    pub fn dir_name(&self) -> String {
        let file = self.body.file().lock();
        let name = file.name();
        if name.is_empty() {
            return String::new();
        }
        if file.is_dir() {
            return name.trim_end_matches('/').to_string();
        }
        Path::new(name)
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Add an include directory unless already present.
    pub fn add_incl(&mut self, dir: &str) {
        if !self.incl.iter().any(|d| d == dir) {
            self.incl.push(dir.to_string());
        }
    }

    /// Lay out the tag and body in `r`.
    pub fn resize(&mut self, r: Rect, tag_lines: usize, metrics: Metrics) {
        self.rect = r;
        self.tag_lines = tag_lines;
        let (tag, body) = split_window_rect(r, tag_lines, metrics);
        self.tag.set_rect(tag, metrics);
        self.body.set_rect(body, metrics);
    }

    /// False if the body has unsaved edits worth protecting.
    pub fn is_clean(&self) -> bool {
        let file = self.body.file().lock();
        !file.dirty() || file.name().starts_with('+') || (file.name().is_empty() && file.is_empty())
    }
}

/// Split a window rectangle into its tag and body rectangles.
pub fn split_window_rect(r: Rect, tag_lines: usize, metrics: Metrics) -> (Rect, Rect) {
    let tag_h = (tag_lines.max(1) as i32 * metrics.line_height).min(r.height().max(0));
    let tag = r.with_max_y(r.min.y + tag_h);
    let body = r.with_min_y(r.min.y + tag_h);
    (tag, body)
}

/// A window: identity, lock, display and teardown signal.
pub struct Window {
    id: WindowId,
    state: Mutex<WindowState>,
    owner: AtomicU8,
    display: Option<Arc<dyn Display>>,
    /// The body's file; fixed for the window's lifetime
    file: FileRef,
    /// Last pointer position this window's device reported
    mouse: Mutex<Point>,
    done: Mutex<Option<watch::Sender<()>>>,
    done_rx: watch::Receiver<()>,
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("owner", &self.owner())
            .finish_non_exhaustive()
    }
}

impl Window {
    /// Create a window whose body shows `body`. Pass another window's body
    /// file to make a zerox.
    pub fn new(id: WindowId, display: Option<Arc<dyn Display>>, body: FileRef) -> Arc<Self> {
        let (done, done_rx) = watch::channel(());
        let state = WindowState {
            tag: Text::new(TextKind::Tag, File::new().shared()),
            body: Text::new(TextKind::Body, Arc::clone(&body)),
            rect: Rect::default(),
            tag_lines: 1,
            in_column: false,
            dump_dir: String::new(),
            dump_command: String::new(),
            event_opens: 0,
            incl: Vec::new(),
            autoindent: false,
            font: String::new(),
            show_del: false,
        };
        Arc::new(Self {
            id,
            state: Mutex::new(state),
            owner: AtomicU8::new(0),
            display,
            file: body,
            mouse: Mutex::new(Point::default()),
            done: Mutex::new(Some(done)),
            done_rx,
        })
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    /// The body's file, readable without the window lock.
    pub fn file(&self) -> &FileRef {
        &self.file
    }

    /// True if both windows show the same file.
    pub fn shares_file(&self, other: &Window) -> bool {
        Arc::ptr_eq(&self.file, &other.file)
    }

    /// Where keys typed on this window's device are routed.
    pub fn mouse_point(&self) -> Point {
        *self.mouse.lock()
    }

    pub fn set_mouse_point(&self, p: Point) {
        *self.mouse.lock() = p;
    }

    pub fn display(&self) -> Option<&Arc<dyn Display>> {
        self.display.as_ref()
    }

    /// A receiver that reports an error once the window is torn down.
    pub fn done(&self) -> watch::Receiver<()> {
        self.done_rx.clone()
    }

    /// Signal teardown to the window's event loops.
    pub fn close(&self) {
        if self.done.lock().take().is_some() {
            log::info!("window {} closed", self.id);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.done.lock().is_none()
    }
}

/// A window together with one of its texts.
#[derive(Debug, Clone)]
pub struct TextRef {
    pub window: Arc<Window>,
    pub kind: TextKind,
}

impl TextRef {
    pub fn new(window: &Arc<Window>, kind: TextKind) -> Self {
        Self {
            window: Arc::clone(window),
            kind,
        }
    }

    pub fn id(&self) -> TextId {
        TextId {
            window: self.window.id(),
            kind: self.kind,
        }
    }

    /// Same window, either text.
    pub fn same_window(&self, other: &TextRef) -> bool {
        self.window.id() == other.window.id()
    }
}

impl PartialEq for TextRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for TextRef {}
