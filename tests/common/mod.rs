//! Shared integration test helpers for winrow.
//!
//! Include this module at the top of each test file that needs it:
//!
//! ```ignore
//! mod common;
//! use common::{TestEditor, wait_for};
//! ```
//!
//! Note: Rust integration tests use `mod common;` (not `use`) to bring in
//! helpers from `tests/common/mod.rs`. The `#![allow(dead_code)]` attribute
//! suppresses warnings when only a subset of helpers are used per file.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;
use winrow::display::{DisplayPort, HeadlessDevice};
use winrow::text::TextKind;
use winrow::traits::DisplayDevice;
use winrow::window::{LockOwner, TextRef, Window};
use winrow::{Config, Editor, EditorTasks};

/// How long a test waits for a background task to catch up.
pub const SETTLE: Duration = Duration::from_secs(5);

/// A running editor on a headless 800x600 screen, plus a scratch directory.
///
/// Must be created inside a tokio runtime. The `TempDir` is removed when the
/// value is dropped.
pub struct TestEditor {
    pub editor: Arc<Editor>,
    pub device: Arc<HeadlessDevice>,
    pub tasks: Option<EditorTasks>,
    pub dir: TempDir,
}

impl TestEditor {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let device = Arc::new(HeadlessDevice::default());
        let (editor, tasks) = Editor::start(config, Arc::clone(&device) as Arc<dyn DisplayDevice>)
            .expect("Failed to start editor");
        Self {
            editor,
            device,
            tasks: Some(tasks),
            dir,
        }
    }

    /// Absolute path of `name` inside the scratch directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `contents` to `name` in the scratch directory.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).expect("Failed to write fixture");
        path
    }

    /// Open a window on `path`, as the command line would.
    pub fn open(&self, path: &Path) -> Arc<Window> {
        let mut row = self.editor.row();
        self.editor
            .readfile(&mut row, &path.to_string_lossy())
            .expect("Failed to open window")
    }

    /// The display port of the window titled `name`.
    pub fn port(&self, name: &str) -> DisplayPort {
        self.device
            .ports()
            .into_iter()
            .rev()
            .find(|p| p.title == name)
            .expect("no display port for window")
    }

    pub fn window_count(&self) -> usize {
        self.editor.row().column.len()
    }

    pub fn lookfile(&self, name: &str) -> Option<Arc<Window>> {
        self.editor.row().lookfile(name)
    }

    /// Body text of the window showing `name`, if any.
    pub fn body_of(&self, name: &str) -> Option<String> {
        self.lookfile(name)
            .map(|w| w.lock(LockOwner::Editor).body.contents())
    }

    /// Flush warnings and return the `+Errors` body for `dir` ("" for the
    /// global one).
    pub fn errors(&self, dir: &str) -> String {
        self.editor.flush_warnings();
        self.body_of(&winrow::mount::error_window_name(dir))
            .unwrap_or_default()
    }

    /// Stop every task and wait for them.
    pub async fn stop(mut self) {
        self.editor.close_all();
        self.editor.shutdown();
        if let Some(tasks) = self.tasks.take() {
            tasks.join().await;
        }
    }
}

pub fn body(window: &Arc<Window>) -> TextRef {
    TextRef::new(window, TextKind::Body)
}

pub fn tag(window: &Arc<Window>) -> TextRef {
    TextRef::new(window, TextKind::Tag)
}

pub fn contents(window: &Arc<Window>, kind: TextKind) -> String {
    window.lock(LockOwner::Editor).text(kind).contents()
}

pub fn selection(window: &Arc<Window>, kind: TextKind) -> (usize, usize) {
    window.lock(LockOwner::Editor).text(kind).selection()
}

/// Poll `cond` until it holds or [`SETTLE`] passes.
pub async fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + SETTLE;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
