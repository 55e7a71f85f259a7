//! The editor: every shared service in one place.
//!
//! This module contains:
//! - `Editor`: owns the window tree behind the structural lock, plus the
//!   warning queue, event log, command and pool coordinators, display
//!   device and configuration that used to be process-wide state
//! - window creation and teardown (`add_window`, `close_window`,
//!   `readfile`)
//! - [`errors`]: flushing queued warnings into `+Errors` windows
//! - [`coordinators`]: the new-window and action tasks
//!
//! Everything that needs the tree takes `&mut Row`, which callers get from
//! [`Editor::row`]. Holding that guard is holding the structural lock.

pub mod coordinators;
pub mod errors;

pub use coordinators::Action;

use crate::command::CommandsHandle;
use crate::events::{EventKind, EventLog};
use crate::file::File;
use crate::geometry::Point;
use crate::input::{KeyLoop, PointerLoop};
use crate::pool::{AfterJob, RequestPool};
use crate::row::Row;
use crate::text::TextKind;
use crate::traits::{DisplayDevice, DisplaySession, PlumbMessage};
use crate::warnings::Warnings;
use crate::window::{CtlError, LockOwner, TextRef, Window};
use anyhow::{Context, Result, anyhow};
use parking_lot::{Mutex, MutexGuard};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use winrow_config::Config;

const PLUMB_CAPACITY: usize = 32;
const NEW_WINDOW_CAPACITY: usize = 16;

/// Join handles of the editor's long-lived tasks.
pub struct EditorTasks {
    pub commands: JoinHandle<()>,
    pub pool: JoinHandle<()>,
    pub new_windows: JoinHandle<()>,
    pub actions: JoinHandle<()>,
}

impl EditorTasks {
    /// Wait for every task to stop after [`Editor::shutdown`].
    pub async fn join(self) {
        for (name, task) in [
            ("commands", self.commands),
            ("pool", self.pool),
            ("new-window", self.new_windows),
            ("actions", self.actions),
        ] {
            if let Err(e) = task.await {
                log::warn!("{} task ended abnormally: {}", name, e);
            }
        }
    }
}

pub struct Editor {
    row: Mutex<Row>,
    config: Config,
    device: Arc<dyn DisplayDevice>,
    warnings: Arc<Warnings>,
    events: EventLog,
    commands: CommandsHandle,
    pool: RequestPool,
    actions: mpsc::UnboundedSender<Action>,
    new_windows: mpsc::Sender<oneshot::Sender<Result<Arc<Window>>>>,
    plumb_tx: mpsc::Sender<PlumbMessage>,
    plumb_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<PlumbMessage>>>,
    edit_done: tokio::sync::Mutex<mpsc::UnboundedReceiver<()>>,
    snarf: Mutex<String>,
    next_id: AtomicU64,
    runtime: Handle,
    shutdown: watch::Sender<bool>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl Editor {
    /// Build the editor and start its coordinator tasks on the current
    /// runtime.
    pub fn start(config: Config, device: Arc<dyn DisplayDevice>) -> Result<(Arc<Self>, EditorTasks)> {
        let runtime = Handle::try_current().context("the editor needs a tokio runtime")?;
        let (shutdown, shutdown_rx) = watch::channel(false);
        let warnings = Arc::new(Warnings::new());
        let (edit_tx, edit_rx) = mpsc::unbounded_channel();
        let (commands, commands_task) =
            CommandsHandle::spawn(Arc::clone(&warnings), edit_tx, shutdown_rx.clone());
        let (actions, actions_rx) = mpsc::unbounded_channel();
        let (new_windows, new_windows_rx) = mpsc::channel(NEW_WINDOW_CAPACITY);
        let (plumb_tx, plumb_rx) = mpsc::channel(PLUMB_CAPACITY);

        let mut row = Row::new(device.screen_rect(), device.metrics());
        row.var_font = config.var_font.clone();
        row.fixed_font = config.fixed_font.clone();

        let mut pool_task = None;
        let editor = Arc::new_cyclic(|weak: &Weak<Editor>| {
            let weak = weak.clone();
            // Workers flush warnings their request produced.
            let after_job: AfterJob = Arc::new(move || {
                if let Some(editor) = weak.upgrade() {
                    editor.flush_warnings();
                }
            });
            let (pool, task) = RequestPool::spawn(Some(after_job), shutdown_rx.clone());
            pool_task = Some(task);
            Editor {
                row: Mutex::new(row),
                config,
                device,
                warnings,
                events: EventLog::default(),
                commands,
                pool,
                actions,
                new_windows,
                plumb_tx,
                plumb_rx: Arc::new(tokio::sync::Mutex::new(plumb_rx)),
                edit_done: tokio::sync::Mutex::new(edit_rx),
                snarf: Mutex::new(String::new()),
                next_id: AtomicU64::new(1),
                runtime,
                shutdown,
            }
        });
        let pool = pool_task.ok_or_else(|| anyhow!("request pool did not start"))?;
        let new_windows_task = editor.runtime.spawn(coordinators::new_window_coordinator(
            Arc::clone(&editor),
            new_windows_rx,
            shutdown_rx.clone(),
        ));
        let actions_task = editor.runtime.spawn(coordinators::action_dispatcher(
            Arc::clone(&editor),
            actions_rx,
            shutdown_rx,
        ));
        log::info!("editor started");
        Ok((
            editor,
            EditorTasks {
                commands: commands_task,
                pool,
                new_windows: new_windows_task,
                actions: actions_task,
            },
        ))
    }

    /// Take the structural lock.
    pub fn row(&self) -> MutexGuard<'_, Row> {
        self.row.lock()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn device(&self) -> &Arc<dyn DisplayDevice> {
        &self.device
    }

    pub fn warnings(&self) -> &Arc<Warnings> {
        &self.warnings
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn commands(&self) -> &CommandsHandle {
        &self.commands
    }

    pub fn pool(&self) -> &RequestPool {
        &self.pool
    }

    /// Where the plumber transport delivers messages.
    pub fn plumb_sender(&self) -> mpsc::Sender<PlumbMessage> {
        self.plumb_tx.clone()
    }

    pub(crate) fn plumb_receiver(&self) -> Arc<tokio::sync::Mutex<mpsc::Receiver<PlumbMessage>>> {
        Arc::clone(&self.plumb_rx)
    }

    /// Queue an action for the dispatcher.
    pub fn dispatch(&self, action: Action) {
        if self.actions.send(action).is_err() {
            log::debug!("action dropped: dispatcher stopped");
        }
    }

    /// Wait until a running edit command retires.
    pub async fn wait_edit_done(&self) -> Option<()> {
        self.edit_done.lock().await.recv().await
    }

    pub fn snarf(&self) -> String {
        self.snarf.lock().clone()
    }

    pub fn set_snarf(&self, s: impl Into<String>) {
        *self.snarf.lock() = s.into();
    }

    /// Ask every coordinator to stop.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Completes once [`Editor::shutdown`] has been called.
    pub async fn wait_shutdown(&self) {
        let mut rx = self.shutdown.subscribe();
        let _ = rx.wait_for(|stop| *stop).await;
    }

    /// Create a window at the bottom of the column and start its input
    /// loops. With `clone`, the new window is a zerox sharing its file.
    ///
    /// The caller holds the structural lock and no window lock.
    pub fn add_window(
        self: &Arc<Self>,
        row: &mut Row,
        clone: Option<&Arc<Window>>,
        name: &str,
    ) -> Result<Arc<Window>> {
        let title = match (name, clone) {
            ("", Some(orig)) => orig.file().lock().name().to_string(),
            ("", None) => "winrow".to_string(),
            (name, _) => name.to_string(),
        };
        let session = self
            .device
            .open(&title)
            .with_context(|| format!("opening display for {:?}", title))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let file = match clone {
            Some(orig) => Arc::clone(orig.file()),
            None => File::new().shared(),
        };
        let window = Window::new(id, Some(Arc::clone(&session.display)), file);
        {
            let mut w = window.lock(LockOwner::Editor);
            w.autoindent = self.config.autoindent;
            match clone {
                Some(orig) => {
                    let o = orig.lock(LockOwner::Editor);
                    w.incl = o.incl.clone();
                    w.autoindent = o.autoindent;
                    let selection = o.body.selection();
                    let suffix = o.tag_suffix();
                    drop(o);
                    w.set_tag();
                    if let Some(suffix) = suffix {
                        w.clear_tag();
                        let n = w.tag.len();
                        w.tag.insert(n, &suffix);
                    }
                    w.body.set_select(selection.0, selection.1);
                }
                None if !name.is_empty() => w.set_name(name),
                None => w.set_tag(),
            }
        }
        row.column.add(Arc::clone(&window));
        self.start_loops(&window, session);

        row.focus.save_pointer(id);
        let tag_box = window.lock(LockOwner::Editor).tag.scroll_rect();
        if let Some(display) = window.display() {
            display.move_cursor(Point::new(tag_box.max.x + 3, tag_box.min.y + 3));
        }
        row.focus.bart_text = Some(TextRef::new(&window, TextKind::Body));
        crate::debug_info!("EDITOR", "added window {} {:?}", id, title);
        Ok(window)
    }

    fn start_loops(self: &Arc<Self>, window: &Arc<Window>, session: DisplaySession) {
        let DisplaySession {
            display,
            pointer,
            resize,
            keys,
        } = session;
        let pointer_loop = PointerLoop::new(Arc::clone(self), Arc::clone(window), Arc::clone(&display));
        self.runtime.spawn(pointer_loop.run(pointer, resize));
        let key_loop = KeyLoop::new(
            Arc::clone(self),
            Arc::clone(window),
            display,
            self.config.tag_commit_delay(),
        );
        self.runtime.spawn(key_loop.run(keys));
    }

    /// Remove `window` from the tree and stop its loops.
    ///
    /// The caller holds the structural lock and no window lock.
    pub fn close_window(&self, row: &mut Row, window: &Arc<Window>) {
        let name = window.file().lock().name().to_string();
        {
            let Row { column, focus, .. } = row;
            let mut guard = window.lock(LockOwner::Editor);
            if !guard.in_column {
                return;
            }
            column.close(&mut guard, true, focus);
        }
        self.events.log(window.id(), EventKind::Del, name);
    }

    /// Close every window, for exit.
    pub fn close_all(&self) {
        let mut row = self.row();
        let mut closing = Vec::new();
        row.all_windows(|w| closing.push(Arc::clone(w)));
        for w in &closing {
            self.events.log(w.id(), EventKind::Del, w.file().lock().name());
        }
        let Row { column, focus, .. } = &mut *row;
        column.close_all(focus);
    }

    /// Open a window on `filename`, loading it from disk if it exists.
    pub fn readfile(self: &Arc<Self>, row: &mut Row, filename: &str) -> Result<Arc<Window>> {
        let abs = std::path::absolute(filename)
            .with_context(|| format!("resolving {:?}", filename))?
            .to_string_lossy()
            .to_string();
        let window = self.add_window(row, None, &abs)?;
        let loaded = {
            let mut w = window.lock(LockOwner::Editor);
            let loaded = if Path::new(&abs).exists() {
                window.file().lock().load_path(Path::new(&abs))
            } else {
                Ok(())
            };
            window.file().lock().clean();
            w.set_tag();
            let n = w.tag.len();
            w.tag.set_select(n, n);
            loaded
        };
        if let Err(e) = loaded {
            self.warnings.add(None, format!("{}: {}\n", abs, e));
        }
        self.events.log(window.id(), EventKind::New, abs);
        Ok(window)
    }

    /// Open the files named on the command line, or the working directory
    /// when there are none.
    pub fn read_arg_files(self: &Arc<Self>, files: &[String]) -> Result<()> {
        let mut row = self.row();
        if files.is_empty() {
            let wdir = row.wdir.clone();
            self.readfile(&mut row, &wdir)?;
            return Ok(());
        }
        for filename in files {
            self.readfile(&mut row, filename)?;
        }
        Ok(())
    }

    /// Apply control text from a filesystem client to `window`.
    pub fn window_ctl(&self, window: &Arc<Window>, text: &str) -> Result<(), CtlError> {
        let _row = self.row();
        let mut w = window.lock(LockOwner::Filesystem);
        let applied = w.ctl(text);
        drop(w);
        if let Some(display) = window.display() {
            display.flush();
        }
        applied
    }

    /// Ask the new-window coordinator for an empty window.
    pub async fn new_window(&self) -> Result<Arc<Window>> {
        let (tx, rx) = oneshot::channel();
        self.new_windows
            .send(tx)
            .await
            .map_err(|_| anyhow!("editor is shutting down"))?;
        rx.await.context("new-window coordinator stopped")?
    }
}
