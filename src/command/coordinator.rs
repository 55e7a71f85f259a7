//! The task that owns the [`CommandTable`].
//!
//! Every lifecycle event (registration, exit, kill request, error text from
//! a command's error writer) arrives on its own channel and is handled in
//! one `select!` loop, so the table needs no lock.

use super::table::{CommandTable, Outcome};
use super::{Command, ProcessExit};
use crate::warnings::Warnings;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

const CHANNEL_CAPACITY: usize = 64;

/// A request to inspect the table, answered on the oneshot.
type Inspect = Box<dyn FnOnce(&CommandTable) + Send>;

/// Sending side of the coordinator's channels.
#[derive(Clone, Debug)]
pub struct CommandsHandle {
    register_tx: mpsc::Sender<Command>,
    exit_tx: mpsc::Sender<ProcessExit>,
    kill_tx: mpsc::Sender<String>,
    error_tx: mpsc::Sender<String>,
    inspect_tx: mpsc::Sender<Inspect>,
}

impl CommandsHandle {
    /// Start the coordinator. It runs until `shutdown` changes or its
    /// sender is dropped, then kills every registered process.
    ///
    /// Retired edit commands are announced on `edit_done`.
    pub fn spawn(
        warnings: Arc<Warnings>,
        edit_done: mpsc::UnboundedSender<()>,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, JoinHandle<()>) {
        let (register_tx, register_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (exit_tx, exit_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (kill_tx, kill_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (error_tx, error_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (inspect_tx, inspect_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let coordinator = Coordinator {
            table: CommandTable::new(),
            warnings,
            edit_done,
        };
        let task = tokio::spawn(coordinator.run(
            register_rx,
            exit_rx,
            kill_rx,
            error_rx,
            inspect_rx,
            shutdown,
        ));
        (
            Self {
                register_tx,
                exit_tx,
                kill_tx,
                error_tx,
                inspect_tx,
            },
            task,
        )
    }

    pub async fn register(&self, cmd: Command) {
        if self.register_tx.send(cmd).await.is_err() {
            log::warn!("command coordinator gone; registration dropped");
        }
    }

    pub async fn notify_exit(&self, exit: ProcessExit) {
        if self.exit_tx.send(exit).await.is_err() {
            log::warn!("command coordinator gone; exit report dropped");
        }
    }

    pub async fn kill(&self, name: impl Into<String>) {
        let _ = self.kill_tx.send(name.into()).await;
    }

    /// Report error output that belongs to no particular command.
    pub async fn error(&self, text: impl Into<String>) {
        let _ = self.error_tx.send(text.into()).await;
    }

    /// Non-async kill request for callers holding a lock.
    pub fn try_kill(&self, name: impl Into<String>) -> bool {
        self.kill_tx.try_send(name.into()).is_ok()
    }

    /// Run `f` against the table on the coordinator task.
    pub async fn inspect<T, F>(&self, f: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&CommandTable) -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Inspect = Box::new(move |table| {
            let _ = tx.send(f(table));
        });
        self.inspect_tx.send(job).await.ok()?;
        rx.await.ok()
    }

    /// Names of the running commands.
    pub async fn running(&self) -> Vec<String> {
        self.inspect(|t| t.names()).await.unwrap_or_default()
    }
}

struct Coordinator {
    table: CommandTable,
    warnings: Arc<Warnings>,
    edit_done: mpsc::UnboundedSender<()>,
}

impl Coordinator {
    async fn run(
        mut self,
        mut register_rx: mpsc::Receiver<Command>,
        mut exit_rx: mpsc::Receiver<ProcessExit>,
        mut kill_rx: mpsc::Receiver<String>,
        mut error_rx: mpsc::Receiver<String>,
        mut inspect_rx: mpsc::Receiver<Inspect>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        log::info!("command coordinator started");
        loop {
            // Exits are handled before registrations that arrived with them.
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                Some(text) = error_rx.recv() => {
                    self.warnings.add(None, text);
                }
                Some(name) = kill_rx.recv() => {
                    let out = self.table.kill(&name);
                    self.apply(out);
                }
                Some(exit) = exit_rx.recv() => {
                    crate::debug_info!("COMMAND", "pid {} exited (success={})", exit.pid, exit.success);
                    let out = self.table.notify_exit(exit);
                    self.apply(out);
                }
                Some(cmd) = register_rx.recv() => {
                    crate::debug_info!("COMMAND", "pid {} registered as {:?}", cmd.pid, cmd.name);
                    let out = self.table.register(cmd);
                    self.apply(out);
                }
                Some(job) = inspect_rx.recv() => {
                    job(&self.table);
                }
                else => break,
            }
        }
        self.table.kill_all();
        log::info!("command coordinator stopped");
    }

    fn apply(&mut self, out: Outcome) {
        for (mount, text) in out.warnings {
            self.warnings.add(mount.as_ref(), text);
        }
        for cmd in out.retired {
            self.free_command(cmd);
        }
    }

    /// Final release of a finished command. Dropping it releases its
    /// directory context.
    fn free_command(&self, cmd: Command) {
        if cmd.is_edit_command {
            let _ = self.edit_done.send(());
        }
        drop(cmd);
    }
}
