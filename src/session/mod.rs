//! Session dump and load.
//!
//! [`capture`] turns the live row into a [`winrow_dumpfile::Content`];
//! [`restore`] rebuilds windows from one. Both run under the structural
//! lock. Exec entries are re-run only after that lock is released, since
//! launching a command awaits the command coordinator.

pub mod capture;
pub mod restore;

pub use restore::{MAX_COLUMNS, PendingExec, clamp_selection, parse_tag, validate};

use crate::command::launch;
use crate::editor::Editor;
use crate::mount::MountDir;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use winrow_dumpfile::{Content, DumpfileError};

/// Errors from dumping or loading a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Dumpfile(#[from] DumpfileError),

    #[error("bad window tag in dump file {tag:?}")]
    BadTag { tag: String },

    #[error("bad number of columns {0}")]
    TooManyColumns(usize),

    #[error("column width {0} is invalid")]
    BadColumnPosition(f64),

    #[error("unknown dump file window type")]
    UnknownType,

    #[error("can't change to directory {dir:?}: {source}")]
    Chdir {
        dir: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{name}: {source}")]
    Get {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("can't create window: {0}")]
    Window(String),

    #[error("no dump file")]
    NoDumpPath,
}

impl Editor {
    /// Write the current layout to `path`.
    pub fn dump_session(&self, path: &Path) -> Result<(), SessionError> {
        let content = self.row().dump();
        content.save(path)?;
        log::info!("dumped {} windows to {:?}", content.windows.len(), path);
        Ok(())
    }

    /// Dump to the configured default path.
    pub fn dump_default(&self) -> Result<PathBuf, SessionError> {
        let path = self.config().dump_path().ok_or(SessionError::NoDumpPath)?;
        self.dump_session(&path)?;
        Ok(path)
    }

    /// Read `path` and recreate its windows. `initial` is set for the load
    /// requested at startup, which also restores the row tag.
    ///
    /// Returns how many windows were recreated, counting exec windows whose
    /// command started.
    pub async fn load_session(self: &Arc<Self>, path: &Path, initial: bool) -> Result<usize, SessionError> {
        let content = Content::load(path)?;
        self.load_content(&content, initial).await
    }

    /// Recreate the windows described by `content`.
    pub async fn load_content(self: &Arc<Self>, content: &Content, initial: bool) -> Result<usize, SessionError> {
        let (pending, before, after) = {
            let mut row = self.row();
            let before = row.column.len();
            let pending = row.load(self, content, initial)?;
            let after = row.column.len();
            self.flush_warnings_locked(&mut row);
            (pending, before, after)
        };
        let mut restored = after.saturating_sub(before);
        let shell = self.config().shell_program();
        for exec in pending {
            let mount = MountDir::new(exec.dir.to_string_lossy(), Vec::new());
            let started = launch(
                self.commands(),
                self.warnings(),
                Some(Arc::clone(&mount)),
                &shell,
                &exec.dir,
                &exec.command,
            )
            .await;
            match started {
                Ok(_) => restored += 1,
                Err(e) => self.warnings().add(Some(&mount), format!("Load: {}\n", e)),
            }
        }
        self.flush_warnings();
        log::info!("loaded {} windows", restored);
        Ok(restored)
    }
}
