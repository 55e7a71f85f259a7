//! External command lifecycle.
//!
//! - [`table`]: the pure registration/exit bookkeeping
//! - [`coordinator`]: the task that owns the table and serialises every
//!   lifecycle event through one `select!` loop
//! - [`launch`]: spawning a shell command and reporting back, either
//!   plainly or as an edit command holding the edit barrier

pub mod coordinator;
pub mod launch;
pub mod table;

pub use coordinator::CommandsHandle;
pub use launch::{CommandError, EditOutput, EditRun, launch, launch_edit};
pub use table::CommandTable;

use crate::mount::MountDir;
use crate::traits::ProcessControl;
use std::fmt;
use std::sync::Arc;

/// A running external command.
pub struct Command {
    pub pid: u32,
    /// First word of the command line followed by a space
    pub name: String,
    pub mount: Option<Arc<MountDir>>,
    pub process: Option<Box<dyn ProcessControl>>,
    /// Participates in the edit barrier: retiring it signals edit completion
    pub is_edit_command: bool,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("is_edit_command", &self.is_edit_command)
            .finish_non_exhaustive()
    }
}

impl Command {
    /// Describe a command started from `cmdline`.
    pub fn new(pid: u32, cmdline: &str) -> Self {
        Self {
            pid,
            name: display_name(cmdline),
            mount: None,
            process: None,
            is_edit_command: false,
        }
    }

    pub fn with_mount(mut self, mount: Option<Arc<MountDir>>) -> Self {
        self.mount = mount;
        self
    }

    pub fn with_process(mut self, process: Box<dyn ProcessControl>) -> Self {
        self.process = Some(process);
        self
    }

    pub fn edit_command(mut self) -> Self {
        self.is_edit_command = true;
        self
    }

    /// Signal the process to terminate.
    pub fn kill(&mut self) -> std::io::Result<()> {
        match self.process.as_mut() {
            Some(p) => p.kill(),
            None => Ok(()),
        }
    }
}

/// `Kill` matches on the first word plus a trailing space. Quoted program
/// names keep their spaces.
pub fn display_name(cmdline: &str) -> String {
    let first = match shell_words::split(cmdline) {
        Ok(words) => words.into_iter().next().unwrap_or_default(),
        Err(_) => cmdline.split_whitespace().next().unwrap_or("").to_string(),
    };
    format!("{} ", first)
}

/// Exit report for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessExit {
    pub pid: u32,
    pub success: bool,
    /// Exit description; empty for a clean exit
    pub message: String,
}

impl ProcessExit {
    pub fn success(pid: u32) -> Self {
        Self {
            pid,
            success: true,
            message: String::new(),
        }
    }

    pub fn failure(pid: u32, message: impl Into<String>) -> Self {
        Self {
            pid,
            success: false,
            message: message.into(),
        }
    }
}

/// An OS process, signalled through its process group.
#[derive(Debug, Clone, Copy)]
pub struct OsProcess {
    pid: u32,
}

impl OsProcess {
    pub fn new(pid: u32) -> Self {
        Self { pid }
    }
}

impl ProcessControl for OsProcess {
    #[cfg(unix)]
    fn kill(&mut self) -> std::io::Result<()> {
        let pid = libc::pid_t::try_from(self.pid)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        // SAFETY: kill(2) has no memory-safety preconditions.
        let rc = unsafe { libc::kill(-pid, libc::SIGTERM) };
        if rc == 0 {
            return Ok(());
        }
        // Not a group leader; signal the process alone.
        // SAFETY: as above.
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }

    #[cfg(not(unix))]
    fn kill(&mut self) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("cannot signal process {}", self.pid),
        ))
    }
}
