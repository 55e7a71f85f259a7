//! Running a command line in a shell and wiring it into the lifecycle.

use super::{Command, CommandsHandle, OsProcess, ProcessExit};
use crate::mount::MountDir;
use crate::warnings::Warnings;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command as ShellCommand};
use tokio::sync::oneshot;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("empty command line")]
    Empty,

    #[error("{dir:?} is not a directory")]
    BadDirectory { dir: PathBuf },

    #[error("can't run {cmdline:?}: {source}")]
    Spawn {
        cmdline: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{cmdline:?} started without a process id")]
    NoPid { cmdline: String },
}

/// Start `cmdline` under `shell -c` in `dir`.
///
/// The command is registered with the coordinator before this returns.
/// Its stdout and stderr become warnings for `mount`, and its exit is
/// reported back to the coordinator from a background task.
pub async fn launch(
    commands: &CommandsHandle,
    warnings: &Arc<Warnings>,
    mount: Option<Arc<MountDir>>,
    shell: &str,
    dir: &Path,
    cmdline: &str,
) -> Result<u32, CommandError> {
    let (mut child, cmdline, pid) = spawn_shell(shell, dir, cmdline, Stdio::null())?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    commands
        .register(
            Command::new(pid, cmdline)
                .with_mount(mount.clone())
                .with_process(Box::new(OsProcess::new(pid))),
        )
        .await;

    let commands = commands.clone();
    let warnings = Arc::clone(warnings);
    tokio::spawn(async move {
        let out = stdout.map(|s| tokio::spawn(forward_lines(s, Arc::clone(&warnings), mount.clone())));
        let err = stderr.map(|s| tokio::spawn(forward_lines(s, Arc::clone(&warnings), mount.clone())));
        let (exit, _) = wait_exit(&mut child, pid).await;
        // Let output land before the exit warning.
        for reader in [out, err].into_iter().flatten() {
            let _ = reader.await;
        }
        commands.notify_exit(exit).await;
    });

    Ok(pid)
}

/// What an edit command produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EditOutput {
    /// Captured stdout; empty unless capture was asked for
    pub text: String,
    /// Ended by a signal, typically `Kill`
    pub signaled: bool,
}

/// A running edit command.
#[derive(Debug)]
pub struct EditRun {
    pub pid: u32,
    /// Resolves once the command's stdout is closed and it has exited
    pub output: oneshot::Receiver<EditOutput>,
}

/// Start `cmdline` as an edit command.
///
/// `input`, if any, is written to the command's stdin. With `capture`,
/// stdout is collected into [`EditOutput::text`]; otherwise it becomes
/// warnings like stderr. The output is delivered before the exit is
/// reported, so a caller that awaits it and then
/// [`Editor::wait_edit_done`](crate::editor::Editor::wait_edit_done) sees
/// both in order.
#[allow(clippy::too_many_arguments)]
pub async fn launch_edit(
    commands: &CommandsHandle,
    warnings: &Arc<Warnings>,
    mount: Option<Arc<MountDir>>,
    shell: &str,
    dir: &Path,
    cmdline: &str,
    input: Option<String>,
    capture: bool,
) -> Result<EditRun, CommandError> {
    let stdin = if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    };
    let (mut child, cmdline, pid) = spawn_shell(shell, dir, cmdline, stdin)?;
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    commands
        .register(
            Command::new(pid, cmdline)
                .with_mount(mount.clone())
                .with_process(Box::new(OsProcess::new(pid)))
                .edit_command(),
        )
        .await;

    let (tx, rx) = oneshot::channel();
    let commands = commands.clone();
    let warnings = Arc::clone(warnings);
    tokio::spawn(async move {
        let feed = stdin.zip(input).map(|(mut stdin, input)| {
            tokio::spawn(async move {
                // A command that exits without reading closes the pipe early.
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    log::debug!("writing command input: {}", e);
                }
            })
        });
        let out = stdout.map(|s| {
            if capture {
                tokio::spawn(read_all(s))
            } else {
                let warnings = Arc::clone(&warnings);
                let mount = mount.clone();
                tokio::spawn(async move {
                    forward_lines(s, warnings, mount).await;
                    String::new()
                })
            }
        });
        let err = stderr.map(|s| tokio::spawn(forward_lines(s, Arc::clone(&warnings), mount.clone())));
        let (exit, signaled) = wait_exit(&mut child, pid).await;
        if let Some(feed) = feed {
            let _ = feed.await;
        }
        let text = match out {
            Some(reader) => reader.await.unwrap_or_default(),
            None => String::new(),
        };
        if let Some(reader) = err {
            let _ = reader.await;
        }
        // The caller may have given up.
        let _ = tx.send(EditOutput { text, signaled });
        commands.notify_exit(exit).await;
    });

    Ok(EditRun { pid, output: rx })
}

/// Spawn `cmdline` under `shell -c` in its own process group.
fn spawn_shell<'a>(
    shell: &str,
    dir: &Path,
    cmdline: &'a str,
    stdin: Stdio,
) -> Result<(Child, &'a str, u32), CommandError> {
    let cmdline = cmdline.trim();
    if cmdline.is_empty() {
        return Err(CommandError::Empty);
    }
    if !dir.is_dir() {
        return Err(CommandError::BadDirectory {
            dir: dir.to_path_buf(),
        });
    }

    let mut cmd = ShellCommand::new(shell);
    cmd.arg("-c")
        .arg(cmdline)
        .current_dir(dir)
        .stdin(stdin)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false);
    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn().map_err(|source| CommandError::Spawn {
        cmdline: cmdline.to_string(),
        source,
    })?;
    let pid = child.id().ok_or_else(|| CommandError::NoPid {
        cmdline: cmdline.to_string(),
    })?;
    log::info!("started {:?} in {:?} as pid {}", cmdline, dir, pid);
    Ok((child, cmdline, pid))
}

/// Wait for `child` and describe how it ended. The flag is set when no
/// exit code was produced.
async fn wait_exit(child: &mut Child, pid: u32) -> (ProcessExit, bool) {
    match child.wait().await {
        Ok(status) if status.success() => (ProcessExit::success(pid), false),
        Ok(status) => (ProcessExit::failure(pid, status.to_string()), status.code().is_none()),
        Err(e) => (ProcessExit::failure(pid, e.to_string()), false),
    }
}

async fn read_all<R>(mut reader: R) -> String
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Err(e) = reader.read_to_end(&mut buf).await {
        log::warn!("reading command output: {}", e);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn forward_lines<R>(reader: R, warnings: Arc<Warnings>, mount: Option<Arc<MountDir>>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => warnings.add(mount.as_ref(), format!("{}\n", line)),
            Ok(None) => break,
            Err(e) => {
                log::warn!("reading command output: {}", e);
                break;
            }
        }
    }
}
