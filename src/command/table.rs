//! Bookkeeping for running commands.
//!
//! Registration and exit reports come from different tasks, so an exit can
//! arrive before the command it belongs to is registered. Such exits wait
//! in a stash keyed by pid; the matching registration consumes them. Either
//! order finalises each pid exactly once.

use super::{Command, ProcessExit};
use crate::mount::MountDir;
use std::collections::HashMap;
use std::sync::Arc;

/// Side effects the owner of the table must carry out.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Warnings to queue, with their directory context
    pub warnings: Vec<(Option<Arc<MountDir>>, String)>,
    /// Commands that are finished and must be freed
    pub retired: Vec<Command>,
}

impl Outcome {
    fn warn(&mut self, mount: Option<Arc<MountDir>>, text: String) {
        self.warnings.push((mount, text));
    }
}

#[derive(Debug, Default)]
pub struct CommandTable {
    commands: Vec<Command>,
    exited: HashMap<u32, ProcessExit>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a started command, or finalise it at once if its exit already
    /// arrived. Registering a pid that is already present replaces the old
    /// entry; the displaced command is retired.
    pub fn register(&mut self, cmd: Command) -> Outcome {
        let mut out = Outcome::default();
        if let Some(exit) = self.exited.remove(&cmd.pid) {
            if !exit.message.is_empty() {
                out.warn(cmd.mount.clone(), format!("{}\n", exit.message));
            }
            out.retired.push(cmd);
            return out;
        }
        if let Some(i) = self.position(cmd.pid) {
            log::warn!("pid {} registered twice; replacing {:?}", cmd.pid, self.commands[i].name);
            let old = std::mem::replace(&mut self.commands[i], cmd);
            out.retired.push(old);
        } else {
            self.commands.push(cmd);
        }
        out
    }

    /// Record that `exit.pid` terminated.
    pub fn notify_exit(&mut self, exit: ProcessExit) -> Outcome {
        let mut out = Outcome::default();
        match self.position(exit.pid) {
            Some(i) => {
                let cmd = self.commands.remove(i);
                if !exit.success {
                    out.warn(cmd.mount.clone(), format!("{}: {}\n", cmd.name, exit.message));
                }
                out.retired.push(cmd);
            }
            None => {
                self.exited.insert(exit.pid, exit);
            }
        }
        out
    }

    /// Signal every command whose name is exactly `name` plus a space.
    pub fn kill(&mut self, name: &str) -> Outcome {
        let mut out = Outcome::default();
        let want = format!("{} ", name);
        let mut found = false;
        for cmd in self.commands.iter_mut().filter(|c| c.name == want) {
            found = true;
            if let Err(e) = cmd.kill() {
                out.warn(None, format!("kill {}: {}\n", name, e));
            }
        }
        if !found {
            out.warn(None, format!("Kill: no process {}\n", name));
        }
        out
    }

    /// Signal everything still registered.
    pub fn kill_all(&mut self) {
        for cmd in &mut self.commands {
            if let Err(e) = cmd.kill() {
                log::warn!("kill {}(pid {}): {}", cmd.name.trim_end(), cmd.pid, e);
            }
        }
    }

    fn position(&self, pid: u32) -> Option<usize> {
        self.commands.iter().position(|c| c.pid == pid)
    }

    pub fn get(&self, pid: u32) -> Option<&Command> {
        self.commands.iter().find(|c| c.pid == pid)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Exits still waiting for their registration.
    pub fn pending_exits(&self) -> usize {
        self.exited.len()
    }

    /// Names of the registered commands, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ProcessControl;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingKill(Arc<AtomicUsize>);

    impl ProcessControl for CountingKill {
        fn kill(&mut self) -> std::io::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingKill;

    impl ProcessControl for FailingKill {
        fn kill(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("no such process"))
        }
    }

    #[test]
    fn test_register_then_failed_exit() {
        let mut table = CommandTable::new();
        assert!(table.register(Command::new(10, "mk all")).retired.is_empty());
        let out = table.notify_exit(ProcessExit::failure(10, "exit status 1"));
        assert_eq!(out.retired.len(), 1);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].1, "mk : exit status 1\n");
        assert!(table.is_empty());
        assert_eq!(table.pending_exits(), 0);
    }

    #[test]
    fn test_exit_before_register() {
        let mut table = CommandTable::new();
        let out = table.notify_exit(ProcessExit::failure(11, "signal: killed"));
        assert!(out.retired.is_empty() && out.warnings.is_empty());
        assert_eq!(table.pending_exits(), 1);

        let out = table.register(Command::new(11, "sleep 1"));
        assert_eq!(out.retired.len(), 1);
        assert_eq!(out.warnings[0].1, "signal: killed\n");
        assert!(table.is_empty());
        assert_eq!(table.pending_exits(), 0);
    }

    #[test]
    fn test_clean_orphan_exit_is_silent() {
        let mut table = CommandTable::new();
        table.notify_exit(ProcessExit::success(12));
        let out = table.register(Command::new(12, "true"));
        assert_eq!(out.retired.len(), 1);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_either_order_finalises_once() {
        for exit_first in [false, true] {
            let mut table = CommandTable::new();
            let mut retired = 0;
            let mut warnings = Vec::new();
            let steps: Vec<Box<dyn Fn(&mut CommandTable) -> Outcome>> = vec![
                Box::new(|t: &mut CommandTable| t.register(Command::new(5, "cc x.c"))),
                Box::new(|t: &mut CommandTable| t.notify_exit(ProcessExit::failure(5, "exit status 2"))),
            ];
            let order: Vec<usize> = if exit_first { vec![1, 0] } else { vec![0, 1] };
            for i in order {
                let out = steps[i](&mut table);
                retired += out.retired.len();
                warnings.extend(out.warnings);
            }
            assert_eq!(retired, 1);
            assert_eq!(warnings.len(), 1);
            assert!(table.is_empty());
            assert_eq!(table.pending_exits(), 0);
        }
    }

    #[test]
    fn test_double_register_keeps_one_entry() {
        let mut table = CommandTable::new();
        table.register(Command::new(42, "first"));
        let out = table.register(Command::new(42, "second"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(42).map(|c| c.name.as_str()), Some("second "));
        assert_eq!(out.retired.len(), 1);
        assert_eq!(out.retired[0].name, "first ");
    }

    #[test]
    fn test_kill_matches_exact_name() {
        let kills = Arc::new(AtomicUsize::new(0));
        let mut table = CommandTable::new();
        table.register(
            Command::new(1, "make all").with_process(Box::new(CountingKill(Arc::clone(&kills)))),
        );
        table.register(
            Command::new(2, "makefoo").with_process(Box::new(CountingKill(Arc::clone(&kills)))),
        );
        table.register(
            Command::new(3, "make test").with_process(Box::new(CountingKill(Arc::clone(&kills)))),
        );
        let out = table.kill("make");
        assert!(out.warnings.is_empty());
        assert_eq!(kills.load(Ordering::SeqCst), 2);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_kill_miss_warns_once_and_changes_nothing() {
        let mut table = CommandTable::new();
        table.register(Command::new(1, "make all"));
        let out = table.kill("name");
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].1, "Kill: no process name\n");
        assert!(out.retired.is_empty());
        assert_eq!(table.names(), vec!["make ".to_string()]);
    }

    #[test]
    fn test_kill_error_is_reported() {
        let mut table = CommandTable::new();
        table.register(Command::new(1, "stuck").with_process(Box::new(FailingKill)));
        let out = table.kill("stuck");
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].1, "kill stuck: no such process\n");
    }
}
