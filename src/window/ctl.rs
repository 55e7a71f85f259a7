//! Control text written to a window by a filesystem client.
//!
//! Each line is one message. A client that produced the window uses `dump`
//! and `dumpdir` so a session dump can re-run it; event stream opens are
//! counted so dumps skip windows nobody else can rebuild.

use super::WindowState;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CtlError {
    #[error("unknown control message {0:?}")]
    Unknown(String),

    #[error("{0}: missing argument")]
    MissingArgument(&'static str),
}

impl WindowState {
    /// Apply every line of `text`, stopping at the first bad one.
    pub fn ctl(&mut self, text: &str) -> Result<(), CtlError> {
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            self.ctl_line(line)?;
        }
        Ok(())
    }

    fn ctl_line(&mut self, line: &str) -> Result<(), CtlError> {
        let (word, arg) = match line.trim_start().split_once(' ') {
            Some((word, arg)) => (word, arg.trim()),
            None => (line.trim(), ""),
        };
        let need = |what: &'static str| {
            if arg.is_empty() {
                Err(CtlError::MissingArgument(what))
            } else {
                Ok(arg)
            }
        };
        match word {
            "dump" => self.dump_command = need("dump")?.to_string(),
            "dumpdir" => self.dump_dir = need("dumpdir")?.to_string(),
            "name" => {
                let name = need("name")?;
                self.set_name(name);
            }
            "clean" => {
                self.body.file().lock().clean();
                self.set_tag();
            }
            "dirty" => {
                self.body.file().lock().modded();
                self.set_tag();
            }
            "cleartag" => self.clear_tag(),
            other => return Err(CtlError::Unknown(other.to_string())),
        }
        Ok(())
    }

    /// A client opened the window's event stream.
    pub fn open_events(&mut self) {
        self.event_opens += 1;
    }

    /// A client closed the window's event stream.
    pub fn close_events(&mut self) {
        self.event_opens = self.event_opens.saturating_sub(1);
    }
}
