//! Pending diagnostics, coalesced per directory context.
//!
//! Reporters append text from any task; the text is written into `+Errors`
//! windows later, by whoever next flushes under the structural lock.

use crate::mount::MountDir;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::sync::futures::Notified;

/// Buffered text for one directory context.
#[derive(Debug)]
pub struct Warning {
    pub mount: Option<Arc<MountDir>>,
    pub text: String,
}

impl Warning {
    /// Directory whose `+Errors` window shows this warning.
    pub fn dir(&self) -> &str {
        self.mount.as_ref().map(|m| m.dir.as_str()).unwrap_or("")
    }

    pub fn incl(&self) -> &[String] {
        self.mount.as_ref().map(|m| m.incl.as_slice()).unwrap_or(&[])
    }
}

fn same_dir(a: &Option<Arc<MountDir>>, b: Option<&Arc<MountDir>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.dir == b.dir,
        _ => false,
    }
}

#[derive(Debug, Default)]
pub struct Warnings {
    pending: Mutex<Vec<Warning>>,
    arrived: Notify,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `text` for `mount`'s error window and wake idle pointer loops.
    pub fn add(&self, mount: Option<&Arc<MountDir>>, text: impl Into<String>) {
        let text = text.into();
        log::debug!("warning: {}", text.trim_end());
        let mut pending = self.pending.lock();
        if let Some(warn) = pending.iter_mut().find(|w| same_dir(&w.mount, mount)) {
            warn.text.push_str(&text);
            return;
        }
        pending.push(Warning {
            mount: mount.cloned(),
            text,
        });
        drop(pending);
        self.arrived.notify_waiters();
    }

    /// Take everything queued so far.
    pub fn take(&self) -> Vec<Warning> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Resolves at the next [`Warnings::add`] that starts a new buffer.
    pub fn arrived(&self) -> Notified<'_> {
        self.arrived.notified()
    }
}
