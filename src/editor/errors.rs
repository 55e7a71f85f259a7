//! Showing queued warnings in `+Errors` windows.

use super::Editor;
use crate::mount::error_window_name;
use crate::row::Row;
use crate::window::{LockOwner, Window};
use anyhow::Result;
use std::sync::Arc;

impl Editor {
    /// Flush queued warnings, taking the structural lock.
    pub fn flush_warnings(self: &Arc<Self>) {
        if self.warnings.is_empty() {
            return;
        }
        let mut row = self.row();
        self.flush_warnings_locked(&mut row);
    }

    /// Append every queued warning to the error window of its directory,
    /// creating the window if needed. The caller holds the structural lock.
    pub fn flush_warnings_locked(self: &Arc<Self>, row: &mut Row) {
        for warn in self.warnings.take() {
            let window = match self.error_window(row, warn.dir(), warn.incl()) {
                Ok(window) => window,
                Err(e) => {
                    log::error!("can't show warning {:?}: {:#}", warn.text, e);
                    continue;
                }
            };
            let mut w = window.lock(LockOwner::Warnings);
            w.body.commit();
            let n = w.body.len();
            w.body.insert(n, &warn.text);
            let end = w.body.len();
            w.body.show(end, end);
            window.file().lock().treat_as_clean();
            w.set_tag();
            drop(w);
            if let Some(display) = window.display() {
                display.flush();
            }
        }
    }

    /// The `+Errors` window for `dir`, opened on first use.
    fn error_window(self: &Arc<Self>, row: &mut Row, dir: &str, incl: &[String]) -> Result<Arc<Window>> {
        let name = error_window_name(dir);
        if let Some(window) = row.lookfile(&name) {
            return Ok(window);
        }
        let window = self.add_window(row, None, &name)?;
        {
            let mut w = window.lock(LockOwner::Warnings);
            for d in incl {
                w.add_incl(d);
            }
        }
        row.focus.clear_pointer();
        Ok(window)
    }
}
