//! Long-lived editor tasks that are not tied to a window.
//!
//! - `new_window_coordinator`: creates windows on behalf of the request
//!   transport, which must not touch the tree itself
//! - `action_dispatcher`: runs execute and look actions emitted by the
//!   pointer loops, so a slow external command never stalls input

use super::Editor;
use crate::events::EventKind;
use crate::exec;
use crate::window::{LockOwner, TextRef, Window};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Work handed from the pointer loops to the dispatcher.
#[derive(Debug, Clone)]
pub enum Action {
    /// Button-2 release: run `command` on behalf of `source`
    Execute { source: TextRef, command: String },
    /// Button-3 release: open or search for `target`, selected at
    /// `[q0, q1)` in `source`
    Look {
        source: TextRef,
        target: String,
        q0: usize,
        q1: usize,
    },
}

pub(super) async fn new_window_coordinator(
    editor: Arc<Editor>,
    mut requests: mpsc::Receiver<oneshot::Sender<Result<Arc<Window>>>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            Some(reply) = requests.recv() => {
                let made = {
                    let mut row = editor.row();
                    editor.add_window(&mut row, None, "")
                };
                if let Ok(window) = &made {
                    window.lock(LockOwner::Editor).set_tag();
                    editor.events().log(window.id(), EventKind::New, "");
                }
                // The requester may have given up.
                let _ = reply.send(made);
            }
            else => break,
        }
    }
    log::info!("new-window coordinator stopped");
}

pub(super) async fn action_dispatcher(
    editor: Arc<Editor>,
    mut actions: mpsc::UnboundedReceiver<Action>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            Some(action) = actions.recv() => {
                crate::debug_log!("ACTION", "{:?}", action);
                match action {
                    Action::Execute { source, command } => {
                        exec::execute(&editor, &source, &command).await;
                    }
                    Action::Look { source, target, q0, q1 } => {
                        exec::look(&editor, &source, &target, q0, q1);
                    }
                }
                editor.flush_warnings();
            }
            else => break,
        }
    }
    log::info!("action dispatcher stopped");
}
