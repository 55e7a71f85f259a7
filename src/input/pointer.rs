//! The per-window pointer loop.
//!
//! Each pass flushes queued warnings under the structural lock and flushes
//! the display, then waits for whichever comes first: teardown, a screen
//! resize, a pointer sample, a warning wake-up or a plumb message.
//!
//! Button sweeps are tracked across samples: a press starts a [`Sweep`] on
//! the text under the pointer, motion with the button held extends it, and
//! the release finishes it (select, execute or look).

use crate::editor::{Action, Editor};
use crate::events::EventKind;
use crate::exec;
use crate::input::{WHEEL_DOWN, WHEEL_UP, button_number, scroll_button};
use crate::row::Row;
use crate::text::{KSCROLL_ONE_DOWN, KSCROLL_ONE_UP, TextKind};
use crate::traits::{Display, Mouse, PlumbMessage};
use crate::window::{LockOwner, TextRef, Window};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A button held down over a text.
#[derive(Debug, Clone)]
pub struct Sweep {
    pub text: TextRef,
    /// Logical button, 1 to 3
    pub button: u32,
    /// Rune offset where the press landed
    pub anchor: usize,
    /// Selection before the sweep, restored after execute and look
    pub prev: (usize, usize),
}

pub struct PointerLoop {
    editor: Arc<Editor>,
    window: Arc<Window>,
    display: Arc<dyn Display>,
    sweep: Option<Sweep>,
}

async fn next_plumb(rx: &tokio::sync::Mutex<mpsc::Receiver<PlumbMessage>>) -> PlumbMessage {
    match rx.lock().await.recv().await {
        Some(msg) => msg,
        None => std::future::pending().await,
    }
}

impl PointerLoop {
    pub fn new(editor: Arc<Editor>, window: Arc<Window>, display: Arc<dyn Display>) -> Self {
        Self {
            editor,
            window,
            display,
            sweep: None,
        }
    }

    pub async fn run(mut self, mut pointer: mpsc::Receiver<Mouse>, mut resize: mpsc::Receiver<()>) {
        let mut done = self.window.done();
        let warnings = Arc::clone(self.editor.warnings());
        let plumb = self.editor.plumb_receiver();
        loop {
            // Registered before the flush so a warning queued in between
            // still wakes this loop.
            let arrived = warnings.arrived();
            self.editor.flush_warnings();
            self.display.flush();
            tokio::select! {
                closed = done.changed() => {
                    if closed.is_err() {
                        break;
                    }
                }
                r = resize.recv() => match r {
                    Some(()) => self.resized(),
                    None => break,
                },
                m = pointer.recv() => match m {
                    Some(m) => self.moved(m),
                    None => break,
                },
                _ = arrived => {}
                msg = next_plumb(&plumb) => self.plumbed(msg),
            }
        }
        crate::debug_info!("INPUT", "pointer loop for window {} stopped", self.window.id());
    }

    fn resized(&mut self) {
        if let Err(e) = self.display.attach() {
            log::error!("window {}: can't reattach display: {:#}", self.window.id(), e);
            return;
        }
        let r = self.display.screen_rect();
        let mut row = self.editor.row();
        row.focus.clear_pointer();
        row.column.resize(r);
    }

    fn plumbed(&mut self, msg: PlumbMessage) {
        if msg.kind != "text" {
            return;
        }
        match msg.attr("action").unwrap_or("") {
            "" | "showfile" => exec::plumb_look(&self.editor, &msg),
            "showdata" => exec::plumb_show(&self.editor, &msg),
            other => log::debug!("ignoring plumb action {:?}", other),
        }
    }

    /// Handle one pointer sample.
    pub fn moved(&mut self, m: Mouse) {
        let editor = Arc::clone(&self.editor);
        let mut row = editor.row();
        row.focus.last_point = m.point;
        self.window.set_mouse_point(m.point);
        row.focus.last_display = Some(Arc::clone(&self.display));

        let hit = match &self.sweep {
            Some(sweep) => Some(sweep.text.clone()),
            None => row
                .column
                .which(m.point)
                .map(|(window, kind)| TextRef { window, kind }),
        };

        if let Some(t) = &hit {
            let entered = row
                .focus
                .mouse_text
                .as_ref()
                .is_none_or(|prev| !prev.same_window(t));
            if entered {
                let name = t.window.file().lock().name().to_string();
                editor.events().log(t.window.id(), EventKind::Focus, name);
            }
        }
        if row.focus.mouse_text != hit
            && let Some(prev) = row.focus.mouse_text.take()
        {
            let mut w = prev.window.lock(LockOwner::Mouse);
            w.text_mut(prev.kind).reset_typing();
            w.commit(prev.kind);
        }
        row.focus.mouse_text = hit.clone();
        let Some(t) = hit else {
            return;
        };

        if let Some(sweep) = self.sweep.take() {
            self.continue_sweep(&mut row, sweep, m);
            return;
        }
        if m.buttons == 0 {
            return;
        }
        let but = button_number(m.buttons);
        row.focus.bart_text = Some(t.clone());
        let metrics = row.column.metrics();
        let swap = editor.config().swap_scroll_buttons;

        let mut w = t.window.lock(LockOwner::Mouse);
        if t.kind == TextKind::Body && w.body.scroll_rect().contains(m.point) {
            if but != 0 {
                w.body.reset_typing();
                w.body.scroll(scroll_button(but, swap), m.point, metrics);
            }
            return;
        }
        if m.buttons & (WHEEL_UP | WHEEL_DOWN) != 0 {
            let r = if m.buttons & WHEEL_UP != 0 {
                KSCROLL_ONE_UP
            } else {
                KSCROLL_ONE_DOWN
            };
            w.text_mut(t.kind).reset_typing();
            w.text_mut(t.kind).type_rune(r, false);
            return;
        }
        if w.text(t.kind).scroll_rect().contains(m.point) {
            if but != 0 && t.kind == TextKind::Tag {
                drop(w);
                row.focus.bart_text = Some(TextRef::new(&t.window, TextKind::Body));
            }
            return;
        }

        let button = if m.buttons & 1 != 0 {
            1
        } else if m.buttons & 2 != 0 {
            2
        } else if m.buttons & 4 != 0 {
            3
        } else {
            return;
        };
        w.text_mut(t.kind).reset_typing();
        w.commit(t.kind);
        let text = w.text_mut(t.kind);
        let prev = text.selection();
        let anchor = text.char_at(m.point, metrics);
        text.set_select(anchor, anchor);
        drop(w);
        self.sweep = Some(Sweep {
            text: t,
            button,
            anchor,
            prev,
        });
    }

    /// Extend the sweep while the button is held; finish it on release.
    fn continue_sweep(&mut self, row: &mut Row, sweep: Sweep, m: Mouse) {
        let metrics = row.column.metrics();
        let t = &sweep.text;
        if m.buttons != 0 {
            let mut w = t.window.lock(LockOwner::Mouse);
            let text = w.text_mut(t.kind);
            let q = text.char_at(m.point, metrics);
            let (q0, q1) = if q < sweep.anchor {
                (q, sweep.anchor)
            } else {
                (sweep.anchor, q)
            };
            text.set_select(q0, q1);
            drop(w);
            self.sweep = Some(sweep);
            return;
        }

        if sweep.button == 1 {
            t.window.lock(LockOwner::Mouse).set_tag();
            row.focus.arg_text = Some(t.clone());
            row.focus.sel_text = Some(t.clone());
            if t.kind == TextKind::Body {
                row.focus.active = Some(Arc::clone(&t.window));
            }
            return;
        }

        let (q0, q1, chosen) = {
            let mut w = t.window.lock(LockOwner::Mouse);
            let text = w.text_mut(t.kind);
            let (mut q0, mut q1) = text.selection();
            if q0 == q1 {
                (q0, q1) = text.expand(q0);
            }
            let chosen = text.read(q0, q1);
            text.set_select(sweep.prev.0, sweep.prev.1);
            (q0, q1, chosen)
        };
        if chosen.trim().is_empty() {
            return;
        }
        let action = match sweep.button {
            2 => Action::Execute {
                source: sweep.text,
                command: chosen,
            },
            _ => Action::Look {
                source: sweep.text,
                target: chosen,
                q0,
                q1,
            },
        };
        self.editor.dispatch(action);
    }
}
