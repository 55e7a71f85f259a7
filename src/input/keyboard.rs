//! The per-window key loop.
//!
//! A key and everything already buffered behind it are typed under one
//! structural-lock acquisition, then the display is flushed once. Typing in
//! a tag is committed only after a quiet period; body typing goes to the
//! file at once.

use crate::editor::Editor;
use crate::input::Debounce;
use crate::text::{TextId, TextKind};
use crate::traits::Display;
use crate::window::{LockOwner, TextRef, Window};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub struct KeyLoop {
    editor: Arc<Editor>,
    window: Arc<Window>,
    display: Arc<dyn Display>,
    /// Text the last key went to
    typed: Option<TextRef>,
    debounce: Debounce,
    delay: Duration,
}

impl KeyLoop {
    pub fn new(editor: Arc<Editor>, window: Arc<Window>, display: Arc<dyn Display>, delay: Duration) -> Self {
        Self {
            editor,
            window,
            display,
            typed: None,
            debounce: Debounce::new(),
            delay,
        }
    }

    pub async fn run(mut self, mut keys: mpsc::Receiver<char>) {
        let mut done = self.window.done();
        loop {
            tokio::select! {
                closed = done.changed() => {
                    if closed.is_err() {
                        break;
                    }
                }
                _ = self.debounce.fired() => self.commit_tag(),
                r = keys.recv() => match r {
                    Some(r) => self.typed(r, &mut keys),
                    None => break,
                },
            }
        }
        crate::debug_info!("INPUT", "key loop for window {} stopped", self.window.id());
    }

    /// Type `first` and every key already queued behind it.
    fn typed(&mut self, first: char, keys: &mut mpsc::Receiver<char>) {
        let click_to_focus = self.editor.config().click_to_focus;
        {
            let mut row = self.editor.row();
            let p = self.window.mouse_point();
            let mut r = first;
            loop {
                let t = row.type_key(r, p, click_to_focus);
                if let Some(t) = &t {
                    // Among zeroxes, the body typed in last is current.
                    t.window.file().lock().set_cur_text(TextId {
                        window: t.window.id(),
                        kind: TextKind::Body,
                    });
                }
                match &t {
                    Some(t) if t.kind == TextKind::Tag => self.debounce.arm(self.delay),
                    _ => self.debounce.disarm(),
                }
                self.typed = t;
                match keys.try_recv() {
                    Ok(next) => r = next,
                    Err(_) => break,
                }
            }
        }
        self.display.flush();
    }

    fn commit_tag(&mut self) {
        let Some(t) = &self.typed else {
            return;
        };
        if t.kind != TextKind::Tag {
            return;
        }
        t.window.lock(LockOwner::Keyboard).commit(TextKind::Tag);
        self.display.flush();
    }
}
