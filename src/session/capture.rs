//! Dumping the live tree into a session document.

use crate::file::FileRef;
use crate::row::{COLUMN_TAG, Row};
use crate::text::TextKind;
use crate::window::{LockOwner, Window};
use std::path::Path;
use std::sync::Arc;
use winrow_dumpfile::{Column, Content, Text, Window as DumpWindow, WindowType};

/// How a file has been claimed by an earlier window in the dump.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Claim {
    /// Shown by a window with open event streams; its zeroxes are dropped
    External,
    Dumped,
}

#[derive(Default)]
struct Claims(Vec<(FileRef, Claim)>);

impl Claims {
    fn get(&self, file: &FileRef) -> Option<Claim> {
        self.0
            .iter()
            .find(|(f, _)| Arc::ptr_eq(f, file))
            .map(|(_, claim)| *claim)
    }

    fn set(&mut self, file: &FileRef, claim: Claim) {
        if self.get(file).is_none() {
            self.0.push((Arc::clone(file), claim));
        }
    }
}

impl Row {
    /// Describe every window in the row, top to bottom.
    pub fn dump(&self) -> Content {
        let mut claims = Claims::default();
        for window in self.column.windows() {
            if window.lock(LockOwner::Session).event_opens > 0 {
                claims.set(window.file(), Claim::External);
            }
        }

        let col = self.column.rect();
        let height = col.height().max(1) as f64;
        let mut windows = Vec::new();
        for window in self.column.windows() {
            let mut w = window.lock(LockOwner::Session);
            w.commit(TextKind::Tag);

            // Windows fed by an external client can't be recreated.
            if w.event_opens > 0 && w.dump_command.is_empty() {
                continue;
            }
            if claims.get(window.file()) == Some(Claim::External) && w.event_opens == 0 {
                continue;
            }

            let (q0, q1) = w.body.selection();
            let mut dw = DumpWindow::new(WindowType::Unsaved);
            dw.body = Text {
                buffer: String::new(),
                q0,
                q1,
            };
            dw.font = if w.font.is_empty() {
                self.var_font.clone()
            } else {
                w.font.clone()
            };
            dw.position = f64::from(w.rect.min.y - col.min.y) * 100.0 / height;
            dw.kind = classify(window, &w.dump_command, &claims);
            match dw.kind {
                WindowType::Exec => {
                    dw.exec_dir = w.dump_dir.clone();
                    dw.exec_command = w.dump_command.clone();
                }
                WindowType::Unsaved => dw.body.buffer = window.file().lock().text(),
                _ => {}
            }
            if matches!(dw.kind, WindowType::Saved | WindowType::Unsaved) {
                claims.set(window.file(), Claim::Dumped);
            }
            let (t0, t1) = w.tag.selection();
            dw.tag = Text {
                buffer: w.tag.contents(),
                q0: t0,
                q1: t1,
            };
            windows.push(dw);
        }

        Content {
            current_dir: self.wdir.clone(),
            var_font: self.var_font.clone(),
            fixed_font: self.fixed_font.clone(),
            row_tag: Text::new(self.tag.contents()),
            columns: vec![Column {
                position: 0.0,
                tag: Text::new(COLUMN_TAG),
            }],
            windows,
        }
    }
}

/// Exec wins over everything, then a second view of a dumped file is a
/// zerox, then a clean file on disk (or any directory) is saved.
fn classify(window: &Window, dump_command: &str, claims: &Claims) -> WindowType {
    if !dump_command.is_empty() {
        return WindowType::Exec;
    }
    if claims.get(window.file()) == Some(Claim::Dumped) {
        return WindowType::Zerox;
    }
    let file = window.file().lock();
    if file.is_dir() || (!file.dirty() && Path::new(file.name()).exists()) {
        WindowType::Saved
    } else {
        WindowType::Unsaved
    }
}
