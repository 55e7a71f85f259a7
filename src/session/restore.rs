//! Loading a session document back into the row.

use super::SessionError;
use crate::editor::Editor;
use crate::events::EventKind;
use crate::row::Row;
use crate::window::{LockOwner, Window};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use winrow_dumpfile::{Content, Window as DumpWindow, WindowType};

/// Most columns a document may describe
pub const MAX_COLUMNS: usize = 10;

/// An exec window to recreate by re-running its command once the
/// structural lock is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExec {
    pub dir: PathBuf,
    pub command: String,
}

/// Split a dumped tag into the file name and the text after the `|`.
pub fn parse_tag(tag: &str) -> Result<(&str, &str), SessionError> {
    let bad = || SessionError::BadTag {
        tag: tag.to_string(),
    };
    let (name, rest) = tag.split_once(' ').ok_or_else(bad)?;
    let (_, suffix) = rest.split_once('|').ok_or_else(bad)?;
    Ok((name, suffix))
}

/// A saved selection that no longer fits becomes empty at the start.
pub fn clamp_selection(q0: usize, q1: usize, len: usize) -> (usize, usize) {
    if q0 > len || q1 > len || q0 > q1 {
        return (0, 0);
    }
    (q0, q1)
}

/// Reject documents whose column layout can't be laid out.
pub fn validate(content: &Content) -> Result<(), SessionError> {
    if content.columns.len() > MAX_COLUMNS {
        return Err(SessionError::TooManyColumns(content.columns.len()));
    }
    if let Some(col) = content
        .columns
        .iter()
        .find(|col| !(0.0..100.0).contains(&col.position))
    {
        return Err(SessionError::BadColumnPosition(col.position));
    }
    Ok(())
}

impl Row {
    /// Recreate the windows described by `content` at the bottom of the
    /// column. Exec windows are returned for the caller to run after the
    /// structural lock is dropped.
    ///
    /// A bad column layout or an unusable current directory fails the whole
    /// load. A bad window entry is reported as a warning and skipped.
    pub fn load(
        &mut self,
        editor: &Arc<Editor>,
        content: &Content,
        initial: bool,
    ) -> Result<Vec<PendingExec>, SessionError> {
        validate(content)?;
        if !content.current_dir.is_empty() {
            std::env::set_current_dir(&content.current_dir).map_err(|source| SessionError::Chdir {
                dir: content.current_dir.clone(),
                source,
            })?;
            self.wdir = content.current_dir.clone();
        }
        self.var_font = content.var_font.clone();
        self.fixed_font = content.fixed_font.clone();
        if initial && !content.row_tag.buffer.is_empty() {
            self.tag.set_contents(&content.row_tag.buffer);
        }

        let mut pending = Vec::new();
        for (i, dw) in content.windows.iter().enumerate() {
            let restored = match dw.kind {
                WindowType::Exec => {
                    let dir = if dw.exec_dir.is_empty() {
                        self.home.clone()
                    } else {
                        PathBuf::from(&dw.exec_dir)
                    };
                    pending.push(PendingExec {
                        dir,
                        command: dw.exec_command.clone(),
                    });
                    Ok(())
                }
                WindowType::Saved | WindowType::Unsaved | WindowType::Zerox => {
                    self.load_window(editor, dw).map(|_| ())
                }
                WindowType::Unknown => Err(SessionError::UnknownType),
            };
            if let Err(e) = restored {
                log::warn!("session window {}: {}", i, e);
                editor.warnings().add(None, format!("Load: {}\n", e));
            }
        }
        Ok(pending)
    }

    fn load_window(&mut self, editor: &Arc<Editor>, dw: &DumpWindow) -> Result<Arc<Window>, SessionError> {
        let (name, suffix) = parse_tag(&dw.tag.buffer)?;
        // A zerox whose original is gone is opened from disk instead.
        let original = match dw.kind {
            WindowType::Zerox => self.lookfile(name),
            _ => None,
        };
        let window = match &original {
            Some(orig) => editor.add_window(self, Some(orig), ""),
            None => editor.add_window(self, None, name),
        }
        .map_err(|e| SessionError::Window(format!("{:#}", e)))?;

        let mut failed = None;
        {
            let mut w = window.lock(LockOwner::Session);
            w.clear_tag();
            let n = w.tag.len();
            w.tag.insert(n, suffix);
            if !dw.font.is_empty() {
                w.font = dw.font.clone();
            }

            if dw.kind == WindowType::Unsaved {
                w.body.set_contents(&dw.body.buffer);
                window.file().lock().modded();
            } else if original.is_none() && !name.is_empty() && !name.starts_with(['+', '-']) {
                let loaded = window.file().lock().load_path(Path::new(name));
                if let Err(source) = loaded {
                    failed = Some(SessionError::Get {
                        name: name.to_string(),
                        source,
                    });
                }
            }

            let (q0, q1) = clamp_selection(dw.body.q0, dw.body.q1, w.body.len());
            w.body.show(q0, q1);
            w.set_tag();
            let (t0, t1) = clamp_selection(dw.tag.q0, dw.tag.q1, w.tag.len());
            w.tag.set_select(t0, t1);
        }
        editor.events().log(window.id(), EventKind::New, name);
        match failed {
            Some(e) => Err(e),
            None => Ok(window),
        }
    }
}
