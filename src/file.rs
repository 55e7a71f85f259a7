//! The shared text buffer behind one or more views.
//!
//! A `File` stores runes, a name, and an undo history grouped by marks.
//! Several `Text`s (a window's body and its zeroxes) can share one `File`
//! through a [`FileRef`]; identity of the `Arc` is what makes two windows
//! zeroxes of each other.

use crate::text::TextId;
use parking_lot::Mutex;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Shared handle to a file buffer.
pub type FileRef = Arc<Mutex<File>>;

#[derive(Debug, Clone)]
enum Edit {
    Insert { q: usize, runes: Vec<char> },
    Delete { q: usize, runes: Vec<char> },
}

#[derive(Debug, Clone)]
struct UndoGroup {
    id: u64,
    edits: Vec<Edit>,
}

/// A text buffer with undo.
#[derive(Debug, Default)]
pub struct File {
    name: String,
    runes: Vec<char>,
    is_dir: bool,
    undo: Vec<UndoGroup>,
    redo: Vec<UndoGroup>,
    next_group_id: u64,
    open_group: bool,
    clean_state: u64,
    modded: bool,
    cur_text: Option<TextId>,
}

impl File {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a new file in a shared handle.
    pub fn shared(self) -> FileRef {
        Arc::new(Mutex::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Number of runes in the buffer.
    pub fn len(&self) -> usize {
        self.runes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runes.is_empty()
    }

    /// Runes in `[q0, q1)` as a string, clamped to the buffer.
    pub fn read(&self, q0: usize, q1: usize) -> String {
        let q1 = q1.min(self.runes.len());
        let q0 = q0.min(q1);
        self.runes[q0..q1].iter().collect()
    }

    /// Whole buffer as a string.
    pub fn text(&self) -> String {
        self.runes.iter().collect()
    }

    pub fn rune(&self, q: usize) -> Option<char> {
        self.runes.get(q).copied()
    }

    /// Start a new undo group at the next edit.
    pub fn mark(&mut self) {
        self.open_group = false;
    }

    fn record(&mut self, edit: Edit) {
        self.redo.clear();
        if !self.open_group || self.undo.is_empty() {
            self.next_group_id += 1;
            self.undo.push(UndoGroup {
                id: self.next_group_id,
                edits: Vec::new(),
            });
            self.open_group = true;
        }
        if let Some(group) = self.undo.last_mut() {
            group.edits.push(edit);
        }
    }

    /// Insert `s` at rune offset `q` (clamped to the end).
    pub fn insert(&mut self, q: usize, s: &str) -> usize {
        let q = q.min(self.runes.len());
        let runes: Vec<char> = s.chars().collect();
        let len = runes.len();
        if len == 0 {
            return 0;
        }
        self.runes.splice(q..q, runes.iter().copied());
        self.record(Edit::Insert { q, runes });
        len
    }

    /// Delete runes `[q0, q1)` (clamped to the buffer).
    pub fn delete(&mut self, q0: usize, q1: usize) {
        let q1 = q1.min(self.runes.len());
        let q0 = q0.min(q1);
        if q0 == q1 {
            return;
        }
        let runes: Vec<char> = self.runes.drain(q0..q1).collect();
        self.record(Edit::Delete { q: q0, runes });
    }

    /// Replace the whole buffer without recording undo, e.g. after a load.
    pub fn reset(&mut self, s: &str) {
        self.runes = s.chars().filter(|&c| c != '\0').collect();
        self.undo.clear();
        self.redo.clear();
        self.open_group = false;
        self.clean_state = 0;
        self.modded = false;
    }

    fn state(&self) -> u64 {
        self.undo.last().map(|g| g.id).unwrap_or(0)
    }

    fn apply_inverse(&mut self, group: &UndoGroup) -> (usize, usize) {
        let mut sel = (0, 0);
        for edit in group.edits.iter().rev() {
            match edit {
                Edit::Insert { q, runes } => {
                    let end = (*q + runes.len()).min(self.runes.len());
                    self.runes.drain(*q..end);
                    sel = (*q, *q);
                }
                Edit::Delete { q, runes } => {
                    self.runes.splice(*q..*q, runes.iter().copied());
                    sel = (*q, *q + runes.len());
                }
            }
        }
        sel
    }

    fn apply_forward(&mut self, group: &UndoGroup) -> (usize, usize) {
        let mut sel = (0, 0);
        for edit in &group.edits {
            match edit {
                Edit::Insert { q, runes } => {
                    self.runes.splice(*q..*q, runes.iter().copied());
                    sel = (*q, *q + runes.len());
                }
                Edit::Delete { q, runes } => {
                    let end = (*q + runes.len()).min(self.runes.len());
                    self.runes.drain(*q..end);
                    sel = (*q, *q);
                }
            }
        }
        sel
    }

    /// Undo the most recent group; returns the affected selection.
    pub fn undo(&mut self) -> Option<(usize, usize)> {
        let group = self.undo.pop()?;
        let sel = self.apply_inverse(&group);
        self.redo.push(group);
        self.open_group = false;
        Some(sel)
    }

    /// Redo the most recently undone group.
    pub fn redo(&mut self) -> Option<(usize, usize)> {
        let group = self.redo.pop()?;
        let sel = self.apply_forward(&group);
        self.undo.push(group);
        self.open_group = false;
        Some(sel)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// True if there are edits since the last clean mark.
    pub fn dirty(&self) -> bool {
        self.modded || self.state() != self.clean_state
    }

    /// Record the current state as saved.
    pub fn clean(&mut self) {
        self.clean_state = self.state();
        self.modded = false;
    }

    /// Treat the contents as saved without touching disk (e.g. `+Errors`).
    pub fn treat_as_clean(&mut self) {
        self.clean();
    }

    /// Mark the file modified even though no edit was recorded.
    pub fn modded(&mut self) {
        self.modded = true;
    }

    /// The view most recently typed into.
    pub fn cur_text(&self) -> Option<TextId> {
        self.cur_text
    }

    pub fn set_cur_text(&mut self, id: TextId) {
        self.cur_text = Some(id);
    }

    /// Replace the contents with `path` read from disk and mark clean.
    ///
    /// Directories are listed one entry per line, subdirectories with a
    /// trailing `/`.
    pub fn load_path(&mut self, path: &Path) -> io::Result<()> {
        let metadata = std::fs::metadata(path)?;
        if metadata.is_dir() {
            let mut entries: Vec<String> = std::fs::read_dir(path)?
                .filter_map(|e| e.ok())
                .map(|e| {
                    let mut name = e.file_name().to_string_lossy().to_string();
                    if e.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                        name.push('/');
                    }
                    name
                })
                .collect();
            entries.sort();
            let mut listing = entries.join("\n");
            if !listing.is_empty() {
                listing.push('\n');
            }
            self.reset(&listing);
            self.is_dir = true;
        } else {
            let bytes = std::fs::read(path)?;
            self.reset(&String::from_utf8_lossy(&bytes));
            self.is_dir = false;
        }
        self.clean();
        Ok(())
    }

    /// Write the buffer to its name and mark clean.
    pub fn save(&mut self) -> io::Result<()> {
        if self.name.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "no file name"));
        }
        if self.is_dir {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a directory", self.name),
            ));
        }
        std::fs::write(&self.name, self.text())?;
        self.clean();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_groups_follow_marks() {
        let mut f = File::new();
        f.insert(0, "hello");
        f.insert(5, " world");
        f.mark();
        f.delete(0, 6);
        assert_eq!(f.text(), "world");

        assert_eq!(f.undo(), Some((0, 6)));
        assert_eq!(f.text(), "hello world");
        assert_eq!(f.undo(), Some((0, 0)));
        assert_eq!(f.text(), "");
        assert!(!f.can_undo());

        f.redo();
        assert_eq!(f.text(), "hello world");
        f.redo();
        assert_eq!(f.text(), "world");
        assert!(!f.can_redo());
    }

    #[test]
    fn test_dirty_tracks_clean_state() {
        let mut f = File::new();
        assert!(!f.dirty());
        f.insert(0, "x");
        assert!(f.dirty());
        f.clean();
        assert!(!f.dirty());
        f.mark();
        f.insert(1, "y");
        assert!(f.dirty());
        f.undo();
        assert!(!f.dirty());
        f.modded();
        assert!(f.dirty());
        f.treat_as_clean();
        assert!(!f.dirty());
    }

    #[test]
    fn test_read_clamps() {
        let mut f = File::new();
        f.insert(0, "abc");
        assert_eq!(f.read(1, 99), "bc");
        assert_eq!(f.read(5, 2), "");
    }

    #[test]
    fn test_load_directory_listing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        let mut f = File::new();
        f.load_path(dir.path()).unwrap();
        assert!(f.is_dir());
        assert_eq!(f.text(), "a/\nb.txt\n");
        assert!(!f.dirty());
    }
}
