//! Views onto a [`File`]: a window's tag line or its body.

use crate::file::{File, FileRef};
use crate::geometry::{Point, Rect};
use crate::traits::Metrics;
use crate::window::WindowId;

/// Backspace
pub const KBACKSPACE: char = '\u{8}';
/// Escape
pub const KESCAPE: char = '\u{1b}';
/// Synthetic key: scroll one line up (mouse wheel)
pub const KSCROLL_ONE_UP: char = '\u{F020}';
/// Synthetic key: scroll one line down (mouse wheel)
pub const KSCROLL_ONE_DOWN: char = '\u{F021}';

/// Width of the scroll bar to the left of every text
pub const SCROLL_WIDTH: i32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
    Tag,
    Body,
}

/// Names one text of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextId {
    pub window: WindowId,
    pub kind: TextKind,
}

/// Typing not yet written into the file.
#[derive(Debug, Default)]
struct TypingCache {
    q: usize,
    runes: Vec<char>,
}

impl TypingCache {
    fn end(&self) -> usize {
        self.q + self.runes.len()
    }
}

/// A selectable, scrollable view of a file.
#[derive(Debug)]
pub struct Text {
    kind: TextKind,
    file: FileRef,
    q0: usize,
    q1: usize,
    /// Rune offset of the first visible line
    org: usize,
    rect: Rect,
    scroll_rect: Rect,
    visible_lines: usize,
    cache: TypingCache,
    typing_at: Option<usize>,
}

fn is_word_rune(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '/' | '-' | '+' | ':' | '~')
}

impl Text {
    pub fn new(kind: TextKind, file: FileRef) -> Self {
        Self {
            kind,
            file,
            q0: 0,
            q1: 0,
            org: 0,
            rect: Rect::default(),
            scroll_rect: Rect::default(),
            visible_lines: 0,
            cache: TypingCache::default(),
            typing_at: None,
        }
    }

    pub fn kind(&self) -> TextKind {
        self.kind
    }

    pub fn is_tag(&self) -> bool {
        self.kind == TextKind::Tag
    }

    pub fn file(&self) -> &FileRef {
        &self.file
    }

    /// Length in runes, including uncommitted typing.
    pub fn len(&self) -> usize {
        self.file.lock().len() + self.cache.runes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn rune_in(&self, file: &File, q: usize) -> Option<char> {
        if self.cache.runes.is_empty() || q < self.cache.q {
            return file.rune(q);
        }
        if q < self.cache.end() {
            return self.cache.runes.get(q - self.cache.q).copied();
        }
        file.rune(q - self.cache.runes.len())
    }

    /// The whole text as seen by the user.
    pub fn contents(&self) -> String {
        let file = self.file.lock();
        if self.cache.runes.is_empty() {
            return file.text();
        }
        let mut s = file.read(0, self.cache.q);
        s.extend(self.cache.runes.iter());
        s.push_str(&file.read(self.cache.q, file.len()));
        s
    }

    /// Runes in `[q0, q1)`.
    pub fn read(&self, q0: usize, q1: usize) -> String {
        let file = self.file.lock();
        (q0..q1).map_while(|q| self.rune_in(&file, q)).collect()
    }

    pub fn selection(&self) -> (usize, usize) {
        (self.q0, self.q1)
    }

    /// Set the selection, clamped to the text.
    pub fn set_select(&mut self, q0: usize, q1: usize) {
        let n = self.len();
        self.q1 = q1.min(n);
        self.q0 = q0.min(self.q1);
    }

    /// Select `[q0, q1)` and scroll it into view.
    pub fn show(&mut self, q0: usize, q1: usize) {
        self.set_select(q0, q1);
        let target = self.q0;
        let file = self.file.lock();
        let visible_end = self.visible_end_in(&file);
        if target < self.org || (self.visible_lines > 0 && target > visible_end) {
            let mut q = target;
            while q > 0 && self.rune_in(&file, q - 1) != Some('\n') {
                q -= 1;
            }
            drop(file);
            self.org = q;
        }
    }

    fn visible_end_in(&self, file: &File) -> usize {
        let mut q = self.org;
        let mut lines = 0;
        while lines < self.visible_lines {
            match self.rune_in(file, q) {
                None => break,
                Some('\n') => lines += 1,
                Some(_) => {}
            }
            q += 1;
        }
        q
    }

    pub fn org(&self) -> usize {
        self.org
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn scroll_rect(&self) -> Rect {
        self.scroll_rect
    }

    /// Lay the text out in `r`: scroll bar on the left, content on the right.
    pub fn set_rect(&mut self, r: Rect, metrics: Metrics) {
        let split = (r.min.x + SCROLL_WIDTH).min(r.max.x);
        self.scroll_rect = r.with_max_x(split);
        self.rect = r.with_min_x(split);
        self.visible_lines = if metrics.line_height > 0 {
            (r.height() / metrics.line_height).max(0) as usize
        } else {
            0
        };
    }

    /// Number of whole lines that fit in the text's rectangle.
    pub fn visible_lines(&self) -> usize {
        self.visible_lines
    }

    /// Number of lines in the text (at least one).
    pub fn line_count(&self) -> usize {
        self.contents().matches('\n').count() + 1
    }

    pub fn has_pending(&self) -> bool {
        !self.cache.runes.is_empty()
    }

    /// Write uncommitted typing into the file. Returns whether anything was
    /// written.
    pub fn commit(&mut self) -> bool {
        if self.cache.runes.is_empty() {
            return false;
        }
        let cache = std::mem::take(&mut self.cache);
        let s: String = cache.runes.iter().collect();
        let mut file = self.file.lock();
        file.mark();
        file.insert(cache.q, &s);
        true
    }

    /// Insert `s` at `q` through the file, keeping the selection in place.
    pub fn insert(&mut self, q: usize, s: &str) {
        self.commit();
        let n = self.file.lock().insert(q, s);
        if self.q0 >= q {
            self.q0 += n;
        }
        if self.q1 >= q {
            self.q1 += n;
        }
    }

    /// Delete `[q0, q1)` through the file, keeping the selection in place.
    pub fn delete(&mut self, q0: usize, q1: usize) {
        self.commit();
        self.file.lock().delete(q0, q1);
        let n = q1.saturating_sub(q0);
        let shift = |q: usize| {
            if q >= q1 {
                q - n
            } else if q > q0 {
                q0
            } else {
                q
            }
        };
        self.q0 = shift(self.q0);
        self.q1 = shift(self.q1);
        self.org = shift(self.org);
    }

    /// Replace the contents with `s`, discarding undo history.
    pub fn set_contents(&mut self, s: &str) {
        self.cache = TypingCache::default();
        self.file.lock().reset(s);
        self.q0 = 0;
        self.q1 = 0;
        self.org = 0;
        self.typing_at = None;
    }

    fn mark_if_moved(&mut self) {
        if self.typing_at != Some(self.q0) {
            self.file.lock().mark();
        }
    }

    fn remove(&mut self, q0: usize, q1: usize) {
        if self.kind == TextKind::Tag
            && !self.cache.runes.is_empty()
            && q1 == self.cache.end()
            && q0 >= self.cache.q
        {
            self.cache.runes.truncate(q0 - self.cache.q);
        } else {
            self.commit();
            self.mark_if_moved();
            self.file.lock().delete(q0, q1);
        }
        self.q0 = q0;
        self.q1 = q0;
    }

    fn add(&mut self, s: &str) {
        let q = self.q0;
        let n = s.chars().count();
        if self.kind == TextKind::Tag {
            if self.cache.runes.is_empty() {
                self.cache.q = q;
            } else if self.cache.end() != q {
                self.commit();
                self.cache.q = q;
            }
            self.cache.runes.extend(s.chars());
        } else {
            self.mark_if_moved();
            self.file.lock().insert(q, s);
        }
        self.q0 = q + n;
        self.q1 = q + n;
    }

    /// Leading blanks of the line containing `q`.
    fn indent_at(&self, q: usize) -> String {
        let file = self.file.lock();
        let mut start = q;
        while start > 0 && self.rune_in(&file, start - 1) != Some('\n') {
            start -= 1;
        }
        (start..q)
            .map_while(|i| self.rune_in(&file, i).filter(|c| *c == ' ' || *c == '\t'))
            .collect()
    }

    /// Apply one typed rune at the selection.
    ///
    /// Tag typing is cached until [`Text::commit`]; body typing goes straight
    /// to the file.
    pub fn type_rune(&mut self, r: char, autoindent: bool) {
        match r {
            KSCROLL_ONE_UP => {
                if self.kind == TextKind::Body {
                    self.scroll_lines(-1);
                }
                return;
            }
            KSCROLL_ONE_DOWN => {
                if self.kind == TextKind::Body {
                    self.scroll_lines(1);
                }
                return;
            }
            KESCAPE => {
                self.commit();
                return;
            }
            KBACKSPACE => {
                let (q0, q1) = self.selection();
                if q0 != q1 {
                    self.remove(q0, q1);
                } else if q0 > 0 {
                    self.remove(q0 - 1, q0);
                }
                self.typing_at = Some(self.q0);
                return;
            }
            _ => {}
        }
        let (q0, q1) = self.selection();
        if q0 != q1 {
            self.remove(q0, q1);
        }
        let mut s = r.to_string();
        if r == '\n' && autoindent && self.kind == TextKind::Body {
            s.push_str(&self.indent_at(self.q0));
        }
        self.add(&s);
        self.typing_at = Some(self.q0);
    }

    /// Rune offset under `p`, assuming fixed-size cells and no wrapping.
    pub fn char_at(&self, p: Point, metrics: Metrics) -> usize {
        let line = ((p.y - self.rect.min.y) / metrics.line_height.max(1)).max(0);
        let col = ((p.x - self.rect.min.x) / metrics.char_width.max(1)).max(0);
        let file = self.file.lock();
        let mut q = self.org;
        let mut l = 0;
        while l < line {
            match self.rune_in(&file, q) {
                None => return q,
                Some('\n') => l += 1,
                Some(_) => {}
            }
            q += 1;
        }
        let mut c = 0;
        while c < col {
            match self.rune_in(&file, q) {
                None | Some('\n') => break,
                Some(_) => {
                    q += 1;
                    c += 1;
                }
            }
        }
        q
    }

    /// Extend an empty selection at `q` to the word around it.
    pub fn expand(&self, q: usize) -> (usize, usize) {
        let file = self.file.lock();
        let is_word = |i: usize| self.rune_in(&file, i).is_some_and(is_word_rune);
        let mut q0 = q;
        while q0 > 0 && is_word(q0 - 1) {
            q0 -= 1;
        }
        let mut q1 = q;
        while is_word(q1) {
            q1 += 1;
        }
        (q0, q1)
    }

    /// Move the origin by `n` lines (negative scrolls back).
    pub fn scroll_lines(&mut self, n: i32) {
        let file = self.file.lock();
        let mut org = self.org;
        if n > 0 {
            for _ in 0..n {
                let mut q = org;
                loop {
                    match self.rune_in(&file, q) {
                        None => break,
                        Some('\n') => {
                            q += 1;
                            break;
                        }
                        Some(_) => q += 1,
                    }
                }
                if self.rune_in(&file, q).is_none() && q == org {
                    break;
                }
                org = q;
            }
        } else {
            for _ in 0..n.unsigned_abs() {
                if org == 0 {
                    break;
                }
                let mut q = org - 1;
                while q > 0 && self.rune_in(&file, q - 1) != Some('\n') {
                    q -= 1;
                }
                org = q;
            }
        }
        drop(file);
        self.org = org;
    }

    /// Scroll-bar click: button 1 scrolls back, 3 forward, 2 jumps.
    pub fn scroll(&mut self, but: u32, p: Point, metrics: Metrics) {
        let lines = ((p.y - self.scroll_rect.min.y) / metrics.line_height.max(1)).max(1);
        match but {
            1 => self.scroll_lines(-lines),
            3 => self.scroll_lines(lines),
            2 => {
                let height = self.scroll_rect.height().max(1) as usize;
                let offset = (p.y - self.scroll_rect.min.y).max(0) as usize;
                let n = self.len();
                let target = (n * offset / height).min(n);
                let file = self.file.lock();
                let mut q = target;
                while q > 0 && self.rune_in(&file, q - 1) != Some('\n') {
                    q -= 1;
                }
                drop(file);
                self.org = q;
            }
            _ => {}
        }
    }

    /// Forget any typing-position history so the next keystroke starts a new
    /// undo group.
    pub fn reset_typing(&mut self) {
        self.typing_at = None;
    }
}
