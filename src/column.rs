//! The column: an ordered stack of windows that exactly tiles a rectangle.

use crate::geometry::{Point, Rect};
use crate::row::Focus;
use crate::text::{SCROLL_WIDTH, TextKind};
use crate::traits::Metrics;
use crate::window::{LockOwner, Window, WindowGuard, WindowId, split_window_rect};
use std::sync::Arc;

/// One window's slot in the column.
#[derive(Debug, Clone)]
pub struct Tile {
    pub window: Arc<Window>,
    pub rect: Rect,
    pub tag_lines: usize,
}

#[derive(Debug)]
pub struct Column {
    tiles: Vec<Tile>,
    rect: Rect,
    metrics: Metrics,
    /// Set once a resize or add has completed
    safe: bool,
    /// Suppresses pointer warping in tests
    fortest: bool,
}

impl Column {
    pub fn new(rect: Rect, metrics: Metrics) -> Self {
        Self {
            tiles: Vec::new(),
            rect,
            metrics,
            safe: false,
            fortest: false,
        }
    }

    /// A column that never moves the pointer.
    pub fn for_test(rect: Rect, metrics: Metrics) -> Self {
        Self {
            fortest: true,
            ..Self::new(rect, metrics)
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    pub fn is_safe(&self) -> bool {
        self.safe
    }

    pub fn is_test(&self) -> bool {
        self.fortest
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Windows top to bottom.
    pub fn windows(&self) -> impl Iterator<Item = &Arc<Window>> {
        self.tiles.iter().map(|t| &t.window)
    }

    pub fn lookup(&self, id: WindowId) -> Option<&Arc<Window>> {
        self.windows().find(|w| w.id() == id)
    }

    fn index_of(&self, id: WindowId) -> Option<usize> {
        self.tiles.iter().position(|t| t.window.id() == id)
    }

    /// Give each tile its share of `r`, proportional to its share of
    /// `old_height`; the last tile absorbs rounding.
    fn distribute(&mut self, r: Rect, old_height: i32) {
        let n = self.tiles.len();
        let new_height = r.height().max(0) as i64;
        let mut y = r.min.y;
        for (i, tile) in self.tiles.iter_mut().enumerate() {
            let room = (r.max.y - y).max(0);
            let h = if i + 1 == n {
                room
            } else if old_height > 0 {
                (tile.rect.height().max(0) as i64 * new_height / old_height as i64) as i32
            } else {
                (new_height / n as i64) as i32
            };
            let h = h.clamp(0, room);
            tile.rect = Rect::new(r.min.x, y, r.max.x, y + h);
            y += h;
        }
    }

    fn apply(&self, tile: &Tile) {
        let mut w = tile.window.lock(LockOwner::Editor);
        w.resize(tile.rect, tile.tag_lines, self.metrics);
    }

    /// Redistribute the column's windows over `r`.
    pub fn resize(&mut self, r: Rect) {
        let old_height = self.rect.height();
        self.rect = r;
        self.distribute(r, old_height);
        for tile in &self.tiles {
            self.apply(tile);
        }
        self.safe = true;
        log::debug!("column resized to {:?} ({} windows)", r, self.tiles.len());
    }

    /// Append `window` at the bottom, taking an equal share of the height
    /// from the windows already present. Returns the new window's rectangle.
    ///
    /// The window must not be locked by the caller.
    pub fn add(&mut self, window: Arc<Window>) -> Rect {
        let n = self.tiles.len() as i32;
        let rect = if n == 0 {
            self.rect
        } else {
            let share = self.rect.height().max(0) / (n + 1);
            let keep = self.rect.with_max_y(self.rect.max.y - share);
            self.distribute(keep, self.rect.height());
            Rect::new(self.rect.min.x, keep.max.y, self.rect.max.x, self.rect.max.y)
        };
        self.tiles.push(Tile {
            window,
            rect,
            tag_lines: 1,
        });
        for tile in &self.tiles {
            self.apply(tile);
        }
        if let Some(tile) = self.tiles.last() {
            tile.window.lock(LockOwner::Editor).in_column = true;
        }
        self.safe = true;
        rect
    }

    /// Remove the locked window. The neighbour below grows upward into the
    /// freed space, or the one above grows downward when the closed window
    /// was last. Returns the neighbour that reclaimed the space.
    ///
    /// Panics if the window is not in this column: the tree is corrupt.
    pub fn close(
        &mut self,
        guard: &mut WindowGuard<'_>,
        free: bool,
        focus: &mut Focus,
    ) -> Option<Arc<Window>> {
        let id = guard.window().id();
        let Some(i) = self.index_of(id) else {
            log::error!("can't find window {} in column", id);
            panic!("can't find window {id}");
        };
        guard.in_column = false;
        let did_restore = focus.restore_pointer(id);
        if free {
            guard.window().close();
        }
        let removed = self.tiles.remove(i);
        focus.forget(id);
        if self.tiles.is_empty() {
            return None;
        }
        let (j, up) = if i == self.tiles.len() {
            (i - 1, false)
        } else {
            (i, true)
        };
        {
            let tile = &mut self.tiles[j];
            tile.rect = if up {
                Rect::new(tile.rect.min.x, removed.rect.min.y, tile.rect.max.x, tile.rect.max.y)
            } else {
                Rect::new(tile.rect.min.x, tile.rect.min.y, tile.rect.max.x, removed.rect.max.y)
            };
        }
        let tile = &self.tiles[j];
        let mut neighbour = tile.window.lock(LockOwner::Editor);
        neighbour.resize(tile.rect, tile.tag_lines, self.metrics);
        if self.safe && !self.fortest && !did_restore && up {
            neighbour.show_del = true;
            drop(neighbour);
            self.move_to_del(&tile.window, tile.rect);
        }
        Some(Arc::clone(&tile.window))
    }

    /// Point at the reclaiming window's tag, where `Del` sits.
    fn move_to_del(&self, window: &Arc<Window>, r: Rect) {
        if let Some(display) = window.display() {
            let (tag, _) = split_window_rect(r, 1, self.metrics);
            display.move_cursor(Point::new(
                tag.min.x + SCROLL_WIDTH + 3,
                tag.min.y + self.metrics.line_height / 2,
            ));
        }
    }

    /// Tear down every window.
    pub fn close_all(&mut self, focus: &mut Focus) {
        for tile in self.tiles.drain(..) {
            tile.window.lock(LockOwner::Editor).in_column = false;
            tile.window.close();
        }
        focus.clear();
    }

    /// The text under `p`, found from tile geometry alone. Points in the
    /// partial line at the bottom of a body hit nothing.
    pub fn which(&self, p: Point) -> Option<(Arc<Window>, TextKind)> {
        let tile = self.tiles.iter().find(|t| t.rect.contains(p))?;
        let (tag, body) = split_window_rect(tile.rect, tile.tag_lines, self.metrics);
        if tag.contains(p) {
            return Some((Arc::clone(&tile.window), TextKind::Tag));
        }
        if body.contains(p) {
            let lh = self.metrics.line_height.max(1);
            let full = (body.height() / lh) * lh;
            if p.y >= body.min.y + full {
                return None;
            }
            return Some((Arc::clone(&tile.window), TextKind::Body));
        }
        None
    }

    /// Change how many lines the tag of a window gets. The caller holds the
    /// window's lock and passes its state.
    pub fn set_tag_lines(&mut self, guard: &mut WindowGuard<'_>, lines: usize) {
        let id = guard.window().id();
        let Some(i) = self.index_of(id) else {
            return;
        };
        let lines = lines.max(1);
        let tile = &mut self.tiles[i];
        if tile.tag_lines != lines {
            tile.tag_lines = lines;
            guard.resize(tile.rect, lines, self.metrics);
        }
    }

    /// True if no window holds edits worth keeping.
    pub fn clean(&self) -> bool {
        self.windows()
            .fold(true, |clean, w| w.lock(LockOwner::Editor).is_clean() && clean)
    }
}
