//! Integer screen geometry: points and half-open rectangles.

/// A point in screen pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Component-wise sum
    pub fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    /// Check if the point lies inside `r`
    pub fn is_in(self, r: Rect) -> bool {
        r.contains(self)
    }
}

/// A rectangle covering `[min.x, max.x) × [min.y, max.y)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    /// Create a rectangle from its corner coordinates
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            min: Point::new(x0, y0),
            max: Point::new(x1, y1),
        }
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }

    pub fn is_empty(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y
    }

    /// Check if a point is inside these bounds
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }

    /// The same rectangle with its top edge moved to `y` (clamped to the bottom)
    pub fn with_min_y(self, y: i32) -> Rect {
        Rect::new(self.min.x, y.min(self.max.y), self.max.x, self.max.y)
    }

    /// The same rectangle with its bottom edge moved to `y` (clamped to the top)
    pub fn with_max_y(self, y: i32) -> Rect {
        Rect::new(self.min.x, self.min.y, self.max.x, y.max(self.min.y))
    }

    /// The same rectangle with its right edge moved to `x` (clamped to the left)
    pub fn with_max_x(self, x: i32) -> Rect {
        Rect::new(self.min.x, self.min.y, x.max(self.min.x), self.max.y)
    }

    /// The same rectangle with its left edge moved to `x` (clamped to the right)
    pub fn with_min_x(self, x: i32) -> Rect {
        Rect::new(x.min(self.max.x), self.min.y, self.max.x, self.max.y)
    }
}
