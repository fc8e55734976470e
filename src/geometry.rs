/// Axis-aligned rectangle in cell units.
///
/// Coordinates may be negative and sizes may exceed the parent's area; a view
/// placed partially or fully offscreen is legal and only resolved at draw time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const ZERO: Rect = Rect::new(0, 0, 0, 0);

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size at the origin.
    pub const fn sized(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Same size, moved to `(0, 0)`.
    pub fn at_origin(&self) -> Rect {
        Rect::sized(self.width, self.height)
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn in_horizontal(&self, x: i32) -> bool {
        x >= self.x && x < self.right()
    }

    pub fn in_vertical(&self, y: i32) -> bool {
        y >= self.y && y < self.bottom()
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.in_horizontal(x) && self.in_vertical(y)
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        intersect(*self, *other)
    }
}

/// Overlap of two rectangles, or [`Rect::ZERO`] when either axis has no overlap.
pub fn intersect(r1: Rect, r2: Rect) -> Rect {
    let (x, width) = if r1.in_horizontal(r2.x) || r2.in_horizontal(r1.x) {
        let left = r1.x.max(r2.x);
        (left, 0.max(r1.right().min(r2.right()) - left))
    } else {
        (0, 0)
    };

    let (y, height) = if r1.in_vertical(r2.y) || r2.in_vertical(r1.y) {
        let top = r1.y.max(r2.y);
        (top, 0.max(r1.bottom().min(r2.bottom()) - top))
    } else {
        (0, 0)
    };

    if width == 0 || height == 0 {
        return Rect::ZERO;
    }

    Rect::new(x, y, width, height)
}
