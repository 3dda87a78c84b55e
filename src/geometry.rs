/// Integer size of a drawing surface or touch sensor, in pixels (or terminal
/// cells when the panel is rendered into a terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A single coordinate on the surface or the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u16,
    pub y: u16,
}

impl Point {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Rectangle anchored on the panel surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> u16 {
        self.y.saturating_add(self.height)
    }

    pub fn right(&self) -> u16 {
        self.x.saturating_add(self.width)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Half-open containment: `[x, x + width) × [y, y + height)`.
    pub fn contains(&self, point: Point) -> bool {
        let right = u32::from(self.x) + u32::from(self.width);
        let bottom = u32::from(self.y) + u32::from(self.height);
        point.x >= self.x
            && u32::from(point.x) < right
            && point.y >= self.y
            && u32::from(point.y) < bottom
    }

    /// True when both rectangles share a region of positive area.
    pub fn overlaps(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let (ax1, ay1) = (u32::from(self.x), u32::from(self.y));
        let (ax2, ay2) = (ax1 + u32::from(self.width), ay1 + u32::from(self.height));
        let (bx1, by1) = (u32::from(other.x), u32::from(other.y));
        let (bx2, by2) = (bx1 + u32::from(other.width), by1 + u32::from(other.height));
        ax1 < bx2 && bx1 < ax2 && ay1 < by2 && by1 < ay2
    }

    /// Shrink the rectangle by `amount` on every side.
    pub fn inset(&self, amount: u16) -> Rect {
        let double = amount.saturating_mul(2);
        Rect {
            x: self.x.saturating_add(amount),
            y: self.y.saturating_add(amount),
            width: self.width.saturating_sub(double),
            height: self.height.saturating_sub(double),
        }
    }
}
