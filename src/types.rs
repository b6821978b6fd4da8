use serde::{Deserialize, Serialize};

/// An axis-aligned window in source-image pixel coordinates.
///
/// The scanner emits one of these for every window that passes all stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Two boxes intersect unless one lies entirely to one side of the other.
    /// Boxes that only share an edge count as intersecting.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(other.x > self.right()
            || other.right() < self.x
            || other.y > self.bottom()
            || other.bottom() < self.y)
    }

    /// Area of the intersection, zero when the boxes merely touch.
    pub fn overlap_area(&self, other: &Rect) -> u64 {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return 0;
        }
        (x1 - x0) as u64 * (y1 - y0) as u64
    }
}

/// A merged detection: the rounded mean of a cluster of raw windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Number of raw windows merged into this detection.
    pub total: usize,
}

impl Detection {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

impl From<Detection> for Rect {
    fn from(d: Detection) -> Self {
        d.rect()
    }
}
