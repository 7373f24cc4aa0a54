//! Result records produced by the analysis pipeline, once per frame.

/// Axis-aligned rectangle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn top_left(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// One past the last covered pixel on each axis.
    pub fn bottom_right(&self) -> (i32, i32) {
        (self.x + self.width, self.y + self.height)
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
    /// Tracking id; 0 when the algorithm does not track across frames.
    pub id: u32,
    /// Metadata tag; 0 when unused.
    pub tag: u32,
    pub bounds: Rect,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoundingBoxesResult {
    pub boxes: Vec<BoundingBox>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Class name, empty if unavailable.
    pub name: String,
    /// Class id; 0 means none.
    pub id: u32,
    pub tag: u32,
}

/// One algorithm result for a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum AlgorithmResult {
    BoundingBoxes(BoundingBoxesResult),
    Points(Vec<Point>),
    Classification(Vec<Classification>),
}
