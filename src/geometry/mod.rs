//! Geometry primitives
//!
//! Integer rectangles for window-system coordinates, floating point points
//! and affine transforms for path construction, and the immutable [`Region`]
//! value used for shape masks and hit-testing.

mod path;
mod region;

pub use path::{Corners, Path};
pub use region::Region;

/// A point in floating point drawing space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned integer rectangle, `width`/`height` never negative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width: width.max(0),
            height: height.max(0),
        }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    /// Exclusive right edge
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 > x0 && y1 > y0 {
            Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
        } else {
            None
        }
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// 2D affine transform with cairo matrix semantics:
/// `x' = xx*x + xy*y + x0`, `y' = yx*x + yy*y + y0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub xx: f64,
    pub yx: f64,
    pub xy: f64,
    pub yy: f64,
    pub x0: f64,
    pub y0: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub const fn identity() -> Self {
        Self {
            xx: 1.0,
            yx: 0.0,
            xy: 0.0,
            yy: 1.0,
            x0: 0.0,
            y0: 0.0,
        }
    }

    /// `self ∘ other`: apply `other` first, then `self`
    pub fn multiply(&self, other: &Transform) -> Transform {
        Transform {
            xx: self.xx * other.xx + self.xy * other.yx,
            xy: self.xx * other.xy + self.xy * other.yy,
            x0: self.xx * other.x0 + self.xy * other.y0 + self.x0,
            yx: self.yx * other.xx + self.yy * other.yx,
            yy: self.yx * other.xy + self.yy * other.yy,
            y0: self.yx * other.x0 + self.yy * other.y0 + self.y0,
        }
    }

    /// Translate user space, like `cairo_translate`
    pub fn translate(&self, tx: f64, ty: f64) -> Transform {
        self.multiply(&Transform {
            x0: tx,
            y0: ty,
            ..Transform::identity()
        })
    }

    /// Scale user space, like `cairo_scale`
    pub fn scale(&self, sx: f64, sy: f64) -> Transform {
        self.multiply(&Transform {
            xx: sx,
            yy: sy,
            ..Transform::identity()
        })
    }

    /// Rotate user space by `angle` radians, like `cairo_rotate`
    pub fn rotate(&self, angle: f64) -> Transform {
        let (s, c) = angle.sin_cos();
        self.multiply(&Transform {
            xx: c,
            xy: -s,
            yx: s,
            yy: c,
            x0: 0.0,
            y0: 0.0,
        })
    }

    pub fn apply(&self, p: Point) -> Point {
        Point {
            x: self.xx * p.x + self.xy * p.y + self.x0,
            y: self.yx * p.x + self.yy * p.y + self.y0,
        }
    }
}
