use std::f64::consts::{FRAC_PI_2, PI};
use tiny_skia::{FillRule, Mask, PathBuilder};

use super::{Point, Region, Transform};

#[derive(Debug, Clone, Copy, PartialEq)]
enum PathSegment {
    MoveTo(Point),
    LineTo(Point),
    CurveTo(Point, Point, Point),
    Close,
}

/// Which corners of a rectangle get rounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Corners {
    pub top_left: bool,
    pub top_right: bool,
    pub bottom_right: bool,
    pub bottom_left: bool,
}

impl Corners {
    pub const NONE: Corners = Corners {
        top_left: false,
        top_right: false,
        bottom_right: false,
        bottom_left: false,
    };
    pub const ALL: Corners = Corners {
        top_left: true,
        top_right: true,
        bottom_right: true,
        bottom_left: true,
    };
    pub const TOP: Corners = Corners {
        top_left: true,
        top_right: true,
        bottom_right: false,
        bottom_left: false,
    };
    pub const TOP_LEFT: Corners = Corners {
        top_left: true,
        ..Corners::NONE
    };
    pub const TOP_RIGHT: Corners = Corners {
        top_right: true,
        ..Corners::NONE
    };
}

/// Vector path built from move/line/curve/close segments
///
/// Arcs are stored as cubic béziers. Regions come from a non-anti-aliased
/// winding fill, the same rasterization [`crate::canvas::Canvas::fill`] uses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    segments: Vec<PathSegment>,
    current: Option<Point>,
    subpath_start: Option<Point>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[cfg(test)]
    pub fn curve_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, PathSegment::CurveTo(..)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn current_point(&self) -> Option<Point> {
        self.current
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        let p = Point::new(x, y);
        self.segments.push(PathSegment::MoveTo(p));
        self.current = Some(p);
        self.subpath_start = Some(p);
        self
    }

    /// Line to `(x, y)`; starts a subpath when there is no current point
    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        if self.current.is_none() {
            return self.move_to(x, y);
        }
        let p = Point::new(x, y);
        self.segments.push(PathSegment::LineTo(p));
        self.current = Some(p);
        self
    }

    pub fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) -> &mut Self {
        if self.current.is_none() {
            self.move_to(x1, y1);
        }
        let p = Point::new(x3, y3);
        self.segments.push(PathSegment::CurveTo(
            Point::new(x1, y1),
            Point::new(x2, y2),
            p,
        ));
        self.current = Some(p);
        self
    }

    pub fn close(&mut self) -> &mut Self {
        if self.current.is_some() {
            self.segments.push(PathSegment::Close);
            self.current = self.subpath_start;
        }
        self
    }

    /// Clockwise arc (increasing angle), like `cairo_arc`
    pub fn arc(&mut self, cx: f64, cy: f64, radius: f64, a1: f64, mut a2: f64) -> &mut Self {
        while a2 < a1 {
            a2 += 2.0 * PI;
        }
        self.arc_segments(cx, cy, radius, a1, a2)
    }

    /// Counter-clockwise arc (decreasing angle), like `cairo_arc_negative`
    pub fn arc_negative(&mut self, cx: f64, cy: f64, radius: f64, a1: f64, mut a2: f64) -> &mut Self {
        while a2 > a1 {
            a2 -= 2.0 * PI;
        }
        self.arc_segments(cx, cy, radius, a1, a2)
    }

    fn arc_segments(&mut self, cx: f64, cy: f64, radius: f64, a1: f64, a2: f64) -> &mut Self {
        let start = Point::new(cx + radius * a1.cos(), cy + radius * a1.sin());
        self.line_to(start.x, start.y);
        if radius <= 0.0 || a1 == a2 {
            return self;
        }

        let pieces = ((a2 - a1).abs() / FRAC_PI_2).ceil().max(1.0) as usize;
        let step = (a2 - a1) / pieces as f64;
        let k = 4.0 / 3.0 * (step / 4.0).tan();
        let mut a = a1;
        for _ in 0..pieces {
            let b = a + step;
            let (sa, ca) = a.sin_cos();
            let (sb, cb) = b.sin_cos();
            self.curve_to(
                cx + radius * (ca - k * sa),
                cy + radius * (sa + k * ca),
                cx + radius * (cb + k * sb),
                cy + radius * (sb - k * cb),
                cx + radius * cb,
                cy + radius * sb,
            );
            a = b;
        }
        self
    }

    pub fn rectangle(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.move_to(x, y)
            .line_to(x + width, y)
            .line_to(x + width, y + height)
            .line_to(x, y + height)
            .close()
    }

    /// Rectangle with the selected corners rounded by `radius`
    pub fn rounded_rect(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        radius: f64,
        corners: Corners,
    ) -> &mut Self {
        let r = radius.min(width / 2.0).min(height / 2.0).max(0.0);
        let pick = |on: bool| if on { r } else { 0.0 };
        let (tl, tr, br, bl) = (
            pick(corners.top_left),
            pick(corners.top_right),
            pick(corners.bottom_right),
            pick(corners.bottom_left),
        );

        self.move_to(x + tl, y);
        self.line_to(x + width - tr, y);
        if tr > 0.0 {
            self.arc(x + width - tr, y + tr, tr, -FRAC_PI_2, 0.0);
        }
        self.line_to(x + width, y + height - br);
        if br > 0.0 {
            self.arc(x + width - br, y + height - br, br, 0.0, FRAC_PI_2);
        }
        self.line_to(x + bl, y + height);
        if bl > 0.0 {
            self.arc(x + bl, y + height - bl, bl, FRAC_PI_2, PI);
        }
        self.line_to(x, y + tl);
        if tl > 0.0 {
            self.arc(x + tl, y + tl, tl, PI, 1.5 * PI);
        }
        self.close()
    }

    pub fn transform(&self, t: &Transform) -> Path {
        let segments = self
            .segments
            .iter()
            .map(|s| match *s {
                PathSegment::MoveTo(p) => PathSegment::MoveTo(t.apply(p)),
                PathSegment::LineTo(p) => PathSegment::LineTo(t.apply(p)),
                PathSegment::CurveTo(a, b, c) => {
                    PathSegment::CurveTo(t.apply(a), t.apply(b), t.apply(c))
                }
                PathSegment::Close => PathSegment::Close,
            })
            .collect();
        Path {
            segments,
            current: self.current.map(|p| t.apply(p)),
            subpath_start: self.subpath_start.map(|p| t.apply(p)),
        }
    }

    /// Rasterizer path, `None` when there is nothing to fill
    pub fn to_skia(&self) -> Option<tiny_skia::Path> {
        let mut pb = PathBuilder::new();
        let f = |v: f64| v as f32;
        for seg in &self.segments {
            match *seg {
                PathSegment::MoveTo(p) => pb.move_to(f(p.x), f(p.y)),
                PathSegment::LineTo(p) => pb.line_to(f(p.x), f(p.y)),
                PathSegment::CurveTo(a, b, p) => pb.cubic_to(f(a.x), f(a.y), f(b.x), f(b.y), f(p.x), f(p.y)),
                PathSegment::Close => pb.close(),
            }
        }
        pb.finish()
    }

    /// Region covered by filling the path
    pub fn to_region(&self) -> Region {
        let Some(path) = self.to_skia() else {
            return Region::new();
        };
        let bounds = path.bounds();
        let (x0, y0) = (bounds.left().floor(), bounds.top().floor());
        let width = (bounds.right().ceil() - x0) as u32 + 1;
        let height = (bounds.bottom().ceil() - y0) as u32 + 1;
        let Some(mut mask) = Mask::new(width, height) else {
            return Region::new();
        };
        mask.fill_path(
            &path,
            FillRule::Winding,
            false,
            tiny_skia::Transform::from_translate(-x0, -y0),
        );

        let (x0, y0) = (x0 as i32, y0 as i32);
        let rows = mask
            .data()
            .chunks_exact(width as usize)
            .enumerate()
            .filter_map(|(row, coverage)| {
                let mut spans = Vec::new();
                let mut start = None;
                for (x, &a) in coverage.iter().chain(std::iter::once(&0)).enumerate() {
                    match (start, a > 0) {
                        (None, true) => start = Some(x),
                        (Some(s), false) => {
                            spans.push((x0 + s as i32, x0 + x as i32));
                            start = None;
                        }
                        _ => {}
                    }
                }
                (!spans.is_empty()).then_some((y0 + row as i32, spans))
            })
            .collect();
        Region::from_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    #[test]
    fn test_rectangle_fills_exact_pixels() {
        let mut path = Path::new();
        path.rectangle(2.0, 3.0, 10.0, 4.0);
        assert_eq!(path.to_region(), Region::from_rect(Rect::new(2, 3, 10, 4)));
    }

    #[test]
    fn test_fill_is_idempotent() {
        let mut path = Path::new();
        path.rounded_rect(0.0, 0.0, 80.0, 30.0, 10.0, Corners::ALL);
        assert_eq!(path.to_region(), path.to_region());
    }

    #[test]
    fn test_rounded_corners_are_cut() {
        let mut path = Path::new();
        path.rounded_rect(0.0, 0.0, 40.0, 40.0, 10.0, Corners::TOP);
        let region = path.to_region();
        assert!(!region.contains(0, 0));
        assert!(!region.contains(39, 0));
        // Bottom corners stay square
        assert!(region.contains(0, 39));
        assert!(region.contains(39, 39));
        assert!(region.contains(20, 20));
    }

    #[test]
    fn test_arc_ends_on_circle() {
        let mut path = Path::new();
        path.arc(0.0, 0.0, 10.0, 0.0, FRAC_PI_2);
        let end = path.current_point().unwrap();
        assert!((end.x).abs() < 1e-9);
        assert!((end.y - 10.0).abs() < 1e-9);
        assert_eq!(path.curve_count(), 1);
    }

    #[test]
    fn test_arc_negative_wraps_angle() {
        let mut path = Path::new();
        path.arc_negative(0.0, 0.0, 5.0, -FRAC_PI_2, -PI);
        let end = path.current_point().unwrap();
        assert!((end.x + 5.0).abs() < 1e-9);
        assert!(end.y.abs() < 1e-9);
    }

    #[test]
    fn test_transform_moves_region() {
        let mut path = Path::new();
        path.rectangle(0.0, 0.0, 4.0, 2.0);
        let moved = path.transform(&Transform::identity().translate(10.0, 5.0));
        assert_eq!(moved.to_region(), Region::from_rect(Rect::new(10, 5, 4, 2)));
    }

    #[test]
    fn test_self_overlapping_subpaths_use_nonzero() {
        let mut path = Path::new();
        path.rectangle(0.0, 0.0, 10.0, 10.0);
        path.rectangle(5.0, 0.0, 10.0, 10.0);
        assert_eq!(path.to_region(), Region::from_rect(Rect::new(0, 0, 15, 10)));
    }

    #[test]
    fn test_empty_path_has_empty_region() {
        assert!(Path::new().to_region().is_empty());
        assert!(Path::new().to_skia().is_none());
    }
}
