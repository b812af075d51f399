//! Software rendering target for background drawing
//!
//! A `tiny_skia` pixmap behind a cairo-like transform stack. Fills are not
//! anti-aliased so painted pixels match [`Path::to_region`] exactly; strokes
//! are.

use anyhow::{Context, Result};
use std::path::Path as FsPath;
use std::sync::Arc;
use tiny_skia::{
    FillRule, FilterQuality, GradientStop, LinearGradient, Pixmap, RadialGradient, Shader, SpreadMode,
    Stroke,
};

use crate::color::Rgba;
use crate::geometry::{Path, Point, Transform};

/// Premultiplied RGBA pixel buffer
///
/// A zero-sized surface keeps a 1x1 pixmap underneath and reports no
/// pixels.
#[derive(Debug, Clone)]
pub struct Surface {
    width: u32,
    height: u32,
    pixmap: Pixmap,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width.max(1), height.max(1))
            .context(format!("Failed to allocate {}x{} pixmap", width, height))?;
        Ok(Self {
            width,
            height,
            pixmap,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Premultiplied ARGB32 at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixmap.pixel(x, y).map(|c| {
            (c.alpha() as u32) << 24 | (c.red() as u32) << 16 | (c.green() as u32) << 8 | c.blue() as u32
        })
    }

    /// Pixels as little-endian BGRA bytes for a 32-bit ZPixmap upload
    pub fn to_bgra_bytes(&self) -> Vec<u8> {
        if self.width == 0 || self.height == 0 {
            return Vec::new();
        }
        self.pixmap
            .data()
            .chunks_exact(4)
            .flat_map(|px| [px[2], px[1], px[0], px[3]])
            .collect()
    }

    /// Decode a PNG file into a surface
    pub fn from_png(path: &FsPath) -> Result<Self> {
        let pixmap = Pixmap::load_png(path)
            .context(format!("Failed to decode pattern image {}", path.display()))?;
        Ok(Self {
            width: pixmap.width(),
            height: pixmap.height(),
            pixmap,
        })
    }
}

/// Source for fills and strokes, coordinates in user space at paint time
#[derive(Debug, Clone)]
pub enum Paint {
    Solid(Rgba),
    Linear {
        from: Point,
        to: Point,
        stops: Vec<(f64, Rgba)>,
    },
    Radial {
        center: Point,
        inner: f64,
        outer: f64,
        stops: Vec<(f64, Rgba)>,
    },
    /// Repeating image tile with a global alpha
    Pattern { surface: Arc<Surface>, alpha: f64 },
}

impl Paint {
    pub fn linear(x0: f64, y0: f64, x1: f64, y1: f64, stops: &[(f64, Rgba)]) -> Self {
        Paint::Linear {
            from: Point::new(x0, y0),
            to: Point::new(x1, y1),
            stops: stops.to_vec(),
        }
    }

    pub fn radial(cx: f64, cy: f64, inner: f64, outer: f64, stops: &[(f64, Rgba)]) -> Self {
        Paint::Radial {
            center: Point::new(cx, cy),
            inner,
            outer,
            stops: stops.to_vec(),
        }
    }

    /// Shader for this paint with `ts` mapping user space to device space
    fn shader(&self, ts: tiny_skia::Transform) -> Shader<'_> {
        let fallback = |stops: &[(f64, Rgba)]| {
            Shader::SolidColor(stops.last().map_or(tiny_skia::Color::TRANSPARENT, |(_, c)| c.to_skia()))
        };
        match self {
            Paint::Solid(color) => Shader::SolidColor(color.to_skia()),
            Paint::Linear { from, to, stops } => LinearGradient::new(
                skia_point(*from),
                skia_point(*to),
                gradient_stops(stops, |t| t),
                SpreadMode::Pad,
                ts,
            )
            .unwrap_or_else(|| fallback(stops)),
            Paint::Radial {
                center,
                inner,
                outer,
                stops,
            } if *outer > 0.0 => {
                // One-radius gradient; the inner radius moves the stops out
                let span = (outer - inner.clamp(0.0, *outer)) / outer;
                let start = 1.0 - span;
                RadialGradient::new(
                    skia_point(*center),
                    skia_point(*center),
                    *outer as f32,
                    gradient_stops(stops, |t| start + t * span),
                    SpreadMode::Pad,
                    ts,
                )
                .unwrap_or_else(|| fallback(stops))
            }
            Paint::Radial { stops, .. } => fallback(stops),
            Paint::Pattern { surface, alpha } => tiny_skia::Pattern::new(
                surface.pixmap.as_ref(),
                SpreadMode::Repeat,
                FilterQuality::Nearest,
                alpha.clamp(0.0, 1.0) as f32,
                ts,
            ),
        }
    }
}

fn skia_point(p: Point) -> tiny_skia::Point {
    tiny_skia::Point::from_xy(p.x as f32, p.y as f32)
}

fn gradient_stops(stops: &[(f64, Rgba)], place: impl Fn(f64) -> f64) -> Vec<GradientStop> {
    stops
        .iter()
        .map(|(t, color)| GradientStop::new(place(*t).clamp(0.0, 1.0) as f32, color.to_skia()))
        .collect()
}

fn skia_transform(t: &Transform) -> tiny_skia::Transform {
    tiny_skia::Transform::from_row(
        t.xx as f32,
        t.yx as f32,
        t.xy as f32,
        t.yy as f32,
        t.x0 as f32,
        t.y0 as f32,
    )
}

/// Drawing context over a [`Surface`]
#[derive(Debug)]
pub struct Canvas {
    surface: Surface,
    transform: Transform,
    saved: Vec<(Transform, f64)>,
    line_width: f64,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            surface: Surface::new(width, height)?,
            transform: Transform::identity(),
            saved: Vec::new(),
            line_width: 1.0,
        })
    }

    pub fn width(&self) -> u32 {
        self.surface.width
    }

    pub fn height(&self) -> u32 {
        self.surface.height
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn save_depth(&self) -> usize {
        self.saved.len()
    }

    pub fn clear(&mut self) {
        self.surface.pixmap.fill(tiny_skia::Color::TRANSPARENT);
    }

    pub fn save(&mut self) {
        self.saved.push((self.transform, self.line_width));
    }

    pub fn restore(&mut self) {
        if let Some((transform, line_width)) = self.saved.pop() {
            self.transform = transform;
            self.line_width = line_width;
        }
    }

    pub fn translate(&mut self, tx: f64, ty: f64) {
        self.transform = self.transform.translate(tx, ty);
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn set_line_width(&mut self, width: f64) {
        self.line_width = width.max(0.0);
    }

    /// Fill `path` (user space) with `paint`
    pub fn fill(&mut self, path: &Path, paint: &Paint) {
        let Some(skia_path) = path.to_skia() else {
            return;
        };
        let ts = skia_transform(&self.transform);
        let paint = tiny_skia::Paint {
            shader: paint.shader(tiny_skia::Transform::identity()),
            anti_alias: false,
            ..Default::default()
        };
        self.surface
            .pixmap
            .fill_path(&skia_path, &paint, FillRule::Winding, ts, None);
    }

    /// Stroke `path` with the current line width
    pub fn stroke(&mut self, path: &Path, paint: &Paint) {
        if self.line_width <= 0.0 {
            return;
        }
        let Some(skia_path) = path.to_skia() else {
            return;
        };
        let stroke = Stroke {
            width: self.line_width as f32,
            ..Default::default()
        };
        let paint = tiny_skia::Paint {
            shader: paint.shader(tiny_skia::Transform::identity()),
            anti_alias: true,
            ..Default::default()
        };
        self.surface
            .pixmap
            .stroke_path(&skia_path, &paint, &stroke, skia_transform(&self.transform), None);
    }

    /// Fill the whole surface, ignoring the transform for coverage
    pub fn paint(&mut self, paint: &Paint) {
        let Some(rect) = tiny_skia::Rect::from_xywh(0.0, 0.0, self.width() as f32, self.height() as f32)
        else {
            return;
        };
        let paint = tiny_skia::Paint {
            shader: paint.shader(skia_transform(&self.transform)),
            ..Default::default()
        };
        self.surface
            .pixmap
            .fill_rect(rect, &paint, tiny_skia::Transform::identity(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> Rgba {
        Rgba::new(1.0, 0.0, 0.0, 1.0)
    }

    #[test]
    fn test_fill_respects_transform() {
        let mut canvas = Canvas::new(20, 20).unwrap();
        canvas.translate(5.0, 5.0);
        let mut path = Path::new();
        path.rectangle(0.0, 0.0, 2.0, 2.0);
        canvas.fill(&path, &Paint::Solid(red()));

        assert_eq!(canvas.surface().pixel(5, 5), Some(0xFFFF0000));
        assert_eq!(canvas.surface().pixel(6, 6), Some(0xFFFF0000));
        assert_eq!(canvas.surface().pixel(4, 4), Some(0));
        assert_eq!(canvas.surface().pixel(7, 7), Some(0));
    }

    #[test]
    fn test_fill_matches_region() {
        let mut canvas = Canvas::new(60, 40).unwrap();
        let mut path = Path::new();
        path.arc(30.0, 20.0, 15.0, 0.0, 2.0 * std::f64::consts::PI).close();
        canvas.fill(&path, &Paint::Solid(red()));
        let region = path.to_region();
        for y in 0..40 {
            for x in 0..60 {
                let painted = canvas.surface().pixel(x, y) != Some(0);
                assert_eq!(painted, region.contains(x as i32, y as i32), "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_save_restore_transform() {
        let mut canvas = Canvas::new(4, 4).unwrap();
        let entry = canvas.transform();
        canvas.save();
        canvas.set_transform(canvas.transform().rotate(1.0));
        canvas.translate(3.0, 3.0);
        canvas.restore();
        assert_eq!(canvas.transform(), entry);
        assert_eq!(canvas.save_depth(), 0);
    }

    #[test]
    fn test_over_blends_half_alpha() {
        let mut canvas = Canvas::new(1, 1).unwrap();
        canvas.paint(&Paint::Solid(Rgba::new(0.0, 0.0, 1.0, 1.0)));
        canvas.paint(&Paint::Solid(Rgba::new(1.0, 0.0, 0.0, 0.5)));
        let px = canvas.surface().pixel(0, 0).unwrap();
        assert_eq!(px >> 24, 0xFF);
        assert!(((px >> 16) & 0xFF).abs_diff(0x80) <= 2);
        assert!((px & 0xFF).abs_diff(0x80) <= 2);
    }

    #[test]
    fn test_linear_gradient_endpoints() {
        let mut canvas = Canvas::new(1, 100).unwrap();
        let black = Rgba::new(0.0, 0.0, 0.0, 1.0);
        let white = Rgba::new(1.0, 1.0, 1.0, 1.0);
        canvas.paint(&Paint::linear(0.0, 0.0, 0.0, 100.0, &[(0.0, black), (1.0, white)]));
        let top = canvas.surface().pixel(0, 0).unwrap() & 0xFF;
        let bottom = canvas.surface().pixel(0, 99).unwrap() & 0xFF;
        assert!(top < 5);
        assert!(bottom > 250);
    }

    #[test]
    fn test_radial_inner_radius_keeps_first_stop() {
        let mut canvas = Canvas::new(41, 41).unwrap();
        let black = Rgba::new(0.0, 0.0, 0.0, 1.0);
        let white = Rgba::new(1.0, 1.0, 1.0, 1.0);
        canvas.paint(&Paint::radial(20.5, 20.5, 10.0, 20.0, &[(0.0, black), (1.0, white)]));
        assert!(canvas.surface().pixel(25, 20).unwrap() & 0xFF < 5);
        assert!(canvas.surface().pixel(40, 20).unwrap() & 0xFF > 220);
    }

    #[test]
    fn test_stroke_draws_outline_only() {
        let mut canvas = Canvas::new(20, 20).unwrap();
        let mut path = Path::new();
        path.rectangle(2.5, 2.5, 10.0, 10.0);
        canvas.stroke(&path, &Paint::Solid(red()));
        assert_ne!(canvas.surface().pixel(2, 7), Some(0));
        assert_eq!(canvas.surface().pixel(7, 7), Some(0));
    }

    #[test]
    fn test_bgra_bytes_little_endian() {
        let mut canvas = Canvas::new(1, 1).unwrap();
        canvas.paint(&Paint::Solid(red()));
        assert_eq!(canvas.surface().to_bgra_bytes(), vec![0x00, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_zero_sized_surface_has_no_pixels() {
        let surface = Surface::new(0, 50).unwrap();
        assert_eq!(surface.pixel(0, 0), None);
        assert!(surface.to_bgra_bytes().is_empty());
    }

    #[test]
    fn test_pattern_load_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");
        assert!(Surface::from_png(&missing).is_err());
    }
}
