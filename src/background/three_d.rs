//! Perspective slab seen from above
//!
//! A rounded rectangle is tilted about the screen edge by the panel angle and
//! projected back into the plane; the side planes below it give the slab its
//! thickness.

use std::f64::consts::FRAC_PI_2;

use crate::canvas::{Canvas, Paint};
use crate::geometry::{Path, Point, Rect, Region, Transform};
use crate::panel::Padding;

use super::{Frame, Style, StyleContext};

const MAX_THICKNESS: f64 = 12.0;
const PADDING_TOP: u32 = 1;
const PADDING_BOTTOM: u32 = 1;
const DRAW_XPADDING: f64 = 2.0;
/// Height of the slab plane before rotation
const PLANE_Z: f64 = 2.0;
/// Keeps the projected top edge from folding over itself
const MAX_PERSPECTIVE: f64 = 0.9;
/// Colours more transparent than this are treated as invisible
const ALPHA_EPSILON: f64 = 0.003;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreeD;

/// Attenuated rotation in degrees for a configured panel angle
fn transform_radius(angle: f64) -> f64 {
    angle.clamp(0.0, 90.0) / 90.0 * 75.0
}

/// Pixel depth of the side planes
fn side_thickness(ctx: &StyleContext) -> f64 {
    let tr = transform_radius(ctx.params.panel_angle).to_radians();
    (tr.sin() * MAX_THICKNESS * ctx.params.thickness.clamp(0.0, 1.0)).floor()
}

/// Horizontal position of `(x, y)` once seen in perspective
fn apply_perspective_x(width: f64, angle_deg: f64, x: f64, y: f64) -> f64 {
    let depth = width / 2.0 * (FRAC_PI_2 - angle_deg.to_radians()).tan();
    if depth <= 0.0 || !depth.is_finite() {
        return x;
    }
    let factor = (y / depth).min(MAX_PERSPECTIVE);
    (width / 2.0 - x) * factor + x
}

/// Twelve control points of the projected rounded rectangle
///
/// Index 0..=3 run along the screen edge, 6..=9 along the away side.
fn calc_points(ctx: &StyleContext, width: f64, height: f64) -> [Point; 12] {
    let tr = transform_radius(ctx.params.panel_angle);
    let (s, c) = tr.to_radians().sin_cos();

    let mut radius = ctx.params.corner_radius.clamp(0.0, (width / 2.0).max(0.0));
    // Bottom corners shrink and top corners widen to stay convex
    let (mut rb, mut ex) = (0.0, 0.0);
    if radius > height {
        ex = radius - height;
        radius = height;
    }
    if radius > height / 2.0 {
        rb = 2.0 * radius - height;
    }
    if radius == 0.0 {
        radius = 0.5;
    }

    let (x0, x1, x2, x3) = (0.0, radius, width - radius, width);
    let (y0, y1, y2, y3) = (0.0, radius, height - radius, height);
    let flat = [
        (x0, y0),
        (x1 - rb, y0),
        (x2 + rb, y0),
        (x3, y0),
        (x3, y1 - rb),
        (x3, y2),
        (x3, y3),
        (x2 - ex, y3),
        (x1 + ex, y3),
        (x0, y3),
        (x0, y2),
        (x0, y1 - rb),
    ];

    flat.map(|(x, y)| {
        let rotated = c * y - s * PLANE_Z;
        Point::new(
            apply_perspective_x(width, tr, x, rotated),
            (height - rotated).floor(),
        )
    })
}

/// Outline of the plane pushed `drop` pixels towards the screen edge
fn rect_path(v: &[Point; 12], drop: f64) -> Path {
    let p = |i: usize| Point::new(v[i].x, v[i].y + drop);
    let mut path = Path::new();
    path.move_to(p(1).x, p(1).y);
    path.line_to(p(2).x, p(2).y);
    path.curve_to(p(2).x, p(2).y, p(3).x, p(3).y, p(4).x, p(4).y);
    path.line_to(p(5).x, p(5).y);
    path.curve_to(p(6).x, p(6).y, p(7).x, p(7).y, p(7).x, p(7).y);
    path.line_to(p(8).x, p(8).y);
    path.curve_to(p(8).x, p(8).y, p(9).x, p(9).y, p(10).x, p(10).y);
    path.line_to(p(11).x, p(11).y);
    path.curve_to(p(0).x, p(0).y, p(1).x, p(1).y, p(1).x, p(1).y);
    path.close();
    path
}

/// Plane size left once the side planes and paddings are taken out
fn plane_size(ctx: &StyleContext, frame: &Frame) -> (f64, f64) {
    let s = side_thickness(ctx);
    (
        frame.width - DRAW_XPADDING * 2.0,
        frame.height - (s + PADDING_BOTTOM as f64 + 1.0),
    )
}

fn paint(canvas: &mut Canvas, ctx: &StyleContext, frame: &Frame) {
    let colors = &ctx.params.colors;
    let s = side_thickness(ctx);
    let (width, height) = plane_size(ctx, frame);

    canvas.translate(DRAW_XPADDING, 0.5);
    let vertices = calc_points(ctx, width, height);

    if ctx.params.panel_angle > 0.0 && colors.hilight.alpha > ALPHA_EPSILON {
        canvas.set_line_width(1.0);
        canvas.stroke(&rect_path(&vertices, s), &Paint::Solid(colors.border));

        canvas.set_line_width(1.5);
        let mut drop = s - 1.0;
        while drop >= 0.0 {
            canvas.stroke(&rect_path(&vertices, drop), &Paint::Solid(colors.hilight));
            drop -= 1.0;
        }
    }

    let top = rect_path(&vertices, 0.0);
    let top_y = if height > 0.0 {
        (vertices[8].y / height).clamp(0.0, 1.0)
    } else {
        0.0
    };
    canvas.fill(
        &top,
        &Paint::linear(
            0.0,
            0.0,
            0.0,
            height,
            &[(top_y, colors.g_step_1), (1.0, colors.g_step_2)],
        ),
    );
    if let Some(surface) = ctx.params.pattern.as_ref().filter(|_| ctx.params.enable_pattern) {
        canvas.fill(
            &top,
            &Paint::Pattern {
                surface: surface.clone(),
                alpha: ctx.params.pattern_alpha,
            },
        );
    }

    canvas.fill(
        &top,
        &Paint::linear(
            0.0,
            0.0,
            0.0,
            height,
            &[
                (top_y, colors.g_histep_1),
                (top_y + (1.0 - top_y) * 0.3, colors.g_histep_2),
                (top_y + (1.0 - top_y) * 0.4, colors.g_histep_2.with_alpha(0.0)),
            ],
        ),
    );

    canvas.set_line_width(1.0);
    canvas.stroke(&top, &Paint::Solid(colors.border));
}

impl Style for ThreeD {
    fn padding_request(&self, ctx: &StyleContext) -> Padding {
        let h = ctx.panel.size as f64;
        let tr = transform_radius(ctx.params.panel_angle);
        // Where the projected origin lands is how far the slab leans in
        let lean = (h * tr.to_radians().tan()).min(h).max(0.0);

        let mut from_radius = ctx.params.corner_radius.clamp(0.0, h);
        if from_radius > h / 2.0 {
            from_radius = h - from_radius;
        }
        let side = lean.max(from_radius) as u32 + DRAW_XPADDING as u32;
        let s = side_thickness(ctx) as u32;
        Padding::from_edge_frame(ctx.position(), PADDING_TOP, PADDING_BOTTOM + s, side, side)
    }

    fn draw(&self, canvas: &mut Canvas, ctx: &StyleContext, area: Rect) {
        let frame = Frame::new(ctx.position(), area);
        frame.paint_with(canvas, |canvas| paint(canvas, ctx, &frame));
    }

    fn input_shape_mask(&self, ctx: &StyleContext, area: Rect) -> Region {
        let frame = Frame::new(ctx.position(), area);
        let (width, height) = plane_size(ctx, &frame);
        let vertices = calc_points(ctx, width, height);
        let shift = Transform::identity().translate(DRAW_XPADDING, 0.5);

        let top = rect_path(&vertices, 0.0).transform(&shift);
        let bottom = rect_path(&vertices, side_thickness(ctx)).transform(&shift);
        frame.region(&top).union(&frame.region(&bottom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::{BackgroundParams, Placement};
    use crate::panel::PanelGeometry;

    fn ctx_with<'a>(panel: &'a PanelGeometry, params: &'a BackgroundParams) -> StyleContext<'a> {
        StyleContext::new(
            params,
            &Placement {
                panel,
                align: 0.5,
                separators: &[],
            },
        )
    }

    #[test]
    fn test_edges_stay_monotonic_for_every_angle() {
        let panel = PanelGeometry::default();
        for radius in [0.0, 10.0, 30.0, 80.0] {
            for angle in 0..=90 {
                let params = BackgroundParams {
                    panel_angle: angle as f64,
                    corner_radius: radius,
                    ..BackgroundParams::default()
                };
                let v = calc_points(&ctx_with(&panel, &params), 300.0, 44.0);
                for run in [[9, 8, 7, 6], [0, 1, 2, 3]] {
                    for pair in run.windows(2) {
                        assert!(
                            v[pair[0]].x <= v[pair[1]].x,
                            "angle {angle} radius {radius}: {:?} > {:?}",
                            v[pair[0]],
                            v[pair[1]]
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_away_edge_is_narrower() {
        let panel = PanelGeometry::default();
        let params = BackgroundParams::default();
        let v = calc_points(&ctx_with(&panel, &params), 300.0, 44.0);
        assert!(v[9].x > v[0].x);
        assert!(v[6].x < v[3].x);
        assert!(v[9].y < v[0].y);
    }

    #[test]
    fn test_padding_for_default_angle() {
        let panel = PanelGeometry::default();
        let params = BackgroundParams::default();
        // tan(37.5°) * 48 = 36.8, side planes floor(sin(37.5°) * 7.2) = 4
        assert_eq!(
            ThreeD.padding_request(&ctx_with(&panel, &params)),
            Padding::new(1, 5, 38, 38)
        );
    }

    #[test]
    fn test_flat_angle_has_no_side_planes() {
        let panel = PanelGeometry::default();
        let params = BackgroundParams {
            panel_angle: 0.0,
            ..BackgroundParams::default()
        };
        let ctx = ctx_with(&panel, &params);
        assert_eq!(side_thickness(&ctx), 0.0);
        assert_eq!(ThreeD.padding_request(&ctx), Padding::new(1, 1, 12, 12));
    }

    #[test]
    fn test_input_mask_covers_plane_centre() {
        let panel = PanelGeometry::default();
        let params = BackgroundParams::default();
        let ctx = ctx_with(&panel, &params);
        let mask = ThreeD.input_shape_mask(&ctx, Rect::new(0, 0, 400, 54));
        assert!(mask.contains(200, 25));
        assert!(!mask.contains(1, 1));
    }
}
