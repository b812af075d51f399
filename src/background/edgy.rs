use std::f64::consts::{FRAC_PI_2, PI};

use crate::canvas::{Canvas, Paint};
use crate::geometry::{Path, Rect, Region, Transform};
use crate::panel::Padding;

use super::flat::{self, Flat, TOP_PADDING};
use super::{Frame, Spacer, StrutOffsets, Style, StyleContext, spacer_at};

/// Clearance the hover effects need above the icons
const ACTIVE_RECT_PADDING: u32 = 6;

/// Quarter-circle corner piece for panels pushed into a screen corner
///
/// Away from a corner, or once the applet row outgrows the arc, the flat slab
/// is drawn as well.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Edgy;

struct Metrics {
    /// Diagonal of the `size + offset` square, truncated
    radius: f64,
    top_pad: u32,
}

impl Metrics {
    fn new(ctx: &StyleContext) -> Self {
        let size_offset = (ctx.panel.size + ctx.panel.offset) as f64;
        let radius = (size_offset * size_offset * 2.0).sqrt().floor();
        Self {
            radius,
            top_pad: (radius - size_offset) as u32 + 1,
        }
    }
}

fn in_corner(ctx: &StyleContext) -> bool {
    ctx.at_start() || ctx.at_end()
}

fn flat_needed(ctx: &StyleContext, metrics: &Metrics, length: f64) -> bool {
    ctx.panel.expand || !in_corner(ctx) || length > metrics.radius * 4.0 / 3.0
}

/// How far the flat slab sits below the top of the corner piece
fn flat_inset(ctx: &StyleContext, metrics: &Metrics) -> f64 {
    if in_corner(ctx) {
        metrics.top_pad.saturating_sub(TOP_PADDING) as f64
    } else {
        0.0
    }
}

fn arc(ctx: &StyleContext, path: &mut Path, width: f64, height: f64, radius: f64) {
    if ctx.at_start() {
        path.arc(0.0, height, radius, -FRAC_PI_2, 0.0);
    } else {
        path.arc_negative(width, height, radius, -FRAC_PI_2, -PI);
    }
}

fn quarter(ctx: &StyleContext, width: f64, height: f64) -> Path {
    let mut path = Path::new();
    arc(ctx, &mut path, width, height, height - 1.0);
    path.line_to(if ctx.at_start() { 0.0 } else { width }, height);
    path.close();
    path
}

fn paint_corner(canvas: &mut Canvas, ctx: &StyleContext, width: f64, height: f64) {
    let colors = &ctx.params.colors;
    let cx = if ctx.at_start() { 0.0 } else { width };
    canvas.set_line_width(1.0);

    if ctx.panel.composited {
        let body = ctx.body_paint(Paint::radial(
            cx,
            height,
            1.0,
            height,
            &[(0.0, colors.g_step_2), (1.0, colors.g_step_1)],
        ));
        canvas.fill(&quarter(ctx, width, height), &body);

        let mut ring = Path::new();
        arc(ctx, &mut ring, width, height, height * 3.0 / 4.0);
        if ctx.at_start() {
            ring.arc_negative(0.0, height, height - 2.0, 0.0, -FRAC_PI_2);
        } else {
            ring.arc(width, height, height - 2.0, -PI, -FRAC_PI_2);
        }
        ring.close();
        let hilight = Paint::radial(
            cx,
            height,
            height * 3.0 / 4.0,
            height,
            &[
                (0.0, colors.g_histep_2.with_alpha(0.0)),
                (0.2, colors.g_histep_2),
                (1.0, colors.g_histep_1),
            ],
        );
        canvas.fill(&ring, &hilight);
    }

    let mut inner = Path::new();
    arc(ctx, &mut inner, width, height, height - 2.0);
    canvas.stroke(&inner, &Paint::Solid(colors.hilight));

    let mut outer = Path::new();
    arc(ctx, &mut outer, width, height, height - 1.0);
    canvas.stroke(&outer, &Paint::Solid(colors.border));
}

impl Style for Edgy {
    fn padding_request(&self, ctx: &StyleContext) -> Padding {
        if !in_corner(ctx) {
            return Flat.padding_request(ctx);
        }
        let metrics = Metrics::new(ctx);
        let side = flat::side_padding(ctx);
        let (start, end) = if ctx.at_start() { (0, side) } else { (side, 0) };
        Padding::from_edge_frame(ctx.position(), metrics.top_pad, 0, start, end)
    }

    fn draw(&self, canvas: &mut Canvas, ctx: &StyleContext, area: Rect) {
        let metrics = Metrics::new(ctx);
        let frame = Frame::new(ctx.position(), area);
        let (width, height) = (frame.width, frame.height);
        frame.paint_with(canvas, |canvas| {
            if flat_needed(ctx, &metrics, width) {
                let inset = flat_inset(ctx, &metrics);
                canvas.save();
                canvas.translate(0.0, inset);
                flat::paint(canvas, ctx, width, height - inset);
                canvas.restore();
            }
            if in_corner(ctx) {
                paint_corner(canvas, ctx, width, height);
            }
        });
    }

    fn shape_mask(&self, ctx: &StyleContext, area: Rect) -> Region {
        let metrics = Metrics::new(ctx);
        let frame = Frame::new(ctx.position(), area);
        let (width, height) = (frame.width, frame.height);

        let mut mask = Region::new();
        if flat_needed(ctx, &metrics, width) {
            let inset = flat_inset(ctx, &metrics);
            let slab = flat::outline(ctx, width, height - inset)
                .transform(&Transform::identity().translate(0.0, inset));
            mask = mask.union(&frame.region(&slab));
        }
        if in_corner(ctx) {
            mask = mask.union(&frame.region(&quarter(ctx, width, height)));
        }
        mask
    }

    fn strut_offsets(&self, ctx: &StyleContext, area: Rect) -> Option<StrutOffsets> {
        if !in_corner(ctx) {
            return None;
        }
        let metrics = Metrics::new(ctx);
        let length = if ctx.position().is_horizontal() {
            area.width
        } else {
            area.height
        };
        Some(StrutOffsets {
            distance: (metrics.radius as u32).saturating_sub(metrics.top_pad) + ACTIVE_RECT_PADDING + 2,
            start: 0,
            end: length,
        })
    }

    fn spacer(&self, ctx: &StyleContext) -> Option<Spacer> {
        if !in_corner(ctx) {
            return None;
        }
        let metrics = Metrics::new(ctx);
        let side_pad = (metrics.top_pad + ctx.panel.offset).saturating_sub(2);
        Some(spacer_at(ctx.position(), ctx.at_start(), side_pad / 2))
    }
}
