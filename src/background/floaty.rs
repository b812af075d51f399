use crate::canvas::{Canvas, Paint};
use crate::geometry::{Corners, Path, Rect, Region};
use crate::panel::Padding;

use super::flat::{TOP_PADDING, corner_padding};
use super::{Frame, Style, StyleContext};

/// Fully rounded slab lifted off the screen edge by `floaty_offset`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Floaty;

/// Side inset used as eye candy when the panel spans the monitor
fn expand_inset(ctx: &StyleContext) -> f64 {
    if ctx.panel.expand {
        (ctx.params.floaty_offset * 3 / 4) as f64
    } else {
        0.0
    }
}

fn rounded(ctx: &StyleContext, x: f64, y: f64, width: f64, height: f64) -> Path {
    let mut path = Path::new();
    path.rounded_rect(x, y, width, height, ctx.params.corner_radius, Corners::ALL);
    path
}

fn paint(canvas: &mut Canvas, ctx: &StyleContext, width: f64, height: f64) {
    let colors = &ctx.params.colors;
    canvas.translate(0.5, 0.5);
    canvas.set_line_width(1.0);

    let inset = expand_inset(ctx);
    canvas.translate(inset, 0.0);
    let width = width - 2.0 * inset;
    let bg_size = height - ctx.params.floaty_offset as f64 + 1.0;
    let inner = rounded(ctx, 1.0, 1.0, width - 3.0, bg_size - 2.0);

    if ctx.panel.composited {
        let body = ctx.body_paint(Paint::linear(
            0.0,
            0.0,
            0.0,
            bg_size,
            &[(0.0, colors.g_step_1), (1.0, colors.g_step_2)],
        ));
        canvas.fill(&inner, &body);

        let hilight = Paint::linear(
            0.0,
            0.0,
            0.0,
            height,
            &[
                (0.0, colors.g_histep_1),
                (0.3, colors.g_histep_2),
                (0.36, colors.g_histep_2.with_alpha(0.0)),
            ],
        );
        canvas.fill(&inner, &hilight);
    }

    canvas.stroke(&inner, &Paint::Solid(colors.hilight));
    canvas.stroke(
        &rounded(ctx, 0.0, 0.0, width - 1.0, bg_size),
        &Paint::Solid(colors.border),
    );
}

impl Style for Floaty {
    fn padding_request(&self, ctx: &StyleContext) -> Padding {
        let mut side = corner_padding(ctx);
        if ctx.panel.expand {
            side += ctx.params.floaty_offset * 3 / 4;
        }
        Padding::from_edge_frame(
            ctx.position(),
            TOP_PADDING,
            ctx.params.floaty_offset,
            side,
            side,
        )
    }

    fn draw(&self, canvas: &mut Canvas, ctx: &StyleContext, area: Rect) {
        let frame = Frame::new(ctx.position(), area);
        frame.paint_with(canvas, |canvas| paint(canvas, ctx, frame.width, frame.height));
    }

    fn shape_mask(&self, ctx: &StyleContext, area: Rect) -> Region {
        let frame = Frame::new(ctx.position(), area);
        let inset = expand_inset(ctx);
        let height = frame.height - ctx.params.floaty_offset as f64 + 2.0;
        frame.region(&rounded(ctx, inset, 0.0, frame.width - 2.0 * inset, height))
    }
}
