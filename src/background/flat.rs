use crate::canvas::{Canvas, Paint};
use crate::geometry::{Corners, Path, Rect, Region};
use crate::panel::Padding;

use super::{Frame, Style, StyleContext};

pub(super) const TOP_PADDING: u32 = 2;
const MIN_SIDE_PADDING: u32 = 6;

/// Plain rounded slab along the edge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flat;

/// Room the rounded corners take along the edge
pub(super) fn corner_padding(ctx: &StyleContext) -> u32 {
    let from_radius = (ctx.params.corner_radius.max(0.0) * 3.0 / 4.0) as u32;
    from_radius.max(MIN_SIDE_PADDING)
}

/// Side padding that keeps applets clear of the rounded corners
pub(super) fn side_padding(ctx: &StyleContext) -> u32 {
    if ctx.panel.expand { 0 } else { corner_padding(ctx) }
}

/// Corners left unrounded where the panel meets the monitor's corner
pub(super) fn corners(ctx: &StyleContext) -> Corners {
    if ctx.panel.expand {
        Corners::NONE
    } else if ctx.at_start() {
        Corners::TOP_RIGHT
    } else if ctx.at_end() {
        Corners::TOP_LEFT
    } else {
        Corners::TOP
    }
}

fn slab(ctx: &StyleContext, x: f64, y: f64, width: f64, height: f64) -> Path {
    let mut path = Path::new();
    path.rounded_rect(x, y, width, height, ctx.params.corner_radius, corners(ctx));
    path
}

/// Outline used for the window shape, in frame space
pub(super) fn outline(ctx: &StyleContext, width: f64, height: f64) -> Path {
    slab(ctx, 0.0, 0.0, width, height + 3.0)
}

/// Paint the slab; the canvas is already in the frame
pub(super) fn paint(canvas: &mut Canvas, ctx: &StyleContext, width: f64, height: f64) {
    let colors = &ctx.params.colors;
    canvas.translate(0.5, 0.5);
    canvas.set_line_width(1.0);

    if ctx.panel.composited {
        let body = ctx.body_paint(Paint::linear(
            0.0,
            0.0,
            0.0,
            height,
            &[(0.0, colors.g_step_1), (1.0, colors.g_step_2)],
        ));
        canvas.fill(&slab(ctx, 1.0, 1.0, width - 2.0, height - 1.0), &body);

        let hilight = Paint::linear(
            0.0,
            0.0,
            0.0,
            height / 3.0,
            &[(0.0, colors.g_histep_1), (1.0, colors.g_histep_2)],
        );
        canvas.fill(&slab(ctx, 1.0, 1.0, width - 2.0, height / 3.0), &hilight);
    }

    canvas.stroke(
        &slab(ctx, 1.0, 1.0, width - 3.0, height + 3.0),
        &Paint::Solid(colors.hilight),
    );
    canvas.stroke(
        &slab(ctx, 0.0, 0.0, width - 1.0, height + 3.0),
        &Paint::Solid(colors.border),
    );
}

impl Style for Flat {
    fn padding_request(&self, ctx: &StyleContext) -> Padding {
        let side = side_padding(ctx);
        Padding::from_edge_frame(ctx.position(), TOP_PADDING, 0, side, side)
    }

    fn draw(&self, canvas: &mut Canvas, ctx: &StyleContext, area: Rect) {
        let frame = Frame::new(ctx.position(), area);
        frame.paint_with(canvas, |canvas| paint(canvas, ctx, frame.width, frame.height));
    }

    fn shape_mask(&self, ctx: &StyleContext, area: Rect) -> Region {
        let frame = Frame::new(ctx.position(), area);
        frame.region(&outline(ctx, frame.width, frame.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::{BackgroundParams, Placement};
    use crate::panel::{PanelGeometry, Position};

    fn ctx_with<'a>(
        panel: &'a PanelGeometry,
        params: &'a BackgroundParams,
        align: f64,
    ) -> StyleContext<'a> {
        StyleContext::new(
            params,
            &Placement {
                panel,
                align,
                separators: &[],
            },
        )
    }

    #[test]
    fn test_expand_drops_side_padding_and_rounding() {
        let panel = PanelGeometry {
            expand: true,
            ..PanelGeometry::default()
        };
        let params = BackgroundParams::default();
        let ctx = ctx_with(&panel, &params, 0.5);
        assert_eq!(Flat.padding_request(&ctx), Padding::new(2, 0, 0, 0));
        assert_eq!(corners(&ctx), Corners::NONE);
    }

    #[test]
    fn test_small_radius_keeps_minimum_side() {
        let panel = PanelGeometry {
            position: Position::Left,
            ..PanelGeometry::default()
        };
        let params = BackgroundParams {
            corner_radius: 2.0,
            ..BackgroundParams::default()
        };
        let ctx = ctx_with(&panel, &params, 0.5);
        assert_eq!(Flat.padding_request(&ctx), Padding::new(6, 6, 0, 2));
    }

    #[test]
    fn test_corner_alignment_rounds_inner_corner_only() {
        let panel = PanelGeometry::default();
        let params = BackgroundParams::default();
        assert_eq!(corners(&ctx_with(&panel, &params, 0.0)), Corners::TOP_RIGHT);
        assert_eq!(corners(&ctx_with(&panel, &params, 1.0)), Corners::TOP_LEFT);
        assert_eq!(corners(&ctx_with(&panel, &params, 0.3)), Corners::TOP);

        // Top panel at the left end of the screen: the frame is rotated, so
        // the rounded corner is still the one facing the screen centre
        let top = PanelGeometry {
            position: Position::Top,
            ..PanelGeometry::default()
        };
        assert_eq!(corners(&ctx_with(&top, &params, 0.0)), Corners::TOP_LEFT);
        let area = Rect::new(0, 0, 100, 50);
        let mask = Flat.shape_mask(&ctx_with(&top, &params, 0.0), area);
        assert!(mask.contains(0, 49));
        assert!(!mask.contains(99, 49));
    }

    #[test]
    fn test_non_composited_draws_outline_only() {
        let panel = PanelGeometry {
            composited: false,
            ..PanelGeometry::default()
        };
        let params = BackgroundParams::default();
        let ctx = ctx_with(&panel, &params, 0.5);
        let mut canvas = Canvas::new(200, 50).unwrap();
        Flat.draw(&mut canvas, &ctx, Rect::new(0, 0, 200, 50));
        assert_eq!(canvas.surface().pixel(100, 25), Some(0));
        assert_ne!(canvas.surface().pixel(100, 0), Some(0));
    }
}
