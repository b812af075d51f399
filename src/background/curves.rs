use std::f64::consts::PI;

use crate::canvas::{Canvas, Paint};
use crate::geometry::{Path, Rect, Region, Transform};
use crate::panel::Padding;

use super::{Frame, PathKind, Style, StyleContext};

const BASE_PADDING: f64 = 20.0;
const INC_PADDING: f64 = 75.0;
/// Icon offset bend matching the ellipse
const OFFSET_MODIFIER: f64 = 20.0;

/// Elliptic hump rising from the screen edge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Curves;

/// Upper half of an ellipse inscribed in `(x, y, width, height)`, overshooting
/// the bottom so the base is hidden past the screen edge
fn ellipse(x: f64, y: f64, width: f64, height: f64) -> Path {
    let mut unit = Path::new();
    unit.move_to(0.0, 1.0);
    unit.arc_negative(0.0, 1.2, 1.0, 0.0, PI);
    unit.close();
    unit.transform(
        &Transform::identity()
            .translate(x + width / 2.0, y)
            .scale(width / 2.0, height),
    )
}

fn curves_height(ctx: &StyleContext, height: f64) -> f64 {
    if ctx.params.curviness < 1.0 {
        height * ctx.params.curviness.max(0.0)
    } else {
        height
    }
}

fn paint(canvas: &mut Canvas, ctx: &StyleContext, width: f64, height: f64) {
    let colors = &ctx.params.colors;
    canvas.set_line_width(1.0);
    canvas.translate(0.5, 0.5);
    let width = width - 1.0;
    let ch = curves_height(ctx, height);

    let outer = ellipse(0.0, height - ch, width, ch);
    let body = ctx.body_paint(Paint::radial(
        width / 2.0,
        height,
        0.01,
        ch.max(width / 2.0),
        &[(0.0, colors.g_step_2), (1.0, colors.g_step_1)],
    ));
    canvas.fill(&outer, &body);

    canvas.stroke(
        &ellipse(1.0, height - ch + 2.0, width - 2.0, ch - 2.0),
        &Paint::Solid(colors.hilight),
    );
    canvas.stroke(&outer, &Paint::Solid(colors.border));

    // Glossy inner hump, slid along by the symmetry setting
    let width_inner = (width * 3.0 / 4.0).floor();
    let spare = width - width_inner;
    let min = spare / 6.0;
    let x_pos = (spare - min * 2.0) * ctx.params.curves_symmetry.clamp(0.0, 1.0) + min;
    canvas.fill(
        &ellipse(x_pos, height - ch / 2.0, width_inner, ch / 2.0),
        &Paint::radial(
            x_pos + width_inner / 2.0,
            height,
            0.01,
            ch / 2.0,
            &[(0.0, colors.g_histep_1), (1.0, colors.g_histep_2)],
        ),
    );
}

impl Style for Curves {
    fn padding_request(&self, ctx: &StyleContext) -> Padding {
        let symmetry = ctx.params.curves_symmetry.clamp(0.0, 1.0);
        let start = (BASE_PADDING + INC_PADDING * symmetry) as u32;
        let end = (BASE_PADDING + INC_PADDING * (1.0 - symmetry)) as u32;
        Padding::from_edge_frame(ctx.position(), 0, 0, start, end)
    }

    fn draw(&self, canvas: &mut Canvas, ctx: &StyleContext, area: Rect) {
        let frame = Frame::new(ctx.position(), area);
        frame.paint_with(canvas, |canvas| paint(canvas, ctx, frame.width, frame.height));
    }

    fn input_shape_mask(&self, ctx: &StyleContext, area: Rect) -> Region {
        let frame = Frame::new(ctx.position(), area);
        let ch = curves_height(ctx, frame.height);
        frame.region(&ellipse(0.0, frame.height - ch, frame.width, ch))
    }

    fn path_type(&self, _ctx: &StyleContext) -> (PathKind, f64) {
        (PathKind::Ellipse, OFFSET_MODIFIER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::{BackgroundParams, Placement};
    use crate::panel::{PanelGeometry, Position};

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
    fn test_symmetry_shifts_side_padding() {
        let params = BackgroundParams {
            curves_symmetry: 0.0,
            ..BackgroundParams::default()
        };
        let bottom = PanelGeometry::default();
        assert_eq!(
            Curves.padding_request(&ctx_with(&bottom, &params)),
            Padding::new(0, 0, 20, 95)
        );
        let top = PanelGeometry {
            position: Position::Top,
            ..PanelGeometry::default()
        };
        assert_eq!(
            Curves.padding_request(&ctx_with(&top, &params)),
            Padding::new(0, 0, 95, 20)
        );
    }

    #[test]
    fn test_reports_ellipse_path() {
        let panel = PanelGeometry::default();
        let params = BackgroundParams::default();
        assert_eq!(
            Curves.path_type(&ctx_with(&panel, &params)),
            (PathKind::Ellipse, 20.0)
        );
    }

    #[test]
    fn test_input_mask_follows_hump() {
        let panel = PanelGeometry::default();
        let params = BackgroundParams::default();
        let mask = Curves.input_shape_mask(&ctx_with(&panel, &params), Rect::new(0, 0, 300, 48));
        assert!(mask.contains(150, 20));
        assert!(mask.contains(150, 47));
        assert!(!mask.contains(2, 10));
        assert!(!mask.contains(297, 10));
    }
}
