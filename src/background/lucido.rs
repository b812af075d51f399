use crate::canvas::{Canvas, Paint};
use crate::geometry::{Path, Rect, Region};
use crate::panel::Padding;

use super::flat::TOP_PADDING;
use super::{Frame, RedrawCheck, Style, StyleContext};

/// Depth of the lowered rail below the top of the bar
const RAIL_DROP: f64 = 5.0;

/// Bar with two parallel rails; every separator swaps rails with one curve
///
/// The separator layout used by the last check is remembered as a count plus
/// a positional checksum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lucido {
    separator_count: usize,
    checksum: i64,
}

/// Width of one rail-switching curve
fn curve_width(ctx: &StyleContext) -> f64 {
    (ctx.params.curviness.max(0.0) * ctx.panel.size as f64).round()
}

/// Straight segment when aligned on an axis, else an S-curve
fn line_from_to(path: &mut Path, x: f64, y: f64) {
    let Some(from) = path.current_point() else {
        path.move_to(x, y);
        return;
    };
    if from.x == x || from.y == y {
        path.line_to(x, y);
    } else {
        let xm = (from.x + x) / 2.0;
        path.curve_to(xm, from.y, xm, y, x, y);
    }
}

struct Rails {
    top: f64,
    lowered: f64,
    bottom: f64,
    start: f64,
    end: f64,
    half: f64,
}

impl Rails {
    fn new(ctx: &StyleContext, width: f64, height: f64) -> Self {
        let d = curve_width(ctx);
        let expanded = ctx.panel.expand;
        Self {
            top: 0.0,
            lowered: height - RAIL_DROP,
            bottom: height,
            start: if expanded || ctx.at_start() { 0.0 } else { d },
            end: if expanded || ctx.at_end() { width } else { width - d },
            half: d / 2.0,
        }
    }

    /// Curve endpoints for each separator, clamped so curves never overlap
    fn switches(&self, separators: &[f64]) -> Vec<(f64, f64)> {
        let mut cursor = self.start;
        separators
            .iter()
            .map(|&u| {
                let from = (u - self.half).clamp(cursor, self.end);
                let to = (u + self.half).clamp(from, self.end);
                cursor = to;
                (from, to)
            })
            .collect()
    }
}

/// Outer silhouette, frame space
fn external_path(ctx: &StyleContext, frame: &Frame, width: f64, height: f64) -> Path {
    let rails = Rails::new(ctx, width, height);
    let mut path = Path::new();
    path.move_to(0.0, rails.bottom);
    line_from_to(&mut path, rails.start, rails.top);

    let mut rail = rails.top;
    for (from, to) in rails.switches(&ctx.separators_along(frame)) {
        let other = if rail == rails.top {
            rails.lowered
        } else {
            rails.top
        };
        line_from_to(&mut path, from, rail);
        line_from_to(&mut path, to, other);
        rail = other;
    }

    line_from_to(&mut path, rails.end, rail);
    line_from_to(&mut path, width, rails.bottom);
    path.close();
    path
}

/// Stripes between the rails wherever the bar runs on the lowered rail
fn internal_path(ctx: &StyleContext, frame: &Frame, width: f64, height: f64) -> Path {
    let rails = Rails::new(ctx, width, height);
    let switches = rails.switches(&ctx.separators_along(frame));
    let mut path = Path::new();
    for pair in switches.chunks(2) {
        let (down_from, down_to) = pair[0];
        path.move_to(down_from, rails.top);
        line_from_to(&mut path, down_to, rails.lowered);
        match pair.get(1) {
            Some(&(up_from, up_to)) => {
                line_from_to(&mut path, up_from, rails.lowered);
                line_from_to(&mut path, up_to, rails.top);
            }
            None => {
                line_from_to(&mut path, rails.end, rails.lowered);
                line_from_to(&mut path, rails.end, rails.top);
            }
        }
        path.close();
    }
    path
}

fn paint(canvas: &mut Canvas, ctx: &StyleContext, frame: &Frame) {
    let (width, height) = (frame.width, frame.height);
    let colors = &ctx.params.colors;
    canvas.set_line_width(1.0);

    if !ctx.panel.composited {
        canvas.translate(0.5, 0.5);
        let mut inner = Path::new();
        inner.rectangle(1.0, 1.0, width - 3.0, height + 3.0);
        canvas.stroke(&inner, &Paint::Solid(colors.hilight));
        let mut outer = Path::new();
        outer.rectangle(1.0, 1.0, width - 1.0, height + 3.0);
        canvas.stroke(&outer, &Paint::Solid(colors.border));
        return;
    }

    if ctx.panel.expand {
        canvas.translate(0.0, 0.5);
    } else {
        canvas.translate(0.5, 0.5);
    }

    let stripes = internal_path(ctx, frame, width, height);
    if !stripes.is_empty() {
        if let Some(pattern) = ctx.params.pattern.as_ref().filter(|_| ctx.params.enable_pattern) {
            canvas.fill(
                &stripes,
                &Paint::Pattern {
                    surface: pattern.clone(),
                    alpha: ctx.params.pattern_alpha,
                },
            );
        }
        canvas.fill(
            &stripes,
            &Paint::linear(0.0, 0.0, 0.0, height, &[(0.0, colors.border), (1.0, colors.hilight)]),
        );
    }

    let body = external_path(ctx, frame, width, height);
    canvas.fill(
        &body,
        &Paint::linear(0.0, 0.0, 0.0, height, &[(0.0, colors.g_step_1), (1.0, colors.g_step_2)]),
    );

    let hilight = Paint::linear(
        0.0,
        0.0,
        0.0,
        height / 3.0,
        &[(0.0, colors.g_histep_1), (1.0, colors.g_histep_2)],
    );
    if ctx.panel.expand {
        let mut band = Path::new();
        band.rectangle(0.0, 0.0, width, height / 3.0);
        canvas.fill(&band, &hilight);
    } else {
        canvas.fill(&body, &hilight);
    }
}

impl Style for Lucido {
    fn padding_request(&self, ctx: &StyleContext) -> Padding {
        let side = if ctx.panel.expand {
            0
        } else {
            curve_width(ctx) as u32
        };
        let start = if ctx.at_start() { 0 } else { side };
        let end = if ctx.at_end() { 0 } else { side };
        Padding::from_edge_frame(ctx.position(), TOP_PADDING, 0, start, end)
    }

    fn draw(&self, canvas: &mut Canvas, ctx: &StyleContext, area: Rect) {
        let frame = Frame::new(ctx.position(), area);
        frame.paint_with(canvas, |canvas| paint(canvas, ctx, &frame));
    }

    fn shape_mask(&self, ctx: &StyleContext, area: Rect) -> Region {
        let frame = Frame::new(ctx.position(), area);
        if ctx.panel.expand {
            let mut full = Path::new();
            full.rectangle(0.0, 0.0, frame.width, frame.height + 2.0);
            frame.region(&full)
        } else {
            frame.region(&external_path(ctx, &frame, frame.width, frame.height))
        }
    }

    fn check_layout(&mut self, ctx: &StyleContext) -> RedrawCheck {
        let count = ctx.separators.len();
        // Cheap positional fingerprint; two layouts may collide
        let checksum: i64 = ctx.separators.iter().map(|&o| o as i64 * 3 / 2).sum();

        let padding_changed = count != self.separator_count;
        let moved = checksum != self.checksum;
        self.separator_count = count;
        self.checksum = checksum;
        RedrawCheck {
            redraw: padding_changed || moved,
            padding_changed,
        }
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
        separators: &'a [i32],
    ) -> StyleContext<'a> {
        StyleContext::new(
            params,
            &Placement {
                panel,
                align,
                separators,
            },
        )
    }

    fn params() -> BackgroundParams {
        BackgroundParams {
            curviness: 0.5,
            ..BackgroundParams::default()
        }
    }

    #[test]
    fn test_separator_changes_curve_count() {
        let panel = PanelGeometry::default();
        let params = params();
        let area = Rect::new(0, 0, 600, 50);
        let frame = Frame::new(Position::Bottom, area);

        let plain = external_path(&ctx_with(&panel, &params, 0.5, &[]), &frame, 600.0, 50.0);
        let split = external_path(&ctx_with(&panel, &params, 0.5, &[300]), &frame, 600.0, 50.0);
        let twice = external_path(&ctx_with(&panel, &params, 0.5, &[200, 400]), &frame, 600.0, 50.0);

        assert_eq!(plain.curve_count(), 2);
        assert_eq!(split.curve_count(), 3);
        assert_eq!(twice.curve_count(), 4);
        assert_ne!(plain.len(), split.len());

        let removed = external_path(&ctx_with(&panel, &params, 0.5, &[]), &frame, 600.0, 50.0);
        assert_eq!(removed, plain);
    }

    #[test]
    fn test_lowered_rail_thins_the_mask() {
        let panel = PanelGeometry::default();
        let params = params();
        let area = Rect::new(0, 0, 600, 50);
        let ctx = ctx_with(&panel, &params, 0.5, &[200, 400]);
        let mask = Lucido::default().shape_mask(&ctx, area);
        assert!(mask.contains(100, 10));
        assert!(!mask.contains(300, 10));
        assert!(mask.contains(300, 47));
        assert!(mask.contains(500, 10));

        let stripes = internal_path(&ctx, &Frame::new(Position::Bottom, area), 600.0, 50.0);
        assert!(stripes.to_region().contains(300, 10));
    }

    #[test]
    fn test_layout_check_tracks_count_and_positions() {
        let panel = PanelGeometry::default();
        let params = params();
        let mut style = Lucido::default();

        let check = style.check_layout(&ctx_with(&panel, &params, 0.5, &[]));
        assert_eq!(check, RedrawCheck::default());

        let check = style.check_layout(&ctx_with(&panel, &params, 0.5, &[120]));
        assert!(check.padding_changed && check.redraw);

        let check = style.check_layout(&ctx_with(&panel, &params, 0.5, &[140]));
        assert!(!check.padding_changed && check.redraw);

        let check = style.check_layout(&ctx_with(&panel, &params, 0.5, &[140]));
        assert_eq!(check, RedrawCheck::default());
    }

    #[test]
    fn test_padding_zero_on_aligned_side() {
        let panel = PanelGeometry::default();
        let params = params();
        assert_eq!(
            Lucido::default().padding_request(&ctx_with(&panel, &params, 0.0, &[])),
            Padding::new(2, 0, 0, 24)
        );
        assert_eq!(
            Lucido::default().padding_request(&ctx_with(&panel, &params, 0.5, &[])),
            Padding::new(2, 0, 24, 24)
        );
    }

    #[test]
    fn test_expanded_mask_is_full_area() {
        let panel = PanelGeometry {
            expand: true,
            ..PanelGeometry::default()
        };
        let params = params();
        let area = Rect::new(0, 0, 600, 50);
        let mask = Lucido::default().shape_mask(&ctx_with(&panel, &params, 0.5, &[300]), area);
        assert_eq!(mask.intersect(&Region::from_rect(area)), Region::from_rect(area));
    }
}
