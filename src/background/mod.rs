//! Background styles
//!
//! A style turns the panel parameters into the padding it needs around the
//! applets, the painted background, and the shape/input regions cut from the
//! same outline. Every style builds its outline in one canonical frame: the
//! panel sits on the bottom edge, `u` runs along the edge from the start side
//! and `v = 0` faces the screen interior. [`Frame`] maps that frame onto the
//! real edge so the four positions share one code path.

mod curves;
mod edgy;
mod flat;
mod floaty;
mod lucido;
mod null;
mod three_d;

use std::f64::consts::PI;
use std::path::Path as FsPath;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::canvas::{Canvas, Paint, Surface};
use crate::color::Rgba;
use crate::geometry::{Path, Rect, Region, Transform};
use crate::panel::{Padding, PanelGeometry, Position};
use crate::signal::Signal;

pub use curves::Curves;
pub use edgy::Edgy;
pub use flat::Flat;
pub use floaty::Floaty;
pub use lucido::Lucido;
pub use null::Null;
pub use three_d::ThreeD;

/// Configured background style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StyleKind {
    #[default]
    Flat,
    Edgy,
    Floaty,
    Lucido,
    ThreeD,
    Curves,
    None,
}

/// Curvature family icons follow when laid out over the background
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Linear,
    Ellipse,
}

/// Named theme colours
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Colors {
    pub g_step_1: Rgba,
    pub g_step_2: Rgba,
    pub g_histep_1: Rgba,
    pub g_histep_2: Rgba,
    pub border: Rgba,
    pub hilight: Rgba,
    pub sep: Rgba,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            g_step_1: Rgba::from_bytes(0x45, 0x45, 0x45, 0xC8),
            g_step_2: Rgba::from_bytes(0x01, 0x01, 0x01, 0xBE),
            g_histep_1: Rgba::from_bytes(0xFF, 0xFF, 0xFF, 0x0B),
            g_histep_2: Rgba::from_bytes(0xFF, 0xFF, 0xFF, 0x0A),
            border: Rgba::from_bytes(0x00, 0x00, 0x00, 0xCC),
            hilight: Rgba::from_bytes(0xFF, 0xFF, 0xFF, 0x11),
            sep: Rgba::from_bytes(0xFF, 0xFF, 0xFF, 0x00),
        }
    }
}

/// Parameters shared by all styles
#[derive(Debug, Clone)]
pub struct BackgroundParams {
    pub corner_radius: f64,
    /// Tilt of the 3D plane in degrees, `0..=90`
    pub panel_angle: f64,
    pub floaty_offset: u32,
    /// Side-plane depth of the 3D style, `0..=1`
    pub thickness: f64,
    pub curviness: f64,
    pub curves_symmetry: f64,
    pub enable_pattern: bool,
    pub pattern_alpha: f64,
    pub pattern: Option<Arc<Surface>>,
    pub colors: Colors,
}

impl Default for BackgroundParams {
    fn default() -> Self {
        Self {
            corner_radius: 10.0,
            panel_angle: 45.0,
            floaty_offset: 10,
            thickness: 0.6,
            curviness: 1.0,
            curves_symmetry: 0.5,
            enable_pattern: false,
            pattern_alpha: 0.5,
            pattern: None,
            colors: Colors::default(),
        }
    }
}

/// Where the panel sits, as seen by a style
#[derive(Debug, Clone, Copy)]
pub struct Placement<'a> {
    pub panel: &'a PanelGeometry,
    /// Monitor alignment, already mirrored for right-to-left layouts
    pub align: f64,
    /// Separator offsets along the edge, relative to the drawn area
    pub separators: &'a [i32],
}

/// Read-only inputs of every style operation
#[derive(Debug, Clone, Copy)]
pub struct StyleContext<'a> {
    pub panel: &'a PanelGeometry,
    pub params: &'a BackgroundParams,
    /// Alignment in the canonical frame: `0.0` hugs the start side
    pub align: f64,
    pub separators: &'a [i32],
}

impl<'a> StyleContext<'a> {
    fn new(params: &'a BackgroundParams, placement: &Placement<'a>) -> Self {
        let position = placement.panel.position;
        let align = placement.align.clamp(0.0, 1.0);
        Self {
            panel: placement.panel,
            params,
            align: match position {
                Position::Bottom | Position::Left => align,
                Position::Top | Position::Right => 1.0 - align,
            },
            separators: placement.separators,
        }
    }

    pub fn position(&self) -> Position {
        self.panel.position
    }

    /// Panel is pushed against the start side of the monitor
    pub fn at_start(&self) -> bool {
        self.align <= 0.0
    }

    /// Panel is pushed against the end side of the monitor
    pub fn at_end(&self) -> bool {
        self.align >= 1.0
    }

    /// Separator positions mapped to `u` inside `frame`, sorted
    pub fn separators_along(&self, frame: &Frame) -> Vec<f64> {
        let mut along: Vec<f64> = self
            .separators
            .iter()
            .map(|&o| match self.position() {
                Position::Bottom | Position::Left => o as f64,
                Position::Top | Position::Right => frame.width - o as f64,
            })
            .filter(|u| *u > 0.0 && *u < frame.width)
            .collect();
        along.sort_by(f64::total_cmp);
        along
    }

    /// Body fill: the tiled pattern when one is loaded, else `gradient`
    fn body_paint(&self, gradient: Paint) -> Paint {
        match &self.params.pattern {
            Some(surface) if self.params.enable_pattern => Paint::Pattern {
                surface: Arc::clone(surface),
                alpha: self.params.pattern_alpha,
            },
            _ => gradient,
        }
    }
}

/// Canonical bottom-edge frame of a drawing area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub transform: Transform,
    /// Extent along the edge
    pub width: f64,
    /// Extent away from the edge
    pub height: f64,
}

impl Frame {
    pub fn new(position: Position, area: Rect) -> Self {
        let (x, y) = (area.x as f64, area.y as f64);
        let (w, h) = (area.width as f64, area.height as f64);
        let base = Transform::identity();
        match position {
            Position::Bottom => Self {
                transform: base.translate(x, y),
                width: w,
                height: h,
            },
            Position::Top => Self {
                transform: base.translate(x + w, y + h).rotate(PI),
                width: w,
                height: h,
            },
            Position::Right => Self {
                transform: base.translate(x, y + h).rotate(PI * 1.5),
                width: h,
                height: w,
            },
            Position::Left => Self {
                transform: base.translate(x + w, y).rotate(PI * 0.5),
                width: h,
                height: w,
            },
        }
    }

    /// Run `draw` with the canvas switched into this frame
    fn paint_with(&self, canvas: &mut Canvas, draw: impl FnOnce(&mut Canvas)) {
        canvas.save();
        canvas.set_transform(canvas.transform().multiply(&self.transform));
        draw(canvas);
        canvas.restore();
    }

    /// Pixels covered by filling the frame-space `path`
    fn region(&self, path: &Path) -> Region {
        path.transform(&self.transform).to_region()
    }
}

/// Strut override reported by styles with a non-rectangular footprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrutOffsets {
    pub distance: u32,
    /// Reserved run along the edge, relative to the drawn area
    pub start: i32,
    pub end: i32,
}

/// Gap a style asks to be kept free at one end of the applet row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spacer {
    /// `true` for the left/top end of the row in window coordinates
    pub leading: bool,
    pub length: u32,
}

/// Outcome of the per-frame cache check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RedrawCheck {
    pub redraw: bool,
    pub padding_changed: bool,
}

/// Capabilities of one background style
trait Style {
    fn padding_request(&self, ctx: &StyleContext) -> Padding;

    fn draw(&self, canvas: &mut Canvas, ctx: &StyleContext, area: Rect);

    fn shape_mask(&self, _ctx: &StyleContext, area: Rect) -> Region {
        Region::from_rect(area)
    }

    fn input_shape_mask(&self, ctx: &StyleContext, area: Rect) -> Region {
        self.shape_mask(ctx, area)
    }

    fn strut_offsets(&self, _ctx: &StyleContext, _area: Rect) -> Option<StrutOffsets> {
        None
    }

    fn path_type(&self, _ctx: &StyleContext) -> (PathKind, f64) {
        (PathKind::Linear, 1.0)
    }

    fn spacer(&self, _ctx: &StyleContext) -> Option<Spacer> {
        None
    }

    /// Compare live applet state against what the last draw used
    fn check_layout(&mut self, _ctx: &StyleContext) -> RedrawCheck {
        RedrawCheck::default()
    }
}

/// Active style with its per-variant state
#[derive(Debug, Clone)]
pub enum BackgroundStyle {
    Flat(Flat),
    Edgy(Edgy),
    Floaty(Floaty),
    Lucido(Lucido),
    ThreeD(ThreeD),
    Curves(Curves),
    None(Null),
}

impl BackgroundStyle {
    pub fn new(kind: StyleKind) -> Self {
        match kind {
            StyleKind::Flat => BackgroundStyle::Flat(Flat),
            StyleKind::Edgy => BackgroundStyle::Edgy(Edgy),
            StyleKind::Floaty => BackgroundStyle::Floaty(Floaty),
            StyleKind::Lucido => BackgroundStyle::Lucido(Lucido::default()),
            StyleKind::ThreeD => BackgroundStyle::ThreeD(ThreeD),
            StyleKind::Curves => BackgroundStyle::Curves(Curves),
            StyleKind::None => BackgroundStyle::None(Null),
        }
    }

    pub fn kind(&self) -> StyleKind {
        match self {
            BackgroundStyle::Flat(_) => StyleKind::Flat,
            BackgroundStyle::Edgy(_) => StyleKind::Edgy,
            BackgroundStyle::Floaty(_) => StyleKind::Floaty,
            BackgroundStyle::Lucido(_) => StyleKind::Lucido,
            BackgroundStyle::ThreeD(_) => StyleKind::ThreeD,
            BackgroundStyle::Curves(_) => StyleKind::Curves,
            BackgroundStyle::None(_) => StyleKind::None,
        }
    }

    fn style(&self) -> &dyn Style {
        match self {
            BackgroundStyle::Flat(s) => s,
            BackgroundStyle::Edgy(s) => s,
            BackgroundStyle::Floaty(s) => s,
            BackgroundStyle::Lucido(s) => s,
            BackgroundStyle::ThreeD(s) => s,
            BackgroundStyle::Curves(s) => s,
            BackgroundStyle::None(s) => s,
        }
    }

    fn style_mut(&mut self) -> &mut dyn Style {
        match self {
            BackgroundStyle::Flat(s) => s,
            BackgroundStyle::Edgy(s) => s,
            BackgroundStyle::Floaty(s) => s,
            BackgroundStyle::Lucido(s) => s,
            BackgroundStyle::ThreeD(s) => s,
            BackgroundStyle::Curves(s) => s,
            BackgroundStyle::None(s) => s,
        }
    }
}

/// Owner of the active style and its parameters
///
/// Parameter changes invalidate the cached output and are announced through
/// `padding_changed` and `changed`.
pub struct Background {
    style: BackgroundStyle,
    params: BackgroundParams,
    needs_redraw: bool,
    /// Latched after the first pattern load failure
    pattern_warned: bool,

    pub padding_changed: Signal<()>,
    pub changed: Signal<()>,
}

impl Background {
    pub fn new(kind: StyleKind, params: BackgroundParams) -> Self {
        Self {
            style: BackgroundStyle::new(kind),
            params,
            needs_redraw: true,
            pattern_warned: false,
            padding_changed: Signal::new(),
            changed: Signal::new(),
        }
    }

    pub fn kind(&self) -> StyleKind {
        self.style.kind()
    }

    pub fn params(&self) -> &BackgroundParams {
        &self.params
    }

    /// Switch to another style; per-variant state starts fresh
    pub fn set_kind(&mut self, kind: StyleKind) {
        if kind == self.kind() {
            return;
        }
        debug!(?kind, "switching background style");
        self.style = BackgroundStyle::new(kind);
        self.notify();
    }

    pub fn set_params(&mut self, params: BackgroundParams) {
        self.params = params;
        self.notify();
    }

    /// Load (or clear) the tiled pattern image
    ///
    /// A load failure disables the pattern and is reported only once.
    pub fn load_pattern(&mut self, path: Option<&FsPath>) {
        self.params.pattern = match path {
            None => None,
            Some(path) => match Surface::from_png(path) {
                Ok(surface) => {
                    self.pattern_warned = false;
                    Some(Arc::new(surface))
                }
                Err(e) => {
                    if !self.pattern_warned {
                        warn!(path = %path.display(), error = %e, "Failed to load background pattern, disabling it");
                        self.pattern_warned = true;
                    }
                    None
                }
            },
        };
        self.notify();
    }

    pub fn invalidate(&mut self) {
        self.needs_redraw = true;
    }

    fn notify(&mut self) {
        self.invalidate();
        self.padding_changed.emit(&());
        self.changed.emit(&());
    }

    /// Whether the cached drawing is stale; clears the flag
    pub fn check_needs_redraw(&mut self, placement: &Placement) -> bool {
        let ctx = StyleContext::new(&self.params, placement);
        let check = self.style.style_mut().check_layout(&ctx);
        if check.padding_changed {
            self.padding_changed.emit(&());
        }
        let stale = self.needs_redraw || check.redraw;
        self.needs_redraw = false;
        stale
    }

    pub fn padding_request(&self, placement: &Placement) -> Padding {
        let ctx = StyleContext::new(&self.params, placement);
        self.style.style().padding_request(&ctx)
    }

    /// Paint into `canvas`; the canvas transform is unchanged afterwards
    pub fn draw(&self, canvas: &mut Canvas, placement: &Placement, area: Rect) {
        let ctx = StyleContext::new(&self.params, placement);
        let depth = canvas.save_depth();
        canvas.save();
        self.style.style().draw(canvas, &ctx, area);
        while canvas.save_depth() > depth {
            canvas.restore();
        }
    }

    /// Painted pixels, clipped to `area`
    pub fn shape_mask(&self, placement: &Placement, area: Rect) -> Region {
        let ctx = StyleContext::new(&self.params, placement);
        self.style
            .style()
            .shape_mask(&ctx, area)
            .intersect(&Region::from_rect(area))
    }

    /// Pixels that take input; always inside [`Background::shape_mask`]
    pub fn input_shape_mask(&self, placement: &Placement, area: Rect) -> Region {
        let ctx = StyleContext::new(&self.params, placement);
        let style = self.style.style();
        style
            .input_shape_mask(&ctx, area)
            .intersect(&style.shape_mask(&ctx, area))
            .intersect(&Region::from_rect(area))
    }

    pub fn strut_offsets(&self, placement: &Placement, area: Rect) -> Option<StrutOffsets> {
        let ctx = StyleContext::new(&self.params, placement);
        self.style.style().strut_offsets(&ctx, area)
    }

    pub fn path_type(&self, placement: &Placement) -> (PathKind, f64) {
        let ctx = StyleContext::new(&self.params, placement);
        self.style.style().path_type(&ctx)
    }

    pub fn spacer(&self, placement: &Placement) -> Option<Spacer> {
        let ctx = StyleContext::new(&self.params, placement);
        self.style.style().spacer(&ctx)
    }
}

/// Map a spacer at the canonical start or end onto window order
fn spacer_at(position: Position, canonical_start: bool, length: u32) -> Spacer {
    let leading = match position {
        Position::Bottom | Position::Left => canonical_start,
        Position::Top | Position::Right => !canonical_start,
    };
    Spacer { leading, length }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [StyleKind; 7] = [
        StyleKind::Flat,
        StyleKind::Edgy,
        StyleKind::Floaty,
        StyleKind::Lucido,
        StyleKind::ThreeD,
        StyleKind::Curves,
        StyleKind::None,
    ];

    fn area_for(panel: &PanelGeometry, padding: Padding) -> Rect {
        let thickness = (panel.size + panel.offset + padding.perpendicular(panel.position)) as i32;
        if panel.position.is_horizontal() {
            Rect::new(0, 0, 400, thickness)
        } else {
            Rect::new(0, 0, thickness, 400)
        }
    }

    #[test]
    fn test_flat_bottom_padding() {
        let background = Background::new(StyleKind::Flat, BackgroundParams::default());
        let panel = PanelGeometry::default();
        let placement = Placement {
            panel: &panel,
            align: 0.5,
            separators: &[],
        };
        assert_eq!(background.padding_request(&placement), Padding::new(2, 0, 7, 7));
    }

    #[test]
    fn test_padding_sane_for_every_style_and_position() {
        for kind in ALL_KINDS {
            let background = Background::new(kind, BackgroundParams::default());
            for position in Position::ALL {
                for align in [0.0, 0.5, 1.0] {
                    let panel = PanelGeometry {
                        position,
                        ..PanelGeometry::default()
                    };
                    let placement = Placement {
                        panel: &panel,
                        align,
                        separators: &[],
                    };
                    let p = background.padding_request(&placement);
                    // Unsigned already; make sure nothing wrapped around
                    for v in [p.top, p.bottom, p.left, p.right] {
                        assert!(v < 1000, "{kind:?} {position:?} {align}: {p:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_input_mask_inside_shape_mask() {
        for kind in ALL_KINDS {
            let background = Background::new(kind, BackgroundParams::default());
            for position in Position::ALL {
                let panel = PanelGeometry {
                    position,
                    ..PanelGeometry::default()
                };
                let placement = Placement {
                    panel: &panel,
                    align: 0.5,
                    separators: &[120],
                };
                let area = area_for(&panel, background.padding_request(&placement));
                let shape = background.shape_mask(&placement, area);
                let input = background.input_shape_mask(&placement, area);
                assert!(input.is_subset_of(&shape), "{kind:?} {position:?}");
            }
        }
    }

    #[test]
    fn test_shape_mask_idempotent() {
        for kind in ALL_KINDS {
            let background = Background::new(kind, BackgroundParams::default());
            let panel = PanelGeometry::default();
            let placement = Placement {
                panel: &panel,
                align: 0.0,
                separators: &[],
            };
            let area = area_for(&panel, background.padding_request(&placement));
            assert_eq!(
                background.shape_mask(&placement, area),
                background.shape_mask(&placement, area),
                "{kind:?}"
            );
        }
    }

    #[test]
    fn test_draw_restores_canvas_state() {
        for kind in ALL_KINDS {
            let background = Background::new(kind, BackgroundParams::default());
            for position in Position::ALL {
                let panel = PanelGeometry {
                    position,
                    ..PanelGeometry::default()
                };
                let placement = Placement {
                    panel: &panel,
                    align: 1.0,
                    separators: &[],
                };
                let area = area_for(&panel, background.padding_request(&placement));
                let mut canvas = Canvas::new(area.width as u32, area.height as u32).unwrap();
                canvas.translate(0.25, 0.0);
                let entry = canvas.transform();
                background.draw(&mut canvas, &placement, area);
                assert_eq!(canvas.transform(), entry, "{kind:?} {position:?}");
                assert_eq!(canvas.save_depth(), 0);
            }
        }
    }

    #[test]
    fn test_flat_draw_stays_inside_shape() {
        let background = Background::new(StyleKind::Flat, BackgroundParams::default());
        let panel = PanelGeometry::default();
        let placement = Placement {
            panel: &panel,
            align: 0.5,
            separators: &[],
        };
        let area = Rect::new(0, 0, 200, 50);
        let mut canvas = Canvas::new(200, 50).unwrap();
        background.draw(&mut canvas, &placement, area);
        let shape = background.shape_mask(&placement, area);
        assert!(!shape.contains(0, 0));
        assert_eq!(canvas.surface().pixel(0, 0), Some(0));
        assert!(shape.contains(100, 25));
        assert_ne!(canvas.surface().pixel(100, 25), Some(0));
    }

    #[test]
    fn test_params_change_notifies() {
        use std::cell::Cell;
        use std::rc::Rc;

        let mut background = Background::new(StyleKind::Flat, BackgroundParams::default());
        let panel = PanelGeometry::default();
        let placement = Placement {
            panel: &panel,
            align: 0.5,
            separators: &[],
        };
        assert!(background.check_needs_redraw(&placement));
        assert!(!background.check_needs_redraw(&placement));

        let seen = Rc::new(Cell::new(0));
        let sink = Rc::clone(&seen);
        let _sub = background.changed.connect(move |_| sink.set(sink.get() + 1));
        background.set_params(BackgroundParams {
            corner_radius: 20.0,
            ..BackgroundParams::default()
        });
        assert_eq!(seen.get(), 1);
        assert!(background.check_needs_redraw(&placement));
    }

    #[test]
    fn test_missing_pattern_disables_and_warns_once() {
        let mut background = Background::new(StyleKind::Flat, BackgroundParams::default());
        let missing = FsPath::new("/nonexistent/edgepanel-pattern.png");
        background.load_pattern(Some(missing));
        assert!(background.params().pattern.is_none());
        assert!(background.pattern_warned);
        background.load_pattern(Some(missing));
        assert!(background.pattern_warned);
    }

    #[test]
    fn test_canonical_alignment_mirrors_top_and_right() {
        let params = BackgroundParams::default();
        for (position, expected) in [
            (Position::Bottom, 0.0),
            (Position::Left, 0.0),
            (Position::Top, 1.0),
            (Position::Right, 1.0),
        ] {
            let panel = PanelGeometry {
                position,
                ..PanelGeometry::default()
            };
            let placement = Placement {
                panel: &panel,
                align: 0.0,
                separators: &[],
            };
            assert_eq!(StyleContext::new(&params, &placement).align, expected);
        }
    }
}
