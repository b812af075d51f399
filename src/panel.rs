//! Panel geometry, padding, and window layout

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::monitor::MonitorGeometry;

/// Screen edge the panel is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Top,
    #[default]
    Bottom,
    Left,
    Right,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::Top,
        Position::Bottom,
        Position::Left,
        Position::Right,
    ];

    /// `true` for panels laid out along a horizontal edge
    pub fn is_horizontal(self) -> bool {
        matches!(self, Position::Top | Position::Bottom)
    }
}

/// Panel parameters shared by every component; only the shell writes them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelGeometry {
    pub position: Position,
    /// Icon diameter
    pub size: u32,
    /// Lift of the icons from the screen edge
    pub offset: u32,
    /// Perpendicular padding requested by the background style
    pub extra_padding: u32,
    pub composited: bool,
    pub expand: bool,
}

impl Default for PanelGeometry {
    fn default() -> Self {
        Self {
            position: Position::Bottom,
            size: 48,
            offset: 0,
            extra_padding: 0,
            composited: true,
            expand: false,
        }
    }
}

/// Space reserved around the applet area, in window directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Padding {
    pub const fn new(top: u32, bottom: u32, left: u32, right: u32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Map padding expressed in the edge-relative frame onto window sides
    ///
    /// `away` faces the screen interior, `edge` touches the screen edge,
    /// `start`/`end` run along the edge in the same direction as the drawing
    /// frame of background styles.
    pub fn from_edge_frame(position: Position, away: u32, edge: u32, start: u32, end: u32) -> Self {
        match position {
            Position::Bottom => Self::new(away, edge, start, end),
            Position::Top => Self::new(edge, away, end, start),
            Position::Left => Self::new(start, end, edge, away),
            Position::Right => Self::new(end, start, away, edge),
        }
    }

    /// Sum of the paddings perpendicular to the screen edge
    pub fn perpendicular(&self, position: Position) -> u32 {
        if position.is_horizontal() {
            self.top + self.bottom
        } else {
            self.left + self.right
        }
    }

    /// Sum of the paddings along the screen edge
    pub fn along(&self, position: Position) -> u32 {
        if position.is_horizontal() {
            self.left + self.right
        } else {
            self.top + self.bottom
        }
    }
}

/// Resolved panel window placement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelLayout {
    /// Window rectangle in root coordinates
    pub window: Rect,
    /// Area the background is drawn into, window-local
    pub drawable: Rect,
    /// Applet viewport, window-local
    pub viewport: Rect,
}

impl PanelLayout {
    /// Lay the panel out on `monitor` for `content_length` pixels of applets
    pub fn compute(
        geometry: &PanelGeometry,
        padding: Padding,
        content_length: u32,
        monitor: &MonitorGeometry,
    ) -> Self {
        let position = geometry.position;
        let thickness = (geometry.size + geometry.offset + padding.perpendicular(position)) as i32;
        let span = if position.is_horizontal() {
            monitor.width
        } else {
            monitor.height
        };
        let natural = (content_length + padding.along(position)) as i32;
        let length = if geometry.expand { span } else { natural.min(span) };
        let along_start = ((span - length) as f64 * monitor.align.clamp(0.0, 1.0)).round() as i32;

        let window = match position {
            Position::Bottom => Rect::new(
                monitor.x_offset + along_start,
                monitor.y_offset + monitor.height - thickness,
                length,
                thickness,
            ),
            Position::Top => Rect::new(monitor.x_offset + along_start, monitor.y_offset, length, thickness),
            Position::Left => Rect::new(monitor.x_offset, monitor.y_offset + along_start, thickness, length),
            Position::Right => Rect::new(
                monitor.x_offset + monitor.width - thickness,
                monitor.y_offset + along_start,
                thickness,
                length,
            ),
        };

        let drawable = Rect::new(0, 0, window.width, window.height);
        let size = geometry.size as i32;
        let inner = length - padding.along(position) as i32;
        let content = (content_length as i32).min(inner.max(0));
        // Centre the applets inside the padded run when the panel is stretched
        let lead = ((inner - content).max(0)) / 2;
        let viewport = match position {
            Position::Bottom => Rect::new(padding.left as i32 + lead, padding.top as i32, content, size),
            Position::Top => Rect::new(
                padding.left as i32 + lead,
                thickness - padding.bottom as i32 - size,
                content,
                size,
            ),
            Position::Left => Rect::new(
                thickness - padding.right as i32 - size,
                padding.top as i32 + lead,
                size,
                content,
            ),
            Position::Right => Rect::new(padding.left as i32, padding.top as i32 + lead, size, content),
        };

        Self {
            window,
            drawable,
            viewport,
        }
    }

    /// Single-pixel strip along the side of the drawable area facing away
    /// from the screen edge, in root coordinates
    pub fn away_edge(&self, position: Position) -> Rect {
        let d = self.drawable.translate(self.window.x, self.window.y);
        match position {
            Position::Bottom => Rect::new(d.x, d.y, d.width, 1),
            Position::Top => Rect::new(d.x, d.bottom() - 1, d.width, 1),
            Position::Left => Rect::new(d.right() - 1, d.y, 1, d.height),
            Position::Right => Rect::new(d.x, d.y, 1, d.height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> MonitorGeometry {
        MonitorGeometry {
            width: 1920,
            height: 1080,
            ..MonitorGeometry::default()
        }
    }

    #[test]
    fn test_edge_frame_mapping() {
        let p = Padding::from_edge_frame(Position::Bottom, 2, 0, 7, 9);
        assert_eq!(p, Padding::new(2, 0, 7, 9));
        let p = Padding::from_edge_frame(Position::Right, 2, 0, 7, 9);
        assert_eq!((p.left, p.right), (2, 0));
        assert_eq!((p.bottom, p.top), (7, 9));
        assert_eq!(p.perpendicular(Position::Right), 2);
    }

    #[test]
    fn test_bottom_layout_centred() {
        let geo = PanelGeometry::default();
        let padding = Padding::new(2, 0, 7, 7);
        let layout = PanelLayout::compute(&geo, padding, 300, &monitor());
        assert_eq!(layout.window, Rect::new(803, 1030, 314, 50));
        assert_eq!(layout.viewport, Rect::new(7, 2, 300, 48));
    }

    #[test]
    fn test_expand_spans_monitor() {
        let geo = PanelGeometry {
            expand: true,
            position: Position::Left,
            ..PanelGeometry::default()
        };
        let layout = PanelLayout::compute(&geo, Padding::new(0, 0, 0, 2), 200, &monitor());
        assert_eq!(layout.window, Rect::new(0, 0, 50, 1080));
        assert_eq!(layout.viewport.height, 200);
        assert_eq!(layout.viewport.x, 0);
    }

    #[test]
    fn test_right_panel_sits_on_right_edge() {
        let geo = PanelGeometry {
            position: Position::Right,
            ..PanelGeometry::default()
        };
        let layout = PanelLayout::compute(&geo, Padding::new(7, 7, 2, 0), 100, &monitor());
        assert_eq!(layout.window.right(), 1920);
        assert_eq!(layout.window.width, 50);
        assert_eq!(layout.away_edge(Position::Right), Rect::new(1870, layout.window.y, 1, layout.window.height));
    }

    #[test]
    fn test_away_edge_faces_screen_interior() {
        let layout = PanelLayout {
            window: Rect::new(100, 200, 60, 400),
            drawable: Rect::new(5, 0, 50, 400),
            viewport: Rect::new(5, 0, 48, 390),
        };
        assert_eq!(layout.away_edge(Position::Left), Rect::new(154, 200, 1, 400));
        assert_eq!(layout.away_edge(Position::Right), Rect::new(105, 200, 1, 400));
        assert_eq!(layout.away_edge(Position::Top), Rect::new(105, 599, 50, 1));
        assert_eq!(layout.away_edge(Position::Bottom), Rect::new(105, 200, 50, 1));
    }
}
