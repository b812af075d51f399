//! Screen space reservation for the panel edge
//!
//! Struts are expressed against the edges of the root window, so a panel on
//! a monitor that does not touch the root edge has to reserve the gap too.
//! When another monitor lies beyond the panel's edge, reserving anything
//! would eat into that monitor, and the strut is dropped.

use crate::background::StrutOffsets;
use crate::geometry::Rect;
use crate::monitor::MonitorGeometry;
use crate::panel::{PanelGeometry, Position};

/// Reserved space along one edge, root coordinates
///
/// `start..end` is the run along the edge, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StrutResult {
    pub distance: u32,
    pub start: i32,
    pub end: i32,
}

impl StrutResult {
    pub fn is_zero(&self) -> bool {
        self.distance == 0
    }

    /// `_NET_WM_STRUT` values: left, right, top, bottom
    pub fn to_strut(&self, position: Position) -> [u32; 4] {
        let mut values = [0; 4];
        values[Self::edge_index(position)] = self.distance;
        values
    }

    /// `_NET_WM_STRUT_PARTIAL` values, with inclusive end coordinates
    pub fn to_strut_partial(&self, position: Position) -> [u32; 12] {
        let mut values = [0; 12];
        if self.is_zero() {
            return values;
        }
        let edge = Self::edge_index(position);
        values[edge] = self.distance;
        values[4 + edge * 2] = self.start.max(0) as u32;
        values[5 + edge * 2] = (self.end - 1).max(self.start).max(0) as u32;
        values
    }

    fn edge_index(position: Position) -> usize {
        match position {
            Position::Left => 0,
            Position::Right => 1,
            Position::Top => 2,
            Position::Bottom => 3,
        }
    }
}

/// Strip between the monitor's `position` edge and the root window edge,
/// at least one pixel thick, spanning the monitor along the edge
fn beyond_edge(position: Position, monitor: Rect, screen: (i32, i32)) -> Rect {
    let (sw, sh) = screen;
    match position {
        Position::Bottom => Rect::new(
            monitor.x,
            monitor.bottom(),
            monitor.width,
            (sh - monitor.bottom()).max(1),
        ),
        Position::Top => {
            let gap = monitor.y.max(1);
            Rect::new(monitor.x, monitor.y - gap, monitor.width, gap)
        }
        Position::Left => {
            let gap = monitor.x.max(1);
            Rect::new(monitor.x - gap, monitor.y, gap, monitor.height)
        }
        Position::Right => Rect::new(
            monitor.right(),
            monitor.y,
            (sw - monitor.right()).max(1),
            monitor.height,
        ),
    }
}

/// Pixels between the monitor's `position` edge and the root window edge
fn root_gap(position: Position, monitor: Rect, screen: (i32, i32)) -> u32 {
    let gap = match position {
        Position::Bottom => screen.1 - monitor.bottom(),
        Position::Top => monitor.y,
        Position::Left => monitor.x,
        Position::Right => screen.0 - monitor.right(),
    };
    gap.max(0) as u32
}

/// `true` when another output lies between the monitor's `position` edge and
/// the root edge
pub fn on_shared_edge(position: Position, monitor: Rect, outputs: &[Rect], screen: (i32, i32)) -> bool {
    let strip = beyond_edge(position, monitor, screen);
    outputs
        .iter()
        .filter(|r| **r != monitor)
        .any(|r| r.intersects(&strip))
}

/// Everything the strut depends on
#[derive(Debug, Clone, Copy)]
pub struct StrutInput<'a> {
    pub panel: &'a PanelGeometry,
    /// Panel window, root coordinates
    pub window: Rect,
    pub monitor: &'a MonitorGeometry,
    pub outputs: &'a [Rect],
    pub screen: (i32, i32),
    /// Footprint reported by the background style, window-local along the edge
    pub style_offsets: Option<StrutOffsets>,
}

pub fn compute(input: &StrutInput) -> StrutResult {
    let position = input.panel.position;
    let monitor = input.monitor.rect();
    if on_shared_edge(position, monitor, input.outputs, input.screen) {
        return StrutResult::default();
    }

    let naive = input.panel.offset + input.panel.size + input.panel.extra_padding;
    let (window_start, window_length) = if position.is_horizontal() {
        (input.window.x, input.window.width)
    } else {
        (input.window.y, input.window.height)
    };
    let (distance, start, end) = match input.style_offsets {
        Some(offsets) => (
            offsets.distance,
            window_start + offsets.start,
            window_start + offsets.end,
        ),
        None => (naive, window_start, window_start + window_length),
    };
    if end <= start {
        return StrutResult::default();
    }

    StrutResult {
        distance: distance + root_gap(position, monitor, input.screen),
        start,
        end,
    }
}

/// Recomputes the strut and reports whether it changed
#[derive(Debug, Default)]
pub struct StrutManager {
    current: Option<(Position, StrutResult)>,
}

impl StrutManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<(Position, StrutResult)> {
        self.current
    }

    /// New strut for `input`, or `None` when nothing changed since the last
    /// update
    pub fn update(&mut self, input: &StrutInput) -> Option<StrutResult> {
        self.publish(input.panel.position, compute(input))
    }

    /// Reserve nothing on `position`'s edge
    pub fn clear(&mut self, position: Position) -> Option<StrutResult> {
        self.publish(position, StrutResult::default())
    }

    fn publish(&mut self, position: Position, strut: StrutResult) -> Option<StrutResult> {
        if self.current == Some((position, strut)) {
            return None;
        }
        self.current = Some((position, strut));
        Some(strut)
    }

    /// Forget the published value so the next update always reports
    pub fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: (i32, i32) = (3840, 1080);

    fn outputs() -> Vec<Rect> {
        vec![Rect::new(0, 0, 1920, 1080), Rect::new(1920, 0, 1920, 1080)]
    }

    fn monitor(rect: Rect) -> MonitorGeometry {
        MonitorGeometry {
            width: rect.width,
            height: rect.height,
            x_offset: rect.x,
            y_offset: rect.y,
            ..MonitorGeometry::default()
        }
    }

    fn right_panel() -> PanelGeometry {
        PanelGeometry {
            position: Position::Right,
            size: 48,
            offset: 0,
            extra_padding: 2,
            ..PanelGeometry::default()
        }
    }

    #[test]
    fn test_right_panel_between_monitors_has_no_strut() {
        let outputs = outputs();
        let panel = right_panel();
        let m0 = monitor(outputs[0]);
        let input = StrutInput {
            panel: &panel,
            window: Rect::new(1870, 300, 50, 400),
            monitor: &m0,
            outputs: &outputs,
            screen: SCREEN,
            style_offsets: None,
        };
        assert!(on_shared_edge(Position::Right, outputs[0], &outputs, SCREEN));
        assert!(compute(&input).is_zero());
    }

    #[test]
    fn test_right_panel_on_outer_monitor_reserves() {
        let outputs = outputs();
        let panel = right_panel();
        let m1 = monitor(outputs[1]);
        let input = StrutInput {
            panel: &panel,
            window: Rect::new(3790, 300, 50, 400),
            monitor: &m1,
            outputs: &outputs,
            screen: SCREEN,
            style_offsets: None,
        };
        let strut = compute(&input);
        assert_eq!(
            strut,
            StrutResult {
                distance: 50,
                start: 300,
                end: 700
            }
        );
        assert_eq!(strut.to_strut(Position::Right), [0, 50, 0, 0]);
        let partial = strut.to_strut_partial(Position::Right);
        assert_eq!(&partial[..2], &[0, 50]);
        assert_eq!(&partial[6..8], &[300, 699]);
    }

    #[test]
    fn test_gap_to_root_edge_is_added() {
        // Short monitor beside a tall one; nothing lies below the short one
        let outputs = vec![Rect::new(0, 0, 1920, 1080), Rect::new(1920, 0, 1280, 1440)];
        let panel = PanelGeometry::default();
        let m0 = monitor(outputs[0]);
        let input = StrutInput {
            panel: &panel,
            window: Rect::new(800, 1032, 320, 48),
            monitor: &m0,
            outputs: &outputs,
            screen: (3200, 1440),
            style_offsets: None,
        };
        let strut = compute(&input);
        assert_eq!(strut.distance, 48 + 360);
        assert_eq!((strut.start, strut.end), (800, 1120));
    }

    #[test]
    fn test_monitor_below_suppresses_bottom_strut() {
        let outputs = vec![Rect::new(0, 0, 1920, 1080), Rect::new(0, 1080, 1920, 1080)];
        assert!(on_shared_edge(Position::Bottom, outputs[0], &outputs, (1920, 2160)));
        assert!(!on_shared_edge(Position::Bottom, outputs[1], &outputs, (1920, 2160)));
        assert!(!on_shared_edge(Position::Top, outputs[0], &outputs, (1920, 2160)));
    }

    #[test]
    fn test_style_offsets_override_footprint() {
        let outputs = vec![Rect::new(0, 0, 1920, 1080)];
        let panel = PanelGeometry::default();
        let m0 = monitor(outputs[0]);
        let input = StrutInput {
            panel: &panel,
            window: Rect::new(0, 1013, 200, 67),
            monitor: &m0,
            outputs: &outputs,
            screen: (1920, 1080),
            style_offsets: Some(StrutOffsets {
                distance: 55,
                start: 0,
                end: 200,
            }),
        };
        assert_eq!(
            compute(&input),
            StrutResult {
                distance: 55,
                start: 0,
                end: 200
            }
        );
    }

    #[test]
    fn test_manager_reports_changes_once() {
        let outputs = vec![Rect::new(0, 0, 1920, 1080)];
        let panel = PanelGeometry::default();
        let m0 = monitor(outputs[0]);
        let input = StrutInput {
            panel: &panel,
            window: Rect::new(800, 1032, 320, 48),
            monitor: &m0,
            outputs: &outputs,
            screen: (1920, 1080),
            style_offsets: None,
        };
        let mut manager = StrutManager::new();
        assert!(manager.update(&input).is_some());
        assert!(manager.update(&input).is_none());
        manager.reset();
        assert!(manager.update(&input).is_some());
        assert_eq!(manager.clear(Position::Bottom), Some(StrutResult::default()));
        assert!(manager.clear(Position::Bottom).is_none());
    }
}
