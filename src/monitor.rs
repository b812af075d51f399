//! Monitor selection and geometry tracking
//!
//! Resolves the geometry of the monitor the panel lives on from the output
//! list reported by the windowing system, or from forced configuration.

use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::geometry::Rect;
use crate::signal::Signal;

/// Geometry of the panel's monitor in root-window coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorGeometry {
    pub width: i32,
    pub height: i32,
    pub x_offset: i32,
    pub y_offset: i32,
    /// Fraction along the panel edge, `0.0..=1.0`
    pub align: f64,
    pub monitor_number: i32,
    pub force: bool,
}

impl Default for MonitorGeometry {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            x_offset: 0,
            y_offset: 0,
            align: 0.5,
            monitor_number: 0,
            force: false,
        }
    }
}

impl MonitorGeometry {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x_offset, self.y_offset, self.width, self.height)
    }
}

/// Owner of the resolved [`MonitorGeometry`]
pub struct Monitor {
    settings: MonitorConfig,
    outputs: Vec<Rect>,
    screen: (i32, i32),
    geometry: MonitorGeometry,
    /// Latched after the first out-of-range warning, reset on layout change
    fallback_warned: bool,

    pub geometry_changed: Signal<MonitorGeometry>,
}

impl Monitor {
    pub fn new(settings: MonitorConfig) -> Self {
        let mut monitor = Self {
            settings,
            outputs: Vec::new(),
            screen: (0, 0),
            geometry: MonitorGeometry::default(),
            fallback_warned: false,
            geometry_changed: Signal::new(),
        };
        monitor.geometry = monitor.resolve();
        monitor
    }

    pub fn geometry(&self) -> MonitorGeometry {
        self.geometry
    }

    /// All outputs of the current layout, for shared-edge detection
    pub fn outputs(&self) -> &[Rect] {
        &self.outputs
    }

    pub fn screen_size(&self) -> (i32, i32) {
        self.screen
    }

    /// New monitor layout from the windowing system
    pub fn update_outputs(&mut self, outputs: Vec<Rect>, screen_width: i32, screen_height: i32) {
        info!(
            outputs = outputs.len(),
            screen_width,
            screen_height,
            "monitor layout changed"
        );
        self.outputs = outputs;
        self.screen = (screen_width, screen_height);
        self.fallback_warned = false;
        self.refresh();
    }

    /// New monitor settings from a configuration reload
    pub fn set_settings(&mut self, mut settings: MonitorConfig) {
        settings.align = settings.align.clamp(0.0, 1.0);
        self.settings = settings;
        self.refresh();
    }

    fn refresh(&mut self) {
        let resolved = self.resolve();
        if resolved != self.geometry {
            debug!(?resolved, "monitor geometry changed");
            self.geometry = resolved;
            self.geometry_changed.emit(&resolved);
        }
    }

    fn resolve(&mut self) -> MonitorGeometry {
        let settings = &self.settings;
        let rect = if settings.force {
            Rect::new(
                settings.x_offset,
                settings.y_offset,
                settings.width,
                settings.height,
            )
        } else if self.outputs.is_empty() {
            if self.screen.0 > 0 && self.screen.1 > 0 {
                Rect::new(0, 0, self.screen.0, self.screen.1)
            } else {
                Rect::new(
                    settings.x_offset,
                    settings.y_offset,
                    settings.width,
                    settings.height,
                )
            }
        } else if settings.number < 0 {
            self.outputs
                .iter()
                .find(|r| r.contains(0, 0))
                .or(self.outputs.first())
                .copied()
                .unwrap_or_default()
        } else if let Some(rect) = self.outputs.get(settings.number as usize) {
            *rect
        } else {
            if !self.fallback_warned {
                warn!(
                    monitor = settings.number,
                    available = self.outputs.len(),
                    "configured monitor does not exist, using the last one"
                );
                self.fallback_warned = true;
            }
            self.outputs.last().copied().unwrap_or_default()
        };

        MonitorGeometry {
            width: rect.width,
            height: rect.height,
            x_offset: rect.x,
            y_offset: rect.y,
            align: settings.align,
            monitor_number: settings.number,
            force: settings.force,
        }
    }

    #[cfg(test)]
    fn fallback_warned(&self) -> bool {
        self.fallback_warned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn dual_head() -> Vec<Rect> {
        vec![Rect::new(1920, 0, 1920, 1080), Rect::new(0, 0, 1920, 1080)]
    }

    #[test]
    fn test_defaults_without_outputs() {
        let monitor = Monitor::new(MonitorConfig::default());
        let geo = monitor.geometry();
        assert_eq!((geo.width, geo.height), (1024, 768));
        assert_eq!(geo.align, 0.5);
    }

    #[test]
    fn test_minus_one_picks_origin_output() {
        let mut monitor = Monitor::new(MonitorConfig {
            number: -1,
            ..MonitorConfig::default()
        });
        monitor.update_outputs(dual_head(), 3840, 1080);
        assert_eq!(monitor.geometry().x_offset, 0);
    }

    #[test]
    fn test_out_of_range_falls_back_to_last_and_warns_once() {
        let mut monitor = Monitor::new(MonitorConfig {
            number: 5,
            ..MonitorConfig::default()
        });
        monitor.update_outputs(dual_head(), 3840, 1080);
        assert_eq!(monitor.geometry().rect(), Rect::new(0, 0, 1920, 1080));
        assert!(monitor.fallback_warned());

        monitor.set_settings(MonitorConfig {
            number: 5,
            align: 0.3,
            ..MonitorConfig::default()
        });
        assert!(monitor.fallback_warned());

        monitor.update_outputs(dual_head(), 3840, 1080);
        // Latch resets with the new layout, then trips again
        assert!(monitor.fallback_warned());
    }

    #[test]
    fn test_force_ignores_layout() {
        let mut monitor = Monitor::new(MonitorConfig {
            force: true,
            width: 800,
            height: 600,
            x_offset: 10,
            y_offset: 20,
            ..MonitorConfig::default()
        });
        monitor.update_outputs(dual_head(), 3840, 1080);
        assert_eq!(monitor.geometry().rect(), Rect::new(10, 20, 800, 600));
    }

    #[test]
    fn test_geometry_changed_only_on_difference() {
        let mut monitor = Monitor::new(MonitorConfig::default());
        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        let _sub = monitor.geometry_changed.connect(move |_| sink.set(sink.get() + 1));

        monitor.update_outputs(dual_head(), 3840, 1080);
        monitor.update_outputs(dual_head(), 3840, 1080);
        assert_eq!(count.get(), 1);

        monitor.set_settings(MonitorConfig {
            number: 1,
            ..MonitorConfig::default()
        });
        assert_eq!(count.get(), 2);
    }
}
