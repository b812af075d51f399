//! Periodic pointer sampling
//!
//! The poller only runs while some consumer needs it: autohide, either
//! clickthrough mode, or a docklet that closes when the pointer leaves. Each
//! tick the owner classifies the pointer with [`classify`] and hands the
//! result to the consumers; a tick that finds no consumer left cancels the
//! timer.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::event_loop::{Scheduler, SourceId};
use crate::geometry::Region;
use crate::panel::{PanelLayout, Position};
use crate::windowing::PointerState;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Policy for "is the pointer on the panel"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckType {
    /// Exactly on the screen-edge row of the panel
    EdgeOnly,
    /// Over the active region, or anywhere in the drawable area when the
    /// masks are coarse
    ActiveMask,
    /// Anywhere in the window allocation
    EntireWindow,
}

/// When the panel lets clicks fall through to the windows below
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickthroughMode {
    #[default]
    Never,
    /// Click-through unless Ctrl is held
    UnlessCtrl,
    /// Click-through while Ctrl is held over the panel
    WithCtrl,
}

impl ClickthroughMode {
    /// Whether input should currently pass through the panel
    pub fn blocks_input(self, pointer: &PointerState, on_panel: bool) -> bool {
        match self {
            ClickthroughMode::Never => false,
            ClickthroughMode::UnlessCtrl => !pointer.ctrl,
            ClickthroughMode::WithCtrl => pointer.ctrl && on_panel,
        }
    }
}

/// Where the panel currently is, for hit-testing
#[derive(Debug, Clone, Copy)]
pub struct HitTarget<'a> {
    pub position: Position,
    pub layout: &'a PanelLayout,
    /// Active region, window-local
    pub active: &'a Region,
    /// No compositing; the drawable area stands in for the masks
    pub coarse: bool,
}

/// Classify `pointer` (root coordinates) against the panel
pub fn classify(check: CheckType, pointer: &PointerState, target: &HitTarget) -> bool {
    let window = target.layout.window;
    match check {
        CheckType::EdgeOnly => target
            .layout
            .away_edge(target.position)
            .contains(pointer.x, pointer.y),
        CheckType::ActiveMask => {
            let (x, y) = (pointer.x - window.x, pointer.y - window.y);
            target.active.contains(x, y) || (target.coarse && target.layout.drawable.contains(x, y))
        }
        CheckType::EntireWindow => window.contains(pointer.x, pointer.y),
    }
}

/// Who still wants pointer samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Consumers {
    pub autohide: bool,
    pub clickthrough: ClickthroughMode,
    pub pointer_on_panel: bool,
    pub docklet_mouse_out: bool,
}

impl Consumers {
    pub fn any(&self) -> bool {
        self.autohide
            || self.docklet_mouse_out
            || match self.clickthrough {
                ClickthroughMode::Never => false,
                ClickthroughMode::UnlessCtrl => true,
                ClickthroughMode::WithCtrl => self.pointer_on_panel,
            }
    }
}

/// Owner of the polling timer
#[derive(Debug)]
pub struct MousePoller {
    interval: Duration,
    source: Option<SourceId>,
}

impl Default for MousePoller {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl MousePoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            source: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.source.is_some()
    }

    pub fn source(&self) -> Option<SourceId> {
        self.source
    }

    /// Start polling if a consumer needs it and the timer is not running
    pub fn ensure<T: Clone + PartialEq>(
        &mut self,
        consumers: &Consumers,
        sched: &mut Scheduler<T>,
        now: Duration,
        tag: T,
    ) -> bool {
        if self.source.is_some() || !consumers.any() {
            return false;
        }
        trace!(interval_ms = self.interval.as_millis() as u64, "mouse poller started");
        self.source = Some(sched.add_interval(now, self.interval, tag));
        true
    }

    /// Called on every tick; cancels the timer once nobody needs it
    ///
    /// Returns `false` when the poller stopped.
    pub fn tick<T: Clone + PartialEq>(&mut self, consumers: &Consumers, sched: &mut Scheduler<T>) -> bool {
        if consumers.any() {
            return true;
        }
        self.stop(sched);
        false
    }

    pub fn stop<T: Clone + PartialEq>(&mut self, sched: &mut Scheduler<T>) {
        if let Some(id) = self.source.take() {
            sched.cancel(id);
            trace!("mouse poller stopped");
        }
    }

    /// New cadence; a running timer is restarted with it
    pub fn set_interval<T: Clone + PartialEq>(
        &mut self,
        interval: Duration,
        sched: &mut Scheduler<T>,
        now: Duration,
        tag: T,
    ) {
        self.interval = interval;
        if let Some(id) = self.source.take() {
            sched.cancel(id);
            self.source = Some(sched.add_interval(now, interval, tag));
        }
    }
}
