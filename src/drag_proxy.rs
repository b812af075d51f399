//! Drag-and-drop pass-through
//!
//! A drag over the transparent parts of the panel is meant for the window
//! underneath. While the pointer is outside the active region the proxy
//! looks up the topmost real window under it, finds the window inside it
//! that speaks the drag protocol, and forwards drag messages there. The
//! lookup is repeated on a short timer because the stack can change while
//! the drag is in progress.

use std::time::Duration;

use tracing::{debug, error, trace};

use crate::event_loop::{Scheduler, SourceId};
use crate::windowing::{DragEvent, DragMessage, PointerState, StackWindow, WindowId, WindowSystem};

/// Timer tag for the periodic target lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragRecheck;

/// Topmost visible toplevel under `(x, y)` other than the panel
pub fn find_toplevel(stack: &[StackWindow], x: i32, y: i32, panel: WindowId) -> Option<WindowId> {
    stack
        .iter()
        .filter(|w| w.id != panel && w.mapped && !w.minimized)
        .find(|w| w.bounds.contains(x, y))
        .map(|w| w.id)
}

pub struct DragProxyController {
    interval: Duration,
    recheck: Option<SourceId>,
    target: Option<WindowId>,
    /// Enter message of the current drag, replayed on a new target
    enter: Option<DragMessage>,
}

impl DragProxyController {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            recheck: None,
            target: None,
            enter: None,
        }
    }

    pub fn target(&self) -> Option<WindowId> {
        self.target
    }

    pub fn is_active(&self) -> bool {
        self.recheck.is_some()
    }

    /// Pointer moved during a drag
    pub fn motion<T: Clone + PartialEq + From<DragRecheck>>(
        &mut self,
        pointer: PointerState,
        over_active: bool,
        ws: &mut dyn WindowSystem,
        sched: &mut Scheduler<T>,
        now: Duration,
    ) {
        if self.recheck.is_none() {
            self.recheck = Some(sched.add_interval(now, self.interval, DragRecheck.into()));
        }
        self.resolve(pointer, over_active, ws);
    }

    /// Periodic re-resolution while the drag lasts
    pub fn on_recheck(&mut self, pointer: PointerState, over_active: bool, ws: &mut dyn WindowSystem) {
        self.resolve(pointer, over_active, ws);
    }

    /// Drag finished or left the panel; normal drop handling resumes
    pub fn end<T: Clone + PartialEq>(&mut self, sched: &mut Scheduler<T>) {
        if let Some(id) = self.recheck.take() {
            sched.cancel(id);
        }
        if self.target.take().is_some() {
            debug!("drag proxy cleared");
        }
        self.enter = None;
    }

    /// Forward a drag message to the current target
    ///
    /// Returns `false` when there is no target and the panel should handle
    /// the message itself.
    pub fn forward(&mut self, message: &DragMessage, ws: &mut dyn WindowSystem) -> bool {
        if message.event == DragEvent::Enter {
            self.enter = Some(*message);
        }
        let Some(target) = self.target else {
            return false;
        };
        if let Err(e) = ws.forward_drag(target, message) {
            error!(target, error = %e, "Failed to forward drag message, dropping proxy");
            self.target = None;
            return false;
        }
        true
    }

    fn resolve(&mut self, pointer: PointerState, over_active: bool, ws: &mut dyn WindowSystem) {
        let next = if over_active {
            None
        } else {
            self.lookup(pointer, ws)
        };
        if next == self.target {
            return;
        }

        trace!(from = ?self.target, to = ?next, "drag proxy target changed");
        if let Some(old) = self.target {
            let leave = DragMessage {
                event: DragEvent::Leave,
                source: self.enter.map(|m| m.source).unwrap_or_default(),
                data: [0; 4],
            };
            let _ = ws
                .forward_drag(old, &leave)
                .inspect_err(|e| error!(target = old, error = %e, "Failed to leave drag target"));
        }
        self.target = next;
        if let (Some(new), Some(enter)) = (next, self.enter) {
            let _ = ws
                .forward_drag(new, &enter)
                .inspect_err(|e| error!(target = new, error = %e, "Failed to enter drag target"));
        }
    }

    /// Drag-aware window under the pointer; lookup failures clear the proxy
    fn lookup(&self, pointer: PointerState, ws: &mut dyn WindowSystem) -> Option<WindowId> {
        let panel = ws.panel_window();
        let stack = ws
            .window_stack()
            .inspect_err(|e| debug!(error = %e, "Failed to read window stack"))
            .ok()?;
        let toplevel = find_toplevel(&stack, pointer.x, pointer.y, panel)?;
        ws.drag_aware_window(toplevel)
            .inspect_err(|e| debug!(toplevel, error = %e, "Failed to resolve drag-aware window"))
            .ok()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::windowing::fake::{Call, FakeWindowSystem};

    fn window(id: WindowId, bounds: Rect) -> StackWindow {
        StackWindow {
            id,
            bounds,
            mapped: true,
            minimized: false,
        }
    }

    fn at(x: i32, y: i32) -> PointerState {
        PointerState { x, y, ctrl: false }
    }

    fn enter() -> DragMessage {
        DragMessage {
            event: DragEvent::Enter,
            source: 77,
            data: [5 << 24, 0, 0, 0],
        }
    }

    fn desktop() -> FakeWindowSystem {
        let mut ws = FakeWindowSystem::new();
        ws.stack = vec![
            window(1, Rect::new(0, 1030, 1920, 50)),
            StackWindow {
                minimized: true,
                ..window(10, Rect::new(0, 0, 1920, 1080))
            },
            window(20, Rect::new(0, 500, 1000, 580)),
            window(30, Rect::new(0, 0, 1920, 1080)),
        ];
        ws.drag_aware.insert(20, 21);
        ws
    }

    #[test]
    fn test_find_toplevel_skips_panel_and_minimized() {
        let ws = desktop();
        assert_eq!(find_toplevel(&ws.stack, 100, 1050, 1), Some(20));
        assert_eq!(find_toplevel(&ws.stack, 1500, 1050, 1), Some(30));
        assert_eq!(find_toplevel(&ws.stack, 3000, 1050, 1), None);
    }

    #[test]
    fn test_forwards_outside_active_region() {
        let mut ws = desktop();
        let mut sched: Scheduler<DragRecheck> = Scheduler::new();
        let mut proxy = DragProxyController::new(Duration::from_millis(40));

        assert!(!proxy.forward(&enter(), &mut ws));
        proxy.motion(at(100, 1050), false, &mut ws, &mut sched, Duration::ZERO);
        assert_eq!(proxy.target(), Some(21));
        assert!(proxy.is_active());
        // Enter is replayed to the new target
        assert_eq!(ws.calls, vec![Call::Forward(21, DragEvent::Enter)]);

        let position = DragMessage {
            event: DragEvent::Position,
            ..enter()
        };
        assert!(proxy.forward(&position, &mut ws));

        // Back over an icon: leave the target and handle drops locally
        proxy.on_recheck(at(100, 1050), true, &mut ws);
        assert_eq!(proxy.target(), None);
        assert_eq!(ws.calls.last(), Some(&Call::Forward(21, DragEvent::Leave)));
        assert!(!proxy.forward(&position, &mut ws));
    }

    #[test]
    fn test_window_without_protocol_clears_target() {
        let mut ws = desktop();
        let mut sched: Scheduler<DragRecheck> = Scheduler::new();
        let mut proxy = DragProxyController::new(Duration::from_millis(40));
        proxy.motion(at(1500, 1050), false, &mut ws, &mut sched, Duration::ZERO);
        assert_eq!(proxy.target(), None);
        assert!(ws.calls.is_empty());
    }

    #[test]
    fn test_recheck_follows_stack_changes() {
        let mut ws = desktop();
        let mut sched: Scheduler<DragRecheck> = Scheduler::new();
        let mut proxy = DragProxyController::new(Duration::from_millis(40));
        proxy.motion(at(1500, 1050), false, &mut ws, &mut sched, Duration::ZERO);
        assert_eq!(proxy.target(), None);

        ws.drag_aware.insert(30, 31);
        assert!(matches!(sched.pop_due(Duration::from_millis(40)), Some((_, DragRecheck))));
        proxy.on_recheck(at(1500, 1050), false, &mut ws);
        assert_eq!(proxy.target(), Some(31));

        proxy.end(&mut sched);
        assert!(!proxy.is_active());
        assert_eq!(proxy.target(), None);
        assert_eq!(sched.timer_count(), 0);
    }
}
