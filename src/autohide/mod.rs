//! Autohide state machine
//!
//! `Visible` → `PendingHide` when the pointer leaves the panel, `PendingHide`
//! → `Hidden` when the hide delay runs out with the pointer still away, and
//! back to `Visible` as soon as the pointer returns. How the panel actually
//! hides is up to the active [`Strategy`]. Outstanding inhibitors keep the
//! panel visible.

mod inhibit;
mod strategy;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::event_loop::SourceId;
use crate::poller::CheckType;

pub use inhibit::{Cookie, Inhibitors};
pub use strategy::{FadeSettings, Strategy, StrategyContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutohideKind {
    #[default]
    None,
    KeepBelow,
    FadeOut,
    Transparentize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutohideState {
    Visible,
    PendingHide,
    Hidden,
}

/// Timers owned by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutohideTimer {
    HideDelay,
    FadeStep,
}

/// Pointer classification for one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerHits {
    /// Over the active mask or drawable area
    pub active: bool,
    /// On the edge of the drawable area facing away from the screen edge
    pub edge: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutohideSettings {
    pub kind: AutohideKind,
    pub hide_delay: Duration,
    pub fade: FadeSettings,
    pub transparentize_opacity: f64,
}

pub struct AutohideController {
    settings: AutohideSettings,
    strategy: Strategy,
    state: AutohideState,
    pending: Option<SourceId>,
    /// Set by the strategy on start; otherwise only the edge reveals
    use_active_mask: bool,
    inhibitors: Inhibitors,
}

impl AutohideController {
    pub fn new(settings: AutohideSettings) -> Self {
        Self {
            strategy: Strategy::new(settings.kind, settings.fade, settings.transparentize_opacity),
            settings,
            state: AutohideState::Visible,
            pending: None,
            use_active_mask: true,
            inhibitors: Inhibitors::new(),
        }
    }

    pub fn state(&self) -> AutohideState {
        self.state
    }

    pub fn kind(&self) -> AutohideKind {
        self.strategy.kind()
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Polling is needed whenever a strategy is configured
    pub fn is_enabled(&self) -> bool {
        self.kind() != AutohideKind::None
    }

    pub fn is_inhibited(&self) -> bool {
        self.inhibitors.is_inhibited()
    }

    /// Test that brings a hidden panel back
    #[cfg(test)]
    pub fn reveal_check(&self) -> CheckType {
        if self.state == AutohideState::Hidden && !self.use_active_mask {
            CheckType::EdgeOnly
        } else {
            CheckType::ActiveMask
        }
    }

    /// Switch strategy; a hidden panel is shown first
    pub fn set_settings<T>(&mut self, settings: AutohideSettings, cx: &mut StrategyContext<T>)
    where
        T: Clone + PartialEq + From<AutohideTimer>,
    {
        self.show(cx);
        self.settings = settings;
        self.strategy = Strategy::new(settings.kind, settings.fade, settings.transparentize_opacity);
        info!(kind = ?settings.kind, delay_ms = settings.hide_delay.as_millis() as u64, "autohide configured");
    }

    /// Feed a pointer sample or an enter/leave event
    pub fn pointer<T>(&mut self, hits: PointerHits, cx: &mut StrategyContext<T>)
    where
        T: Clone + PartialEq + From<AutohideTimer>,
    {
        if !self.is_enabled() {
            return;
        }
        match self.state {
            AutohideState::Visible => {
                if !hits.active && !self.is_inhibited() {
                    self.arm(cx);
                }
            }
            AutohideState::PendingHide => {
                if hits.active {
                    self.cancel_pending(cx);
                    self.state = AutohideState::Visible;
                    debug!("pointer returned before the hide delay");
                }
            }
            AutohideState::Hidden => {
                let near = if self.use_active_mask { hits.active } else { hits.edge };
                if near {
                    self.show(cx);
                }
            }
        }
    }

    /// Dispatch one of the controller's timers
    pub fn on_timer<T>(&mut self, timer: AutohideTimer, hits: PointerHits, cx: &mut StrategyContext<T>)
    where
        T: Clone + PartialEq + From<AutohideTimer>,
    {
        match timer {
            AutohideTimer::HideDelay => {
                self.pending = None;
                if self.state != AutohideState::PendingHide {
                    return;
                }
                if hits.active || self.is_inhibited() {
                    self.state = AutohideState::Visible;
                    return;
                }
                self.state = AutohideState::Hidden;
                self.use_active_mask = self.strategy.start(cx);
                debug!(kind = ?self.kind(), use_active_mask = self.use_active_mask, "autohide started");
            }
            AutohideTimer::FadeStep => {
                if self.strategy.fade_step(cx) {
                    self.use_active_mask = false;
                }
            }
        }
    }

    /// Keep the panel visible until the cookie is released
    pub fn inhibit<T>(&mut self, app_name: &str, reason: &str, cx: &mut StrategyContext<T>) -> Cookie
    where
        T: Clone + PartialEq + From<AutohideTimer>,
    {
        let cookie = self.inhibitors.acquire(app_name, reason);
        self.show(cx);
        cookie
    }

    /// Release `cookie`; the last release re-checks the pointer at once
    pub fn uninhibit<T>(&mut self, cookie: Cookie, hits: PointerHits, cx: &mut StrategyContext<T>) -> bool
    where
        T: Clone + PartialEq + From<AutohideTimer>,
    {
        if !self.inhibitors.release(cookie) {
            return false;
        }
        if !self.is_inhibited() {
            self.pointer(hits, cx);
        }
        true
    }

    pub fn list_inhibitors(&self) -> Vec<String> {
        self.inhibitors.descriptions()
    }

    fn arm<T>(&mut self, cx: &mut StrategyContext<T>)
    where
        T: Clone + PartialEq + From<AutohideTimer>,
    {
        self.cancel_pending(cx);
        self.pending = Some(
            cx.sched
                .add_timeout(cx.now, self.settings.hide_delay, AutohideTimer::HideDelay.into()),
        );
        self.state = AutohideState::PendingHide;
        debug!(delay_ms = self.settings.hide_delay.as_millis() as u64, "hide pending");
    }

    fn cancel_pending<T: Clone + PartialEq>(&mut self, cx: &mut StrategyContext<T>) {
        if let Some(id) = self.pending.take() {
            cx.sched.cancel(id);
        }
    }

    /// Back to `Visible` from any state
    fn show<T: Clone + PartialEq>(&mut self, cx: &mut StrategyContext<T>) {
        self.cancel_pending(cx);
        if self.state == AutohideState::Hidden {
            self.strategy.end(cx);
            debug!(kind = ?self.kind(), "autohide ended");
        }
        self.state = AutohideState::Visible;
        self.use_active_mask = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::Scheduler;
    use crate::geometry::Rect;
    use crate::poller::ClickthroughMode;
    use crate::windowing::fake::{Call, FakeWindowSystem};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    const AWAY: PointerHits = PointerHits {
        active: false,
        edge: false,
    };
    const OVER: PointerHits = PointerHits {
        active: true,
        edge: false,
    };
    const EDGE: PointerHits = PointerHits {
        active: false,
        edge: true,
    };

    fn settings(kind: AutohideKind) -> AutohideSettings {
        AutohideSettings {
            kind,
            hide_delay: ms(1000),
            fade: FadeSettings {
                step: ms(40),
                steps: 8,
            },
            transparentize_opacity: 0.4,
        }
    }

    /// Controller plus everything a strategy touches
    struct Harness {
        ws: FakeWindowSystem,
        sched: Scheduler<AutohideTimer>,
        mode: ClickthroughMode,
        now: Duration,
        controller: AutohideController,
    }

    impl Harness {
        fn new(kind: AutohideKind) -> Self {
            Self {
                ws: FakeWindowSystem::new(),
                sched: Scheduler::new(),
                mode: ClickthroughMode::Never,
                now: Duration::ZERO,
                controller: AutohideController::new(settings(kind)),
            }
        }

        fn with<R>(&mut self, f: impl FnOnce(&mut AutohideController, &mut StrategyContext<AutohideTimer>) -> R) -> R {
            let mut cx = StrategyContext {
                ws: &mut self.ws,
                sched: &mut self.sched,
                now: self.now,
                clickthrough: &mut self.mode,
                window: Rect::new(0, 1030, 300, 50),
            };
            f(&mut self.controller, &mut cx)
        }

        fn pointer(&mut self, hits: PointerHits) {
            self.with(|c, cx| c.pointer(hits, cx));
        }

        /// Advance virtual time, waking at every deadline up to `at` with the
        /// pointer at `hits`
        fn advance_to(&mut self, at: Duration, hits: PointerHits) {
            while let Some(deadline) = self.sched.next_deadline().filter(|d| *d <= at) {
                self.now = deadline;
                while let Some((_, timer)) = self.sched.pop_due(deadline) {
                    self.with(|c, cx| c.on_timer(timer, hits, cx));
                }
            }
            self.now = at;
        }

        fn starts(&self) -> usize {
            self.ws.count(|c| *c == Call::KeepBelow(true))
        }
    }

    #[test]
    fn test_hides_exactly_once_after_delay() {
        let mut h = Harness::new(AutohideKind::KeepBelow);
        h.pointer(AWAY);
        assert_eq!(h.controller.state(), AutohideState::PendingHide);

        h.advance_to(ms(999), AWAY);
        assert_eq!(h.starts(), 0);
        h.advance_to(ms(1000), AWAY);
        assert_eq!(h.controller.state(), AutohideState::Hidden);
        assert_eq!(h.starts(), 1);

        // Further samples away from the panel do not start again
        h.pointer(AWAY);
        h.advance_to(ms(5000), AWAY);
        assert_eq!(h.starts(), 1);
    }

    #[test]
    fn test_reentry_before_delay_cancels() {
        let mut h = Harness::new(AutohideKind::KeepBelow);
        h.pointer(AWAY);
        h.advance_to(ms(999), AWAY);
        h.pointer(OVER);
        assert_eq!(h.controller.state(), AutohideState::Visible);
        h.advance_to(ms(3000), OVER);
        assert_eq!(h.starts(), 0);
        assert_eq!(h.sched.timer_count(), 0);
    }

    #[test]
    fn test_keep_below_reveals_on_edge_only() {
        let mut h = Harness::new(AutohideKind::KeepBelow);
        h.pointer(AWAY);
        h.advance_to(ms(1000), AWAY);
        assert_eq!(h.controller.reveal_check(), CheckType::EdgeOnly);

        h.pointer(OVER);
        assert_eq!(h.controller.state(), AutohideState::Hidden);
        h.pointer(EDGE);
        assert_eq!(h.controller.state(), AutohideState::Visible);
        assert_eq!(h.ws.calls.last(), Some(&Call::KeepBelow(false)));
    }

    #[test]
    fn test_fade_out_catchable_until_withdrawn() {
        let mut h = Harness::new(AutohideKind::FadeOut);
        h.pointer(AWAY);
        h.advance_to(ms(1000), AWAY);
        assert_eq!(h.controller.reveal_check(), CheckType::ActiveMask);

        // Seven of eight 40 ms steps: dimmed but still on screen
        h.advance_to(ms(1280), AWAY);
        assert!(h.ws.visible);
        assert_eq!(h.ws.count(|c| matches!(c, Call::Opacity(_))), 7);
        assert_eq!(h.controller.reveal_check(), CheckType::ActiveMask);

        h.advance_to(ms(1320), AWAY);
        assert!(!h.ws.visible);
        assert_eq!(h.controller.reveal_check(), CheckType::EdgeOnly);

        h.pointer(EDGE);
        assert!(h.ws.visible);
        assert_eq!(h.controller.state(), AutohideState::Visible);
    }

    #[test]
    fn test_inhibit_holds_until_last_cookie() {
        let mut h = Harness::new(AutohideKind::KeepBelow);
        let a = h.with(|c, cx| c.inhibit("player", "video", cx));
        let b = h.with(|c, cx| c.inhibit("slides", "presenting", cx));

        h.pointer(AWAY);
        assert_eq!(h.controller.state(), AutohideState::Visible);

        assert!(h.with(|c, cx| c.uninhibit(a, AWAY, cx)));
        assert!(h.controller.is_inhibited());
        assert_eq!(h.controller.state(), AutohideState::Visible);
        assert_eq!(h.controller.list_inhibitors(), vec!["slides: presenting".to_string()]);

        // The last release re-arms immediately, without waiting for a sample
        assert!(h.with(|c, cx| c.uninhibit(b, AWAY, cx)));
        assert_eq!(h.controller.state(), AutohideState::PendingHide);
        h.advance_to(ms(1000), AWAY);
        assert_eq!(h.starts(), 1);
        assert!(!h.with(|c, cx| c.uninhibit(b, AWAY, cx)));
    }

    #[test]
    fn test_inhibit_cancels_pending_and_hidden() {
        let mut h = Harness::new(AutohideKind::KeepBelow);
        h.pointer(AWAY);
        h.with(|c, cx| c.inhibit("a", "b", cx));
        assert_eq!(h.controller.state(), AutohideState::Visible);
        h.advance_to(ms(2000), AWAY);
        assert_eq!(h.starts(), 0);

        let mut h = Harness::new(AutohideKind::KeepBelow);
        h.pointer(AWAY);
        h.advance_to(ms(1000), AWAY);
        h.with(|c, cx| c.inhibit("a", "b", cx));
        assert_eq!(h.controller.state(), AutohideState::Visible);
        assert!(!h.ws.below);
    }

    #[test]
    fn test_disabled_kind_never_hides() {
        let mut h = Harness::new(AutohideKind::None);
        h.pointer(AWAY);
        h.advance_to(ms(5000), AWAY);
        assert_eq!(h.controller.state(), AutohideState::Visible);
        assert!(h.ws.calls.is_empty());
    }

    #[test]
    fn test_switching_kind_shows_panel() {
        let mut h = Harness::new(AutohideKind::Transparentize);
        h.pointer(AWAY);
        h.advance_to(ms(1000), AWAY);
        assert_eq!(h.mode, ClickthroughMode::UnlessCtrl);

        h.with(|c, cx| c.set_settings(settings(AutohideKind::KeepBelow), cx));
        assert_eq!(h.mode, ClickthroughMode::Never);
        assert_eq!(h.controller.kind(), AutohideKind::KeepBelow);
        assert_eq!(h.controller.state(), AutohideState::Visible);
    }
}
