//! The ways a panel can get out of the way

use std::time::Duration;

use tracing::{debug, error};

use crate::event_loop::{Scheduler, SourceId};
use crate::geometry::Rect;
use crate::poller::ClickthroughMode;
use crate::windowing::WindowSystem;

use super::{AutohideKind, AutohideTimer};

/// What a strategy may touch while starting or ending
pub struct StrategyContext<'a, T> {
    pub ws: &'a mut dyn WindowSystem,
    pub sched: &'a mut Scheduler<T>,
    pub now: Duration,
    pub clickthrough: &'a mut ClickthroughMode,
    /// Where the panel window belongs when it is shown again
    pub window: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeSettings {
    pub step: Duration,
    pub steps: u32,
}

/// Stacks the panel below other windows
#[derive(Debug, Default)]
pub struct KeepBelow;

impl KeepBelow {
    fn start<T>(&mut self, cx: &mut StrategyContext<T>) -> bool {
        let _ = cx
            .ws
            .set_keep_below(true)
            .inspect_err(|e| error!(error = %e, "Failed to lower panel"));
        false
    }

    fn end<T>(&mut self, cx: &mut StrategyContext<T>) {
        let _ = cx
            .ws
            .set_keep_below(false)
            .inspect_err(|e| error!(error = %e, "Failed to restore panel stacking"));
    }
}

/// Ramps the opacity down, then withdraws the window
#[derive(Debug)]
pub struct FadeOut {
    settings: FadeSettings,
    step: u32,
    ramp: Option<SourceId>,
    withdrawn: bool,
}

impl FadeOut {
    pub fn new(settings: FadeSettings) -> Self {
        Self {
            settings,
            step: 0,
            ramp: None,
            withdrawn: false,
        }
    }

    #[cfg(test)]
    pub fn is_fading(&self) -> bool {
        self.ramp.is_some()
    }

    #[cfg(test)]
    pub fn is_withdrawn(&self) -> bool {
        self.withdrawn
    }

    fn start<T: Clone + PartialEq + From<AutohideTimer>>(&mut self, cx: &mut StrategyContext<T>) -> bool {
        if let Some(id) = self.ramp.take() {
            cx.sched.cancel(id);
        }
        self.step = 0;
        self.ramp = Some(
            cx.sched
                .add_interval(cx.now, self.settings.step, AutohideTimer::FadeStep.into()),
        );
        // Mid-fade the panel can still be caught anywhere on its mask
        true
    }

    /// Advance the ramp; `true` once the window has been withdrawn
    fn step<T: Clone + PartialEq>(&mut self, cx: &mut StrategyContext<T>) -> bool {
        if self.ramp.is_none() {
            return false;
        }
        self.step += 1;
        let steps = self.settings.steps.max(1);
        if self.step < steps {
            let opacity = 1.0 - self.step as f64 / steps as f64;
            let _ = cx
                .ws
                .set_opacity(opacity)
                .inspect_err(|e| error!(opacity, error = %e, "Failed to set panel opacity"));
            return false;
        }

        if let Some(id) = self.ramp.take() {
            cx.sched.cancel(id);
        }
        let _ = cx
            .ws
            .set_visible(false)
            .inspect_err(|e| error!(error = %e, "Failed to withdraw panel"));
        let _ = cx
            .ws
            .set_opacity(1.0)
            .inspect_err(|e| error!(error = %e, "Failed to reset panel opacity"));
        self.withdrawn = true;
        debug!("panel faded out");
        true
    }

    fn end<T: Clone + PartialEq>(&mut self, cx: &mut StrategyContext<T>) {
        if let Some(id) = self.ramp.take() {
            cx.sched.cancel(id);
            let _ = cx
                .ws
                .set_opacity(1.0)
                .inspect_err(|e| error!(error = %e, "Failed to reset panel opacity"));
        } else if self.withdrawn {
            let _ = cx
                .ws
                .set_visible(true)
                .and_then(|()| cx.ws.move_resize(cx.window))
                .inspect_err(|e| error!(error = %e, "Failed to show panel"));
        }
        self.withdrawn = false;
        self.step = 0;
    }
}

/// Lets clicks through to the windows below and dims the panel
#[derive(Debug)]
pub struct Transparentize {
    opacity: f64,
    previous: Option<ClickthroughMode>,
}

impl Transparentize {
    pub fn new(opacity: f64) -> Self {
        Self {
            opacity,
            previous: None,
        }
    }

    fn start<T>(&mut self, cx: &mut StrategyContext<T>) -> bool {
        if self.previous.is_none() {
            self.previous = Some(*cx.clickthrough);
        }
        *cx.clickthrough = ClickthroughMode::UnlessCtrl;
        let _ = cx
            .ws
            .set_opacity(self.opacity)
            .inspect_err(|e| error!(error = %e, "Failed to dim panel"));
        false
    }

    fn end<T>(&mut self, cx: &mut StrategyContext<T>) {
        if let Some(previous) = self.previous.take() {
            *cx.clickthrough = previous;
        }
        let _ = cx
            .ws
            .set_opacity(1.0)
            .inspect_err(|e| error!(error = %e, "Failed to restore panel opacity"));
    }
}

/// Active strategy with its own state
#[derive(Debug)]
pub enum Strategy {
    None,
    KeepBelow(KeepBelow),
    FadeOut(FadeOut),
    Transparentize(Transparentize),
}

impl Strategy {
    pub fn new(kind: AutohideKind, fade: FadeSettings, transparentize_opacity: f64) -> Self {
        match kind {
            AutohideKind::None => Strategy::None,
            AutohideKind::KeepBelow => Strategy::KeepBelow(KeepBelow),
            AutohideKind::FadeOut => Strategy::FadeOut(FadeOut::new(fade)),
            AutohideKind::Transparentize => {
                Strategy::Transparentize(Transparentize::new(transparentize_opacity))
            }
        }
    }

    pub fn kind(&self) -> AutohideKind {
        match self {
            Strategy::None => AutohideKind::None,
            Strategy::KeepBelow(_) => AutohideKind::KeepBelow,
            Strategy::FadeOut(_) => AutohideKind::FadeOut,
            Strategy::Transparentize(_) => AutohideKind::Transparentize,
        }
    }

    /// Hide the panel; returns whether the whole active mask keeps counting
    /// as "near" (otherwise only the away-facing edge does)
    pub fn start<T: Clone + PartialEq + From<AutohideTimer>>(&mut self, cx: &mut StrategyContext<T>) -> bool {
        match self {
            Strategy::None => true,
            Strategy::KeepBelow(s) => s.start(cx),
            Strategy::FadeOut(s) => s.start(cx),
            Strategy::Transparentize(s) => s.start(cx),
        }
    }

    pub fn end<T: Clone + PartialEq>(&mut self, cx: &mut StrategyContext<T>) {
        match self {
            Strategy::None => {}
            Strategy::KeepBelow(s) => s.end(cx),
            Strategy::FadeOut(s) => s.end(cx),
            Strategy::Transparentize(s) => s.end(cx),
        }
    }

    /// One fade step; `true` when the panel just became fully hidden
    pub fn fade_step<T: Clone + PartialEq>(&mut self, cx: &mut StrategyContext<T>) -> bool {
        match self {
            Strategy::FadeOut(s) => s.step(cx),
            _ => false,
        }
    }
}
