//! The panel shell
//!
//! Owns every engine component and runs them on one [`Scheduler`]. Windowing
//! events and IPC requests come in through [`PanelShell::handle_event`] and
//! [`PanelShell::handle_request`]; [`PanelShell::dispatch`] then runs the
//! timers and idle work that are due. Component notifications only queue
//! idle tasks, so a burst of changes is handled by one relayout.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::applets::{AppletManager, IconRow};
use crate::autohide::{AutohideController, AutohideTimer, Cookie, PointerHits, StrategyContext};
use crate::background::{Background, Placement, Spacer};
use crate::canvas::Canvas;
use crate::config::PanelConfig;
use crate::drag_proxy::{DragProxyController, DragRecheck};
use crate::event_loop::{IdleQueue, Scheduler};
use crate::geometry::{Rect, Region};
use crate::ipc::{PanelRequest, PanelResponse};
use crate::mask::{MaskCompositor, Viewport};
use crate::monitor::Monitor;
use crate::panel::{PanelGeometry, PanelLayout};
use crate::poller::{classify, CheckType, ClickthroughMode, Consumers, HitTarget, MousePoller};
use crate::signal::{Signal, Subscription};
use crate::strut::{StrutInput, StrutManager};
use crate::windowing::{DragEvent, DragMessage, PointerState, WindowSystem};

/// Upper bound on idle passes per dispatch
const MAX_PASSES: usize = 16;

/// Work items on the panel's scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Poll,
    Autohide(AutohideTimer),
    DragRecheck,
    Relayout,
    UpdateMasks,
    UpdateStrut,
    Redraw,
}

impl From<AutohideTimer> for Task {
    fn from(timer: AutohideTimer) -> Self {
        Task::Autohide(timer)
    }
}

impl From<DragRecheck> for Task {
    fn from(_: DragRecheck) -> Self {
        Task::DragRecheck
    }
}

/// Windowing events the panel reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    /// Pointer entered or left the panel window
    Crossing(PointerState),
    Drag(DragMessage),
    OutputsChanged { outputs: Vec<Rect>, screen: (i32, i32) },
    Exposed,
}

fn queue_on<T: 'static>(signal: &Signal<T>, idle: &IdleQueue<Task>, task: Task) -> Subscription {
    let idle = idle.clone();
    signal.connect(move |_| {
        idle.schedule(task);
    })
}

/// Root position packed into an XDND position message
fn drag_position(message: &DragMessage) -> PointerState {
    let packed = message.data[1];
    PointerState {
        x: (packed >> 16) as i16 as i32,
        y: (packed & 0xFFFF) as i16 as i32,
        ctrl: false,
    }
}

pub struct PanelShell<W: WindowSystem> {
    config: PanelConfig,
    composited: bool,
    geometry: PanelGeometry,
    layout: PanelLayout,
    spacer: Option<Spacer>,
    monitor: Monitor,
    background: Background,
    applets: IconRow,
    masks: MaskCompositor,
    /// Background input mask joined with the applet region
    active: Region,
    shape: Option<Region>,
    input_blocked: bool,
    poller: MousePoller,
    last_pointer: PointerState,
    pointer_on_panel: bool,
    clickthrough: ClickthroughMode,
    autohide: AutohideController,
    struts: StrutManager,
    drag: DragProxyController,
    frame: Option<(u32, u32)>,
    sched: Scheduler<Task>,
    ws: W,
    _subscriptions: Vec<Subscription>,
}

impl<W: WindowSystem> PanelShell<W> {
    pub fn new(config: PanelConfig, composited: bool, ws: W, outputs: Vec<Rect>, screen: (i32, i32)) -> Self {
        let sched = Scheduler::new();
        let mut monitor = Monitor::new(config.monitor.clone());
        monitor.update_outputs(outputs, screen.0, screen.1);

        let mut background = Background::new(config.panel.style, config.background_params());
        if config.background.enable_pattern {
            background.load_pattern(config.background.pattern_path.as_deref());
        }
        let applets = IconRow::new(config.panel.position, config.panel.size, config.panel.slots.clone());

        let idle = sched.idle_queue();
        let subscriptions = vec![
            queue_on(&monitor.geometry_changed, &idle, Task::Relayout),
            queue_on(&background.padding_changed, &idle, Task::Relayout),
            queue_on(&background.changed, &idle, Task::Redraw),
            queue_on(applets.changed(), &idle, Task::Relayout),
        ];

        Self {
            composited,
            geometry: config.panel_geometry(composited),
            layout: PanelLayout {
                window: Rect::default(),
                drawable: Rect::default(),
                viewport: Rect::default(),
            },
            spacer: None,
            monitor,
            background,
            applets,
            masks: MaskCompositor::new(),
            active: Region::new(),
            shape: None,
            input_blocked: false,
            poller: MousePoller::new(config.autohide.poll_interval()),
            last_pointer: PointerState::default(),
            pointer_on_panel: false,
            clickthrough: config.panel.clickthrough,
            autohide: AutohideController::new(config.autohide.settings()),
            struts: StrutManager::new(),
            drag: DragProxyController::new(config.drag_proxy.recheck_interval()),
            frame: None,
            config,
            sched,
            ws,
            _subscriptions: subscriptions,
        }
    }

    /// Lay out, show the window and start polling
    pub fn start(&mut self, now: Duration) {
        self.relayout();
        let _ = self
            .ws
            .set_visible(true)
            .inspect_err(|e| error!(error = %e, "Failed to show panel window"));
        self.ensure_poller(now);
        self.dispatch(now);
        info!(window = ?self.layout.window, style = ?self.background.kind(), "panel started");
    }

    pub fn window_system(&self) -> &W {
        &self.ws
    }

    pub fn layout(&self) -> &PanelLayout {
        &self.layout
    }

    pub fn autohide(&self) -> &AutohideController {
        &self.autohide
    }

    /// Time until the scheduler has work, `None` when idle indefinitely
    pub fn next_timeout(&self, now: Duration) -> Option<Duration> {
        if !self.sched.idle_queue().is_empty() {
            return Some(Duration::ZERO);
        }
        self.sched.next_deadline().map(|deadline| deadline.saturating_sub(now))
    }

    /// Run idle work and every timer due at `now`
    pub fn dispatch(&mut self, now: Duration) {
        for _ in 0..MAX_PASSES {
            let mut ran = false;
            for task in self.sched.take_idle() {
                ran = true;
                self.run(task, now);
            }
            while let Some((_, task)) = self.sched.pop_due(now) {
                ran = true;
                self.run(task, now);
            }
            if !ran {
                return;
            }
        }
        warn!(passes = MAX_PASSES, "idle work kept rescheduling itself");
    }

    fn run(&mut self, task: Task, now: Duration) {
        match task {
            Task::Poll => self.poll(now),
            Task::Autohide(timer) => {
                let pointer = self.current_pointer();
                let hits = self.hits(&pointer);
                self.with_autohide(now, |autohide, cx| autohide.on_timer(timer, hits, cx));
                self.refresh_input(&pointer);
            }
            Task::DragRecheck => {
                let pointer = self.current_pointer();
                let over_active = self.check(CheckType::ActiveMask, &pointer);
                self.drag.on_recheck(pointer, over_active, &mut self.ws);
            }
            Task::Relayout => self.relayout(),
            Task::UpdateMasks => self.update_masks(),
            Task::UpdateStrut => self.update_strut(),
            Task::Redraw => self.redraw(),
        }
    }

    pub fn handle_event(&mut self, event: PanelEvent, now: Duration) {
        match event {
            PanelEvent::Crossing(pointer) => self.sample(pointer, now),
            PanelEvent::Drag(message) => self.drag_message(&message, now),
            PanelEvent::OutputsChanged { outputs, screen } => {
                self.monitor.update_outputs(outputs, screen.0, screen.1);
                // Shared edges may change without the panel's monitor moving
                self.sched.queue_idle(Task::UpdateStrut);
            }
            PanelEvent::Exposed => {
                self.background.invalidate();
                self.sched.queue_idle(Task::Redraw);
            }
        }
    }

    pub fn handle_request(&mut self, request: &PanelRequest, now: Duration) -> PanelResponse {
        match request {
            PanelRequest::Inhibit { app_name, .. } if app_name.trim().is_empty() => {
                PanelResponse::Error("app_name must not be empty".to_string())
            }
            PanelRequest::Inhibit { app_name, reason, .. } => {
                PanelResponse::Cookie(self.inhibit(app_name, reason, now))
            }
            PanelRequest::Uninhibit { cookie } => PanelResponse::Released(self.uninhibit(*cookie, now)),
            PanelRequest::ListInhibitors => PanelResponse::Inhibitors(self.autohide.list_inhibitors()),
            PanelRequest::OpenDocklet => {
                self.open_docklet(now);
                PanelResponse::Done
            }
            PanelRequest::Ping => PanelResponse::Pong,
        }
    }

    pub fn inhibit(&mut self, app_name: &str, reason: &str, now: Duration) -> Cookie {
        let cookie = self.with_autohide(now, |autohide, cx| autohide.inhibit(app_name, reason, cx));
        let pointer = self.last_pointer;
        self.refresh_input(&pointer);
        cookie
    }

    pub fn uninhibit(&mut self, cookie: Cookie, now: Duration) -> bool {
        let pointer = self.current_pointer();
        let hits = self.hits(&pointer);
        let released = self.with_autohide(now, |autohide, cx| autohide.uninhibit(cookie, hits, cx));
        self.ensure_poller(now);
        released
    }

    /// Track the pointer until it leaves the panel, then drop docklet mode
    pub fn open_docklet(&mut self, now: Duration) {
        debug!("docklet opened");
        self.applets.set_docklet_mode(true);
        self.ensure_poller(now);
    }

    /// Apply a reloaded configuration
    pub fn apply_config(&mut self, config: PanelConfig, now: Duration) {
        let settings = config.autohide.settings();
        self.with_autohide(now, |autohide, cx| autohide.set_settings(settings, cx));
        // Set after the strategy ended so Transparentize cannot restore a stale mode
        self.clickthrough = config.panel.clickthrough;

        self.poller
            .set_interval(config.autohide.poll_interval(), &mut self.sched, now, Task::Poll);
        self.drag.end(&mut self.sched);
        self.drag = DragProxyController::new(config.drag_proxy.recheck_interval());

        self.monitor.set_settings(config.monitor.clone());
        self.background.set_kind(config.panel.style);
        self.background.set_params(config.background_params());
        if config.background.enable_pattern {
            self.background.load_pattern(config.background.pattern_path.as_deref());
        }
        if config.panel.slots != self.applets.slots() {
            self.applets.set_slots(config.panel.slots.clone());
        }
        self.applets.set_geometry(config.panel.position, config.panel.size);

        self.config = config;
        self.struts.reset();
        self.sched.queue_idle(Task::Relayout);
        self.ensure_poller(now);
        info!("configuration applied");
    }

    fn with_autohide<R>(
        &mut self,
        now: Duration,
        f: impl FnOnce(&mut AutohideController, &mut StrategyContext<Task>) -> R,
    ) -> R {
        let mut cx = StrategyContext {
            ws: &mut self.ws,
            sched: &mut self.sched,
            now,
            clickthrough: &mut self.clickthrough,
            window: self.layout.window,
        };
        f(&mut self.autohide, &mut cx)
    }

    fn align(&self) -> f64 {
        self.config.effective_align(self.monitor.geometry().align)
    }

    fn leading_spacer(&self) -> i32 {
        self.spacer
            .filter(|s| s.leading)
            .map_or(0, |s| s.length as i32)
    }

    /// Separator offsets along the drawn area
    fn separators(&self) -> Vec<i32> {
        let viewport = self.layout.viewport;
        let start = if self.geometry.position.is_horizontal() {
            viewport.x
        } else {
            viewport.y
        } + self.leading_spacer();
        self.applets.separators().into_iter().map(|s| s + start).collect()
    }

    fn viewport(&self) -> Viewport {
        let lead = self.leading_spacer();
        let mut viewport = Viewport::new(self.layout.viewport);
        if self.geometry.position.is_horizontal() {
            viewport.scroll_x = -lead;
        } else {
            viewport.scroll_y = -lead;
        }
        viewport
    }

    fn relayout(&mut self) {
        let monitor = self.monitor.geometry();
        let align = self.align();
        let separators = self.separators();
        let mut geometry = self.config.panel_geometry(self.composited);
        let padding = self.background.padding_request(&Placement {
            panel: &geometry,
            align,
            separators: &separators,
        });
        geometry.extra_padding = padding.perpendicular(geometry.position);
        self.spacer = self.background.spacer(&Placement {
            panel: &geometry,
            align,
            separators: &separators,
        });

        let content = self.applets.content_length() + self.spacer.map_or(0, |s| s.length);
        let layout = PanelLayout::compute(&geometry, padding, content, &monitor);
        self.geometry = geometry;
        self.applets.set_geometry(geometry.position, geometry.size);

        if layout != self.layout {
            debug!(window = ?layout.window, viewport = ?layout.viewport, "panel layout changed");
            self.layout = layout;
            let _ = self
                .ws
                .move_resize(layout.window)
                .inspect_err(|e| error!(error = %e, "Failed to move panel window"));
        }
        self.sched.queue_idle(Task::UpdateMasks);
        self.sched.queue_idle(Task::UpdateStrut);
        self.sched.queue_idle(Task::Redraw);
    }

    fn update_masks(&mut self) {
        let separators = self.separators();
        let placement = Placement {
            panel: &self.geometry,
            align: self.align(),
            separators: &separators,
        };
        let area = self.layout.drawable;
        let (path, modifier) = self.background.path_type(&placement);
        let applet_mask = self.applets.mask(path, modifier);
        let input = self.background.input_shape_mask(&placement, area);
        let viewport = self.viewport();
        self.masks.update(&applet_mask, &[], &viewport);
        self.active = input.union(self.masks.region());
        let shape = (!self.geometry.composited)
            .then(|| self.background.shape_mask(&placement, area).union(self.masks.region()));

        if shape != self.shape {
            let _ = self
                .ws
                .set_shape(shape.as_ref())
                .inspect_err(|e| error!(error = %e, "Failed to shape panel window"));
            self.shape = shape;
        }

        let applied = if self.input_blocked {
            self.ws.set_input_shape(&Region::new())
        } else {
            self.ws
                .set_input_shape(&input)
                .and_then(|()| self.ws.add_input_shape(self.masks.region()))
        };
        let _ = applied.inspect_err(|e| error!(error = %e, "Failed to set panel input shape"));
    }

    fn update_strut(&mut self) {
        let position = self.geometry.position;
        // A panel that gets out of the way does not reserve space
        let published = if self.autohide.is_enabled() {
            self.struts.clear(position)
        } else {
            let separators = self.separators();
            let style_offsets = self.background.strut_offsets(
                &Placement {
                    panel: &self.geometry,
                    align: self.align(),
                    separators: &separators,
                },
                self.layout.drawable,
            );
            let monitor = self.monitor.geometry();
            self.struts.update(&StrutInput {
                panel: &self.geometry,
                window: self.layout.window,
                monitor: &monitor,
                outputs: self.monitor.outputs(),
                screen: self.monitor.screen_size(),
                style_offsets,
            })
        };
        if let Some(strut) = published {
            let _ = self
                .ws
                .set_strut(position, &strut)
                .inspect_err(|e| error!(error = %e, "Failed to publish strut"));
        }
    }

    fn redraw(&mut self) {
        let separators = self.separators();
        let align = self.align();
        let placement = Placement {
            panel: &self.geometry,
            align,
            separators: &separators,
        };
        let stale = self.background.check_needs_redraw(&placement);
        let window = self.layout.window;
        let size = (window.width.max(0) as u32, window.height.max(0) as u32);
        if !stale && self.frame == Some(size) {
            return;
        }

        let mut canvas = match Canvas::new(size.0, size.1) {
            Ok(canvas) => canvas,
            Err(e) => {
                error!(error = %e, "Failed to allocate panel frame");
                return;
            }
        };
        self.background.draw(&mut canvas, &placement, self.layout.drawable);
        match self.ws.present(canvas.surface()) {
            Ok(()) => self.frame = Some(size),
            Err(e) => error!(error = %e, "Failed to present panel frame"),
        }
    }

    fn consumers(&self) -> Consumers {
        Consumers {
            autohide: self.autohide.is_enabled(),
            clickthrough: self.clickthrough,
            pointer_on_panel: self.pointer_on_panel,
            docklet_mouse_out: self.applets.docklet_mode(),
        }
    }

    fn ensure_poller(&mut self, now: Duration) {
        let consumers = self.consumers();
        self.poller.ensure(&consumers, &mut self.sched, now, Task::Poll);
    }

    /// Fresh pointer sample, or the last one when the query fails
    fn current_pointer(&mut self) -> PointerState {
        match self.ws.pointer() {
            Ok(pointer) => {
                self.last_pointer = pointer;
                pointer
            }
            Err(e) => {
                error!(error = %e, "Failed to query pointer");
                self.last_pointer
            }
        }
    }

    fn check(&self, check: CheckType, pointer: &PointerState) -> bool {
        classify(
            check,
            pointer,
            &HitTarget {
                position: self.geometry.position,
                layout: &self.layout,
                active: &self.active,
                coarse: !self.geometry.composited,
            },
        )
    }

    fn hits(&self, pointer: &PointerState) -> PointerHits {
        PointerHits {
            active: self.check(CheckType::ActiveMask, pointer),
            edge: self.check(CheckType::EdgeOnly, pointer),
        }
    }

    fn poll(&mut self, now: Duration) {
        let consumers = self.consumers();
        if !self.poller.tick(&consumers, &mut self.sched) {
            return;
        }
        let pointer = self.current_pointer();
        self.sample(pointer, now);
    }

    /// Feed one pointer sample to every consumer
    fn sample(&mut self, pointer: PointerState, now: Duration) {
        self.last_pointer = pointer;
        self.pointer_on_panel = self.check(CheckType::EntireWindow, &pointer);
        let hits = self.hits(&pointer);
        self.with_autohide(now, |autohide, cx| autohide.pointer(hits, cx));
        self.refresh_input(&pointer);

        if self.applets.docklet_mode() && !self.pointer_on_panel {
            debug!("pointer left the docklet");
            self.applets.set_docklet_mode(false);
        }
        self.ensure_poller(now);
    }

    /// Re-evaluate clickthrough; a change reapplies the input shape
    fn refresh_input(&mut self, pointer: &PointerState) {
        let blocked = self.clickthrough.blocks_input(pointer, self.pointer_on_panel);
        if blocked != self.input_blocked {
            debug!(blocked, mode = ?self.clickthrough, "clickthrough changed");
            self.input_blocked = blocked;
            self.sched.queue_idle(Task::UpdateMasks);
        }
    }

    fn drag_message(&mut self, message: &DragMessage, now: Duration) {
        match message.event {
            DragEvent::Enter => {
                self.drag.forward(message, &mut self.ws);
            }
            DragEvent::Position => {
                let pointer = drag_position(message);
                if self.check(CheckType::EntireWindow, &pointer) {
                    let over_active = self.check(CheckType::ActiveMask, &pointer);
                    self.drag
                        .motion(pointer, over_active, &mut self.ws, &mut self.sched, now);
                }
                if !self.drag.forward(message, &mut self.ws) {
                    self.reject(message);
                }
            }
            DragEvent::Leave => {
                self.drag.forward(message, &mut self.ws);
                self.drag.end(&mut self.sched);
            }
            DragEvent::Drop => {
                if !self.drag.forward(message, &mut self.ws) {
                    self.reject(message);
                }
                self.drag.end(&mut self.sched);
            }
        }
    }

    fn reject(&mut self, message: &DragMessage) {
        let _ = self
            .ws
            .reject_drag(message)
            .inspect_err(|e| error!(source = message.source, error = %e, "Failed to refuse drag"));
    }
}
