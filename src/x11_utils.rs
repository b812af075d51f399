//! X11 implementation of the windowing capabilities

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::Event;
use x11rb::protocol::randr::{self, ConnectionExt as RandrExt};
use x11rb::protocol::shape::{self, ConnectionExt as ShapeExt};
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as WrapperExt;

use crate::canvas::Surface;
use crate::constants::x11;
use crate::geometry::{Rect, Region};
use crate::panel::Position;
use crate::shell::PanelEvent;
use crate::strut::StrutResult;
use crate::windowing::{DragEvent, DragMessage, PointerState, StackWindow, WindowId, WindowSystem};

/// Pre-cached X11 atoms to avoid repeated roundtrips
pub struct CachedAtoms {
    pub net_wm_strut: Atom,
    pub net_wm_strut_partial: Atom,
    pub net_wm_window_opacity: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_below: Atom,
    pub net_wm_state_hidden: Atom,
    pub net_wm_state_sticky: Atom,
    pub net_wm_state_skip_taskbar: Atom,
    pub net_wm_state_skip_pager: Atom,
    pub net_wm_window_type: Atom,
    pub net_wm_window_type_dock: Atom,
    pub net_client_list_stacking: Atom,
    pub xdnd_aware: Atom,
    pub xdnd_proxy: Atom,
    pub xdnd_enter: Atom,
    pub xdnd_position: Atom,
    pub xdnd_status: Atom,
    pub xdnd_leave: Atom,
    pub xdnd_drop: Atom,
    pub xdnd_finished: Atom,
}

fn intern(conn: &RustConnection, name: &str) -> Result<Atom> {
    Ok(conn
        .intern_atom(false, name.as_bytes())
        .context(format!("Failed to intern {} atom", name))?
        .reply()
        .context(format!("Failed to get reply for {} atom", name))?
        .atom)
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        // Do all intern_atom roundtrips once at startup
        Ok(Self {
            net_wm_strut: intern(conn, "_NET_WM_STRUT")?,
            net_wm_strut_partial: intern(conn, "_NET_WM_STRUT_PARTIAL")?,
            net_wm_window_opacity: intern(conn, "_NET_WM_WINDOW_OPACITY")?,
            net_wm_state: intern(conn, "_NET_WM_STATE")?,
            net_wm_state_below: intern(conn, "_NET_WM_STATE_BELOW")?,
            net_wm_state_hidden: intern(conn, "_NET_WM_STATE_HIDDEN")?,
            net_wm_state_sticky: intern(conn, "_NET_WM_STATE_STICKY")?,
            net_wm_state_skip_taskbar: intern(conn, "_NET_WM_STATE_SKIP_TASKBAR")?,
            net_wm_state_skip_pager: intern(conn, "_NET_WM_STATE_SKIP_PAGER")?,
            net_wm_window_type: intern(conn, "_NET_WM_WINDOW_TYPE")?,
            net_wm_window_type_dock: intern(conn, "_NET_WM_WINDOW_TYPE_DOCK")?,
            net_client_list_stacking: intern(conn, "_NET_CLIENT_LIST_STACKING")?,
            xdnd_aware: intern(conn, "XdndAware")?,
            xdnd_proxy: intern(conn, "XdndProxy")?,
            xdnd_enter: intern(conn, "XdndEnter")?,
            xdnd_position: intern(conn, "XdndPosition")?,
            xdnd_status: intern(conn, "XdndStatus")?,
            xdnd_leave: intern(conn, "XdndLeave")?,
            xdnd_drop: intern(conn, "XdndDrop")?,
            xdnd_finished: intern(conn, "XdndFinished")?,
        })
    }

    fn drag_event(&self, atom: Atom) -> Option<DragEvent> {
        match atom {
            a if a == self.xdnd_enter => Some(DragEvent::Enter),
            a if a == self.xdnd_position => Some(DragEvent::Position),
            a if a == self.xdnd_leave => Some(DragEvent::Leave),
            a if a == self.xdnd_drop => Some(DragEvent::Drop),
            _ => None,
        }
    }

    fn drag_atom(&self, event: DragEvent) -> Atom {
        match event {
            DragEvent::Enter => self.xdnd_enter,
            DragEvent::Position => self.xdnd_position,
            DragEvent::Leave => self.xdnd_leave,
            DragEvent::Drop => self.xdnd_drop,
        }
    }
}

fn to_rectangles(region: &Region) -> Vec<Rectangle> {
    region
        .rects()
        .into_iter()
        .map(|r| Rectangle {
            x: r.x as i16,
            y: r.y as i16,
            width: r.width as u16,
            height: r.height as u16,
        })
        .collect()
}

/// Whether a compositing manager owns `_NET_WM_CM_S<screen>`
pub fn is_composited(conn: &RustConnection, screen_num: usize) -> Result<bool> {
    let selection = intern(conn, &format!("_NET_WM_CM_S{}", screen_num))?;
    let owner = conn
        .get_selection_owner(selection)
        .context("Failed to query compositing manager selection")?
        .reply()
        .context("Failed to get reply for compositing manager selection")?
        .owner;
    Ok(owner != x11rb::NONE)
}

/// Monitor rectangles from RandR; the whole screen when RandR has none
pub fn query_outputs(conn: &RustConnection, screen: &Screen) -> Vec<Rect> {
    let whole = Rect::new(0, 0, screen.width_in_pixels as i32, screen.height_in_pixels as i32);
    let monitors = conn
        .randr_get_monitors(screen.root, true)
        .context("Failed to query RandR monitors")
        .and_then(|cookie| cookie.reply().context("Failed to get reply for RandR monitors"));
    match monitors {
        Ok(reply) if !reply.monitors.is_empty() => reply
            .monitors
            .iter()
            .map(|m| Rect::new(m.x as i32, m.y as i32, m.width as i32, m.height as i32))
            .collect(),
        Ok(_) => vec![whole],
        Err(e) => {
            warn!(error = %e, "RandR monitor query failed, using the whole screen");
            vec![whole]
        }
    }
}

/// The panel's dock window and the connection it lives on
pub struct X11Backend {
    conn: RustConnection,
    screen_num: usize,
    root: Window,
    window: Window,
    gc: Gcontext,
    depth: u8,
    atoms: CachedAtoms,
    composited: bool,
}

impl X11Backend {
    /// Connect to the display and create the (unmapped) dock window
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None)
            .context("Failed to connect to X11 server. Is DISPLAY set correctly?")?;
        let screen = conn.setup().roots[screen_num].clone();
        info!(
            screen = screen_num,
            width = screen.width_in_pixels,
            height = screen.height_in_pixels,
            "Connected to X11 server"
        );

        conn.shape_query_version()
            .context("Failed to query SHAPE extension version. Is SHAPE extension available?")?
            .reply()
            .context("SHAPE extension not available")?;
        let _ = conn
            .randr_select_input(screen.root, randr::NotifyMask::SCREEN_CHANGE)
            .inspect_err(|e| warn!(error = %e, "Failed to watch RandR screen changes"));

        let atoms = CachedAtoms::new(&conn).context("Failed to cache X11 atoms at startup")?;
        let composited = is_composited(&conn, screen_num)
            .inspect_err(|e| warn!(error = %e, "Failed to detect compositing manager"))
            .unwrap_or(false);

        let argb = screen
            .allowed_depths
            .iter()
            .filter(|d| d.depth == x11::ARGB_DEPTH)
            .flat_map(|d| d.visuals.iter())
            .find(|v| v.class == VisualClass::TRUE_COLOR)
            .map(|v| v.visual_id);
        let (depth, visual) = match argb {
            Some(visual) if composited => (x11::ARGB_DEPTH, visual),
            _ => (screen.root_depth, screen.root_visual),
        };

        let colormap = conn.generate_id().context("Failed to generate X11 colormap ID")?;
        conn.create_colormap(ColormapAlloc::NONE, colormap, screen.root, visual)
            .context("Failed to create panel colormap")?;

        let window = conn.generate_id().context("Failed to generate X11 window ID")?;
        conn.create_window(
            depth,
            window,
            screen.root,
            0,
            0,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            visual,
            &CreateWindowAux::new()
                .background_pixel(0)
                .border_pixel(0)
                .colormap(colormap)
                .event_mask(
                    EventMask::ENTER_WINDOW
                        | EventMask::LEAVE_WINDOW
                        | EventMask::EXPOSURE
                        | EventMask::STRUCTURE_NOTIFY,
                ),
        )
        .context("Failed to create panel window")?;

        let gc = conn.generate_id().context("Failed to generate ID for panel graphics context")?;
        conn.create_gc(gc, window, &CreateGCAux::new())
            .context("Failed to create panel graphics context")?;

        let backend = Self {
            conn,
            screen_num,
            root: screen.root,
            window,
            gc,
            depth,
            atoms,
            composited,
        };
        backend.setup_window_properties()?;
        info!(window, depth, composited, "Created panel window");
        Ok(backend)
    }

    /// Dock type, WM_CLASS, sticky state and drop-target advertisement
    fn setup_window_properties(&self) -> Result<()> {
        let atoms = &self.atoms;
        self.conn
            .change_property32(
                PropMode::REPLACE,
                self.window,
                atoms.net_wm_window_type,
                AtomEnum::ATOM,
                &[atoms.net_wm_window_type_dock],
            )
            .context("Failed to set panel window type")?;
        self.conn
            .change_property8(
                PropMode::REPLACE,
                self.window,
                AtomEnum::WM_CLASS,
                AtomEnum::STRING,
                x11::WM_CLASS,
            )
            .context("Failed to set WM_CLASS for panel")?;
        self.conn
            .change_property32(
                PropMode::REPLACE,
                self.window,
                atoms.net_wm_state,
                AtomEnum::ATOM,
                &[
                    atoms.net_wm_state_sticky,
                    atoms.net_wm_state_skip_taskbar,
                    atoms.net_wm_state_skip_pager,
                ],
            )
            .context("Failed to set panel window state")?;
        self.conn
            .change_property32(
                PropMode::REPLACE,
                self.window,
                atoms.xdnd_aware,
                AtomEnum::ATOM,
                &[x11::XDND_VERSION],
            )
            .context("Failed to advertise XdndAware on panel")?;
        Ok(())
    }

    pub fn connection(&self) -> &RustConnection {
        &self.conn
    }

    pub fn is_composited(&self) -> bool {
        self.composited
    }

    fn screen(&self) -> &Screen {
        &self.conn.setup().roots[self.screen_num]
    }

    pub fn outputs(&self) -> Vec<Rect> {
        query_outputs(&self.conn, self.screen())
    }

    /// Current root window size
    pub fn screen_size(&self) -> Result<(i32, i32)> {
        let geometry = self
            .conn
            .get_geometry(self.root)
            .context("Failed to query root window geometry")?
            .reply()
            .context("Failed to get reply for root window geometry")?;
        Ok((geometry.width as i32, geometry.height as i32))
    }

    /// Map an X event onto what the panel cares about
    pub fn translate(&self, event: &Event) -> Result<Option<PanelEvent>> {
        Ok(match event {
            Event::EnterNotify(e) | Event::LeaveNotify(e) if e.event == self.window => {
                Some(PanelEvent::Crossing(PointerState {
                    x: e.root_x as i32,
                    y: e.root_y as i32,
                    ctrl: e.state.contains(KeyButMask::CONTROL),
                }))
            }
            Event::Expose(e) if e.window == self.window && e.count == 0 => Some(PanelEvent::Exposed),
            Event::ClientMessage(e) if e.window == self.window && e.format == 32 => {
                self.atoms.drag_event(e.type_).map(|event| {
                    let d = e.data.as_data32();
                    PanelEvent::Drag(DragMessage {
                        event,
                        source: d[0],
                        data: [d[1], d[2], d[3], d[4]],
                    })
                })
            }
            Event::RandrScreenChangeNotify(_) => Some(PanelEvent::OutputsChanged {
                outputs: self.outputs(),
                screen: self.screen_size()?,
            }),
            Event::Error(e) => {
                warn!(error = ?e, "X11 protocol error");
                None
            }
            _ => None,
        })
    }

    fn has_property(&self, window: Window, property: Atom, type_: AtomEnum) -> Result<Option<u32>> {
        let reply = self
            .conn
            .get_property(false, window, property, type_, 0, 1)
            .context(format!("Failed to query property {} on window {}", property, window))?
            .reply()
            .context(format!("Failed to get property reply for window {}", window))?;
        Ok(reply.value32().and_then(|mut v| v.next()))
    }

    fn describe(&self, window: Window) -> Result<StackWindow> {
        // Pipeline the requests, then collect the replies
        let attrs = self
            .conn
            .get_window_attributes(window)
            .context(format!("Failed to query attributes of window {}", window))?;
        let geometry = self
            .conn
            .get_geometry(window)
            .context(format!("Failed to query geometry of window {}", window))?;
        let origin = self
            .conn
            .translate_coordinates(window, self.root, 0, 0)
            .context(format!("Failed to translate coordinates of window {}", window))?;
        let state = self
            .conn
            .get_property(false, window, self.atoms.net_wm_state, AtomEnum::ATOM, 0, 32)
            .context(format!("Failed to query _NET_WM_STATE for window {}", window))?;

        let attrs = attrs.reply().context("Failed to get window attributes reply")?;
        let geometry = geometry.reply().context("Failed to get window geometry reply")?;
        let origin = origin.reply().context("Failed to get translate coordinates reply")?;
        let minimized = state
            .reply()
            .context("Failed to get _NET_WM_STATE reply")?
            .value32()
            .is_some_and(|mut atoms| atoms.any(|a| a == self.atoms.net_wm_state_hidden));

        Ok(StackWindow {
            id: window,
            bounds: Rect::new(
                origin.dst_x as i32,
                origin.dst_y as i32,
                geometry.width as i32,
                geometry.height as i32,
            ),
            mapped: attrs.map_state == MapState::VIEWABLE,
            minimized,
        })
    }

    fn send_client_message(&self, target: Window, type_: Atom, data: [u32; 5]) -> Result<()> {
        let event = ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: 32,
            sequence: 0,
            window: target,
            type_,
            data: ClientMessageData::from(data),
        };
        self.conn
            .send_event(false, target, EventMask::NO_EVENT, event)
            .context(format!("Failed to send client message to window {}", target))?;
        self.conn.flush().context("Failed to flush X11 connection after client message")?;
        Ok(())
    }
}

impl WindowSystem for X11Backend {
    fn set_shape(&mut self, region: Option<&Region>) -> Result<()> {
        match region {
            Some(region) => self
                .conn
                .shape_rectangles(
                    shape::SO::SET,
                    shape::SK::BOUNDING,
                    ClipOrdering::UNSORTED,
                    self.window,
                    0,
                    0,
                    &to_rectangles(region),
                )
                .context("Failed to set panel bounding shape")?,
            None => self
                .conn
                .shape_mask(shape::SO::SET, shape::SK::BOUNDING, self.window, 0, 0, x11rb::NONE)
                .context("Failed to clear panel bounding shape")?,
        };
        self.conn.flush().context("Failed to flush X11 connection after shaping")?;
        Ok(())
    }

    fn set_input_shape(&mut self, region: &Region) -> Result<()> {
        self.conn
            .shape_rectangles(
                shape::SO::SET,
                shape::SK::INPUT,
                ClipOrdering::UNSORTED,
                self.window,
                0,
                0,
                &to_rectangles(region),
            )
            .context("Failed to set panel input shape")?;
        self.conn.flush().context("Failed to flush X11 connection after input shaping")?;
        Ok(())
    }

    fn add_input_shape(&mut self, region: &Region) -> Result<()> {
        self.conn
            .shape_rectangles(
                shape::SO::UNION,
                shape::SK::INPUT,
                ClipOrdering::UNSORTED,
                self.window,
                0,
                0,
                &to_rectangles(region),
            )
            .context("Failed to extend panel input shape")?;
        self.conn.flush().context("Failed to flush X11 connection after input shaping")?;
        Ok(())
    }

    fn set_strut(&mut self, position: Position, strut: &StrutResult) -> Result<()> {
        self.conn
            .change_property32(
                PropMode::REPLACE,
                self.window,
                self.atoms.net_wm_strut,
                AtomEnum::CARDINAL,
                &strut.to_strut(position),
            )
            .context("Failed to set _NET_WM_STRUT")?;
        self.conn
            .change_property32(
                PropMode::REPLACE,
                self.window,
                self.atoms.net_wm_strut_partial,
                AtomEnum::CARDINAL,
                &strut.to_strut_partial(position),
            )
            .context("Failed to set _NET_WM_STRUT_PARTIAL")?;
        self.conn.flush().context("Failed to flush X11 connection after strut update")?;
        debug!(?position, distance = strut.distance, start = strut.start, end = strut.end, "strut published");
        Ok(())
    }

    fn window_stack(&mut self) -> Result<Vec<StackWindow>> {
        let stacking: Vec<Window> = self
            .conn
            .get_property(
                false,
                self.root,
                self.atoms.net_client_list_stacking,
                AtomEnum::WINDOW,
                0,
                u32::MAX,
            )
            .context("Failed to query _NET_CLIENT_LIST_STACKING")?
            .reply()
            .context("Failed to get reply for _NET_CLIENT_LIST_STACKING")?
            .value32()
            .map(|windows| windows.collect())
            .unwrap_or_default();

        // Both sources list bottom to top
        let bottom_up = if stacking.is_empty() {
            self.conn
                .query_tree(self.root)
                .context("Failed to query root window tree")?
                .reply()
                .context("Failed to get reply for root window tree")?
                .children
        } else {
            stacking
        };

        Ok(bottom_up
            .into_iter()
            .rev()
            .filter_map(|w| {
                self.describe(w)
                    .inspect_err(|e| debug!(window = w, error = %e, "Skipping window in stack"))
                    .ok()
            })
            .collect())
    }

    fn panel_window(&self) -> WindowId {
        self.window
    }

    fn set_opacity(&mut self, opacity: f64) -> Result<()> {
        if opacity >= 1.0 {
            self.conn
                .delete_property(self.window, self.atoms.net_wm_window_opacity)
                .context("Failed to clear panel opacity")?;
        } else {
            let value = (opacity.clamp(0.0, 1.0) * x11::OPAQUE as f64) as u32;
            self.conn
                .change_property32(
                    PropMode::REPLACE,
                    self.window,
                    self.atoms.net_wm_window_opacity,
                    AtomEnum::CARDINAL,
                    &[value],
                )
                .context("Failed to set panel opacity")?;
        }
        self.conn.flush().context("Failed to flush X11 connection after opacity change")?;
        Ok(())
    }

    fn set_keep_below(&mut self, below: bool) -> Result<()> {
        let action = if below {
            x11::NET_WM_STATE_ADD
        } else {
            x11::NET_WM_STATE_REMOVE
        };
        let event = ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: 32,
            sequence: 0,
            window: self.window,
            type_: self.atoms.net_wm_state,
            data: ClientMessageData::from([
                action,
                self.atoms.net_wm_state_below,
                0,
                x11::SOURCE_APPLICATION,
                0,
            ]),
        };
        self.conn
            .send_event(
                false,
                self.root,
                EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
                event,
            )
            .context("Failed to send _NET_WM_STATE_BELOW request")?;
        self.conn.flush().context("Failed to flush X11 connection after stacking change")?;
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) -> Result<()> {
        if visible {
            self.conn.map_window(self.window).context("Failed to map panel window")?;
        } else {
            self.conn.unmap_window(self.window).context("Failed to unmap panel window")?;
        }
        self.conn.flush().context("Failed to flush X11 connection after visibility change")?;
        Ok(())
    }

    fn move_resize(&mut self, rect: Rect) -> Result<()> {
        self.conn
            .configure_window(
                self.window,
                &ConfigureWindowAux::new()
                    .x(rect.x)
                    .y(rect.y)
                    .width(rect.width.max(1) as u32)
                    .height(rect.height.max(1) as u32),
            )
            .context(format!("Failed to move panel window to {:?}", rect))?;
        self.conn.flush().context("Failed to flush X11 connection after move")?;
        Ok(())
    }

    fn pointer(&mut self) -> Result<PointerState> {
        let reply = self
            .conn
            .query_pointer(self.root)
            .context("Failed to query pointer")?
            .reply()
            .context("Failed to get reply for pointer query")?;
        Ok(PointerState {
            x: reply.root_x as i32,
            y: reply.root_y as i32,
            ctrl: reply.mask.contains(KeyButMask::CONTROL),
        })
    }

    fn present(&mut self, surface: &Surface) -> Result<()> {
        let (width, height) = (surface.width(), surface.height());
        if width == 0 || height == 0 {
            return Ok(());
        }
        let bytes = surface.to_bgra_bytes();
        let stride = width as usize * 4;
        let rows = rows_per_upload(self.conn.maximum_request_bytes(), stride);
        for (band, chunk) in bytes.chunks(rows * stride).enumerate() {
            self.conn
                .put_image(
                    ImageFormat::Z_PIXMAP,
                    self.window,
                    self.gc,
                    width as u16,
                    (chunk.len() / stride) as u16,
                    0,
                    (band * rows) as i16,
                    0,
                    self.depth,
                    chunk,
                )
                .context(format!("Failed to upload panel image ({}x{})", width, height))?;
        }
        self.conn.flush().context("Failed to flush X11 connection after upload")?;
        Ok(())
    }

    fn drag_aware_window(&mut self, toplevel: WindowId) -> Result<Option<WindowId>> {
        if let Some(proxy) = self.has_property(toplevel, self.atoms.xdnd_proxy, AtomEnum::WINDOW)? {
            return Ok(Some(proxy));
        }
        if self.has_property(toplevel, self.atoms.xdnd_aware, AtomEnum::ATOM)?.is_some() {
            return Ok(Some(toplevel));
        }

        // Window manager frames keep the client one level down
        let children = self
            .conn
            .query_tree(toplevel)
            .context(format!("Failed to query tree of window {}", toplevel))?
            .reply()
            .context(format!("Failed to get tree reply for window {}", toplevel))?
            .children;
        for child in children.into_iter().rev() {
            if self.has_property(child, self.atoms.xdnd_aware, AtomEnum::ATOM)?.is_some() {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    fn forward_drag(&mut self, target: WindowId, message: &DragMessage) -> Result<()> {
        let d = message.data;
        self.send_client_message(
            target,
            self.atoms.drag_atom(message.event),
            [message.source, d[0], d[1], d[2], d[3]],
        )
    }

    fn reject_drag(&mut self, message: &DragMessage) -> Result<()> {
        let reply = match message.event {
            DragEvent::Position => self.atoms.xdnd_status,
            DragEvent::Drop => self.atoms.xdnd_finished,
            DragEvent::Enter | DragEvent::Leave => return Ok(()),
        };
        self.send_client_message(message.source, reply, [self.window, 0, 0, 0, 0])
    }
}

/// Rows of `stride` bytes that fit in one PutImage request
fn rows_per_upload(maximum_request_bytes: usize, stride: usize) -> usize {
    // 24-byte request header, rounded up
    let budget = maximum_request_bytes.saturating_sub(64);
    (budget / stride.max(1)).max(1)
}

impl Drop for X11Backend {
    fn drop(&mut self) {
        let _ = self.conn.destroy_window(self.window);
        let _ = self.conn.flush();
    }
}
