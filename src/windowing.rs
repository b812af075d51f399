//! Capabilities the engine needs from the windowing system
//!
//! The X11 implementation lives in [`crate::x11_utils`]; tests use the
//! recording fake at the bottom of this file.

use anyhow::Result;

use crate::canvas::Surface;
use crate::geometry::{Rect, Region};
use crate::panel::Position;
use crate::strut::StrutResult;

pub type WindowId = u32;

/// One toplevel in the window stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackWindow {
    pub id: WindowId,
    /// Root coordinates
    pub bounds: Rect,
    pub mapped: bool,
    pub minimized: bool,
}

/// Pointer position in root coordinates plus modifier state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerState {
    pub x: i32,
    pub y: i32,
    pub ctrl: bool,
}

/// Drag protocol messages the proxy forwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragEvent {
    Enter,
    Position,
    Leave,
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragMessage {
    pub event: DragEvent,
    /// Window owning the drag
    pub source: WindowId,
    /// Raw protocol payload after the source window
    pub data: [u32; 4],
}

pub trait WindowSystem {
    /// Visible pixels of the panel window; `None` removes the shape
    fn set_shape(&mut self, region: Option<&Region>) -> Result<()>;

    /// Replace the event-receiving pixels of the panel window
    fn set_input_shape(&mut self, region: &Region) -> Result<()>;

    /// Add `region` to the current input shape
    fn add_input_shape(&mut self, region: &Region) -> Result<()>;

    /// Reserve screen space on `position`'s edge
    fn set_strut(&mut self, position: Position, strut: &StrutResult) -> Result<()>;

    /// Toplevels ordered top to bottom, the panel itself included
    fn window_stack(&mut self) -> Result<Vec<StackWindow>>;

    fn panel_window(&self) -> WindowId;

    fn set_opacity(&mut self, opacity: f64) -> Result<()>;

    fn set_keep_below(&mut self, below: bool) -> Result<()>;

    /// Map or withdraw the panel window
    fn set_visible(&mut self, visible: bool) -> Result<()>;

    fn move_resize(&mut self, rect: Rect) -> Result<()>;

    fn pointer(&mut self) -> Result<PointerState>;

    /// Upload a rendered frame into the panel window
    fn present(&mut self, surface: &Surface) -> Result<()>;

    /// Window inside `toplevel` that speaks the drag protocol, if any
    fn drag_aware_window(&mut self, toplevel: WindowId) -> Result<Option<WindowId>>;

    fn forward_drag(&mut self, target: WindowId, message: &DragMessage) -> Result<()>;

    /// Answer a drag message the panel keeps for itself with a refusal
    fn reject_drag(&mut self, message: &DragMessage) -> Result<()>;
}
