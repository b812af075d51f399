//! Input region of the applet row
//!
//! The applet manager reports icon hit regions in the coordinate space of
//! its scrollable viewport. They are moved into window coordinates, cut to
//! the visible part of the viewport, and joined with the scroll arrows. The
//! background's own input mask is not part of the result; the windowing
//! layer adds it over the whole window.

use crate::geometry::{Rect, Region};

/// Scrollable applet viewport inside the panel window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Visible allocation, window-local
    pub allocation: Rect,
    /// Scroll offset of the content inside the allocation
    pub scroll_x: i32,
    pub scroll_y: i32,
}

impl Viewport {
    pub fn new(allocation: Rect) -> Self {
        Self {
            allocation,
            scroll_x: 0,
            scroll_y: 0,
        }
    }
}

/// Join applet and arrow regions into the window's active region
pub fn compose(applet_region: &Region, arrows: &[Region], viewport: &Viewport) -> Region {
    let alloc = viewport.allocation;
    let visible = applet_region
        .translate(alloc.x - viewport.scroll_x, alloc.y - viewport.scroll_y)
        .intersect(&Region::from_rect(alloc));
    arrows.iter().fold(visible, |acc, arrow| acc.union(arrow))
}

/// Keeps the last composed region for hit-testing between updates
#[derive(Debug, Clone, Default)]
pub struct MaskCompositor {
    region: Region,
}

impl MaskCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompose and remember the result; returns `true` when it changed
    pub fn update(&mut self, applet_region: &Region, arrows: &[Region], viewport: &Viewport) -> bool {
        let region = compose(applet_region, arrows, viewport);
        if region == self.region {
            return false;
        }
        self.region = region;
        true
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Hit test in window coordinates
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.region.contains(x, y)
    }
}
