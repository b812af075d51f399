use crate::canvas::Canvas;
use crate::geometry::Rect;
use crate::panel::Padding;

use super::{Style, StyleContext};

/// No background at all; the whole area stays shaped and clickable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Null;

impl Style for Null {
    fn padding_request(&self, _ctx: &StyleContext) -> Padding {
        Padding::default()
    }

    fn draw(&self, _canvas: &mut Canvas, _ctx: &StyleContext, _area: Rect) {}
}
