//! Applet row collaborator
//!
//! Hosting applet processes is somebody else's job; the engine only needs
//! the row's hit regions, its length, where separators sit, and whether a
//! docklet has taken over. [`IconRow`] is the built-in row of fixed-size
//! slots.

use serde::{Deserialize, Serialize};

use crate::background::PathKind;
use crate::geometry::{Rect, Region};
use crate::panel::Position;
use crate::signal::Signal;

pub trait AppletManager {
    /// Hit regions in viewport coordinates, bent to follow the background
    fn mask(&self, path: PathKind, offset_modifier: f64) -> Region;

    fn docklet_mode(&self) -> bool;

    /// Separator centres along the row, viewport coordinates
    fn separators(&self) -> Vec<i32>;

    /// Length of the row along the edge
    fn content_length(&self) -> u32;

    /// Emitted when size, position, offset or the applet list change
    fn changed(&self) -> &Signal<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Icon,
    Separator,
}

/// Row of icon and separator slots along the panel edge
pub struct IconRow {
    position: Position,
    size: u32,
    slots: Vec<Slot>,
    docklet: bool,
    changed: Signal<()>,
}

impl IconRow {
    pub fn new(position: Position, size: u32, slots: Vec<Slot>) -> Self {
        Self {
            position,
            size,
            slots,
            docklet: false,
            changed: Signal::new(),
        }
    }

    /// Separators are thin slots
    fn slot_length(&self, slot: Slot) -> u32 {
        match slot {
            Slot::Icon => self.size,
            Slot::Separator => (self.size / 6).max(4),
        }
    }

    /// `(slot, start, length)` along the row
    fn spans(&self) -> impl Iterator<Item = (Slot, u32, u32)> + '_ {
        self.slots.iter().scan(0u32, move |start, &slot| {
            let length = self.slot_length(slot);
            let span = (slot, *start, length);
            *start += length;
            Some(span)
        })
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn set_slots(&mut self, slots: Vec<Slot>) {
        self.slots = slots;
        self.changed.emit(&());
    }

    pub fn set_geometry(&mut self, position: Position, size: u32) {
        if (position, size) == (self.position, self.size) {
            return;
        }
        self.position = position;
        self.size = size;
        self.changed.emit(&());
    }

    /// Entered when an applet opens a docklet over the row; the whole row
    /// then counts as active until the shell sees the pointer leave
    pub fn set_docklet_mode(&mut self, docklet: bool) {
        self.docklet = docklet;
        self.changed.emit(&());
    }

    /// Towards-the-edge shift of a slot centred at `centre`
    fn sink(&self, centre: f64, path: PathKind, offset_modifier: f64) -> i32 {
        let length = self.content_length() as f64;
        match path {
            PathKind::Linear => 0,
            PathKind::Ellipse if length > 0.0 => {
                // Ends of the row follow the ellipse down
                let t = (centre / length * 2.0 - 1.0).clamp(-1.0, 1.0);
                (offset_modifier * (1.0 - (1.0 - t * t).sqrt())).round() as i32
            }
            PathKind::Ellipse => 0,
        }
    }

    fn slot_rect(&self, start: u32, length: u32, sink: i32) -> Rect {
        let (u, len, size) = (start as i32, length as i32, self.size as i32);
        match self.position {
            Position::Bottom => Rect::new(u, sink, len, size),
            Position::Top => Rect::new(u, -sink, len, size),
            Position::Left => Rect::new(-sink, u, size, len),
            Position::Right => Rect::new(sink, u, size, len),
        }
    }
}

impl AppletManager for IconRow {
    fn mask(&self, path: PathKind, offset_modifier: f64) -> Region {
        if self.docklet {
            return Region::from_rect(self.slot_rect(0, self.content_length(), 0));
        }
        Region::from_rects(self.spans().map(|(_, start, length)| {
            let centre = start as f64 + length as f64 / 2.0;
            self.slot_rect(start, length, self.sink(centre, path, offset_modifier))
        }))
    }

    fn docklet_mode(&self) -> bool {
        self.docklet
    }

    fn separators(&self) -> Vec<i32> {
        self.spans()
            .filter(|(slot, _, _)| *slot == Slot::Separator)
            .map(|(_, start, length)| (start + length / 2) as i32)
            .collect()
    }

    fn content_length(&self) -> u32 {
        self.spans().map(|(_, _, length)| length).sum()
    }

    fn changed(&self) -> &Signal<()> {
        &self.changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn row() -> IconRow {
        IconRow::new(
            Position::Bottom,
            48,
            vec![Slot::Icon, Slot::Icon, Slot::Separator, Slot::Icon],
        )
    }

    #[test]
    fn test_length_and_separators() {
        let row = row();
        assert_eq!(row.content_length(), 48 * 3 + 8);
        assert_eq!(row.separators(), vec![100]);
    }

    #[test]
    fn test_linear_mask_is_flat_row() {
        let row = row();
        let mask = row.mask(PathKind::Linear, 1.0);
        assert_eq!(mask.bounds(), Rect::new(0, 0, 152, 48));
        assert_eq!(mask, Region::from_rect(Rect::new(0, 0, 152, 48)));
    }

    #[test]
    fn test_ellipse_sinks_the_ends() {
        let row = IconRow::new(Position::Bottom, 48, vec![Slot::Icon; 5]);
        let mask = row.mask(PathKind::Ellipse, 20.0);
        // Middle icon stays put, outer ones drop towards the screen edge
        assert!(mask.contains(120, 0));
        assert!(!mask.contains(5, 0));
        assert!(!mask.contains(235, 0));
        assert!(mask.contains(5, 47));
    }

    #[test]
    fn test_vertical_row() {
        let row = IconRow::new(Position::Right, 32, vec![Slot::Icon, Slot::Icon]);
        assert_eq!(
            row.mask(PathKind::Linear, 1.0),
            Region::from_rect(Rect::new(0, 0, 32, 64))
        );
    }

    #[test]
    fn test_changes_are_announced() {
        let mut row = row();
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        let _sub = row.changed().connect(move |_| seen.set(seen.get() + 1));
        let mut slots = row.slots().to_vec();
        slots.insert(0, Slot::Separator);
        row.set_slots(slots);
        row.set_geometry(Position::Bottom, 48);
        row.set_geometry(Position::Top, 48);
        assert_eq!(count.get(), 2);
        assert_eq!(row.separators().len(), 2);
    }
}
