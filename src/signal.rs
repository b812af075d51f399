//! Single-threaded notification signals with scoped subscriptions

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Handler<T> = Rc<dyn Fn(&T)>;

struct Slots<T> {
    next_id: u64,
    handlers: Vec<(u64, Handler<T>)>,
}

/// Broadcast point for `T` notifications
///
/// Handlers run in connection order. A handler may connect or disconnect
/// during emission; the change takes effect from the next `emit`.
pub struct Signal<T> {
    slots: Rc<RefCell<Slots<T>>>,
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Signal<T> {
    pub fn new() -> Self {
        Self {
            slots: Rc::new(RefCell::new(Slots {
                next_id: 0,
                handlers: Vec::new(),
            })),
        }
    }

    /// Register `handler`; it stays connected while the returned handle lives
    #[must_use = "dropping the Subscription disconnects the handler"]
    pub fn connect<F: Fn(&T) + 'static>(&self, handler: F) -> Subscription {
        let id = {
            let mut slots = self.slots.borrow_mut();
            let id = slots.next_id;
            slots.next_id += 1;
            slots.handlers.push((id, Rc::new(handler)));
            id
        };

        let weak: Weak<RefCell<Slots<T>>> = Rc::downgrade(&self.slots);
        Subscription {
            disconnect: Some(Box::new(move || {
                if let Some(slots) = weak.upgrade() {
                    slots.borrow_mut().handlers.retain(|(h, _)| *h != id);
                }
            })),
        }
    }

    pub fn emit(&self, value: &T) {
        let handlers: Vec<Handler<T>> = self
            .slots
            .borrow()
            .handlers
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();
        for handler in handlers {
            handler(value);
        }
    }

    #[cfg(test)]
    pub fn handler_count(&self) -> usize {
        self.slots.borrow().handlers.len()
    }
}

/// Connection handle; disconnects its handler when dropped
pub struct Subscription {
    disconnect: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn disconnect(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("connected", &self.disconnect.is_some())
            .finish()
    }
}
