//! Cooperative timer and idle scheduling for the single panel loop
//!
//! Time is a [`Duration`] since loop start. The daemon feeds it from a
//! monotonic clock; tests advance it by hand.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Handle of a pending timer; invalid once the timer is cancelled or a
/// one-shot has fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

#[derive(Debug)]
struct Timer<T> {
    id: SourceId,
    deadline: Duration,
    interval: Option<Duration>,
    tag: T,
}

/// Coalescing queue of idle work, shareable with signal handlers
#[derive(Debug)]
pub struct IdleQueue<T> {
    pending: Rc<RefCell<Vec<T>>>,
}

impl<T> Clone for IdleQueue<T> {
    fn clone(&self) -> Self {
        Self {
            pending: Rc::clone(&self.pending),
        }
    }
}

impl<T: PartialEq> IdleQueue<T> {
    fn new() -> Self {
        Self {
            pending: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Queue `tag` unless an identical item is already pending
    pub fn schedule(&self, tag: T) -> bool {
        let mut pending = self.pending.borrow_mut();
        if pending.contains(&tag) {
            return false;
        }
        pending.push(tag);
        true
    }

    #[cfg(test)]
    pub fn is_pending(&self, tag: &T) -> bool {
        self.pending.borrow().contains(tag)
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }
}

/// Timer table plus idle queue
#[derive(Debug)]
pub struct Scheduler<T> {
    next_id: u64,
    timers: Vec<Timer<T>>,
    idle: IdleQueue<T>,
}

impl<T: Clone + PartialEq> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            timers: Vec::new(),
            idle: IdleQueue::new(),
        }
    }

    fn insert(&mut self, deadline: Duration, interval: Option<Duration>, tag: T) -> SourceId {
        let id = SourceId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            deadline,
            interval,
            tag,
        });
        id
    }

    /// One-shot timer firing `delay` after `now`
    pub fn add_timeout(&mut self, now: Duration, delay: Duration, tag: T) -> SourceId {
        self.insert(now + delay, None, tag)
    }

    /// Repeating timer firing every `interval`, first at `now + interval`
    pub fn add_interval(&mut self, now: Duration, interval: Duration, tag: T) -> SourceId {
        let interval = interval.max(Duration::from_millis(1));
        self.insert(now + interval, Some(interval), tag)
    }

    /// Remove a pending timer; returns `false` if it already fired or was
    /// cancelled
    pub fn cancel(&mut self, id: SourceId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn is_active(&self, id: SourceId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    #[cfg(test)]
    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.iter().map(|t| t.deadline).min()
    }

    /// Take the earliest due timer, if any
    ///
    /// Only one timer is returned per call so a handler that cancels another
    /// source keeps it from firing in the same pass. Repeating timers are
    /// rescheduled before being returned.
    pub fn pop_due(&mut self, now: Duration) -> Option<(SourceId, T)> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= now)
            .min_by_key(|(_, t)| (t.deadline, t.id))
            .map(|(i, _)| i)?;

        let timer = &mut self.timers[idx];
        let fired = (timer.id, timer.tag.clone());
        match timer.interval {
            Some(interval) => {
                timer.deadline += interval;
                if timer.deadline <= now {
                    timer.deadline = now + interval;
                }
            }
            None => {
                self.timers.swap_remove(idx);
            }
        }
        Some(fired)
    }

    pub fn idle_queue(&self) -> IdleQueue<T> {
        self.idle.clone()
    }

    pub fn queue_idle(&self, tag: T) -> bool {
        self.idle.schedule(tag)
    }

    /// Pending idle work in scheduling order; items queued while handling
    /// these land in the next batch
    pub fn take_idle(&mut self) -> Vec<T> {
        self.idle.drain()
    }
}
