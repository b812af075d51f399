use std::collections::BTreeMap;

use tracing::debug;

/// Opaque handle returned to an inhibiting client
pub type Cookie = u32;

/// Outstanding autohide inhibitors, keyed by cookie
#[derive(Debug)]
pub struct Inhibitors {
    next: Cookie,
    entries: BTreeMap<Cookie, String>,
}

impl Default for Inhibitors {
    fn default() -> Self {
        Self {
            next: 1,
            entries: BTreeMap::new(),
        }
    }
}

impl Inhibitors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self, app_name: &str, reason: &str) -> Cookie {
        // Zero is never handed out, and live cookies are skipped after wrap
        while self.next == 0 || self.entries.contains_key(&self.next) {
            self.next = self.next.wrapping_add(1);
        }
        let cookie = self.next;
        self.next = self.next.wrapping_add(1);
        self.entries.insert(cookie, format!("{app_name}: {reason}"));
        debug!(cookie, app_name, reason, "autohide inhibited");
        cookie
    }

    /// Returns `false` for unknown cookies
    pub fn release(&mut self, cookie: Cookie) -> bool {
        let released = self.entries.remove(&cookie).is_some();
        debug!(cookie, released, remaining = self.entries.len(), "autohide inhibitor released");
        released
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_inhibited(&self) -> bool {
        !self.entries.is_empty()
    }

    /// `"<app>: <reason>"` for every outstanding cookie, in cookie order
    pub fn descriptions(&self) -> Vec<String> {
        self.entries.values().cloned().collect()
    }
}
