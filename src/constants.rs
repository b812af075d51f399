//! Application-wide constants
//!
//! Magic numbers and string literals shared across modules.

/// Configuration file location
pub mod config {
    /// Directory under the XDG config and runtime dirs
    pub const APP_DIR: &str = "edgepanel";

    pub const FILENAME: &str = "config.json";
}

/// Inhibit socket
pub mod ipc {
    pub const SOCKET_NAME: &str = "panel.sock";

    /// Largest accepted message (10 MB)
    pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

    /// Client connections served at once
    pub const MAX_CLIENTS: usize = 32;
}

/// Timer cadences, in milliseconds
pub mod timing {
    pub const HIDE_DELAY_MS: u64 = 1000;

    pub const POLL_INTERVAL_MS: u64 = 500;

    /// One step of the fade-out ramp
    pub const FADE_STEP_MS: u64 = 40;

    pub const FADE_STEPS: u32 = 8;

    /// Re-resolution of the drag target while a drag is in progress
    pub const DRAG_RECHECK_MS: u64 = 40;

    /// Lower bound for every configured delay
    pub const MIN_DELAY_MS: u64 = 1;
}

/// Ranges enforced by `validate_and_clamp`
pub mod validation {
    pub const MIN_SIZE: u32 = 8;
    pub const MAX_SIZE: u32 = 256;

    pub const MAX_OFFSET: u32 = 128;

    pub const MAX_CORNER_RADIUS: f64 = 256.0;

    pub const MAX_PANEL_ANGLE: f64 = 90.0;

    pub const MAX_FLOATY_OFFSET: u32 = 128;

    pub const MAX_FADE_STEPS: u32 = 64;

    /// Curviness above this gives curves wider than the panel is tall
    pub const MAX_CURVINESS: f64 = 4.0;
}

/// X11 protocol constants
pub mod x11 {
    /// ARGB visual depth
    pub const ARGB_DEPTH: u8 = 32;

    /// `_NET_WM_WINDOW_OPACITY` value for a fully opaque window
    pub const OPAQUE: u32 = 0xFFFF_FFFF;

    /// `_NET_WM_STATE` client message actions
    pub const NET_WM_STATE_REMOVE: u32 = 0;
    pub const NET_WM_STATE_ADD: u32 = 1;

    /// Source indication for EWMH client messages (1 = application)
    pub const SOURCE_APPLICATION: u32 = 1;

    /// Highest XDND protocol version spoken by the drag proxy
    pub const XDND_VERSION: u32 = 5;

    /// WM_CLASS value, instance and class NUL-separated
    pub const WM_CLASS: &[u8] = b"edgepanel\0Edgepanel\0";
}
