//! IPC message types for client ↔ panel communication

use serde::{Deserialize, Serialize};

/// Requests sent from a client to the panel
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum PanelRequest {
    /// Keep the panel visible until released
    ///
    /// With `hold` the inhibitor is also released when this connection
    /// closes.
    Inhibit {
        app_name: String,
        reason: String,
        hold: bool,
    },

    /// Release an inhibitor by cookie
    Uninhibit { cookie: u32 },

    /// Describe every outstanding inhibitor
    ListInhibitors,

    /// An applet opened a docklet; it closes once the pointer leaves the
    /// panel
    OpenDocklet,

    /// Health check
    Ping,
}

/// Responses sent from the panel to a client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum PanelResponse {
    /// Cookie for a new inhibitor
    Cookie(u32),

    /// Whether the cookie was outstanding
    Released(bool),

    /// `"<app>: <reason>"` per inhibitor
    Inhibitors(Vec<String>),

    /// Request applied
    Done,

    /// Health check response
    Pong,

    /// Error occurred
    Error(String),
}
