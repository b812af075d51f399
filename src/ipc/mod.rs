//! IPC via Unix sockets
//!
//! Clients ask the panel to inhibit autohide. Messages are length-prefixed
//! JSON over a Unix domain socket. The server never blocks: it is polled
//! from the panel's event loop.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::autohide::Cookie;
use crate::constants::{config, ipc};

mod messages;
pub use messages::{PanelRequest, PanelResponse};

/// Get default socket path (XDG_RUNTIME_DIR with fallback to cache)
pub fn default_socket_path() -> Result<PathBuf> {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime_dir).join(config::APP_DIR).join(ipc::SOCKET_NAME));
    }

    // Fallback to cache dir
    let cache = dirs::cache_dir()
        .context("Failed to determine cache directory (no XDG_RUNTIME_DIR or HOME)")?;
    Ok(cache.join(config::APP_DIR).join(ipc::SOCKET_NAME))
}

/// Blocking client connection to the panel
pub struct PanelClient {
    stream: UnixStream,
}

impl PanelClient {
    /// Connect to the panel socket
    pub fn connect() -> Result<Self> {
        let path = default_socket_path()?;
        Self::connect_to(&path)
    }

    /// Connect to specific socket path
    pub fn connect_to(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .context(format!("Failed to connect to panel at {}", path.display()))?;
        Ok(Self { stream })
    }

    /// Send request and wait for response
    pub fn request(&mut self, req: &PanelRequest) -> Result<PanelResponse> {
        write_message(&mut self.stream, req)?;
        read_message(&mut self.stream)
    }
}

/// Identifies one accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

/// Something the event loop has to act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Request {
        client: ClientId,
        request: PanelRequest,
    },
    /// Connection closed; `held` are the inhibitors tied to it
    Disconnected { client: ClientId, held: Vec<Cookie> },
}

struct Connection {
    id: ClientId,
    stream: UnixStream,
    pending: Vec<u8>,
    held: Vec<Cookie>,
}

/// Non-blocking socket server for inhibit requests
pub struct PanelServer {
    listener: UnixListener,
    socket_path: PathBuf,
    clients: Vec<Connection>,
    next_id: u64,
}

impl PanelServer {
    /// Create server and bind to default socket path
    pub fn bind() -> Result<Self> {
        let socket_path = default_socket_path()?;
        Self::bind_to(socket_path)
    }

    /// Create server and bind to specific socket path
    pub fn bind_to(socket_path: PathBuf) -> Result<Self> {
        // Create directory if needed
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create socket directory: {}", parent.display()))?;
        }

        // Remove stale socket if exists
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .context(format!("Failed to remove stale socket: {}", socket_path.display()))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .context(format!("Failed to bind socket at {}", socket_path.display()))?;
        listener
            .set_nonblocking(true)
            .context("Failed to make IPC listener non-blocking")?;

        // Set permissions to 0700 (owner only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o700))
                .context("Failed to set socket permissions")?;
        }

        Ok(Self {
            listener,
            socket_path,
            clients: Vec::new(),
            next_id: 1,
        })
    }

    /// Get socket path
    pub fn path(&self) -> &Path {
        &self.socket_path
    }

    #[cfg(test)]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Descriptors to wait on: the listener, then every client
    pub fn fds(&self) -> Vec<BorrowedFd<'_>> {
        std::iter::once(self.listener.as_fd())
            .chain(self.clients.iter().map(|c| c.stream.as_fd()))
            .collect()
    }

    /// Accept new connections and read whatever the clients sent
    pub fn poll_events(&mut self) -> Vec<ServerEvent> {
        self.accept_pending();

        let mut events = Vec::new();
        let mut closed = Vec::new();
        for conn in &mut self.clients {
            match read_available(conn, &mut events) {
                Ok(true) => {}
                Ok(false) => closed.push(conn.id),
                Err(e) => {
                    warn!(client = conn.id.0, error = %e, "Dropping IPC client");
                    closed.push(conn.id);
                }
            }
        }

        for id in closed {
            if let Some(idx) = self.clients.iter().position(|c| c.id == id) {
                let conn = self.clients.swap_remove(idx);
                debug!(client = id.0, held = conn.held.len(), "IPC client disconnected");
                events.push(ServerEvent::Disconnected {
                    client: id,
                    held: conn.held,
                });
            }
        }
        events
    }

    /// Tie `cookie` to the lifetime of `client`'s connection
    pub fn hold(&mut self, client: ClientId, cookie: Cookie) {
        if let Some(conn) = self.clients.iter_mut().find(|c| c.id == client) {
            conn.held.push(cookie);
        }
    }

    /// Forget a held cookie that was released explicitly
    pub fn forget(&mut self, cookie: Cookie) {
        for conn in &mut self.clients {
            conn.held.retain(|c| *c != cookie);
        }
    }

    pub fn respond(&mut self, client: ClientId, response: &PanelResponse) -> Result<()> {
        let conn = self
            .clients
            .iter_mut()
            .find(|c| c.id == client)
            .ok_or_else(|| anyhow!("IPC client {} is gone", client.0))?;
        write_message(&mut conn.stream, response)
    }

    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    if self.clients.len() >= ipc::MAX_CLIENTS {
                        warn!(max = ipc::MAX_CLIENTS, "Too many IPC clients, refusing connection");
                        continue;
                    }
                    if let Err(e) = stream.set_nonblocking(true) {
                        warn!(error = %e, "Failed to make IPC client non-blocking");
                        continue;
                    }
                    let id = ClientId(self.next_id);
                    self.next_id += 1;
                    debug!(client = id.0, "IPC client connected");
                    self.clients.push(Connection {
                        id,
                        stream,
                        pending: Vec::new(),
                        held: Vec::new(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(error = %e, "Failed to accept IPC connection");
                    break;
                }
            }
        }
    }
}

impl Drop for PanelServer {
    fn drop(&mut self) {
        // Clean up socket file
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Drain the socket and decode complete frames; `Ok(false)` on EOF
fn read_available(conn: &mut Connection, events: &mut Vec<ServerEvent>) -> Result<bool> {
    let mut open = true;
    let mut chunk = [0u8; 4096];
    loop {
        match conn.stream.read(&mut chunk) {
            Ok(0) => {
                open = false;
                break;
            }
            Ok(n) => conn.pending.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("Failed to read from IPC client"),
        }
    }

    while let Some(payload) = take_frame(&mut conn.pending)? {
        let request = serde_json::from_slice(&payload).context("Failed to deserialize message from JSON")?;
        events.push(ServerEvent::Request {
            client: conn.id,
            request,
        });
    }
    Ok(open)
}

/// Split one complete frame off the front of `buf`
fn take_frame(buf: &mut Vec<u8>) -> Result<Option<Vec<u8>>> {
    let Some(prefix) = buf.get(..4) else {
        return Ok(None);
    };
    let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if len > ipc::MAX_MESSAGE_SIZE {
        return Err(anyhow!("Message too large: {} bytes (max: {})", len, ipc::MAX_MESSAGE_SIZE));
    }
    if buf.len() < 4 + len {
        return Ok(None);
    }
    let payload = buf[4..4 + len].to_vec();
    buf.drain(..4 + len);
    Ok(Some(payload))
}

/// Write length-prefixed message to stream
fn write_message<T: Serialize>(stream: &mut UnixStream, msg: &T) -> Result<()> {
    let json = serde_json::to_vec(msg).context("Failed to serialize message to JSON")?;

    // Write length prefix (u32 little-endian)
    let len = json.len() as u32;
    stream
        .write_all(&len.to_le_bytes())
        .context("Failed to write message length")?;

    // Write JSON payload
    stream
        .write_all(&json)
        .context("Failed to write message payload")?;

    stream.flush().context("Failed to flush stream")?;

    Ok(())
}

/// Read length-prefixed message from stream (blocking)
fn read_message<T: for<'de> Deserialize<'de>>(stream: &mut UnixStream) -> Result<T> {
    // Read length prefix
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .context("Failed to read message length")?;
    let len = u32::from_le_bytes(len_buf) as usize;

    // Sanity check (prevent DoS via huge allocation)
    if len > ipc::MAX_MESSAGE_SIZE {
        return Err(anyhow!("Message too large: {} bytes (max: {})", len, ipc::MAX_MESSAGE_SIZE));
    }

    // Read JSON payload
    let mut json_buf = vec![0u8; len];
    stream
        .read_exact(&mut json_buf)
        .context("Failed to read message payload")?;

    // Deserialize
    serde_json::from_slice(&json_buf).context("Failed to deserialize message from JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn server(dir: &TempDir) -> PanelServer {
        PanelServer::bind_to(dir.path().join("run").join("panel.sock")).unwrap()
    }

    /// Poll until `n` events arrived; the client side writes synchronously
    fn events(server: &mut PanelServer, n: usize) -> Vec<ServerEvent> {
        let mut all = Vec::new();
        for _ in 0..200 {
            all.extend(server.poll_events());
            if all.len() >= n {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        all
    }

    #[test]
    fn test_socket_permissions_and_cleanup() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let server = server(&dir);
        let path = server.path().to_path_buf();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
        drop(server);
        assert!(!path.exists());
    }

    #[test]
    fn test_request_and_response() {
        let dir = TempDir::new().unwrap();
        let mut server = server(&dir);
        let path = server.path().to_path_buf();

        let client = std::thread::spawn(move || {
            let mut client = PanelClient::connect_to(&path).unwrap();
            client.request(&PanelRequest::Ping).unwrap()
        });

        let got = events(&mut server, 1);
        let ServerEvent::Request { client: id, request } = &got[0] else {
            panic!("expected a request, got {got:?}");
        };
        assert_eq!(*request, PanelRequest::Ping);
        server.respond(*id, &PanelResponse::Pong).unwrap();
        assert_eq!(client.join().unwrap(), PanelResponse::Pong);
    }

    #[test]
    fn test_held_cookies_reported_on_disconnect() {
        let dir = TempDir::new().unwrap();
        let mut server = server(&dir);
        let mut stream = UnixStream::connect(server.path()).unwrap();
        write_message(
            &mut stream,
            &PanelRequest::Inhibit {
                app_name: "player".into(),
                reason: "video".into(),
                hold: true,
            },
        )
        .unwrap();

        let got = events(&mut server, 1);
        let ServerEvent::Request { client, .. } = got[0].clone() else {
            panic!("expected a request");
        };
        server.hold(client, 7);
        drop(stream);

        let got = events(&mut server, 1);
        assert_eq!(got, vec![ServerEvent::Disconnected { client, held: vec![7] }]);
        assert_eq!(server.client_count(), 0);
    }

    #[test]
    fn test_frames_split_across_reads() {
        let mut buf = Vec::new();
        let json = serde_json::to_vec(&PanelRequest::ListInhibitors).unwrap();
        buf.extend_from_slice(&(json.len() as u32).to_le_bytes());
        buf.extend_from_slice(&json[..3]);
        assert!(take_frame(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&json[3..]);
        assert_eq!(take_frame(&mut buf).unwrap(), Some(json));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut buf = ((ipc::MAX_MESSAGE_SIZE + 1) as u32).to_le_bytes().to_vec();
        assert!(take_frame(&mut buf).is_err());
    }
}
