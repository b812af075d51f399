//! Panel daemon - owns the X connection and the inhibit socket

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::os::fd::AsFd;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use x11rb::connection::Connection;

use crate::config::PanelConfig;
use crate::ipc::{PanelRequest, PanelResponse, PanelServer, ServerEvent};
use crate::shell::PanelShell;
use crate::x11_utils::X11Backend;

/// Set from signal handlers, checked once per loop iteration
struct Flags {
    quit: Arc<AtomicBool>,
    reload: Arc<AtomicBool>,
}

impl Flags {
    fn register() -> Result<Self> {
        use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};

        let quit = Arc::new(AtomicBool::new(false));
        let reload = Arc::new(AtomicBool::new(false));
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&quit))
                .context(format!("Failed to register handler for signal {}", signal))?;
        }
        signal_hook::flag::register(SIGHUP, Arc::clone(&reload))
            .context("Failed to register SIGHUP handler")?;
        Ok(Self { quit, reload })
    }
}

/// Poll timeout for the next scheduler deadline, rounded up to whole
/// milliseconds so a timer is never woken for early
fn poll_timeout(next: Option<Duration>) -> PollTimeout {
    match next {
        None => PollTimeout::NONE,
        Some(wait) => {
            let ms = wait.as_micros().div_ceil(1000).min(i32::MAX as u128) as i32;
            PollTimeout::try_from(ms).unwrap_or(PollTimeout::MAX)
        }
    }
}

pub fn run_panel_daemon(config_path: Option<PathBuf>) -> Result<()> {
    let config_path = config_path.unwrap_or_else(PanelConfig::default_path);
    let config = PanelConfig::load(&config_path);
    debug!(config = ?config, "Effective configuration");

    let backend = X11Backend::connect()?;
    let composited = backend.is_composited();
    let outputs = backend.outputs();
    let screen = backend.screen_size()?;
    info!(outputs = outputs.len(), width = screen.0, height = screen.1, composited, "Display ready");

    // The panel still works without the socket, it just cannot be inhibited
    let mut server = PanelServer::bind()
        .inspect_err(|e| error!(error = ?e, "Failed to start inhibit socket, continuing without it"))
        .ok();
    if let Some(server) = &server {
        info!(path = %server.path().display(), "Listening for inhibit requests");
    }

    let flags = Flags::register()?;
    let epoch = Instant::now();

    let mut shell = PanelShell::new(config, composited, backend, outputs, screen);
    shell.start(epoch.elapsed());

    while !flags.quit.load(Ordering::Relaxed) {
        // Replies read during dispatch can leave events queued in the connection
        drain_x_events(&mut shell, epoch)?;
        let timeout = poll_timeout(shell.next_timeout(epoch.elapsed()));
        {
            let conn = shell.window_system().connection();
            let mut fds = vec![PollFd::new(conn.stream().as_fd(), PollFlags::POLLIN)];
            if let Some(server) = &server {
                fds.extend(server.fds().into_iter().map(|fd| PollFd::new(fd, PollFlags::POLLIN)));
            }
            match poll(&mut fds, timeout) {
                Ok(_) | Err(Errno::EINTR) => {}
                Err(e) => return Err(e).context("Failed to wait for panel events"),
            }
        }

        if flags.reload.swap(false, Ordering::Relaxed) {
            info!(path = %config_path.display(), "Reloading configuration");
            shell.apply_config(PanelConfig::load(&config_path), epoch.elapsed());
        }

        if let Some(server) = &mut server {
            service_clients(&mut shell, server, epoch);
        }
        shell.dispatch(epoch.elapsed());
        shell
            .window_system()
            .connection()
            .flush()
            .context("Failed to flush X11 connection")?;
    }

    info!("Shutting down panel");
    Ok(())
}

fn drain_x_events(shell: &mut PanelShell<X11Backend>, epoch: Instant) -> Result<()> {
    while let Some(event) = shell
        .window_system()
        .connection()
        .poll_for_event()
        .context("Lost connection to X11 server")?
    {
        let translated = shell
            .window_system()
            .translate(&event)
            .inspect_err(|e| error!(error = %e, "Failed to translate X11 event"));
        if let Ok(Some(event)) = translated {
            shell.handle_event(event, epoch.elapsed());
        }
    }
    Ok(())
}

fn service_clients(shell: &mut PanelShell<X11Backend>, server: &mut PanelServer, epoch: Instant) {
    for event in server.poll_events() {
        match event {
            ServerEvent::Request { client, request } => {
                let response = shell.handle_request(&request, epoch.elapsed());
                match (&request, &response) {
                    (PanelRequest::Inhibit { hold: true, .. }, PanelResponse::Cookie(cookie)) => {
                        server.hold(client, *cookie);
                    }
                    (PanelRequest::Uninhibit { cookie }, PanelResponse::Released(true)) => {
                        server.forget(*cookie);
                    }
                    _ => {}
                }
                let _ = server
                    .respond(client, &response)
                    .inspect_err(|e| warn!(error = %e, "Failed to answer IPC client"));
            }
            ServerEvent::Disconnected { held, .. } => {
                for cookie in held {
                    debug!(cookie, "Releasing inhibitor of disconnected client");
                    shell.uninhibit(cookie, epoch.elapsed());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_timeout_rounds_up() {
        assert_eq!(poll_timeout(None), PollTimeout::NONE);
        assert_eq!(poll_timeout(Some(Duration::ZERO)), PollTimeout::ZERO);
        assert_eq!(
            poll_timeout(Some(Duration::from_micros(1500))),
            PollTimeout::try_from(2i32).unwrap()
        );
        assert_eq!(poll_timeout(Some(Duration::from_secs(u64::MAX))), PollTimeout::MAX);
    }
}
