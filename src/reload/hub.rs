// src/reload/hub.rs

//! WebSocket hub that pushes reload notifications to connected browsers.
//!
//! One thread owns the listener and every client socket. [`LiveReload`]
//! handles only enqueue [`HubCommand`]s, so a slow or stalled browser can
//! never block a build. Sockets carry a write timeout and are dropped on the
//! first failed send. The thread exits once every handle is gone.

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};
use tracing::{debug, info, warn};
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use crate::errors::{AssetflowError, Result};

use super::message::ReloadMessage;

/// Maximum port retry attempts.
const MAX_PORT_RETRIES: u16 = 10;

const IDLE_POLL: Duration = Duration::from_millis(20);

/// Upper bound for a browser to complete the upgrade request.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// A client that does not drain its socket within this window is dropped.
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// What changed after a successful leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadScope {
    Full { task: Option<String> },
    /// Only stylesheets changed; URL paths below the served root.
    Styles(Vec<String>),
}

#[derive(Debug)]
enum HubCommand {
    Send(ReloadMessage),
    ShowError { task: String, message: String },
    ClearError,
}

/// Handle to the live reload hub. Cheap to clone.
#[derive(Clone)]
pub struct LiveReload {
    tx: UnboundedSender<HubCommand>,
    clients: Arc<AtomicUsize>,
    port: Option<u16>,
}

impl std::fmt::Debug for LiveReload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveReload")
            .field("port", &self.port)
            .field("clients", &self.client_count())
            .finish()
    }
}

impl LiveReload {
    /// A hub without a listener. Notifications go nowhere.
    pub fn detached() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self {
            tx,
            clients: Arc::new(AtomicUsize::new(0)),
            port: None,
        }
    }

    /// Bind the WebSocket listener on `host`, trying `base_port` and the next
    /// few ports if it is taken. Port 0 picks any free port.
    pub fn bind(host: &str, base_port: u16) -> Result<Self> {
        let (listener, port) = try_bind_port(host, base_port, MAX_PORT_RETRIES)?;
        listener.set_nonblocking(true)?;
        if port != base_port && base_port != 0 {
            info!(base_port, port, "reload port in use, using another");
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let clients = Arc::new(AtomicUsize::new(0));
        let hub = Hub {
            listener,
            rx,
            clients: Vec::new(),
            client_count: Arc::clone(&clients),
            pending_error: None,
        };
        thread::Builder::new()
            .name("assetflow-reload".into())
            .spawn(move || hub.run())?;

        debug!(port, "live reload listening");
        Ok(Self {
            tx,
            clients,
            port: Some(port),
        })
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn client_count(&self) -> usize {
        self.clients.load(Ordering::Relaxed)
    }

    pub fn notify(&self, scope: ReloadScope) {
        let msg = match scope {
            ReloadScope::Full { task } => ReloadMessage::Reload { task },
            ReloadScope::Styles(paths) => ReloadMessage::Css { paths },
        };
        self.enqueue(HubCommand::Send(msg));
    }

    /// Show a build error overlay on every client, including later ones.
    pub fn report_error(&self, task: &str, message: &str) {
        self.enqueue(HubCommand::ShowError {
            task: task.to_string(),
            message: message.to_string(),
        });
    }

    /// Hide the overlay if one is showing.
    pub fn clear_error(&self) {
        self.enqueue(HubCommand::ClearError);
    }

    fn enqueue(&self, cmd: HubCommand) {
        if self.tx.send(cmd).is_err() && self.port.is_some() {
            debug!("reload hub stopped; dropping notification");
        }
    }
}

struct Hub {
    listener: TcpListener,
    rx: UnboundedReceiver<HubCommand>,
    clients: Vec<WebSocket<TcpStream>>,
    client_count: Arc<AtomicUsize>,
    /// Last reported build error, replayed to clients that connect later.
    pending_error: Option<(String, String)>,
}

impl Hub {
    fn run(mut self) {
        loop {
            let mut idle = true;

            match self.drain_commands() {
                Some(handled) => idle &= handled == 0,
                None => break,
            }

            match self.listener.accept() {
                Ok((stream, addr)) => {
                    idle = false;
                    debug!(%addr, "reload client connecting");
                    // Commands sent before the browser connected must be
                    // applied first, so a pending error is replayed.
                    if self.drain_commands().is_none() {
                        break;
                    }
                    self.add_client(stream);
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => warn!(error = %e, "reload accept error"),
            }

            if idle {
                thread::sleep(IDLE_POLL);
            }
        }

        for mut ws in self.clients.drain(..) {
            let _ = ws.close(None);
        }
        self.client_count.store(0, Ordering::Relaxed);
        debug!("reload hub stopped");
    }

    /// Apply queued commands. `None` once every handle is dropped.
    fn drain_commands(&mut self) -> Option<usize> {
        let mut handled = 0;
        loop {
            match self.rx.try_recv() {
                Ok(cmd) => {
                    self.apply(cmd);
                    handled += 1;
                }
                Err(TryRecvError::Empty) => return Some(handled),
                Err(TryRecvError::Disconnected) => return None,
            }
        }
    }

    fn apply(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Send(msg) => self.broadcast(&msg),
            HubCommand::ShowError { task, message } => {
                self.pending_error = Some((task.clone(), message.clone()));
                self.broadcast(&ReloadMessage::Error { task, message });
            }
            HubCommand::ClearError => {
                if self.pending_error.take().is_some() {
                    self.broadcast(&ReloadMessage::ClearError);
                }
            }
        }
    }

    fn broadcast(&mut self, msg: &ReloadMessage) {
        let json = msg.to_json();
        let before = self.clients.len();
        self.clients
            .retain_mut(|ws| ws.send(Message::Text(json.clone().into())).is_ok());
        let dropped = before - self.clients.len();
        if dropped > 0 {
            debug!(dropped, "removed unresponsive reload clients");
        }
        self.client_count.store(self.clients.len(), Ordering::Relaxed);
        debug!(clients = self.clients.len(), message = %json, "broadcast reload message");
    }

    fn add_client(&mut self, stream: TcpStream) {
        if let Err(e) = prepare_stream(&stream) {
            debug!(error = %e, "reload client socket setup failed");
            return;
        }

        let mut ws = match tungstenite::accept(stream) {
            Ok(ws) => ws,
            Err(e) => {
                debug!(error = %e, "reload handshake failed");
                return;
            }
        };
        // Clients never need to be read from after the handshake.
        let _ = ws.get_ref().set_read_timeout(None);

        let mut greeting = vec![ReloadMessage::connected()];
        if let Some((task, message)) = self.pending_error.clone() {
            greeting.push(ReloadMessage::Error { task, message });
        }
        for msg in greeting {
            if ws.send(Message::Text(msg.to_json().into())).is_err() {
                return;
            }
        }

        self.clients.push(ws);
        self.client_count.store(self.clients.len(), Ordering::Relaxed);
        debug!(total = self.clients.len(), "reload client connected");
    }
}

/// Blocking socket with bounded handshake reads and bounded writes.
fn prepare_stream(stream: &TcpStream) -> std::io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
    stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
    Ok(())
}

/// Try binding to port, retry with incremented port if in use.
fn try_bind_port(host: &str, base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind((host, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => {
                last_error = Some(e);
            }
        }
    }

    Err(AssetflowError::Network(format!(
        "failed to bind live reload server on {host} after {max_retries} attempts from port {base_port}: {}",
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}
