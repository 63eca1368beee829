//! Development HTTP server for the build output directory.
//!
//! Static files only. HTML responses carry the live reload client script,
//! which the server also hosts at [`CLIENT_SCRIPT_PATH`].

mod mime;
mod path;
mod response;

pub use path::resolve_path;
pub use response::inject_reload_script;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tiny_http::{Method, Request, Server};
use tracing::{debug, info, warn};

use crate::errors::{AssetflowError, Result};
use crate::reload::CLIENT_SCRIPT_PATH;

/// A bound, not yet serving, HTTP server.
pub struct DevServer {
    server: Arc<Server>,
    addr: SocketAddr,
    root: PathBuf,
    reload_port: Option<u16>,
}

impl std::fmt::Debug for DevServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevServer")
            .field("addr", &self.addr)
            .field("root", &self.root)
            .field("reload_port", &self.reload_port)
            .finish()
    }
}

impl DevServer {
    /// Bind `host:port` for serving `root`. Port 0 picks a free port.
    ///
    /// `reload_port` is the live reload WebSocket port; `None` disables
    /// script injection.
    pub fn bind(
        host: &str,
        port: u16,
        root: impl Into<PathBuf>,
        reload_port: Option<u16>,
    ) -> Result<Self> {
        let server = Server::http((host, port)).map_err(|e| {
            AssetflowError::Network(format!("cannot bind dev server to {host}:{port}: {e}"))
        })?;
        let addr = server.server_addr().to_ip().ok_or_else(|| {
            AssetflowError::Network(format!("dev server on {host}:{port} has no IP address"))
        })?;

        Ok(Self {
            server: Arc::new(server),
            addr,
            root: root.into(),
            reload_port,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the request loop on a background thread.
    pub fn spawn(self) -> ServerHandle {
        info!(addr = %self.addr, root = ?self.root, "dev server listening");
        println!("Serving {} at http://{}", self.root.display(), self.addr);

        let server = Arc::clone(&self.server);
        let root = self.root;
        let reload_port = self.reload_port;
        let thread = thread::spawn(move || {
            for request in server.incoming_requests() {
                if let Err(e) = handle_request(request, &root, reload_port) {
                    warn!(error = %e, "request error");
                }
            }
            debug!("dev server loop finished");
        });

        ServerHandle {
            server: self.server,
            addr: self.addr,
            thread: Some(thread),
        }
    }
}

/// Running server. Stops on [`ServerHandle::stop`] or drop.
pub struct ServerHandle {
    server: Arc<Server>,
    addr: SocketAddr,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle").field("addr", &self.addr).finish()
    }
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.server.unblock();
            if thread.join().is_err() {
                warn!("dev server thread panicked");
            }
            info!(addr = %self.addr, "dev server stopped");
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn handle_request(request: Request, root: &Path, reload_port: Option<u16>) -> anyhow::Result<()> {
    debug!(method = %request.method(), url = request.url(), "request");

    if !matches!(request.method(), Method::Get | Method::Head) {
        return response::respond_method_not_allowed(request);
    }

    if let Some(port) = reload_port
        && path::url_path(request.url()) == CLIENT_SCRIPT_PATH
    {
        return response::respond_client_script(request, port);
    }

    match path::resolve_path(request.url(), root) {
        Some(file) => response::respond_file(request, &file, reload_port),
        None => response::respond_not_found(request),
    }
}
