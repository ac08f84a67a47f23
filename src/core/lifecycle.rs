//! Start/stop bookkeeping for the lookup endpoint
//!
//! The controller is the single owner of the listening socket and of the
//! persisted `ServerState`. Every transition is pushed to a `StatusReporter`
//! so the host can mirror it (status bar, console line, ...).

use std::fmt;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::state::{ServerState, StateStore};
use crate::server::{self, Endpoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Error,
}

impl LifecycleState {
    /// Short host-facing label
    pub fn label(&self) -> &'static str {
        match self {
            LifecycleState::Stopped => "FEIC disconnected",
            LifecycleState::Starting => "FEIC starting",
            LifecycleState::Running => "FEIC connected",
            LifecycleState::Stopping => "FEIC stopping",
            LifecycleState::Error => "FEIC errored",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Host hook notified on every transition
pub trait StatusReporter: Send + Sync {
    fn set_status(&self, state: LifecycleState, detail: &str);
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("No workspace is open. The server stays disabled until you open a workspace.")]
    NoWorkspace,
    #[error("Port {port} is already in use. Make sure no other instance is running.")]
    PortUnavailable { port: u16 },
    #[error("Failed to start server: {0}")]
    Bind(#[source] io::Error),
}

struct RunningServer {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

pub struct LifecycleController {
    port: u16,
    endpoint: Endpoint,
    store: StateStore,
    reporter: Arc<dyn StatusReporter>,
    state: LifecycleState,
    server: Option<RunningServer>,
}

impl LifecycleController {
    pub fn new(
        port: u16,
        endpoint: Endpoint,
        store: StateStore,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            port,
            endpoint,
            store,
            reporter,
            state: LifecycleState::Stopped,
            server: None,
        }
    }

    pub fn status(&self) -> LifecycleState {
        self.state
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(|s| s.addr)
    }

    pub fn persisted(&self) -> ServerState {
        self.store.load()
    }

    /// Bind the port and begin serving. Already running is a no-op.
    pub async fn start(&mut self) -> Result<SocketAddr, LifecycleError> {
        if let Some(server) = &self.server {
            return Ok(server.addr);
        }

        self.transition(LifecycleState::Starting, "Starting server...");

        if self.endpoint.workspace().is_none() {
            return Err(self.fail(LifecycleError::NoWorkspace));
        }

        let listener = match TcpListener::bind((Ipv4Addr::LOCALHOST, self.port)).await {
            Ok(listener) => listener,
            Err(err) if err.kind() == io::ErrorKind::AddrInUse => {
                return Err(self.fail(LifecycleError::PortUnavailable { port: self.port }));
            }
            Err(err) => return Err(self.fail(LifecycleError::Bind(err))),
        };
        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(err) => return Err(self.fail(LifecycleError::Bind(err))),
        };

        let (shutdown, signal) = watch::channel(false);
        let task = tokio::spawn(server::run(listener, self.endpoint.clone(), signal));
        self.server = Some(RunningServer {
            addr,
            shutdown,
            task,
        });

        tracing::info!(%addr, "server started");
        self.persist(&ServerState::running());
        self.transition(
            LifecycleState::Running,
            &format!("Server is running on port {}. Click to stop.", addr.port()),
        );
        Ok(addr)
    }

    /// Close the socket and wait for the accept loop to exit. Stopped is a no-op.
    pub async fn stop(&mut self) -> Result<(), LifecycleError> {
        self.close().await;
        self.persist(&ServerState::stopped());
        self.transition(LifecycleState::Stopped, "Server is stopped. Click to start.");
        Ok(())
    }

    pub async fn toggle(&mut self) -> Result<LifecycleState, LifecycleError> {
        if self.server.is_some() {
            self.stop().await?;
        } else {
            self.start().await?;
        }
        Ok(self.state)
    }

    /// Restore the running state recorded by a previous process.
    ///
    /// Returns whether a start was attempted and succeeded; a failed attempt
    /// leaves the controller in `Error` with that outcome persisted.
    pub async fn resume(&mut self) -> Result<bool, LifecycleError> {
        let persisted = self.store.load();
        if !persisted.is_running {
            self.transition(LifecycleState::Stopped, "Server is stopped. Click to start.");
            return Ok(false);
        }

        tracing::info!(port = self.port, "resuming server from persisted state");
        self.start().await.map(|_| true)
    }

    /// Host shutdown: release the socket but keep the persisted flag so the
    /// next process resumes where this one left off.
    pub async fn deactivate(&mut self) {
        self.close().await;
        self.transition(LifecycleState::Stopped, "Server is stopped.");
    }

    async fn close(&mut self) {
        let Some(server) = self.server.take() else {
            return;
        };

        self.transition(LifecycleState::Stopping, "Stopping server...");
        // A dropped receiver means the loop is already gone
        let _ = server.shutdown.send(true);
        if let Err(err) = server.task.await {
            tracing::warn!(error = %err, "accept loop ended abnormally");
        }
        tracing::info!(addr = %server.addr, "server stopped");
    }

    fn fail(&mut self, err: LifecycleError) -> LifecycleError {
        tracing::error!(error = %err, "server failed to start");
        self.persist(&ServerState::error());
        self.transition(LifecycleState::Error, &err.to_string());
        err
    }

    fn persist(&self, state: &ServerState) {
        if let Err(err) = self.store.save(state) {
            tracing::error!(path = %self.store.path().display(), error = %err, "failed to persist server state");
        }
    }

    fn transition(&mut self, state: LifecycleState, detail: &str) {
        tracing::debug!(from = %self.state, to = %state, "lifecycle transition");
        self.state = state;
        self.reporter.set_status(state, detail);
    }
}

impl Drop for LifecycleController {
    fn drop(&mut self) {
        if let Some(server) = &self.server {
            let _ = server.shutdown.send(true);
        }
    }
}
