//! Unix domain socket server for IPC
//!
//! Provides request-response communication for timer actions and push
//! notifications of timer events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::events::TimerEvent;
use crate::host::{Action, Command, HostError};

use super::frame::{read_frame, write_frame};
use super::protocol::{Notification, Request, Response, TimerDisplay, TimerStatus};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    shared: Arc<Shared>,
    shutdown_tx: broadcast::Sender<()>,
}

/// State shared with every client handler
struct Shared {
    start_time: Instant,
    /// Actions are forwarded to the driver task
    command_tx: mpsc::Sender<Command>,
    /// Latest display published by the driver
    display_rx: watch::Receiver<TimerDisplay>,
    /// Source of notifications for subscribed clients
    event_tx: broadcast::Sender<TimerEvent>,
}

impl Server {
    /// Create a new IPC server
    pub fn new(
        socket_path: &Path,
        command_tx: mpsc::Sender<Command>,
        display_rx: watch::Receiver<TimerDisplay>,
        event_tx: broadcast::Sender<TimerEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let shared = Arc::new(Shared {
            start_time: Instant::now(),
            command_tx,
            display_rx,
            event_tx,
        });

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            shared,
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let shared = Arc::clone(&self.shared);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, shared) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(mut stream: UnixStream, shared: Arc<Shared>) -> Result<()> {
        loop {
            let Some(request) = read_frame::<_, Request>(&mut stream).await? else {
                debug!("client disconnected");
                return Ok(());
            };

            debug!(?request, "received request");

            if let Request::Subscribe = request {
                // Subscribe before confirming so no event is missed
                let event_rx = shared.event_tx.subscribe();
                write_frame(&mut stream, &Response::Subscribed).await?;
                debug!("client subscribed to notifications");
                return Self::push_events(stream, event_rx).await;
            }

            let response = Self::process_request(request, &shared).await;
            write_frame(&mut stream, &response).await?;
        }
    }

    /// Forward timer events to a subscribed client until either side closes
    async fn push_events(
        mut stream: UnixStream,
        mut event_rx: broadcast::Receiver<TimerEvent>,
    ) -> Result<()> {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    let note = Notification::Event { event };
                    if let Err(e) = write_frame(&mut stream, &note).await {
                        debug!(?e, "subscriber went away");
                        return Ok(());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            }
        }
    }

    /// Process a request and return a response
    async fn process_request(request: Request, shared: &Shared) -> Response {
        let action = match request {
            Request::Ping => return Response::Pong,
            Request::GetStatus => {
                let display = shared.display_rx.borrow().clone();
                return Response::Status(shared.status(display));
            }
            Request::Subscribe => return Response::Subscribed,
            Request::Start { form } => Action::Start(form),
            Request::UpdateSettings { form } => Action::UpdateSettings(form),
            Request::SetBreak { on_break } => Action::SetBreak(on_break),
            Request::SetAudioTime { time } => Action::SetAudioTime(time),
        };

        match shared.dispatch(action).await {
            Ok(Ok(display)) => Response::Status(shared.status(display)),
            Ok(Err(e)) => Response::Rejected {
                reason: e.to_string(),
            },
            Err(e) => {
                error!(?e, "timer driver unavailable");
                Response::Error {
                    code: "driver_unavailable".to_string(),
                    message: e.to_string(),
                }
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

impl Shared {
    fn status(&self, display: TimerDisplay) -> TimerStatus {
        TimerStatus {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            display,
        }
    }

    /// Hand an action to the driver and wait for its outcome
    async fn dispatch(&self, action: Action) -> Result<Result<TimerDisplay, HostError>> {
        let (reply, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command { action, reply })
            .await
            .context("timer driver stopped")?;
        reply_rx.await.context("timer driver dropped the request")
    }
}
