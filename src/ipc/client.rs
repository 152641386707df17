//! Client side of the daemon socket

use std::path::Path;

use anyhow::{bail, Context, Result};
use tokio::net::UnixStream;

use crate::events::TimerEvent;

use super::frame::{read_frame, write_frame};
use super::protocol::{Notification, Request, Response};

/// A request/response connection to the daemon
pub struct Client {
    stream: UnixStream,
}

impl Client {
    /// Connect to the daemon socket
    pub async fn connect(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path).await.with_context(|| {
            format!(
                "failed to connect to {} (is the daemon running?)",
                socket_path.display()
            )
        })?;
        Ok(Self { stream })
    }

    /// Send a request and wait for its response
    pub async fn request(&mut self, request: &Request) -> Result<Response> {
        write_frame(&mut self.stream, request).await?;
        read_frame(&mut self.stream)
            .await?
            .context("daemon closed the connection")
    }

    /// Turn this connection into an event subscription
    pub async fn subscribe(mut self) -> Result<Subscription> {
        match self.request(&Request::Subscribe).await? {
            Response::Subscribed => Ok(Subscription {
                stream: self.stream,
            }),
            other => bail!("unexpected response to subscribe: {other:?}"),
        }
    }
}

/// A connection receiving pushed timer events
pub struct Subscription {
    stream: UnixStream,
}

impl Subscription {
    /// Wait for the next event; `None` once the daemon hangs up
    pub async fn next(&mut self) -> Result<Option<TimerEvent>> {
        let note: Option<Notification> = read_frame(&mut self.stream).await?;
        Ok(note.map(|Notification::Event { event }| event))
    }
}
