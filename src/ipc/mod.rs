//! IPC module for daemon-client communication

mod client;
mod frame;
mod protocol;
mod server;

pub use client::{Client, Subscription};
pub use protocol::{Mode, Request, Response, TimerDisplay};
pub use server::Server;
