//! Daemon lifecycle management

mod shutdown;

pub use shutdown::ShutdownSignal;
