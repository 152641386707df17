//! Host adapter around the engine
//!
//! Reads user input, validates it, calls the engine, and renders the
//! results. The engine itself has no knowledge of clients or clocks.

mod display;
mod driver;
mod form;

pub use driver::{Action, Command, Driver};
pub use form::{HostError, SettingsForm};
