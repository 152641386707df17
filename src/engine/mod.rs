//! Time accounting engine
//!
//! Provides an explicit state machine with three phases:
//! - Idle: work not started, no offsets exist
//! - Working: elapsed time accrues audio progress and break credit
//! - OnBreak: accrual frozen, break balance counts down in real time

mod machine;
mod settings;

pub use machine::{Engine, Phase};
pub use settings::Settings;
