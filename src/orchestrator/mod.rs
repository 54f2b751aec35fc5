//! Application-level orchestration.
//!
//! This module owns the run lifecycle: it accepts submissions from
//! presentation layers, dispatches them across the engine process boundary,
//! and relays log and completion events back. UI/CLI layers call into this
//! module to keep responsibilities separated.

mod controller;

pub use controller::{run_controller, UiCommand};
