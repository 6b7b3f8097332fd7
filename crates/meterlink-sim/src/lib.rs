//! ---
//! meterlink_section: "02-simulation"
//! meterlink_subsection: "01-bootstrap"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Simulation module exports and shared types."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
//! Metering reading model and the synthetic signal generator feeding the
//! emission loop.

pub mod generator;
pub mod reading;

pub use generator::{generate, NominalProfile, SignalGenerator, DEFAULT_JITTER_FACTOR};
pub use reading::{Channel, Reading};
