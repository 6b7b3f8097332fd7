//! ---
//! meterlink_section: "01-core-functionality"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Shared primitives and utilities for the emitter runtime."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
//! Shared primitives for the Meterlink workspace.
//! This crate exposes configuration loading and tracing initialisation
//! consumed by the emitter library crates and the daemon.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, CollectorConfig, EmissionConfig, LoadedAppConfig, LoggingConfig, MetricsConfig,
    SessionConfig,
};
pub use logging::{init_tracing, LogFormat};
