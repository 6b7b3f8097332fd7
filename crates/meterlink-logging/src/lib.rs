//! ---
//! meterlink_section: "03-logging"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Structured logging adapters for the emission loop."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Context-carrying log helpers shared by the emitter crates.

use tracing::Level;

pub mod macros;

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Emission session number, incremented on every start.
    pub session: Option<u64>,
    /// Tick sequence number within the session.
    pub tick: Option<u64>,
    /// Collector endpoint the tick talks to.
    pub endpoint: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a session number.
    pub fn with_session(mut self, session: u64) -> Self {
        self.session = Some(session);
        self
    }

    /// Attach a tick value.
    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = Some(tick);
        self
    }

    /// Attach the collector endpoint.
    pub fn with_endpoint(mut self, endpoint: &'a str) -> Self {
        self.endpoint = Some(endpoint);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation completed but needs operator attention.
    Degraded,
    /// The operation failed or was aborted.
    Fault,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Degraded => "degraded",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized lifecycle event with an outcome.
pub fn log_system_event(
    context: Option<&LogContext<'_>>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let default = LogContext::default();
    let ctx = context.unwrap_or(&default);
    macro_rules! emit {
        ($level:expr) => {
            tracing::event!(
                $level,
                event,
                outcome = outcome.as_str(),
                session = ctx.session.unwrap_or_default(),
                tick = ctx.tick.unwrap_or_default(),
                endpoint = ctx.endpoint.unwrap_or(""),
                message = %message
            )
        };
    }
    match outcome {
        SystemEventOutcome::Success => emit!(Level::INFO),
        SystemEventOutcome::Degraded => emit!(Level::WARN),
        SystemEventOutcome::Fault => emit!(Level::ERROR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        let ctx = LogContext::new().with_session(3).with_tick(7);
        meter_info!(context = ctx.clone(), "reading accepted");
        meter_debug!("debug message");
        meter_warn!(context = ctx.clone(), "transport failure status {}", 502);
        meter_error!(context = ctx, "error code: {}", 42);
    }

    #[test]
    fn context_builder_sets_fields() {
        let ctx = LogContext::new()
            .with_session(2)
            .with_tick(9)
            .with_endpoint("http://collector/devices/data");
        assert_eq!(ctx.session, Some(2));
        assert_eq!(ctx.tick, Some(9));
        assert_eq!(ctx.endpoint, Some("http://collector/devices/data"));
    }

    #[test]
    fn system_event_helper_emits() {
        let ctx = LogContext::new().with_session(1);
        log_system_event(
            Some(&ctx),
            "emission.started",
            "emission session started",
            SystemEventOutcome::Success,
        );
        log_system_event(
            None,
            "emission.halted",
            "no session credential",
            SystemEventOutcome::Fault,
        );
    }
}
