//! ---
//! meterlink_section: "03-logging"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Structured logging adapters for the emission loop."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
//! Logging macros that stamp every event with the emission context.

#[doc(hidden)]
#[macro_export]
macro_rules! __meter_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx: &$crate::LogContext<'_> = &$ctx;
        tracing::event!(
            $level,
            session = ctx.session.unwrap_or_default(),
            tick = ctx.tick.unwrap_or_default(),
            endpoint = ctx.endpoint.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with emission context.
#[macro_export]
macro_rules! meter_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__meter_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__meter_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with emission context.
#[macro_export]
macro_rules! meter_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__meter_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__meter_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with emission context.
#[macro_export]
macro_rules! meter_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__meter_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__meter_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with emission context.
#[macro_export]
macro_rules! meter_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__meter_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__meter_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
