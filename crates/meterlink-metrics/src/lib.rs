//! ---
//! meterlink_section: "03-logging"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Metrics collection and export utilities."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, StatusCode};
use axum::routing::get;
use axum::{response::IntoResponse, Router};
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Shared registry type used across the workspace.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Spawn an HTTP server that exposes the registry at `/metrics`.
pub async fn spawn_http_server(registry: SharedRegistry, addr: SocketAddr) -> Result<MetricsServer> {
    let app = Router::new().route(
        "/metrics",
        get({
            let registry = registry.clone();
            move || metrics_handler(registry.clone())
        }),
    );

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind metrics listener {}", addr))?;
    let local_addr = listener
        .local_addr()
        .context("failed to read metrics listener address")?;

    info!(address = %local_addr, "metrics server starting");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let service = app.into_make_service();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .context("metrics server encountered an error")?;
        Ok(())
    });

    Ok(MetricsServer {
        addr: local_addr,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

async fn metrics_handler(registry: SharedRegistry) -> impl IntoResponse {
    let families = registry.gather();
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&families) {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(prometheus::TEXT_FORMAT),
            )],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("metrics encoding error"),
            )
                .into_response()
        }
    }
}

/// Handle to the running HTTP exporter.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl MetricsServer {
    /// Return the bound address for convenience.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and await task completion.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(join_err) => Err(anyhow::Error::new(join_err)),
        }
    }
}

/// Outcome label attached to `meterlink_submissions_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted,
    TransportError,
    AuthRejected,
    NoSession,
    Discarded,
}

impl SubmissionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionOutcome::Accepted => "accepted",
            SubmissionOutcome::TransportError => "transport_error",
            SubmissionOutcome::AuthRejected => "auth_rejected",
            SubmissionOutcome::NoSession => "no_session",
            SubmissionOutcome::Discarded => "discarded",
        }
    }
}

/// Metrics recorded by the emission scheduler.
#[derive(Clone, Debug)]
pub struct EmitterMetrics {
    registry: SharedRegistry,
    ticks_total: IntCounter,
    ticks_skipped: IntCounter,
    submissions: IntCounterVec,
    window_len: IntGauge,
    running: IntGauge,
    submit_seconds: Histogram,
}

impl EmitterMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let ticks_total = IntCounter::with_opts(Opts::new(
            "meterlink_ticks_total",
            "Cadence ticks fired while an emission session was running",
        ))?;
        registry.register(Box::new(ticks_total.clone()))?;

        let ticks_skipped = IntCounter::with_opts(Opts::new(
            "meterlink_ticks_skipped_total",
            "Ticks skipped because a submission was still in flight",
        ))?;
        registry.register(Box::new(ticks_skipped.clone()))?;

        let submissions = IntCounterVec::new(
            Opts::new(
                "meterlink_submissions_total",
                "Tick outcomes by result of the submission attempt",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(submissions.clone()))?;

        let window_len = IntGauge::with_opts(Opts::new(
            "meterlink_window_length",
            "Readings currently held in the sliding window",
        ))?;
        registry.register(Box::new(window_len.clone()))?;

        let running = IntGauge::with_opts(Opts::new(
            "meterlink_emission_running",
            "Indicator (0/1) whether an emission session is running",
        ))?;
        registry.register(Box::new(running.clone()))?;

        let buckets = prometheus::exponential_buckets(0.005, 2.0, 12)
            .context("failed to construct histogram buckets")?;
        let submit_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "meterlink_submit_seconds",
                "Round-trip time of collector submissions",
            )
            .buckets(buckets),
        )?;
        registry.register(Box::new(submit_seconds.clone()))?;

        Ok(Self {
            registry,
            ticks_total,
            ticks_skipped,
            submissions,
            window_len,
            running,
            submit_seconds,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn record_tick(&self) {
        self.ticks_total.inc();
    }

    pub fn record_skipped_tick(&self) {
        self.ticks_skipped.inc();
    }

    pub fn record_outcome(&self, outcome: SubmissionOutcome) {
        self.submissions.with_label_values(&[outcome.as_str()]).inc();
    }

    pub fn observe_submit(&self, elapsed: Duration) {
        self.submit_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn set_window_len(&self, len: usize) {
        self.window_len.set(len as i64);
    }

    pub fn set_running(&self, running: bool) {
        self.running.set(i64::from(running));
    }
}

pub use prometheus;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emitter_metrics_register_and_record() {
        let registry = new_registry();
        let metrics = EmitterMetrics::new(registry.clone()).unwrap();
        metrics.record_tick();
        metrics.record_tick();
        metrics.record_skipped_tick();
        metrics.record_outcome(SubmissionOutcome::Accepted);
        metrics.record_outcome(SubmissionOutcome::TransportError);
        metrics.set_window_len(4);
        metrics.set_running(true);
        metrics.observe_submit(Duration::from_millis(12));

        let body = TextEncoder::new()
            .encode_to_string(&registry.gather())
            .unwrap();
        assert!(body.contains("meterlink_ticks_total 2"));
        assert!(body.contains("meterlink_ticks_skipped_total 1"));
        assert!(body.contains("meterlink_submissions_total{outcome=\"accepted\"} 1"));
        assert!(body.contains("meterlink_window_length 4"));
        assert!(body.contains("meterlink_emission_running 1"));
    }

    #[test]
    fn double_registration_is_rejected() {
        let registry = new_registry();
        EmitterMetrics::new(registry.clone()).unwrap();
        assert!(EmitterMetrics::new(registry).is_err());
    }

    #[tokio::test]
    async fn exporter_serves_registry() {
        let registry = new_registry();
        let metrics = EmitterMetrics::new(registry.clone()).unwrap();
        metrics.record_tick();

        let server = spawn_http_server(registry, "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let body = reqwest::get(format!("http://{}/metrics", server.addr()))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("meterlink_ticks_total 1"));
        server.shutdown().await.unwrap();
    }
}
