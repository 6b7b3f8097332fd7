//! ---
//! meterlink_section: "01-core-functionality"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Emission scheduler driving generate, submit and window updates."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
//! The emission loop.
//!
//! A running session owns a [`Cadence`] timer task. Every tick checks the
//! single in-flight slot; when it is free the tick spawns one attempt that
//! resolves the credential, generates a reading, submits it and folds the
//! accepted reading into the [`SlidingWindow`]. Ticks that find the slot
//! occupied are skipped and counted.
//!
//! Sessions are numbered. An attempt re-checks its session right before
//! submitting and sends nothing once it has ended; a result that arrives after
//! its session ended is discarded without touching the window.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use meterlink_common::EmissionConfig;
use meterlink_logging::{
    log_system_event, meter_debug, meter_info, meter_warn, LogContext, SystemEventOutcome,
};
use meterlink_metrics::{EmitterMetrics, SubmissionOutcome};
use meterlink_net::SubmissionClient;
use meterlink_sim::{Reading, SignalGenerator, DEFAULT_JITTER_FACTOR};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::aggregate::ChannelAverages;
use crate::cadence::Cadence;
use crate::error::EmissionError;
use crate::presenter::{Presenter, WindowUpdate};
use crate::session::SessionGate;
use crate::window::{SlidingWindow, DEFAULT_CAPACITY};

const DEFAULT_CADENCE: Duration = Duration::from_millis(3000);

/// Tuning for one scheduler instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionSettings {
    pub cadence: Duration,
    pub window_capacity: usize,
    pub jitter_factor: f64,
    pub random_seed: Option<u64>,
}

impl Default for EmissionSettings {
    fn default() -> Self {
        Self {
            cadence: DEFAULT_CADENCE,
            window_capacity: DEFAULT_CAPACITY,
            jitter_factor: DEFAULT_JITTER_FACTOR,
            random_seed: None,
        }
    }
}

impl EmissionSettings {
    pub fn from_config(config: &EmissionConfig) -> Self {
        Self {
            cadence: config.cadence,
            window_capacity: config.window_capacity,
            jitter_factor: config.jitter_factor,
            random_seed: config.random_seed,
        }
    }

    fn generator(&self) -> SignalGenerator {
        let generator = match self.random_seed {
            Some(seed) => SignalGenerator::seeded(seed),
            None => SignalGenerator::from_entropy(),
        };
        generator.with_jitter_factor(self.jitter_factor)
    }
}

/// Counters accumulated over the scheduler's lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Cadence ticks fired while running.
    pub ticks: u64,
    /// Ticks skipped because a submission was still in flight.
    pub skipped: u64,
    /// Readings accepted into the window.
    pub accepted: u64,
    /// Attempts that ended in a notification.
    pub failed: u64,
    /// Results that arrived after their session ended.
    pub discarded: u64,
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    skipped: AtomicU64,
    accepted: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
struct ActiveSession {
    id: u64,
    started_at: Instant,
    timer: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct Control {
    last_session: u64,
    active: Option<ActiveSession>,
}

impl Control {
    fn is_current(&self, session: u64) -> bool {
        self.active.as_ref().map(|active| active.id) == Some(session)
    }
}

struct Shared {
    settings: EmissionSettings,
    gate: SessionGate,
    client: Arc<dyn SubmissionClient>,
    generator: Mutex<SignalGenerator>,
    window: SlidingWindow,
    presenter: Arc<dyn Presenter>,
    metrics: Option<EmitterMetrics>,
    control: Mutex<Control>,
    in_flight: AtomicBool,
    counters: Counters,
}

/// Releases the in-flight slot when the attempt finishes, whichever way it ends.
struct InFlightSlot<'a>(&'a AtomicBool);

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives periodic emission for one device. Idle until [`start`](Self::start).
pub struct EmissionScheduler {
    shared: Arc<Shared>,
}

impl EmissionScheduler {
    pub fn new(
        settings: EmissionSettings,
        gate: SessionGate,
        client: Arc<dyn SubmissionClient>,
        presenter: Arc<dyn Presenter>,
        metrics: Option<EmitterMetrics>,
    ) -> Self {
        let generator = Mutex::new(settings.generator());
        let window = SlidingWindow::new(settings.window_capacity);
        Self {
            shared: Arc::new(Shared {
                settings,
                gate,
                client,
                generator,
                window,
                presenter,
                metrics,
                control: Mutex::new(Control::default()),
                in_flight: AtomicBool::new(false),
                counters: Counters::default(),
            }),
        }
    }

    /// Begin a new session: clear the window and arm the cadence timer.
    ///
    /// Returns `false` without side effects when a session is already
    /// running. Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let shared = &self.shared;
        let session = {
            let mut control = shared.control.lock();
            if control.active.is_some() {
                meter_debug!("start ignored; emission already running");
                return false;
            }
            control.last_session += 1;
            let id = control.last_session;
            shared.window.clear();
            let timer = tokio::spawn(run_cadence(shared.clone(), id));
            control.active = Some(ActiveSession {
                id,
                started_at: Instant::now(),
                timer,
            });
            id
        };

        if let Some(metrics) = &shared.metrics {
            metrics.set_running(true);
            metrics.set_window_len(0);
        }
        let ctx = LogContext::new()
            .with_session(session)
            .with_endpoint(shared.client.endpoint());
        log_system_event(
            Some(&ctx),
            "emission.start",
            &format!("emitting every {:?}", shared.settings.cadence),
            SystemEventOutcome::Success,
        );
        shared.presenter.session_started(session);
        true
    }

    /// Cancel the timer and clear the window. Safe to call when idle.
    ///
    /// An attempt already in flight is left to finish; its result is
    /// discarded. Returns whether a running session was stopped.
    pub fn stop(&self) -> bool {
        let shared = &self.shared;
        let stopped = {
            let mut control = shared.control.lock();
            shared.window.clear();
            control.active.take()
        };
        if let Some(metrics) = &shared.metrics {
            metrics.set_window_len(0);
        }

        let Some(session) = stopped else {
            return false;
        };
        session.timer.abort();
        if let Some(metrics) = &shared.metrics {
            metrics.set_running(false);
        }
        let ctx = LogContext::new().with_session(session.id);
        log_system_event(
            Some(&ctx),
            "emission.stop",
            &format!("stopped after {:?}", session.started_at.elapsed()),
            SystemEventOutcome::Success,
        );
        shared.presenter.session_stopped(session.id);
        true
    }

    pub fn is_running(&self) -> bool {
        self.shared.control.lock().active.is_some()
    }

    /// Identifier of the running session, if any.
    pub fn current_session(&self) -> Option<u64> {
        self.shared.control.lock().active.as_ref().map(|s| s.id)
    }

    pub fn window_snapshot(&self) -> Vec<Reading> {
        self.shared.window.snapshot()
    }

    pub fn averages(&self) -> ChannelAverages {
        ChannelAverages::from_readings(&self.shared.window.snapshot())
    }

    pub fn settings(&self) -> &EmissionSettings {
        &self.shared.settings
    }

    pub fn stats(&self) -> SchedulerStats {
        self.shared.counters.snapshot()
    }
}

impl Drop for EmissionScheduler {
    fn drop(&mut self) {
        if let Some(session) = self.shared.control.lock().active.take() {
            session.timer.abort();
        }
    }
}

impl std::fmt::Debug for EmissionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmissionScheduler")
            .field("settings", &self.shared.settings)
            .field("session", &self.current_session())
            .field("window", &self.shared.window.len())
            .field("stats", &self.stats())
            .finish()
    }
}

async fn run_cadence(shared: Arc<Shared>, session: u64) {
    let mut cadence = Cadence::new(shared.settings.cadence);
    let mut tick = 0u64;
    loop {
        cadence.tick().await;
        if !shared.control.lock().is_current(session) {
            break;
        }
        tick += 1;
        Counters::bump(&shared.counters.ticks);
        if let Some(metrics) = &shared.metrics {
            metrics.record_tick();
        }

        if shared
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            Counters::bump(&shared.counters.skipped);
            if let Some(metrics) = &shared.metrics {
                metrics.record_skipped_tick();
            }
            let ctx = LogContext::new().with_session(session).with_tick(tick);
            meter_debug!(context = ctx, "tick skipped; previous submission still in flight");
            continue;
        }
        tokio::spawn(run_attempt(shared.clone(), session, tick));
    }
}

async fn run_attempt(shared: Arc<Shared>, session: u64, tick: u64) {
    let _slot = InFlightSlot(&shared.in_flight);
    let ctx = LogContext::new()
        .with_session(session)
        .with_tick(tick)
        .with_endpoint(shared.client.endpoint());

    let credential = match shared.gate.require() {
        Ok(credential) => credential,
        Err(err) => {
            shared.fail(session, err.into(), &ctx);
            return;
        }
    };

    if !shared.control.lock().is_current(session) {
        meter_debug!(context = ctx, "session ended before submission; nothing sent");
        return;
    }

    let reading = shared.generator.lock().generate();
    let started = Instant::now();
    let result = shared.client.submit(&credential, &reading).await;
    if let Some(metrics) = &shared.metrics {
        metrics.observe_submit(started.elapsed());
    }

    match result {
        Ok(accepted) => shared.accept(session, accepted, &ctx),
        Err(err) => shared.fail(session, err.into(), &ctx),
    }
}

impl Shared {
    fn discard(&self, ctx: &LogContext<'_>) {
        Counters::bump(&self.counters.discarded);
        if let Some(metrics) = &self.metrics {
            metrics.record_outcome(SubmissionOutcome::Discarded);
        }
        meter_debug!(context = *ctx, "result arrived after its session ended; discarded");
    }

    fn accept(&self, session: u64, reading: Reading, ctx: &LogContext<'_>) {
        let readings = {
            let control = self.control.lock();
            if !control.is_current(session) {
                drop(control);
                self.discard(ctx);
                return;
            }
            self.window.append(reading);
            self.window.snapshot()
        };

        Counters::bump(&self.counters.accepted);
        if let Some(metrics) = &self.metrics {
            metrics.record_outcome(SubmissionOutcome::Accepted);
            metrics.set_window_len(readings.len());
        }
        meter_debug!(
            context = *ctx,
            "reading accepted; window holds {}",
            readings.len()
        );

        let averages = ChannelAverages::from_readings(&readings);
        self.presenter.publish(WindowUpdate {
            session,
            published_at: Utc::now(),
            readings,
            averages,
        });
    }

    fn fail(&self, session: u64, err: EmissionError, ctx: &LogContext<'_>) {
        let halted = {
            let mut control = self.control.lock();
            if !control.is_current(session) {
                drop(control);
                self.discard(ctx);
                return;
            }
            if err.is_session_ending() {
                control.active.take()
            } else {
                None
            }
        };

        Counters::bump(&self.counters.failed);
        if let Some(metrics) = &self.metrics {
            metrics.record_outcome(err.outcome());
        }

        match &halted {
            Some(active) => {
                active.timer.abort();
                if let Some(metrics) = &self.metrics {
                    metrics.set_running(false);
                }
                log_system_event(
                    Some(ctx),
                    "emission.halt",
                    &err.to_string(),
                    SystemEventOutcome::Degraded,
                );
            }
            None => meter_warn!(context = *ctx, "{}", err),
        }

        self.presenter.notify(err.to_notification());
        if matches!(err, EmissionError::AuthRejected { .. }) {
            self.presenter.session_expired();
        }
        if let Some(active) = halted {
            meter_info!(context = *ctx, "emission halted; window kept for display");
            self.presenter.session_stopped(active.id);
        }
    }
}
