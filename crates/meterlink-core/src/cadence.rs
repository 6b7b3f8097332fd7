//! ---
//! meterlink_section: "01-core-functionality"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Fixed-period tick source for the emission loop."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Repeating timer whose first tick fires one full period after creation.
#[derive(Debug)]
pub struct Cadence {
    period: Duration,
    interval: Interval,
}

impl Cadence {
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { period, interval }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_period() {
        let started = Instant::now();
        let mut cadence = Cadence::new(Duration::from_millis(3000));
        let first = cadence.tick().await;
        assert_eq!(first - started, Duration::from_millis(3000));
        let second = cadence.tick().await;
        assert_eq!(second - first, cadence.period());
    }
}
