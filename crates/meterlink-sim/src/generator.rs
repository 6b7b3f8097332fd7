//! ---
//! meterlink_section: "02-simulation"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Jittered synthetic reading generator."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::reading::Reading;

/// Symmetric multiplicative jitter applied to every channel (±2%).
pub const DEFAULT_JITTER_FACTOR: f64 = 0.02;

/// Nominal operating point around which readings are jittered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NominalProfile {
    pub voltage: f64,
    pub current: f64,
    pub power_factor: f64,
    pub energy: f64,
    pub frequency: f64,
    pub unit_price: f64,
}

impl NominalProfile {
    /// Nominal power is derived rather than configured so the power triangle
    /// holds at the operating point.
    pub fn power(&self) -> f64 {
        self.voltage * self.current * self.power_factor
    }

    /// The nominal reading with zero jitter applied.
    pub fn reading(&self) -> Reading {
        Reading {
            active: true,
            voltage: self.voltage,
            current: self.current,
            power: self.power(),
            energy: self.energy,
            frequency: self.frequency,
            power_factor: self.power_factor,
            unit_price: self.unit_price,
        }
    }
}

impl Default for NominalProfile {
    fn default() -> Self {
        Self {
            voltage: 230.0,
            current: 10.0,
            power_factor: 0.95,
            energy: 100.0,
            frequency: 50.0,
            unit_price: 0.15,
        }
    }
}

/// Produces one reading per call with bounded uniform jitter around a
/// [`NominalProfile`].
///
/// Channels are jittered independently, so `power` only approximates
/// `voltage * current * power_factor`; the deviation stays within the
/// combined jitter tolerance.
#[derive(Debug, Clone)]
pub struct SignalGenerator<R = StdRng> {
    profile: NominalProfile,
    jitter_factor: f64,
    unit: Uniform<f64>,
    rng: R,
}

impl SignalGenerator<StdRng> {
    /// Generator seeded from OS entropy with the default profile.
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic generator for reproducible runs and tests.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> SignalGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            profile: NominalProfile::default(),
            jitter_factor: DEFAULT_JITTER_FACTOR,
            unit: Uniform::new_inclusive(-1.0, 1.0),
            rng,
        }
    }

    pub fn with_profile(mut self, profile: NominalProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Override the jitter factor. Values are clamped into `[0, 1)` so a
    /// jittered channel never changes sign.
    pub fn with_jitter_factor(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor.clamp(0.0, 0.999);
        self
    }

    pub fn profile(&self) -> &NominalProfile {
        &self.profile
    }

    pub fn jitter_factor(&self) -> f64 {
        self.jitter_factor
    }

    /// Draw the next reading. Never fails.
    pub fn generate(&mut self) -> Reading {
        let nominal = self.profile;
        Reading {
            active: true,
            voltage: self.jitter(nominal.voltage),
            current: self.jitter(nominal.current),
            power: self.jitter(nominal.power()),
            energy: self.jitter(nominal.energy),
            frequency: self.jitter(nominal.frequency),
            power_factor: self.jitter(nominal.power_factor),
            unit_price: self.jitter(nominal.unit_price),
        }
    }

    fn jitter(&mut self, value: f64) -> f64 {
        let u = self.unit.sample(&mut self.rng);
        value + value * self.jitter_factor * u
    }
}

/// One-shot reading from the thread-local RNG with default tuning.
pub fn generate() -> Reading {
    SignalGenerator::with_rng(rand::thread_rng()).generate()
}
