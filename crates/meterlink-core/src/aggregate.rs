//! ---
//! meterlink_section: "01-core-functionality"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Per-channel aggregates over the sliding window."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
use indexmap::IndexMap;
use meterlink_sim::{Channel, Reading};
use serde::Serialize;
use strum::IntoEnumIterator;

/// Arithmetic mean of `channel` over `readings`; `0.0` for an empty window.
pub fn average(readings: &[Reading], channel: Channel) -> f64 {
    if readings.is_empty() {
        return 0.0;
    }
    let sum: f64 = readings.iter().map(|r| r.value(channel)).sum();
    sum / readings.len() as f64
}

/// Means of every channel, recomputed from a window snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChannelAverages {
    values: IndexMap<Channel, f64>,
}

impl ChannelAverages {
    pub fn from_readings(readings: &[Reading]) -> Self {
        let values = Channel::iter()
            .map(|channel| (channel, average(readings, channel)))
            .collect();
        Self { values }
    }

    pub fn get(&self, channel: Channel) -> f64 {
        self.values.get(&channel).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, f64)> + '_ {
        self.values.iter().map(|(channel, value)| (*channel, *value))
    }
}
