//! ---
//! meterlink_section: "02-simulation"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Reading model exchanged with the remote collector."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// One synthetic multi-channel metering sample.
///
/// Field names on the wire follow the collector contract (`isActive`, `PF`,
/// `electricPrice`); the descriptive names are accepted when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(rename = "isActive", alias = "active")]
    pub active: bool,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub energy: f64,
    pub frequency: f64,
    #[serde(rename = "PF", alias = "powerFactor")]
    pub power_factor: f64,
    #[serde(rename = "electricPrice", alias = "unitPrice")]
    pub unit_price: f64,
}

impl Reading {
    /// Value carried by the given numeric channel.
    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Voltage => self.voltage,
            Channel::Current => self.current,
            Channel::Power => self.power,
            Channel::Energy => self.energy,
            Channel::Frequency => self.frequency,
            Channel::PowerFactor => self.power_factor,
            Channel::UnitPrice => self.unit_price,
        }
    }

    /// Apparent power times power factor, i.e. what `power` should approximate.
    pub fn expected_power(&self) -> f64 {
        self.voltage * self.current * self.power_factor
    }
}

/// Numeric channels of a [`Reading`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Channel {
    Voltage,
    Current,
    Power,
    Energy,
    Frequency,
    PowerFactor,
    UnitPrice,
}

impl Channel {
    /// Channels the dashboard charts over the window, in display order.
    pub const CHARTED: [Channel; 3] = [Channel::Voltage, Channel::Power, Channel::Current];

    /// Engineering unit shown next to values of this channel.
    pub fn unit(&self) -> &'static str {
        match self {
            Channel::Voltage => "V",
            Channel::Current => "A",
            Channel::Power => "W",
            Channel::Energy => "kWh",
            Channel::Frequency => "Hz",
            Channel::PowerFactor => "",
            Channel::UnitPrice => "/kWh",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    fn sample() -> Reading {
        Reading {
            active: true,
            voltage: 231.0,
            current: 9.9,
            power: 2170.0,
            energy: 101.0,
            frequency: 50.1,
            power_factor: 0.95,
            unit_price: 0.15,
        }
    }

    #[test]
    fn serializes_with_collector_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["isActive"], json!(true));
        assert_eq!(value["PF"], json!(0.95));
        assert_eq!(value["electricPrice"], json!(0.15));
        assert!(value.get("power_factor").is_none());
    }

    #[test]
    fn accepts_descriptive_aliases() {
        let reading: Reading = serde_json::from_value(json!({
            "active": true,
            "voltage": 230.0,
            "current": 10.0,
            "power": 2185.0,
            "energy": 100.0,
            "frequency": 50.0,
            "powerFactor": 0.95,
            "unitPrice": 0.15
        }))
        .unwrap();
        assert!(reading.active);
        assert_eq!(reading.power_factor, 0.95);
        assert_eq!(reading.unit_price, 0.15);
    }

    #[test]
    fn value_maps_every_channel() {
        let reading = sample();
        let values: Vec<f64> = Channel::iter().map(|c| reading.value(c)).collect();
        assert_eq!(values, vec![231.0, 9.9, 2170.0, 101.0, 50.1, 0.95, 0.15]);
    }

    #[test]
    fn channel_names_round_trip_through_strings() {
        assert_eq!(Channel::PowerFactor.to_string(), "powerFactor");
        assert_eq!("unitPrice".parse::<Channel>().unwrap(), Channel::UnitPrice);
        assert!("watts".parse::<Channel>().is_err());
    }
}
