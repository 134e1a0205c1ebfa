//! Messages carried on the pipeline channels

use serde::Serialize;

/// Periodic timer notification, carries no data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickEvent;

/// Running illuminance range since start-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Extrema {
    pub min: u16,
    pub max: u16,
}

impl Extrema {
    /// Range containing a single value
    #[must_use]
    pub fn new(value: u16) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Widen the range to include `value`
    pub fn update(&mut self, value: u16) {
        if value > self.max {
            self.max = value;
        }
        if value < self.min {
            self.min = value;
        }
    }
}

/// Latest illuminance measurement in sensor-native units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LightReading {
    pub value: u16,
    /// Present only when the sampler tracks extrema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extrema: Option<Extrema>,
}

/// Battery voltage and the charge estimated from it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatteryReading {
    pub millivolts: i32,
    pub percent: i32,
}
