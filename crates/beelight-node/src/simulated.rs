//! Simulated drivers for running the node on a host

use crate::config::SimulationConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sensor_pipeline::{BatteryFrontEnd, DriverError, LightSensor};
use std::cell::Cell;

/// ADC reference span in millivolts
const ADC_FULL_SCALE_MV: i32 = 3600;

/// ADC resolution in bits
const ADC_RESOLUTION_BITS: u32 = 12;

/// Error code returned by a failed conversion
const ADC_EIO: i32 = -5;

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Ambient light sensor with a slow sinusoidal swing plus noise
pub struct SimulatedLightSensor {
    rng: StdRng,
    base_lux: i32,
    amplitude: i32,
    period: u32,
    noise: i32,
    not_ready_every: u32,
    checks: Cell<u32>,
    samples: u32,
}

impl SimulatedLightSensor {
    #[must_use]
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            rng: rng(config.seed),
            base_lux: config.base_lux,
            amplitude: config.lux_amplitude,
            period: config.lux_period_samples.max(1),
            noise: config.lux_noise.abs(),
            not_ready_every: config.not_ready_every,
            checks: Cell::new(0),
            samples: 0,
        }
    }
}

impl LightSensor for SimulatedLightSensor {
    fn name(&self) -> &str {
        "sim-apds9306"
    }

    fn is_ready(&self) -> bool {
        let check = self.checks.get().wrapping_add(1);
        self.checks.set(check);
        self.not_ready_every == 0 || check % self.not_ready_every != 0
    }

    fn sample(&mut self) -> Result<i32, DriverError> {
        let phase = f64::from(self.samples % self.period) / f64::from(self.period);
        self.samples = self.samples.wrapping_add(1);

        let swing = f64::from(self.amplitude) * (phase * std::f64::consts::TAU).sin();
        let noise = if self.noise > 0 {
            self.rng.gen_range(-self.noise..=self.noise)
        } else {
            0
        };
        // swing is bounded by amplitude, so the cast cannot overflow
        #[allow(clippy::cast_possible_truncation)]
        let lux = self.base_lux + swing.round() as i32 + noise;
        Ok(lux.max(0))
    }
}

/// Battery behind a sense-enabled divider on a 12-bit ADC, discharging
/// linearly with occasional conversion failures
pub struct SimulatedBattery {
    rng: StdRng,
    millivolts: f64,
    drain_mv: f64,
    failure_rate: f64,
    enabled: bool,
}

impl SimulatedBattery {
    #[must_use]
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            rng: rng(config.seed.map(|s| s.wrapping_add(1))),
            millivolts: f64::from(config.battery_start_mv),
            drain_mv: config.battery_drain_mv,
            failure_rate: config.adc_failure_rate.clamp(0.0, 1.0),
            enabled: false,
        }
    }
}

impl BatteryFrontEnd for SimulatedBattery {
    fn set_enable(&mut self, enabled: bool) -> Result<(), DriverError> {
        self.enabled = enabled;
        Ok(())
    }

    fn read(&mut self) -> Result<i32, DriverError> {
        if !self.enabled {
            return Err(DriverError::Gpio("battery sense is disabled".to_string()));
        }
        if self.rng.gen_bool(self.failure_rate) {
            return Err(DriverError::ReadFailed(ADC_EIO));
        }

        let max_code = (1 << ADC_RESOLUTION_BITS) - 1;
        // bounded by max_code before the cast
        #[allow(clippy::cast_possible_truncation)]
        let raw = (self.millivolts * f64::from(1 << ADC_RESOLUTION_BITS)
            / f64::from(ADC_FULL_SCALE_MV))
        .clamp(0.0, f64::from(max_code)) as i32;

        self.millivolts = (self.millivolts - self.drain_mv).max(0.0);
        Ok(raw)
    }

    fn raw_to_millivolts(&self, raw: i32) -> i32 {
        raw * ADC_FULL_SCALE_MV >> ADC_RESOLUTION_BITS
    }
}
