//! Hardware collaborators of the samplers

use crate::error::DriverError;

/// Ambient light sensor driver
pub trait LightSensor {
    /// Device name used in logs
    fn name(&self) -> &str;

    /// Whether the device finished initialisation
    fn is_ready(&self) -> bool;

    /// Fetch one sample and return the integer part of the illuminance channel
    fn sample(&mut self) -> Result<i32, DriverError>;
}

/// Battery voltage front end: a sense-enable output gating a divider into
/// one ADC channel
pub trait BatteryFrontEnd {
    /// Drive the sense-enable output
    fn set_enable(&mut self, enabled: bool) -> Result<(), DriverError>;

    /// Perform one conversion and return the raw code
    fn read(&mut self) -> Result<i32, DriverError>;

    /// Convert a raw code to battery millivolts using the calibrated scale
    fn raw_to_millivolts(&self, raw: i32) -> i32;
}
