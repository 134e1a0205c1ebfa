//! Error types for the sensor pipeline

use std::time::Duration;
use thiserror::Error;

/// Errors reported by sensor, ADC and GPIO drivers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Device did not finish initialisation
    #[error("Device \"{0}\" is not ready")]
    NotReady(String),

    /// Sample fetch or conversion returned an error code
    #[error("Read failed with code {0}")]
    ReadFailed(i32),

    /// Conversion produced a value outside the valid range
    #[error("Invalid measurement: {0}")]
    InvalidMeasurement(i32),

    /// GPIO could not be driven
    #[error("GPIO error: {0}")]
    Gpio(String),
}

/// Errors returned when publishing a reading
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// Consumer inbox stayed full for the whole timeout; the reading is dropped
    #[error("Publishing on {channel} timed out after {timeout:?}")]
    Timeout {
        channel: &'static str,
        timeout: Duration,
    },

    /// Consumer is gone
    #[error("Channel {0} is closed")]
    Closed(&'static str),
}

/// Invalid discharge curve definitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurveError {
    #[error("Discharge curve has no points")]
    Empty,

    #[error("Curve voltages must strictly descend (point {index})")]
    NotDescending { index: usize },

    #[error("Curve levels must not increase as voltage drops (point {index})")]
    LevelIncreasing { index: usize },

    #[error("Curve level {pptt} out of range 0..=10000 (point {index})")]
    LevelOutOfRange { index: usize, pptt: i32 },
}
