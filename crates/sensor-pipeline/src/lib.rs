//! Sensor sampling pipeline for the BeeLight node
//!
//! Timer-driven producers (light and battery samplers) publish readings on
//! bounded channels; a single consumer mirrors them into Zigbee attributes.

pub mod battery;
pub mod bus;
pub mod driver;
pub mod error;
pub mod event;
pub mod light;
pub mod ticker;

pub use battery::{battery_level_pptt, BatterySampler, CurvePoint, DischargeCurve, SamplerState};
pub use bus::{reading_channel, ReadingInbox, ReadingPublisher};
pub use driver::{BatteryFrontEnd, LightSensor};
pub use error::{CurveError, DriverError, PublishError};
pub use event::{BatteryReading, Extrema, LightReading, TickEvent};
pub use light::LightSampler;
pub use ticker::Ticker;
