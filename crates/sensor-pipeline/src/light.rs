//! Tick-driven illuminance sampling

use crate::bus::ReadingPublisher;
use crate::driver::LightSensor;
use crate::error::{DriverError, PublishError};
use crate::event::{Extrema, LightReading, TickEvent};
use std::time::Duration;
use tokio::sync::broadcast;

/// Samples the light sensor once per tick
pub struct LightSampler<S> {
    sensor: S,
    track_extrema: bool,
    extrema: Option<Extrema>,
}

impl<S: LightSensor> LightSampler<S> {
    /// With `track_extrema` set, readings carry the running min/max
    #[must_use]
    pub fn new(sensor: S, track_extrema: bool) -> Self {
        Self {
            sensor,
            track_extrema,
            extrema: None,
        }
    }

    /// Range seen so far, if tracking
    #[must_use]
    pub fn extrema(&self) -> Option<Extrema> {
        self.extrema
    }

    /// Handle one tick. Returns the reading to publish, or `None` when the
    /// device is not ready or the sample failed.
    pub fn on_tick(&mut self) -> Option<LightReading> {
        let value = match self.measure() {
            Ok(value) => value,
            Err(e @ DriverError::NotReady(_)) => {
                tracing::error!("{}!", e);
                return None;
            }
            Err(e) => {
                tracing::error!("Sampling \"{}\" failed: {}", self.sensor.name(), e);
                return None;
            }
        };

        if self.track_extrema {
            match self.extrema.as_mut() {
                Some(range) => range.update(value),
                None => self.extrema = Some(Extrema::new(value)),
            }
        }

        Some(LightReading {
            value,
            extrema: self.extrema,
        })
    }

    /// One illuminance sample, saturated to the attribute range
    fn measure(&mut self) -> Result<u16, DriverError> {
        if !self.sensor.is_ready() {
            return Err(DriverError::NotReady(self.sensor.name().to_string()));
        }
        let raw = self.sensor.sample()?;
        Ok(u16::try_from(raw.clamp(0, i32::from(u16::MAX))).unwrap_or(u16::MAX))
    }

    /// Sample on every tick and publish with a bounded wait. Returns when
    /// the tick source or the consumer is gone.
    pub async fn run(
        mut self,
        mut ticks: broadcast::Receiver<TickEvent>,
        publisher: ReadingPublisher<LightReading>,
        publish_timeout: Duration,
    ) {
        loop {
            match ticks.recv().await {
                Ok(TickEvent) => {
                    let Some(reading) = self.on_tick() else {
                        continue;
                    };
                    match publisher.publish(reading, publish_timeout).await {
                        Ok(()) => tracing::debug!("Publish new value: {}", reading.value),
                        Err(e @ PublishError::Timeout { .. }) => {
                            tracing::warn!("Dropped light reading: {}", e);
                        }
                        Err(PublishError::Closed(_)) => {
                            tracing::info!("{} channel closed, stopping sampler", publisher.name());
                            break;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Light sampler lagged by {} ticks", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Tick channel closed, stopping light sampler");
                    break;
                }
            }
        }
    }
}
