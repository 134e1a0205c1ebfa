//! Mirrors sensor readings into ZCL attributes

use sensor_pipeline::{BatteryReading, LightReading, ReadingInbox};
use zigbee_core::cluster::{
    id, illuminance_attrs, millivolts_to_decivolts, percent_to_half_percent, power_config_attrs,
};
use zigbee_core::{AttributePath, AttributeValue, DeviceContext, ZclAttributes, ZclError};

/// Sole writer of the node's attribute values.
///
/// Owns the [`DeviceContext`] and the stack's attribute interface; readings
/// are written straight through and the stack's reporting runs on its own.
pub struct AttributePublisher<Z> {
    ctx: DeviceContext,
    zcl: Z,
}

impl<Z: ZclAttributes> AttributePublisher<Z> {
    #[must_use]
    pub fn new(ctx: DeviceContext, zcl: Z) -> Self {
        Self { ctx, zcl }
    }

    /// Write the illuminance measured value
    pub fn on_light(&mut self, reading: LightReading) -> Result<(), ZclError> {
        tracing::debug!("Value from light sensor: {}", reading.value);

        let lux = &mut self.ctx.illuminance;
        lux.measured_value = reading.value;
        if let Some(range) = reading.extrema {
            lux.min_measured_value = range.min;
            lux.max_measured_value = range.max;
        }

        self.zcl.set_attribute(
            AttributePath::server(
                self.ctx.endpoint,
                id::ILLUMINANCE_MEASUREMENT,
                illuminance_attrs::MEASURED_VALUE,
            ),
            AttributeValue::Uint16(reading.value),
            false,
        )
    }

    /// Write the battery percentage remaining computed by the sampler
    pub fn on_battery(&mut self, reading: BatteryReading) -> Result<(), ZclError> {
        tracing::debug!(
            "Value from battery sensor: {} mV, {}%",
            reading.millivolts,
            reading.percent
        );

        let power = &mut self.ctx.power;
        power.voltage = millivolts_to_decivolts(reading.millivolts);
        power.percent_remaining = percent_to_half_percent(reading.percent);

        self.zcl.set_attribute(
            AttributePath::server(
                self.ctx.endpoint,
                id::POWER_CONFIG,
                power_config_attrs::BATTERY_PERCENTAGE_REMAINING,
            ),
            AttributeValue::Uint8(power.percent_remaining),
            false,
        )
    }

    /// Consume both reading channels until every producer is gone, then
    /// hand back the final attribute values
    pub async fn run(
        mut self,
        mut light: ReadingInbox<LightReading>,
        mut battery: ReadingInbox<BatteryReading>,
    ) -> DeviceContext {
        loop {
            tokio::select! {
                Some(reading) = light.recv() => {
                    if let Err(e) = self.on_light(reading) {
                        tracing::warn!("Failed to update illuminance: {}", e);
                    }
                }
                Some(reading) = battery.recv() => {
                    if let Err(e) = self.on_battery(reading) {
                        tracing::warn!("Failed to update battery percentage: {}", e);
                    }
                }
                else => break,
            }
        }

        tracing::info!(
            "{} and {} channels closed, attribute publisher stopped",
            light.name(),
            battery.name()
        );
        self.ctx
    }
}
