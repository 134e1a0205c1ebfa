//! Application-side attribute storage of the light sensor
//!
//! [`DeviceContext`] mirrors every attribute value the node exposes. It is a
//! plain owned value: whoever holds it is the only writer of the mirrored
//! attributes.

use crate::attribute::{AttributePath, AttributeValue};
use crate::cluster::{
    basic_attrs, id, identify_attrs, illuminance_attrs, power_config_attrs, BatterySize,
    ZCL_VERSION,
};
use serde::{Deserialize, Serialize};

/// Maximum length of the manufacturer name and model id strings
pub const MAX_NAME_LEN: usize = 32;
/// Maximum length of the date code string
pub const MAX_DATE_CODE_LEN: usize = 16;
/// Maximum length of the location description
pub const MAX_LOCATION_LEN: usize = 16;
/// Maximum length of the software build id
pub const MAX_SW_BUILD_ID_LEN: usize = 16;

/// Static identity of the device, as configured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicInfo {
    pub manufacturer: String,
    pub model_id: String,
    /// ISO 8601 date (YYYYMMDD) followed by optional manufacturer data
    pub date_code: String,
    pub location: String,
    pub app_version: u8,
    pub stack_version: u8,
    pub hw_version: u8,
    pub sw_build_id: String,
}

impl Default for BasicInfo {
    fn default() -> Self {
        Self {
            manufacturer: "Kampi".to_string(),
            model_id: "BeeLight_v1.0".to_string(),
            date_code: "20200329".to_string(),
            location: "Office desk".to_string(),
            app_version: 1,
            stack_version: 10,
            hw_version: 1,
            sw_build_id: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Basic cluster attribute values
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BasicAttributes {
    pub zcl_version: u8,
    pub app_version: u8,
    pub stack_version: u8,
    pub hw_version: u8,
    pub manufacturer_name: String,
    pub model_identifier: String,
    pub date_code: String,
    pub power_source: u8,
    pub location_description: String,
    pub physical_environment: u8,
    pub sw_build_id: String,
}

/// Identify cluster attribute values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdentifyAttributes {
    pub identify_time: u16,
}

/// Power Configuration cluster attribute values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PowerAttributes {
    /// Units of 100 mV
    pub voltage: u8,
    pub size: BatterySize,
    pub quantity: u8,
    /// Units of 100 mV
    pub rated_voltage: u8,
    pub alarm_mask: u8,
    pub voltage_min_threshold: u8,
    /// Units of 0.5 %, 200 is 100 %
    pub percent_remaining: u8,
    pub alarm_state: u32,
}

/// Illuminance Measurement cluster attribute values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IlluminanceAttributes {
    pub measured_value: u16,
    pub min_measured_value: u16,
    pub max_measured_value: u16,
}

/// All attribute values of the light sensor endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceContext {
    pub endpoint: u8,
    pub basic: BasicAttributes,
    pub identify: IdentifyAttributes,
    pub power: PowerAttributes,
    pub illuminance: IlluminanceAttributes,
}

impl DeviceContext {
    /// Initial attribute values for a CR2 battery powered light sensor
    #[must_use]
    pub fn new(endpoint: u8, info: &BasicInfo) -> Self {
        Self {
            endpoint,
            basic: BasicAttributes {
                zcl_version: ZCL_VERSION,
                app_version: info.app_version,
                stack_version: info.stack_version,
                hw_version: info.hw_version,
                manufacturer_name: truncate(&info.manufacturer, MAX_NAME_LEN),
                model_identifier: truncate(&info.model_id, MAX_NAME_LEN),
                date_code: truncate(&info.date_code, MAX_DATE_CODE_LEN),
                power_source: basic_attrs::POWER_SOURCE_BATTERY,
                location_description: truncate(&info.location, MAX_LOCATION_LEN),
                physical_environment: basic_attrs::ENV_UNSPECIFIED,
                sw_build_id: truncate(&info.sw_build_id, MAX_SW_BUILD_ID_LEN),
            },
            identify: IdentifyAttributes {
                identify_time: identify_attrs::IDENTIFY_TIME_DEFAULT,
            },
            power: PowerAttributes {
                voltage: 30,
                size: BatterySize::Cr2,
                quantity: 1,
                rated_voltage: 30,
                alarm_mask: 0,
                voltage_min_threshold: 0,
                percent_remaining: power_config_attrs::PERCENTAGE_UNKNOWN,
                alarm_state: 0,
            },
            illuminance: IlluminanceAttributes {
                measured_value: illuminance_attrs::MEASURED_VALUE_INVALID,
                min_measured_value: illuminance_attrs::MEASURED_VALUE_INVALID,
                max_measured_value: illuminance_attrs::MEASURED_VALUE_INVALID,
            },
        }
    }

    /// Every attribute value with its path, used to seed the stack's
    /// attribute memory at start-up
    #[must_use]
    pub fn attributes(&self) -> Vec<(AttributePath, AttributeValue)> {
        let ep = self.endpoint;
        let basic = |attr| AttributePath::server(ep, id::BASIC, attr);
        let power = |attr| AttributePath::server(ep, id::POWER_CONFIG, attr);
        let lux = |attr| AttributePath::server(ep, id::ILLUMINANCE_MEASUREMENT, attr);

        vec![
            (basic(basic_attrs::ZCL_VERSION), AttributeValue::Uint8(self.basic.zcl_version)),
            (
                basic(basic_attrs::APPLICATION_VERSION),
                AttributeValue::Uint8(self.basic.app_version),
            ),
            (basic(basic_attrs::STACK_VERSION), AttributeValue::Uint8(self.basic.stack_version)),
            (basic(basic_attrs::HW_VERSION), AttributeValue::Uint8(self.basic.hw_version)),
            (
                basic(basic_attrs::MANUFACTURER_NAME),
                AttributeValue::String(self.basic.manufacturer_name.clone()),
            ),
            (
                basic(basic_attrs::MODEL_IDENTIFIER),
                AttributeValue::String(self.basic.model_identifier.clone()),
            ),
            (basic(basic_attrs::DATE_CODE), AttributeValue::String(self.basic.date_code.clone())),
            (basic(basic_attrs::POWER_SOURCE), AttributeValue::Enum8(self.basic.power_source)),
            (
                basic(basic_attrs::LOCATION_DESCRIPTION),
                AttributeValue::String(self.basic.location_description.clone()),
            ),
            (
                basic(basic_attrs::PHYSICAL_ENVIRONMENT),
                AttributeValue::Enum8(self.basic.physical_environment),
            ),
            (
                basic(basic_attrs::SW_BUILD_ID),
                AttributeValue::String(self.basic.sw_build_id.clone()),
            ),
            (
                AttributePath::server(ep, id::IDENTIFY, identify_attrs::IDENTIFY_TIME),
                AttributeValue::Uint16(self.identify.identify_time),
            ),
            (power(power_config_attrs::BATTERY_VOLTAGE), AttributeValue::Uint8(self.power.voltage)),
            (
                power(power_config_attrs::BATTERY_PERCENTAGE_REMAINING),
                AttributeValue::Uint8(self.power.percent_remaining),
            ),
            (power(power_config_attrs::BATTERY_SIZE), AttributeValue::Enum8(self.power.size as u8)),
            (
                power(power_config_attrs::BATTERY_QUANTITY),
                AttributeValue::Uint8(self.power.quantity),
            ),
            (
                power(power_config_attrs::BATTERY_RATED_VOLTAGE),
                AttributeValue::Uint8(self.power.rated_voltage),
            ),
            (
                power(power_config_attrs::BATTERY_ALARM_MASK),
                AttributeValue::Bitmap8(self.power.alarm_mask),
            ),
            (
                power(power_config_attrs::BATTERY_VOLTAGE_MIN_THRESHOLD),
                AttributeValue::Uint8(self.power.voltage_min_threshold),
            ),
            (
                power(power_config_attrs::BATTERY_ALARM_STATE),
                AttributeValue::Bitmap32(self.power.alarm_state),
            ),
            (
                lux(illuminance_attrs::MEASURED_VALUE),
                AttributeValue::Uint16(self.illuminance.measured_value),
            ),
            (
                lux(illuminance_attrs::MIN_MEASURED_VALUE),
                AttributeValue::Uint16(self.illuminance.min_measured_value),
            ),
            (
                lux(illuminance_attrs::MAX_MEASURED_VALUE),
                AttributeValue::Uint16(self.illuminance.max_measured_value),
            ),
        ]
    }
}

/// Cut a string to at most `max` bytes on a char boundary
fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{EndpointDescriptor, LIGHT_SENSOR_ENDPOINT};

    #[test]
    fn test_default_identity() {
        let ctx = DeviceContext::new(LIGHT_SENSOR_ENDPOINT, &BasicInfo::default());
        assert_eq!(ctx.basic.manufacturer_name, "Kampi");
        assert_eq!(ctx.basic.model_identifier, "BeeLight_v1.0");
        assert_eq!(ctx.basic.power_source, basic_attrs::POWER_SOURCE_BATTERY);
        assert_eq!(ctx.power.size, BatterySize::Cr2);
        assert_eq!(ctx.power.percent_remaining, power_config_attrs::PERCENTAGE_UNKNOWN);
    }

    #[test]
    fn test_long_strings_truncated() {
        let info = BasicInfo {
            location: "A very long location description".to_string(),
            ..BasicInfo::default()
        };
        let ctx = DeviceContext::new(1, &info);
        assert_eq!(ctx.basic.location_description.len(), MAX_LOCATION_LEN);
    }

    #[test]
    fn test_sw_build_id_limit() {
        let info = BasicInfo {
            sw_build_id: "0.1.0-beelight+20200329.abcdef".to_string(),
            date_code: "20200329-rev-b-beelight".to_string(),
            ..BasicInfo::default()
        };
        let ctx = DeviceContext::new(1, &info);
        assert_eq!(ctx.basic.sw_build_id, "0.1.0-beelight+2");
        assert_eq!(ctx.basic.sw_build_id.len(), MAX_SW_BUILD_ID_LEN);
        assert_eq!(ctx.basic.date_code.len(), MAX_DATE_CODE_LEN);
    }

    #[test]
    fn test_attributes_match_descriptor() {
        let ctx = DeviceContext::new(LIGHT_SENSOR_ENDPOINT, &BasicInfo::default());
        let ep = EndpointDescriptor::light_sensor(LIGHT_SENSOR_ENDPOINT);
        for (path, value) in ctx.attributes() {
            let cluster = ep.cluster(path.cluster_id, path.role).unwrap();
            let attr = cluster.find(path.attribute_id).unwrap();
            assert_eq!(attr.data_type, value.data_type(), "{path:?}");
        }
    }
}
