//! ZCL (Zigbee Cluster Library) definitions used by the light sensor

/// Home Automation profile id
pub const HA_PROFILE_ID: u16 = 0x0104;

/// ZCL revision reported in the Basic cluster
pub const ZCL_VERSION: u8 = 0x03;

/// Cluster IDs exposed by the node
pub mod id {
    // General Clusters
    pub const BASIC: u16 = 0x0000;
    pub const POWER_CONFIG: u16 = 0x0001;
    pub const IDENTIFY: u16 = 0x0003;

    // Measurement Clusters
    pub const ILLUMINANCE_MEASUREMENT: u16 = 0x0400;
}

/// Basic cluster attributes
pub mod basic_attrs {
    pub const ZCL_VERSION: u16 = 0x0000;
    pub const APPLICATION_VERSION: u16 = 0x0001;
    pub const STACK_VERSION: u16 = 0x0002;
    pub const HW_VERSION: u16 = 0x0003;
    pub const MANUFACTURER_NAME: u16 = 0x0004;
    pub const MODEL_IDENTIFIER: u16 = 0x0005;
    pub const DATE_CODE: u16 = 0x0006;
    pub const POWER_SOURCE: u16 = 0x0007;
    pub const LOCATION_DESCRIPTION: u16 = 0x0010;
    pub const PHYSICAL_ENVIRONMENT: u16 = 0x0011;
    pub const SW_BUILD_ID: u16 = 0x4000;

    /// Power source: battery
    pub const POWER_SOURCE_BATTERY: u8 = 0x03;
    /// Physical environment: unspecified
    pub const ENV_UNSPECIFIED: u8 = 0x00;
}

/// Identify cluster attributes
pub mod identify_attrs {
    pub const IDENTIFY_TIME: u16 = 0x0000;

    /// Identify time when the endpoint is not identifying
    pub const IDENTIFY_TIME_DEFAULT: u16 = 0x0000;
}

/// Power Configuration cluster attributes (battery set 1)
pub mod power_config_attrs {
    /// Battery voltage, units of 100 mV
    pub const BATTERY_VOLTAGE: u16 = 0x0020;
    /// Remaining charge, units of 0.5 % (200 = 100 %)
    pub const BATTERY_PERCENTAGE_REMAINING: u16 = 0x0021;
    pub const BATTERY_SIZE: u16 = 0x0031;
    pub const BATTERY_QUANTITY: u16 = 0x0033;
    pub const BATTERY_RATED_VOLTAGE: u16 = 0x0034;
    pub const BATTERY_ALARM_MASK: u16 = 0x0035;
    pub const BATTERY_VOLTAGE_MIN_THRESHOLD: u16 = 0x0036;
    pub const BATTERY_ALARM_STATE: u16 = 0x003E;

    /// Percentage remaining value meaning "unknown"
    pub const PERCENTAGE_UNKNOWN: u8 = 0xFF;
}

/// Illuminance Measurement cluster attributes
pub mod illuminance_attrs {
    pub const MEASURED_VALUE: u16 = 0x0000;
    pub const MIN_MEASURED_VALUE: u16 = 0x0001;
    pub const MAX_MEASURED_VALUE: u16 = 0x0002;

    /// Measured value meaning "invalid / not yet measured"
    pub const MEASURED_VALUE_INVALID: u16 = 0xFFFF;
}

/// Battery size enumeration of the Power Configuration cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BatterySize {
    NoBattery = 0x00,
    BuiltIn = 0x01,
    Other = 0x02,
    Aa = 0x03,
    Aaa = 0x04,
    C = 0x05,
    D = 0x06,
    Cr2 = 0x07,
    Cr123a = 0x08,
    Unknown = 0xFF,
}

/// Role a cluster plays on an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterRole {
    Server,
    Client,
}

/// ZCL data types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataType {
    Bitmap8 = 0x18,
    Bitmap32 = 0x1B,
    Uint8 = 0x20,
    Uint16 = 0x21,
    Uint32 = 0x23,
    Enum8 = 0x30,
    String = 0x42,
}

/// Convert a battery percentage (0..=100) into the half-percent units of
/// `BATTERY_PERCENTAGE_REMAINING`. Out of range inputs are clamped.
#[must_use]
pub fn percent_to_half_percent(percent: i32) -> u8 {
    // clamp keeps the product within 0..=200
    u8::try_from(percent.clamp(0, 100) * 2).unwrap_or(u8::MAX)
}

/// Convert millivolts into the 100 mV units of `BATTERY_VOLTAGE`.
#[must_use]
pub fn millivolts_to_decivolts(millivolts: i32) -> u8 {
    u8::try_from((millivolts / 100).clamp(0, 0xFE)).unwrap_or(0xFE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_encoding() {
        assert_eq!(percent_to_half_percent(100), 200);
        assert_eq!(percent_to_half_percent(62), 124);
        assert_eq!(percent_to_half_percent(0), 0);
    }

    #[test]
    fn test_percent_encoding_clamps() {
        assert_eq!(percent_to_half_percent(-5), 0);
        assert_eq!(percent_to_half_percent(150), 200);
    }

    #[test]
    fn test_decivolts() {
        assert_eq!(millivolts_to_decivolts(3000), 30);
        assert_eq!(millivolts_to_decivolts(2950), 29);
        assert_eq!(millivolts_to_decivolts(-1), 0);
    }
}
