//! Endpoint, cluster and attribute descriptors of the light sensor device

use crate::cluster::{
    basic_attrs, id, identify_attrs, illuminance_attrs, power_config_attrs, ClusterRole, DataType,
    HA_PROFILE_ID,
};
use serde::Serialize;

/// Default light sensor endpoint
pub const LIGHT_SENSOR_ENDPOINT: u8 = 10;

/// HA light sensor device id
pub const LIGHT_SENSOR_DEVICE_ID: u16 = 0x0106;

/// Device version advertised in the simple descriptor
pub const LIGHT_SENSOR_DEVICE_VERSION: u8 = 1;

/// Access flags of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Access {
    /// Writable over the air
    pub writable: bool,
    /// Can be configured for reporting
    pub reportable: bool,
}

impl Access {
    pub const READ_ONLY: Self = Self {
        writable: false,
        reportable: false,
    };
    pub const REPORTABLE: Self = Self {
        writable: false,
        reportable: true,
    };
    pub const READ_WRITE: Self = Self {
        writable: true,
        reportable: false,
    };
}

/// A declared attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttributeDescriptor {
    pub id: u16,
    #[serde(skip)]
    pub data_type: DataType,
    pub access: Access,
}

/// A cluster instance on an endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ClusterDescriptor {
    pub cluster_id: u16,
    pub role: ClusterRole,
    pub attributes: Vec<AttributeDescriptor>,
}

impl ClusterDescriptor {
    /// Start a server-side cluster
    #[must_use]
    pub fn server(cluster_id: u16) -> Self {
        Self {
            cluster_id,
            role: ClusterRole::Server,
            attributes: Vec::new(),
        }
    }

    /// Start a client-side cluster
    #[must_use]
    pub fn client(cluster_id: u16) -> Self {
        Self {
            cluster_id,
            role: ClusterRole::Client,
            attributes: Vec::new(),
        }
    }

    /// Declare an attribute
    #[must_use]
    pub fn attribute(mut self, id: u16, data_type: DataType, access: Access) -> Self {
        self.attributes.push(AttributeDescriptor {
            id,
            data_type,
            access,
        });
        self
    }

    /// Look up a declared attribute
    #[must_use]
    pub fn find(&self, attribute_id: u16) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.id == attribute_id)
    }
}

/// A device endpoint with its simple descriptor data
#[derive(Debug, Clone, Serialize)]
pub struct EndpointDescriptor {
    /// Endpoint ID (1-240)
    pub id: u8,
    /// Profile ID (e.g., 0x0104 for Home Automation)
    pub profile_id: u16,
    /// Device ID within the profile
    pub device_id: u16,
    /// Device version
    pub device_version: u8,
    /// Server and client clusters
    pub clusters: Vec<ClusterDescriptor>,
}

impl EndpointDescriptor {
    /// Start building an endpoint
    #[must_use]
    pub fn builder(id: u8) -> EndpointBuilder {
        EndpointBuilder {
            endpoint: Self {
                id,
                profile_id: HA_PROFILE_ID,
                device_id: 0,
                device_version: 0,
                clusters: Vec::new(),
            },
        }
    }

    /// The light sensor endpoint: Basic, Identify, Power Configuration and
    /// Illuminance Measurement servers plus an Identify client.
    #[must_use]
    pub fn light_sensor(id: u8) -> Self {
        use basic_attrs as basic;
        use illuminance_attrs as lux;
        use power_config_attrs as power;

        let ro = Access::READ_ONLY;
        let rw = Access::READ_WRITE;
        let report = Access::REPORTABLE;

        Self::builder(id)
            .device(LIGHT_SENSOR_DEVICE_ID, LIGHT_SENSOR_DEVICE_VERSION)
            .cluster(
                ClusterDescriptor::server(id::BASIC)
                    .attribute(basic::ZCL_VERSION, DataType::Uint8, ro)
                    .attribute(basic::APPLICATION_VERSION, DataType::Uint8, ro)
                    .attribute(basic::STACK_VERSION, DataType::Uint8, ro)
                    .attribute(basic::HW_VERSION, DataType::Uint8, ro)
                    .attribute(basic::MANUFACTURER_NAME, DataType::String, ro)
                    .attribute(basic::MODEL_IDENTIFIER, DataType::String, ro)
                    .attribute(basic::DATE_CODE, DataType::String, ro)
                    .attribute(basic::POWER_SOURCE, DataType::Enum8, ro)
                    .attribute(basic::LOCATION_DESCRIPTION, DataType::String, rw)
                    .attribute(basic::PHYSICAL_ENVIRONMENT, DataType::Enum8, rw)
                    .attribute(basic::SW_BUILD_ID, DataType::String, ro),
            )
            .cluster(
                ClusterDescriptor::server(id::IDENTIFY).attribute(
                    identify_attrs::IDENTIFY_TIME,
                    DataType::Uint16,
                    rw,
                ),
            )
            .cluster(
                ClusterDescriptor::server(id::POWER_CONFIG)
                    .attribute(power::BATTERY_VOLTAGE, DataType::Uint8, report)
                    .attribute(power::BATTERY_PERCENTAGE_REMAINING, DataType::Uint8, report)
                    .attribute(power::BATTERY_SIZE, DataType::Enum8, rw)
                    .attribute(power::BATTERY_QUANTITY, DataType::Uint8, rw)
                    .attribute(power::BATTERY_RATED_VOLTAGE, DataType::Uint8, rw)
                    .attribute(power::BATTERY_ALARM_MASK, DataType::Bitmap8, rw)
                    .attribute(power::BATTERY_VOLTAGE_MIN_THRESHOLD, DataType::Uint8, rw)
                    .attribute(power::BATTERY_ALARM_STATE, DataType::Bitmap32, report),
            )
            .cluster(
                ClusterDescriptor::server(id::ILLUMINANCE_MEASUREMENT)
                    .attribute(lux::MEASURED_VALUE, DataType::Uint16, report)
                    .attribute(lux::MIN_MEASURED_VALUE, DataType::Uint16, ro)
                    .attribute(lux::MAX_MEASURED_VALUE, DataType::Uint16, ro),
            )
            .cluster(ClusterDescriptor::client(id::IDENTIFY))
            .build()
    }

    /// Input (server) cluster ids, in declaration order
    #[must_use]
    pub fn in_clusters(&self) -> Vec<u16> {
        self.cluster_ids(ClusterRole::Server)
    }

    /// Output (client) cluster ids, in declaration order
    #[must_use]
    pub fn out_clusters(&self) -> Vec<u16> {
        self.cluster_ids(ClusterRole::Client)
    }

    fn cluster_ids(&self, role: ClusterRole) -> Vec<u16> {
        self.clusters
            .iter()
            .filter(|c| c.role == role)
            .map(|c| c.cluster_id)
            .collect()
    }

    /// Check if endpoint has a specific cluster
    #[must_use]
    pub fn has_cluster(&self, cluster_id: u16) -> bool {
        self.clusters.iter().any(|c| c.cluster_id == cluster_id)
    }

    /// Find a cluster by id and role
    #[must_use]
    pub fn cluster(&self, cluster_id: u16, role: ClusterRole) -> Option<&ClusterDescriptor> {
        self.clusters
            .iter()
            .find(|c| c.cluster_id == cluster_id && c.role == role)
    }

    /// Number of attributes that can be configured for reporting
    #[must_use]
    pub fn reportable_attribute_count(&self) -> usize {
        self.clusters
            .iter()
            .flat_map(|c| c.attributes.iter())
            .filter(|a| a.access.reportable)
            .count()
    }
}

/// Builder for [`EndpointDescriptor`]
#[derive(Debug, Clone)]
pub struct EndpointBuilder {
    endpoint: EndpointDescriptor,
}

impl EndpointBuilder {
    /// Set device id and version
    #[must_use]
    pub fn device(mut self, device_id: u16, device_version: u8) -> Self {
        self.endpoint.device_id = device_id;
        self.endpoint.device_version = device_version;
        self
    }

    /// Add a cluster
    #[must_use]
    pub fn cluster(mut self, cluster: ClusterDescriptor) -> Self {
        self.endpoint.clusters.push(cluster);
        self
    }

    #[must_use]
    pub fn build(self) -> EndpointDescriptor {
        self.endpoint
    }
}
