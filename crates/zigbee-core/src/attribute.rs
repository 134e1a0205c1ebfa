//! Attribute values and the stack-facing attribute interface

use crate::cluster::{ClusterRole, DataType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by the Zigbee stack when writing attributes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZclError {
    #[error("Unsupported cluster {cluster_id:#06x} on endpoint {endpoint}")]
    UnsupportedCluster { endpoint: u8, cluster_id: u16 },

    #[error("Unsupported attribute {attribute_id:#06x} in cluster {cluster_id:#06x}")]
    UnsupportedAttribute { cluster_id: u16, attribute_id: u16 },

    #[error(
        "Type mismatch for attribute {attribute_id:#06x}: expected {expected:?}, got {actual:?}"
    )]
    TypeMismatch {
        attribute_id: u16,
        expected: DataType,
        actual: DataType,
    },

    #[error("Attribute {attribute_id:#06x} is read-only")]
    ReadOnly { attribute_id: u16 },

    #[error("Stack not running")]
    NotRunning,
}

/// A typed ZCL attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Enum8(u8),
    Bitmap8(u8),
    Bitmap32(u32),
    String(String),
}

impl AttributeValue {
    /// ZCL data type tag of this value
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Uint8(_) => DataType::Uint8,
            Self::Uint16(_) => DataType::Uint16,
            Self::Uint32(_) => DataType::Uint32,
            Self::Enum8(_) => DataType::Enum8,
            Self::Bitmap8(_) => DataType::Bitmap8,
            Self::Bitmap32(_) => DataType::Bitmap32,
            Self::String(_) => DataType::String,
        }
    }
}

/// Fully qualified attribute location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributePath {
    pub endpoint: u8,
    pub cluster_id: u16,
    pub role: ClusterRole,
    pub attribute_id: u16,
}

impl AttributePath {
    /// Server-side attribute on an endpoint
    #[must_use]
    pub fn server(endpoint: u8, cluster_id: u16, attribute_id: u16) -> Self {
        Self {
            endpoint,
            cluster_id,
            role: ClusterRole::Server,
            attribute_id,
        }
    }
}

/// Attribute write access into the Zigbee stack.
///
/// The stack owns attribute memory; writes made through this trait may
/// trigger attribute reporting. Callers never wait for reports to go out.
pub trait ZclAttributes {
    /// Overwrite one attribute. With `check_access` set the stack refuses
    /// writes to attributes that are read-only over the air.
    fn set_attribute(
        &mut self,
        path: AttributePath,
        value: AttributeValue,
        check_access: bool,
    ) -> Result<(), ZclError>;
}
