//! Zigbee abstraction layer
//!
//! This crate describes the light sensor device as the Zigbee stack sees it:
//! ZCL identifiers, endpoint descriptors, the application's attribute mirror
//! and the narrow interfaces through which the application talks to the stack.

pub mod attribute;
pub mod cluster;
pub mod context;
pub mod device;
pub mod memory;
pub mod signal;

pub use attribute::{AttributePath, AttributeValue, ZclAttributes, ZclError};
pub use context::{BasicInfo, DeviceContext};
pub use device::{EndpointDescriptor, LIGHT_SENSOR_ENDPOINT};
pub use memory::{AttributeReport, InMemoryStack};
pub use signal::{BufferPool, BufferToken, SignalHandler, StackSignal};
