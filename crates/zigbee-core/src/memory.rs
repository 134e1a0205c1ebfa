//! In-process Zigbee stack stand-in
//!
//! Keeps attribute memory for registered endpoints, validates writes against
//! the endpoint descriptors and emits an [`AttributeReport`] whenever a
//! reportable attribute changes. Used for host runs and tests.

use crate::attribute::{AttributePath, AttributeValue, ZclAttributes, ZclError};
use crate::device::EndpointDescriptor;
use crate::signal::{BufferPool, SignalHandler, StackSignal};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Number of buffer slots available for signal delivery
const SIGNAL_BUFFERS: usize = 4;

/// Report emitted when a reportable attribute changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeReport {
    pub path: AttributePath,
    pub value: AttributeValue,
}

/// Attribute memory shared by all handles of one stack
#[derive(Debug, Clone)]
pub struct InMemoryStack {
    endpoints: Arc<DashMap<u8, EndpointDescriptor>>,
    store: Arc<DashMap<AttributePath, AttributeValue>>,
    report_tx: broadcast::Sender<AttributeReport>,
    buffers: BufferPool,
}

impl Default for InMemoryStack {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStack {
    /// Create an empty stack
    #[must_use]
    pub fn new() -> Self {
        let (report_tx, _) = broadcast::channel(64);
        Self {
            endpoints: Arc::new(DashMap::new()),
            store: Arc::new(DashMap::new()),
            report_tx,
            buffers: BufferPool::new(SIGNAL_BUFFERS),
        }
    }

    /// Register an endpoint and seed its attribute memory
    pub fn register_endpoint(
        &self,
        endpoint: EndpointDescriptor,
        initial: impl IntoIterator<Item = (AttributePath, AttributeValue)>,
    ) {
        let id = endpoint.id;
        self.endpoints.insert(id, endpoint);
        let mut count = 0;
        for (path, value) in initial {
            if path.endpoint == id {
                self.store.insert(path, value);
                count += 1;
            }
        }
        tracing::info!("Registered endpoint {} with {} attributes", id, count);
    }

    /// Subscribe to attribute reports
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AttributeReport> {
        self.report_tx.subscribe()
    }

    /// Read the current value of an attribute
    #[must_use]
    pub fn get(&self, path: &AttributePath) -> Option<AttributeValue> {
        self.store.get(path).map(|r| r.value().clone())
    }

    /// Buffer slots used for signal delivery
    #[must_use]
    pub fn buffers(&self) -> &BufferPool {
        &self.buffers
    }

    /// Deliver one signal to the application handler
    pub fn raise(&self, signal: StackSignal, handler: &mut impl SignalHandler) {
        match self.buffers.acquire() {
            Some(buffer) => handler.handle(signal, buffer),
            None => tracing::warn!("No free buffer to deliver {:?}", signal),
        }
    }

    /// Bring the stack up: first start followed by a successful join
    pub fn start(&self, handler: &mut impl SignalHandler) {
        self.raise(StackSignal::DeviceFirstStart, handler);
        self.raise(StackSignal::Steering { joined: true }, handler);
    }

    fn validate(
        &self,
        path: &AttributePath,
        value: &AttributeValue,
        check_access: bool,
    ) -> Result<bool, ZclError> {
        let endpoint = self
            .endpoints
            .get(&path.endpoint)
            .ok_or(ZclError::UnsupportedCluster {
                endpoint: path.endpoint,
                cluster_id: path.cluster_id,
            })?;
        let cluster = endpoint
            .cluster(path.cluster_id, path.role)
            .ok_or(ZclError::UnsupportedCluster {
                endpoint: path.endpoint,
                cluster_id: path.cluster_id,
            })?;
        let attr = cluster
            .find(path.attribute_id)
            .ok_or(ZclError::UnsupportedAttribute {
                cluster_id: path.cluster_id,
                attribute_id: path.attribute_id,
            })?;

        if attr.data_type != value.data_type() {
            return Err(ZclError::TypeMismatch {
                attribute_id: path.attribute_id,
                expected: attr.data_type,
                actual: value.data_type(),
            });
        }
        if check_access && !attr.access.writable {
            return Err(ZclError::ReadOnly {
                attribute_id: path.attribute_id,
            });
        }
        Ok(attr.access.reportable)
    }
}

impl ZclAttributes for InMemoryStack {
    fn set_attribute(
        &mut self,
        path: AttributePath,
        value: AttributeValue,
        check_access: bool,
    ) -> Result<(), ZclError> {
        let reportable = self.validate(&path, &value, check_access)?;

        let previous = self.store.insert(path, value.clone());
        if reportable && previous.as_ref() != Some(&value) {
            tracing::trace!("Reporting {:?} = {:?}", path, value);
            // No subscribers means nobody bound for reports
            let _ = self.report_tx.send(AttributeReport { path, value });
        }
        Ok(())
    }
}
