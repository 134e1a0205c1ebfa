//! Application handling of Zigbee stack signals

use zigbee_core::{BufferToken, SignalHandler, StackSignal};

/// Tracks network membership from stack signals
#[derive(Debug, Default)]
pub struct NodeSignalHandler {
    joined: bool,
}

impl NodeSignalHandler {
    /// Whether the node is currently part of a network
    #[must_use]
    pub fn joined(&self) -> bool {
        self.joined
    }
}

impl SignalHandler for NodeSignalHandler {
    fn handle(&mut self, signal: StackSignal, buffer: BufferToken) {
        tracing::debug!("Stack signal {:?} (buffer {})", signal, buffer.slot());

        match signal {
            StackSignal::DeviceFirstStart => {
                tracing::info!("Factory new device, starting network steering");
            }
            StackSignal::DeviceReboot => {
                tracing::info!("Rejoining stored network");
            }
            StackSignal::Steering { joined: true } => {
                self.joined = true;
                tracing::info!("Joined network");
            }
            StackSignal::Steering { joined: false } => {
                self.joined = false;
                tracing::warn!("Network steering failed");
            }
            StackSignal::Left => {
                self.joined = false;
                tracing::info!("Left network");
            }
            StackSignal::ParentLink { ok } => {
                tracing::info!("Parent link {}", if ok { "restored" } else { "lost" });
            }
            StackSignal::Other(code) => {
                tracing::trace!("Unhandled stack signal {:#06x}", code);
            }
        }
        // buffer released here
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zigbee_core::InMemoryStack;

    #[test]
    fn test_join_and_leave() {
        let stack = InMemoryStack::new();
        let mut handler = NodeSignalHandler::default();

        stack.start(&mut handler);
        assert!(handler.joined());

        stack.raise(StackSignal::Left, &mut handler);
        assert!(!handler.joined());
        assert_eq!(stack.buffers().in_use(), 0);
    }
}
