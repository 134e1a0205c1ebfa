//! Stack signals and the buffer slots they arrive in
//!
//! The stack hands every signal to the application together with the buffer
//! slot it was carried in. The slot is represented by a [`BufferToken`]; the
//! handler takes the token by value and the slot returns to the pool when the
//! token is dropped, whichever way the handler exits.

use std::sync::{Arc, Mutex, PoisonError};

/// Signals raised by the Zigbee stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackSignal {
    /// Stack started with no network configuration
    DeviceFirstStart,
    /// Stack started from stored network configuration
    DeviceReboot,
    /// Network steering finished
    Steering { joined: bool },
    /// Device left the network
    Left,
    /// Parent link lost or restored
    ParentLink { ok: bool },
    /// Anything the application does not interpret
    Other(u16),
}

/// Handler for stack signals
pub trait SignalHandler {
    fn handle(&mut self, signal: StackSignal, buffer: BufferToken);
}

impl<F> SignalHandler for F
where
    F: FnMut(StackSignal, BufferToken),
{
    fn handle(&mut self, signal: StackSignal, buffer: BufferToken) {
        self(signal, buffer);
    }
}

#[derive(Debug)]
struct PoolInner {
    free: Mutex<Vec<usize>>,
    capacity: usize,
}

impl PoolInner {
    fn release(&self, slot: usize) {
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(slot);
    }
}

/// Fixed-size pool of stack buffer slots
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    /// Create a pool with `capacity` slots
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new((0..capacity).rev().collect()),
                capacity,
            }),
        }
    }

    /// Take a free slot, `None` when the pool is exhausted
    #[must_use]
    pub fn acquire(&self) -> Option<BufferToken> {
        let slot = self
            .inner
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()?;
        Some(BufferToken {
            slot,
            pool: Arc::clone(&self.inner),
        })
    }

    /// Slots currently held by tokens
    #[must_use]
    pub fn in_use(&self) -> usize {
        let free = self
            .inner
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        self.inner.capacity - free
    }
}

/// Borrowed ownership of one buffer slot. Released on drop.
#[derive(Debug)]
pub struct BufferToken {
    slot: usize,
    pool: Arc<PoolInner>,
}

impl BufferToken {
    /// Slot index inside the pool
    #[must_use]
    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl Drop for BufferToken {
    fn drop(&mut self) {
        self.pool.release(self.slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_released_on_drop() {
        let pool = BufferPool::new(2);
        let token = pool.acquire().unwrap();
        assert_eq!(pool.in_use(), 1);
        drop(token);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_pool_exhaustion() {
        let pool = BufferPool::new(1);
        let _held = pool.acquire().unwrap();
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn test_released_on_early_return() {
        fn handle(signal: StackSignal, buffer: BufferToken) -> Result<usize, ()> {
            if let StackSignal::Other(_) = signal {
                return Err(());
            }
            Ok(buffer.slot())
        }

        let pool = BufferPool::new(1);
        let token = pool.acquire().unwrap();
        assert!(handle(StackSignal::Other(7), token).is_err());
        assert_eq!(pool.in_use(), 0);

        let token = pool.acquire().unwrap();
        assert_eq!(handle(StackSignal::DeviceReboot, token), Ok(0));
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_closure_handler() {
        let pool = BufferPool::new(1);
        let mut seen = Vec::new();
        let mut handler = |signal: StackSignal, _buffer: BufferToken| seen.push(signal);
        handler.handle(StackSignal::Left, pool.acquire().unwrap());
        assert_eq!(seen, vec![StackSignal::Left]);
        assert_eq!(pool.in_use(), 0);
    }
}
