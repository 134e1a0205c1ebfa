//! Bounded reading channels
//!
//! Each reading type travels on its own bounded queue with exactly one
//! consumer. Producers publish with an explicit timeout: if the consumer's
//! inbox stays full for that long the reading is dropped, never retried.

use crate::error::PublishError;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendTimeoutError};

/// Create a reading channel with room for `capacity` undelivered readings
#[must_use]
pub fn reading_channel<T>(
    name: &'static str,
    capacity: usize,
) -> (ReadingPublisher<T>, ReadingInbox<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ReadingPublisher { name, tx }, ReadingInbox { name, rx })
}

/// Producer side of a reading channel
#[derive(Debug)]
pub struct ReadingPublisher<T> {
    name: &'static str,
    tx: mpsc::Sender<T>,
}

impl<T> Clone for ReadingPublisher<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
        }
    }
}

impl<T> ReadingPublisher<T> {
    /// Channel name used in logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Queue a reading, waiting at most `timeout` for inbox space
    pub async fn publish(&self, reading: T, timeout: Duration) -> Result<(), PublishError> {
        match self.tx.send_timeout(reading, timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(PublishError::Timeout {
                channel: self.name,
                timeout,
            }),
            Err(SendTimeoutError::Closed(_)) => Err(PublishError::Closed(self.name)),
        }
    }
}

/// Consumer side of a reading channel. Readings arrive in publish order.
#[derive(Debug)]
pub struct ReadingInbox<T> {
    name: &'static str,
    rx: mpsc::Receiver<T>,
}

impl<T> ReadingInbox<T> {
    /// Channel name used in logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait for the next reading, `None` once every publisher is gone
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take a reading if one is queued
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}
