//! Periodic tick source driving the sampling cadence

use crate::event::TickEvent;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default tick period
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(10_000);

/// Default delay before the first tick
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(10_000);

/// Undelivered ticks kept per subscriber before it starts lagging
const TICK_CHANNEL_CAPACITY: usize = 16;

/// Repeating timer that fans a [`TickEvent`] out to every subscriber.
///
/// After each expiry the timer is re-armed for `now + interval` before the
/// tick is emitted, so each period stretches by the time spent handling the
/// expiry.
///
/// A node runs exactly one ticker: the application creates it once and hands
/// out subscriptions, never the ticker itself.
pub struct Ticker {
    interval: Duration,
    initial_delay: Duration,
    tick_tx: broadcast::Sender<TickEvent>,
}

impl Ticker {
    /// Create a ticker; nothing fires until [`Ticker::start`]
    #[must_use]
    pub fn new(interval: Duration, initial_delay: Duration) -> Self {
        let (tick_tx, _) = broadcast::channel(TICK_CHANNEL_CAPACITY);
        Self {
            interval,
            initial_delay,
            tick_tx,
        }
    }

    /// Subscribe to ticks emitted from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TickEvent> {
        self.tick_tx.subscribe()
    }

    /// Get the number of current subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tick_tx.receiver_count()
    }

    /// Arm the timer. It runs until the returned task is aborted.
    pub fn start(&self) -> JoinHandle<()> {
        let interval = self.interval;
        let tick_tx = self.tick_tx.clone();
        let mut deadline = Instant::now() + self.initial_delay;

        tracing::info!(
            "Ticker armed: first tick in {:?}, then every {:?}",
            self.initial_delay,
            interval
        );

        tokio::spawn(async move {
            let mut count: u64 = 0;
            loop {
                tokio::time::sleep_until(deadline).await;

                deadline = Instant::now() + interval;
                count += 1;
                tracing::debug!("{:?} timeout (tick {})", interval, count);

                if tick_tx.send(TickEvent).is_err() {
                    tracing::trace!("Tick {} had no subscribers", count);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_respect_interval() {
        let ticker = Ticker::new(DEFAULT_TICK_INTERVAL, DEFAULT_INITIAL_DELAY);
        let mut rx = ticker.subscribe();
        let mut last = Instant::now();
        let handle = ticker.start();

        for _ in 0..5 {
            rx.recv().await.unwrap();
            let now = Instant::now();
            assert!(now - last >= Duration::from_secs(10));
            last = now;
        }
        assert!(rx.try_recv().is_err());

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_count_matches_expiries() {
        let ticker = Ticker::new(DEFAULT_TICK_INTERVAL, DEFAULT_INITIAL_DELAY);
        let mut rx = ticker.subscribe();
        let handle = ticker.start();

        // Expiries at 10, 20, 30, 40 and 50 seconds
        tokio::time::sleep(Duration::from_secs(55)).await;

        let mut seen = 0;
        while rx.try_recv().is_ok() {
            seen += 1;
        }
        assert_eq!(seen, 5);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_from_late_handling() {
        let start = Instant::now();
        let ticker = Ticker::new(Duration::from_secs(10), Duration::from_secs(10));
        let mut rx = ticker.subscribe();
        let handle = ticker.start();

        // First expiry is due at 10 s but only handled at 13 s
        tokio::time::advance(Duration::from_secs(13)).await;
        rx.recv().await.unwrap();
        assert_eq!(Instant::now() - start, Duration::from_secs(13));

        // A fixed schedule would fire again at 20 s
        tokio::time::advance(Duration::from_secs(8)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        rx.recv().await.unwrap();
        assert_eq!(Instant::now() - start, Duration::from_secs(23));

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fan_out() {
        let ticker = Ticker::new(Duration::from_secs(1), Duration::from_millis(500));
        let mut first = ticker.subscribe();
        let mut second = ticker.subscribe();
        assert_eq!(ticker.subscriber_count(), 2);

        let handle = ticker.start();
        assert_eq!(first.recv().await.unwrap(), TickEvent);
        assert_eq!(second.recv().await.unwrap(), TickEvent);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_keeps_running_without_subscribers() {
        let ticker = Ticker::new(Duration::from_secs(1), Duration::from_secs(1));
        let handle = ticker.start();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let mut rx = ticker.subscribe();
        rx.recv().await.unwrap();
        assert!(!handle.is_finished());

        handle.abort();
    }
}
