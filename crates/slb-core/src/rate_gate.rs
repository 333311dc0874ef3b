use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Process-wide pacing for outbound Slack calls.
///
/// Guarantees a minimum spacing between call *starts*. It is not a queue: waiters
/// are not ordered fairly, each one just holds a reserved slot.
#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    next: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Reserve the next slot and return its start instant.
    async fn reserve(&self) -> Instant {
        let mut next = self.next.lock().await;
        let now = Instant::now();
        let start = match *next {
            Some(n) if n > now => n,
            _ => now,
        };
        *next = Some(start + self.min_interval);
        start
    }

    /// Suspend until the caller may start its remote call.
    pub async fn acquire(&self) {
        let start = self.reserve().await;
        let wait = start.saturating_duration_since(Instant::now());
        if wait > Duration::ZERO {
            tracing::debug!("rate gate: waiting {} ms", wait.as_millis());
            sleep_until(start).await;
        }
    }
}
