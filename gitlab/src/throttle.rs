use tokio::sync::Mutex;
use tokio::time::{Duration, Instant, sleep};

/// Paces outbound requests: consecutive `wait` calls return at least the
/// given interval apart, process-wide. The lock is held across the sleep, so
/// concurrent callers queue up instead of all observing the same "elapsed"
/// value and proceeding together.
#[derive(Default)]
pub struct Throttle {
    last_request: Mutex<Option<Instant>>,
}

impl Throttle {
    /// Blocks until at least `min_interval` has passed since the previous
    /// call returned. The first call never blocks; a zero interval never
    /// blocks and leaves the shared timestamp untouched.
    pub async fn wait(&self, min_interval: Duration) {
        if min_interval.is_zero() {
            return;
        }

        let mut last_request = self.last_request.lock().await;
        if let Some(previous) = *last_request {
            let elapsed = previous.elapsed();
            if elapsed < min_interval {
                sleep(min_interval - elapsed).await;
            }
        }
        *last_request = Some(Instant::now());
    }
}
