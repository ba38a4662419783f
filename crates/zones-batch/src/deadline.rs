//! Deadline timers that fire a cancellation token.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancels a token once a duration elapses.
///
/// Dropping the `Deadline` disarms it. The timer also exits early if the
/// token is cancelled by someone else.
#[derive(Debug)]
pub struct Deadline {
    timer: JoinHandle<()>,
}

impl Deadline {
    /// Arm a deadline on `token`. Must be called inside a Tokio runtime.
    pub fn arm(token: CancellationToken, after: Duration) -> Self {
        let timer = tokio::spawn(async move {
            tokio::select! {
                biased;

                _ = token.cancelled() => {}

                _ = tokio::time::sleep(after) => {
                    tracing::debug!(after_ms = after.as_millis() as u64, "deadline expired");
                    token.cancel();
                }
            }
        });
        Self { timer }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_the_duration() {
        let token = CancellationToken::new();
        let _deadline = Deadline::arm(token.clone(), Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!token.is_cancelled());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_disarms() {
        let token = CancellationToken::new();
        let deadline = Deadline::arm(token.clone(), Duration::from_millis(100));
        drop(deadline);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!token.is_cancelled());
    }
}
