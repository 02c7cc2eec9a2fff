use skyprune_core::PacingSettings;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingConfig {
    /// Fixed wait between two consecutive deletions
    pub interval: Duration,
    /// Emit a progress tick after this many completions
    pub progress_every: usize,
}

impl PacingConfig {
    pub fn bluesky() -> Self {
        Self {
            interval: Duration::from_millis(500),
            progress_every: 10,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self::bluesky()
    }
}

impl From<&PacingSettings> for PacingConfig {
    fn from(settings: &PacingSettings) -> Self {
        Self {
            interval: Duration::from_millis(settings.interval_ms),
            progress_every: settings.progress_every.max(1),
        }
    }
}

/// Keeps sequential requests under the server's ambient limits.
#[derive(Debug)]
pub struct RequestPacer {
    config: PacingConfig,
}

impl RequestPacer {
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    /// Sleep after the request at 1-based `position` unless it was the last.
    pub async fn pause_after(&self, position: usize, total: usize) {
        if position >= total || self.config.interval.is_zero() {
            return;
        }
        tracing::trace!("Pacing {:?} before next request", self.config.interval);
        sleep(self.config.interval).await;
    }

    /// Whether a progress tick is due after `completed` of `total`.
    pub fn progress_due(&self, completed: usize, total: usize) -> bool {
        completed == total || completed % self.config.progress_every == 0
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pacing_defaults() {
        let config = PacingConfig::bluesky();
        assert_eq!(config.interval, Duration::from_millis(500));
        assert_eq!(config.progress_every, 10);
    }

    #[test]
    fn test_progress_ticks() {
        let pacer = RequestPacer::new(PacingConfig::bluesky());
        assert!(!pacer.progress_due(1, 25));
        assert!(pacer.progress_due(10, 25));
        assert!(pacer.progress_due(20, 25));
        assert!(pacer.progress_due(25, 25));
        assert!(pacer.progress_due(3, 3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_pause_after_last_request() {
        let pacer = RequestPacer::new(PacingConfig::bluesky());
        let start = tokio::time::Instant::now();

        pacer.pause_after(1, 3).await;
        pacer.pause_after(2, 3).await;
        pacer.pause_after(3, 3).await;

        // Two intervals, none after the third request.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(1));
        assert!(elapsed < Duration::from_millis(1500));
    }
}
