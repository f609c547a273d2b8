//! Random pacing between visits.

use rand::Rng;
use std::time::Duration;

/// A uniform random delay in `[from, to]` taken before each visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisitDelay {
    from: Duration,
    to: Duration,
}

impl VisitDelay {
    /// Build from millisecond bounds. `to == 0` disables pacing; an inverted
    /// range collapses to `to`.
    pub fn from_millis(from_ms: u64, to_ms: u64) -> Self {
        Self {
            from: Duration::from_millis(from_ms.min(to_ms)),
            to: Duration::from_millis(to_ms),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.to.is_zero()
    }

    /// Draw one delay.
    pub fn sample(&self) -> Duration {
        if !self.is_enabled() {
            return Duration::ZERO;
        }
        let ms = rand::thread_rng().gen_range(self.from.as_millis()..=self.to.as_millis());
        Duration::from_millis(ms as u64)
    }

    pub async fn wait(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tracing::debug!("Waiting {}ms before visit", delay.as_millis());
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_by_default() {
        let delay = VisitDelay::default();
        assert!(!delay.is_enabled());
        assert_eq!(delay.sample(), Duration::ZERO);
    }

    #[test]
    fn test_samples_within_bounds() {
        let delay = VisitDelay::from_millis(100, 250);
        for _ in 0..100 {
            let sample = delay.sample();
            assert!(sample >= Duration::from_millis(100));
            assert!(sample <= Duration::from_millis(250));
        }
    }

    #[test]
    fn test_fixed_delay() {
        assert_eq!(VisitDelay::from_millis(300, 300).sample(), Duration::from_millis(300));
        assert_eq!(VisitDelay::from_millis(900, 300).sample(), Duration::from_millis(300));
    }
}
