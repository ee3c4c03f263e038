use std::time::Duration;

use tracing::debug;

use crate::config::PacingConfig;

/// Call class used to pick a politeness band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceClass {
    /// News and general web queries.
    Search,
    /// Filetype-constrained document queries.
    Document,
}

/// Spaces out consecutive backend calls.
pub trait Pacer {
    async fn pace(&self, class: PaceClass);
}

/// Sleeps for a duration drawn uniformly from the class's `[min, max]` band.
#[derive(Debug, Clone)]
pub struct JitterPacer {
    bands: PacingConfig,
}

impl JitterPacer {
    pub fn new(bands: PacingConfig) -> Self {
        Self { bands }
    }

    fn band(&self, class: PaceClass) -> (f64, f64) {
        match class {
            PaceClass::Search => self.bands.search,
            PaceClass::Document => self.bands.document,
        }
    }
}

impl Pacer for JitterPacer {
    async fn pace(&self, class: PaceClass) {
        let (min, max) = self.band(class);
        let delay = uniform_delay(min, max);
        debug!(?class, delay_ms = delay.as_millis() as u64, "pacing");
        tokio::time::sleep(delay).await;
    }
}

fn uniform_delay(min: f64, max: f64) -> Duration {
    let secs = min + fastrand::f64() * (max - min).max(0.0);
    Duration::from_secs_f64(secs.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn delay_stays_within_band() {
        for _ in 0..200 {
            let d = uniform_delay(1.5, 3.0).as_secs_f64();
            assert!((1.5..=3.0).contains(&d), "out of band: {d}");
        }
    }

    #[test]
    fn degenerate_band_is_fixed() {
        assert_eq!(uniform_delay(2.0, 2.0), Duration::from_secs(2));
        assert_eq!(uniform_delay(0.0, 0.0), Duration::ZERO);
    }

    #[test]
    fn classes_map_to_their_bands() {
        let pacer = JitterPacer::new(PacingConfig {
            search: (1.0, 2.0),
            document: (3.0, 4.0),
        });
        assert_eq!(pacer.band(PaceClass::Search), (1.0, 2.0));
        assert_eq!(pacer.band(PaceClass::Document), (3.0, 4.0));
    }

    #[tokio::test]
    async fn pace_waits_at_least_band_minimum() {
        let pacer = JitterPacer::new(PacingConfig {
            search: (0.05, 0.06),
            document: (0.0, 0.0),
        });
        let start = Instant::now();
        pacer.pace(PaceClass::Search).await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
