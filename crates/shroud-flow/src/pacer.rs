#![forbid(unsafe_code)]
use core::time::Duration;

use crate::config::FillerConfig;

/// Waits a run must observe before each record.
///
/// The first record waits out the initial delay, every later one the
/// inter-record interval. Zero durations yield no wait at all.
#[derive(Debug, Clone)]
pub struct Pacer {
    initial_delay: Duration,
    interval: Duration,
    records_paced: u64,
}

impl Pacer {
    pub fn new(config: &FillerConfig) -> Self {
        Self {
            initial_delay: config.initial_delay,
            interval: config.interval,
            records_paced: 0,
        }
    }

    /// Wait owed before the next record.
    pub fn next_wait(&mut self) -> Option<Duration> {
        let wait = if self.records_paced == 0 { self.initial_delay } else { self.interval };
        self.records_paced += 1;
        if wait.is_zero() { None } else { Some(wait) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_delay_then_interval() {
        let config = FillerConfig {
            initial_delay: Duration::from_millis(50),
            interval: Duration::from_millis(5),
            ..FillerConfig::default()
        };
        let mut pacer = Pacer::new(&config);
        assert_eq!(pacer.next_wait(), Some(Duration::from_millis(50)));
        assert_eq!(pacer.next_wait(), Some(Duration::from_millis(5)));
        assert_eq!(pacer.next_wait(), Some(Duration::from_millis(5)));
    }

    #[test]
    fn unpaced() {
        let mut pacer = Pacer::new(&FillerConfig::default());
        assert_eq!(pacer.next_wait(), None);
        assert_eq!(pacer.next_wait(), None);
    }

    #[test]
    fn interval_only() {
        let config = FillerConfig { interval: Duration::from_millis(2), ..FillerConfig::default() };
        let mut pacer = Pacer::new(&config);
        assert_eq!(pacer.next_wait(), None);
        assert_eq!(pacer.next_wait(), Some(Duration::from_millis(2)));
    }
}
