#![forbid(unsafe_code)]
use core::time::Duration;

use shroud_core::{ShroudError, ShroudResult, MAX_FILLER_LEN};

/// Shape and pacing of filler records. Fixed for the lifetime of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillerConfig {
    /// Smallest filler payload, excluding the inner content-type byte.
    pub min_len: usize,
    /// Largest filler payload, excluding the inner content-type byte.
    pub max_len: usize,
    /// Gap between consecutive records. Zero disables pacing.
    pub interval: Duration,
    /// Delay before the first record of a run. Zero disables it.
    pub initial_delay: Duration,
}

impl Default for FillerConfig {
    fn default() -> Self {
        Self {
            min_len: 900,
            max_len: 1400,
            interval: Duration::ZERO,
            initial_delay: Duration::ZERO,
        }
    }
}

impl FillerConfig {
    pub fn new(
        min_len: usize,
        max_len: usize,
        interval: Duration,
        initial_delay: Duration,
    ) -> ShroudResult<Self> {
        let config = Self { min_len, max_len, interval, initial_delay };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ShroudResult<()> {
        if self.min_len > self.max_len {
            return Err(ShroudError::InvalidConfig("min_len > max_len"));
        }
        if self.max_len > MAX_FILLER_LEN {
            return Err(ShroudError::InvalidConfig("max_len exceeds record plaintext limit"));
        }
        Ok(())
    }
}
