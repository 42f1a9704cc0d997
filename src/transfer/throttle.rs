//! Throttle policy
//!
//! Fixed-size chunks separated by a fixed delay. The default of 40960 bytes
//! every 0.1 s is roughly 400 KB/s.

use std::time::Duration;

/// Invalid throttle settings
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThrottleError {
    #[error("chunk size must be greater than zero")]
    ZeroChunk,
    #[error("delay must be a finite, non-negative number of seconds, got {0}")]
    InvalidDelay(f64),
}

/// Chunk size and delay applied after every chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    chunk_bytes: usize,
    delay: Duration,
}

impl ThrottlePolicy {
    pub const DEFAULT_CHUNK_BYTES: usize = 40_960;
    pub const DEFAULT_DELAY_SECS: f64 = 0.1;

    /// Build a policy from a chunk size and a delay in fractional seconds
    pub fn new(chunk_bytes: usize, delay_secs: f64) -> Result<Self, ThrottleError> {
        if chunk_bytes == 0 {
            return Err(ThrottleError::ZeroChunk);
        }
        let delay = Duration::try_from_secs_f64(delay_secs)
            .map_err(|_| ThrottleError::InvalidDelay(delay_secs))?;
        Ok(Self { chunk_bytes, delay })
    }

    /// Policy without pacing, one chunk right after the other
    pub fn unthrottled(chunk_bytes: usize) -> Result<Self, ThrottleError> {
        Self::new(chunk_bytes, 0.0)
    }

    #[inline]
    pub const fn chunk_bytes(&self) -> usize {
        self.chunk_bytes
    }

    #[inline]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of read/write cycles needed for `len` bytes
    pub fn cycles(&self, len: u64) -> u64 {
        len.div_ceil(self.chunk_bytes as u64)
    }

    /// Time spent pacing a complete transfer of `len` bytes
    pub fn pacing_time(&self, len: u64) -> Duration {
        let cycles = u32::try_from(self.cycles(len)).unwrap_or(u32::MAX);
        self.delay.saturating_mul(cycles)
    }
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            chunk_bytes: Self::DEFAULT_CHUNK_BYTES,
            delay: Duration::from_secs_f64(Self::DEFAULT_DELAY_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = ThrottlePolicy::default();
        assert_eq!(policy.chunk_bytes(), 40_960);
        assert_eq!(policy.delay(), Duration::from_millis(100));
        assert_eq!(
            ThrottlePolicy::new(
                ThrottlePolicy::DEFAULT_CHUNK_BYTES,
                ThrottlePolicy::DEFAULT_DELAY_SECS
            ),
            Ok(policy)
        );
    }

    #[test]
    fn test_invalid_policy() {
        assert_eq!(ThrottlePolicy::new(0, 0.1), Err(ThrottleError::ZeroChunk));
        assert!(matches!(
            ThrottlePolicy::new(10, -1.0),
            Err(ThrottleError::InvalidDelay(_))
        ));
        assert!(ThrottlePolicy::new(10, f64::NAN).is_err());
        assert!(ThrottlePolicy::new(10, f64::INFINITY).is_err());
    }

    #[test]
    fn test_cycles() {
        let policy = ThrottlePolicy::new(100, 0.5).unwrap();
        assert_eq!(policy.cycles(0), 0);
        assert_eq!(policy.cycles(1), 1);
        assert_eq!(policy.cycles(100), 1);
        assert_eq!(policy.cycles(101), 2);
        assert_eq!(policy.cycles(1000), 10);
        assert_eq!(policy.pacing_time(250), Duration::from_millis(1500));
    }
}
