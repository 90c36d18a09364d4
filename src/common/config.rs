//! Configuration for clockbuf.

use crate::common::{Error, Result};

/// Size of a page in bytes (4KB).
///
/// Every frame in the pool holds exactly one page of this size, and the
/// page files lay pages out at multiples of it.
pub const PAGE_SIZE: usize = 4096;

/// Number of frames used by [`BufferPoolConfig::default`].
pub const DEFAULT_POOL_SIZE: usize = 64;

/// How many full rotations the clock hand may make before giving up.
///
/// One rotation may be spent clearing reference bits, the second finds a
/// frame that is now unreferenced and unpinned.
pub const CLOCK_SWEEP_FACTOR: usize = 2;

/// Sizing parameters for a buffer pool.
///
/// # Example
/// ```
/// use clockbuf::common::config::BufferPoolConfig;
///
/// let config = BufferPoolConfig::default().num_frames(16);
/// assert!(config.validate().is_ok());
/// assert!(BufferPoolConfig::default().num_frames(0).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Fixed number of frames, allocated once at construction.
    pub num_frames: usize,
}

impl BufferPoolConfig {
    /// Set the number of frames.
    pub fn num_frames(mut self, num_frames: usize) -> Self {
        self.num_frames = num_frames;
        self
    }

    /// Reject configurations the pool cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.num_frames == 0 {
            return Err(Error::InvalidConfig(
                "num_frames must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            num_frames: DEFAULT_POOL_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert_eq!(PAGE_SIZE, 4096);
    }

    #[test]
    fn test_default_config() {
        let config = BufferPoolConfig::default();
        assert_eq!(config.num_frames, DEFAULT_POOL_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_frames_rejected() {
        let err = BufferPoolConfig::default().num_frames(0).validate();
        assert!(matches!(err, Err(Error::InvalidConfig(_))));
    }
}
