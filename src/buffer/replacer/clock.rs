//! CLOCK (second-chance) replacement policy.
//!
//! Frames form a ring swept by a single hand. A referenced frame gets its
//! reference bit cleared and is passed over once; the first unpinned,
//! unreferenced frame the hand reaches is the victim. Empty frames are
//! taken immediately.

use log::{trace, warn};

use crate::buffer::descriptor::FrameDescriptor;
use crate::common::config::CLOCK_SWEEP_FACTOR;
use crate::common::{Error, FrameId, Result};

/// Outcome of a successful sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Victim {
    /// The frame holds no page and can be used as is.
    Empty(FrameId),
    /// The frame holds an unpinned, unreferenced page that must be evicted
    /// (written back if dirty, unmapped) before reuse.
    Occupied(FrameId),
}

impl Victim {
    #[inline]
    pub fn frame(&self) -> FrameId {
        match *self {
            Victim::Empty(fid) | Victim::Occupied(fid) => fid,
        }
    }
}

/// The clock hand and its sweep.
///
/// The hand persists across calls and moves forward one frame per inspected
/// frame, whatever the outcome. It starts on the last frame so the first
/// sweep begins at frame 0.
#[derive(Debug)]
pub struct ClockReplacer {
    hand: FrameId,
    num_frames: usize,
    /// Frames inspected over the replacer's lifetime.
    steps: u64,
}

impl ClockReplacer {
    /// Create a replacer for a pool of `num_frames` frames.
    ///
    /// # Panics
    /// Panics if `num_frames` is 0.
    pub fn new(num_frames: usize) -> Self {
        assert!(num_frames > 0, "num_frames must be > 0");
        Self {
            hand: FrameId::new(num_frames - 1),
            num_frames,
            steps: 0,
        }
    }

    /// Current hand position (the frame inspected last).
    #[inline]
    pub fn hand(&self) -> FrameId {
        self.hand
    }

    /// Total frames inspected by all sweeps so far.
    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Sweep from just after the hand until a frame can be reused.
    ///
    /// Clears the reference bit of every referenced frame it passes. Gives
    /// up after `CLOCK_SWEEP_FACTOR × num_frames` frames: one rotation to
    /// clear reference bits, one to find a frame that is now unreferenced.
    ///
    /// # Errors
    /// `Error::PoolExhausted` when every frame is pinned.
    pub fn select_victim(&mut self, descriptors: &mut [FrameDescriptor]) -> Result<Victim> {
        debug_assert_eq!(descriptors.len(), self.num_frames);

        for _ in 0..self.num_frames * CLOCK_SWEEP_FACTOR {
            self.hand = self.hand.next(self.num_frames);
            self.steps += 1;
            let desc = &mut descriptors[self.hand.0];

            if !desc.is_valid() {
                trace!("clock: {} is empty", self.hand);
                return Ok(Victim::Empty(self.hand));
            }
            if desc.ref_bit() {
                desc.clear_ref_bit();
                continue;
            }
            if desc.is_pinned() {
                continue;
            }

            trace!("clock: evicting {} from {}", desc.page_no(), self.hand);
            return Ok(Victim::Occupied(self.hand));
        }

        warn!("clock: all {} frames pinned", self.num_frames);
        Err(Error::PoolExhausted {
            num_frames: self.num_frames,
        })
    }
}
