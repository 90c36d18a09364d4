//! Frame index type.

use std::fmt;

/// Index of a frame in the buffer pool.
///
/// The frame store and the descriptor table are parallel arrays, so one
/// `FrameId` addresses both: `frames[fid.0]` and `descriptors[fid.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub usize);

impl FrameId {
    /// Create a new FrameId.
    #[inline]
    pub fn new(id: usize) -> Self {
        FrameId(id)
    }

    /// The next frame in clock order, wrapping at `num_frames`.
    #[inline]
    pub fn next(self, num_frames: usize) -> Self {
        FrameId((self.0 + 1) % num_frames)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}
