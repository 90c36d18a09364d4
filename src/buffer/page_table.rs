//! Page index - maps (file, page number) to the frame caching it.

use std::collections::HashMap;

use crate::common::{Error, FileId, FrameId, PageId, Result};
use crate::storage::FileHandle;

/// Maps page identities to frame indices.
///
/// Holds at most one entry per key. A lookup miss is an ordinary `None`,
/// never an error.
#[derive(Debug, Default)]
pub struct PageTable {
    entries: HashMap<(FileId, PageId), FrameId>,
}

impl PageTable {
    /// Create a table sized for `num_frames` entries.
    pub fn with_capacity(num_frames: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(num_frames),
        }
    }

    /// Register that `page_no` of `file` now lives in `frame`.
    ///
    /// # Errors
    /// `Error::PageAlreadyMapped` if the key is already present; the existing
    /// entry is left untouched.
    pub fn insert(&mut self, file: &FileHandle, page_no: PageId, frame: FrameId) -> Result<()> {
        let key = (file.id(), page_no);
        if let Some(&existing) = self.entries.get(&key) {
            return Err(Error::PageAlreadyMapped {
                file: file.filename().to_string(),
                page_no,
                frame: existing,
            });
        }
        self.entries.insert(key, frame);
        Ok(())
    }

    #[inline]
    pub fn lookup(&self, file: FileId, page_no: PageId) -> Option<FrameId> {
        self.entries.get(&(file, page_no)).copied()
    }

    /// Remove a mapping, returning the frame it pointed at.
    #[inline]
    pub fn remove(&mut self, file: FileId, page_no: PageId) -> Option<FrameId> {
        self.entries.remove(&(file, page_no))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
