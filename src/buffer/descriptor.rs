//! Frame descriptors - per-frame bookkeeping for the buffer pool.
//!
//! The descriptor table is index-aligned with the frame store: descriptor
//! `i` describes the page cached in frame `i`. A [`FrameDescriptor`] tracks:
//! - Whether the frame holds a live page, and which (file, page) it is
//! - Pin count for reference counting
//! - Dirty flag for write-back tracking
//! - Reference bit for the clock replacer's second chance

use std::fmt;

use crate::common::{Error, FileId, FrameId, PageId, Result};
use crate::storage::FileHandle;

/// One stay of one page in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Residency {
    pub(crate) frame: FrameId,
    pub(crate) generation: u64,
}

/// Metadata for one frame.
///
/// # Invariants
/// - An invalid descriptor has `pin_count == 0`, `dirty == false`,
///   `ref_bit == false` and no owning file.
/// - `file` and `page_no` are meaningful only while `valid`.
/// - `generation` changes on every `set` and `clear`, so a (frame,
///   generation) pair names one residency of one page.
#[derive(Debug)]
pub struct FrameDescriptor {
    frame: FrameId,
    valid: bool,
    dirty: bool,
    ref_bit: bool,
    pin_count: u32,
    file: Option<FileHandle>,
    page_no: PageId,
    generation: u64,
}

impl FrameDescriptor {
    /// Create an empty descriptor for `frame`.
    pub fn new(frame: FrameId) -> Self {
        Self {
            frame,
            valid: false,
            dirty: false,
            ref_bit: false,
            pin_count: 0,
            file: None,
            page_no: PageId::INVALID,
            generation: 0,
        }
    }

    /// Mark the frame as holding `page_no` of `file`, pinned once and
    /// freshly referenced.
    pub fn set(&mut self, file: FileHandle, page_no: PageId) {
        self.valid = true;
        self.dirty = false;
        self.ref_bit = true;
        self.pin_count = 1;
        self.file = Some(file);
        self.page_no = page_no;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Reset to the empty state.
    pub fn clear(&mut self) {
        self.valid = false;
        self.dirty = false;
        self.ref_bit = false;
        self.pin_count = 0;
        self.file = None;
        self.page_no = PageId::INVALID;
        self.generation = self.generation.wrapping_add(1);
    }

    // ========================================================================
    // Identity
    // ========================================================================

    #[inline]
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[inline]
    pub fn file(&self) -> Option<&FileHandle> {
        self.file.as_ref()
    }

    #[inline]
    pub fn page_no(&self) -> PageId {
        self.page_no
    }

    /// Residency counter, bumped whenever the frame is filled or emptied.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn residency(&self) -> Residency {
        Residency {
            frame: self.frame,
            generation: self.generation,
        }
    }

    /// Whether this frame is associated with `file`, valid or not.
    #[inline]
    pub fn belongs_to(&self, file: FileId) -> bool {
        self.file.as_ref().is_some_and(|f| f.id() == file)
    }

    // ========================================================================
    // Pinning
    // ========================================================================

    /// Add a pin and set the reference bit (a cache hit).
    pub fn pin(&mut self) -> u32 {
        self.ref_bit = true;
        self.pin_count += 1;
        self.pin_count
    }

    /// Drop one pin, recording a modification if `dirty`.
    ///
    /// The dirty flag is sticky; only a write-back clears it.
    ///
    /// # Errors
    /// `Error::PageNotPinned` if the pin count is already zero.
    pub fn unpin(&mut self, dirty: bool) -> Result<u32> {
        if self.pin_count == 0 {
            return Err(Error::PageNotPinned {
                file: self.file_name().to_string(),
                page_no: self.page_no,
                frame: self.frame,
            });
        }
        self.pin_count -= 1;
        if dirty {
            self.dirty = true;
        }
        Ok(self.pin_count)
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }

    // ========================================================================
    // Dirty and reference bits
    // ========================================================================

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Called once the frame's contents have reached the file.
    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    #[inline]
    pub fn ref_bit(&self) -> bool {
        self.ref_bit
    }

    #[inline]
    pub fn clear_ref_bit(&mut self) {
        self.ref_bit = false;
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    pub(crate) fn file_name(&self) -> &str {
        self.file.as_ref().map_or("<none>", |f| f.filename())
    }

    /// `Error::PagePinned` describing this frame.
    pub(crate) fn pinned_error(&self) -> Error {
        Error::PagePinned {
            file: self.file_name().to_string(),
            page_no: self.page_no,
            frame: self.frame,
        }
    }

    /// `Error::CorruptDescriptor` describing this frame.
    pub(crate) fn corrupt_error(&self) -> Error {
        Error::CorruptDescriptor {
            frame: self.frame,
            valid: self.valid,
            dirty: self.dirty,
            ref_bit: self.ref_bit,
        }
    }

    #[cfg(test)]
    pub(crate) fn force_invalid(&mut self) {
        self.valid = false;
    }
}

impl fmt::Display for FrameDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame {:>4}  valid={:<5} file={} page={} dirty={:<5} ref={:<5} pins={}",
            self.frame.0,
            self.valid,
            self.file_name(),
            self.page_no,
            self.dirty,
            self.ref_bit,
            self.pin_count
        )
    }
}
