//! Page number type.

use std::fmt;

use crate::common::config::PAGE_SIZE;

/// Identifies a page within one file.
///
/// Page numbers are only unique per file; the buffer pool keys its page
/// index on `(FileId, PageId)`.
///
/// # Example
/// ```
/// use clockbuf::PageId;
///
/// let page_no = PageId::new(42);
/// assert!(page_no.is_valid());
/// assert_eq!(page_no.byte_offset(), 42 * 4096);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Sentinel for "no page", e.g. the page number of an empty frame.
    pub const INVALID: PageId = PageId(u32::MAX);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Offset of this page inside a page file.
    #[inline]
    pub fn byte_offset(&self) -> u64 {
        self.0 as u64 * PAGE_SIZE as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}
