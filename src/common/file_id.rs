//! File identity type.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an open page file.
///
/// Two handles compare equal only if they refer to the same open file, which
/// is what the buffer pool uses to decide frame ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u64);

impl FileId {
    /// Hand out a fresh identity. Never returns the same value twice.
    pub fn next() -> Self {
        FileId(NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_ids_are_unique() {
        let a = FileId::next();
        let b = FileId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }
}
