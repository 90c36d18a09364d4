//! Error types for clockbuf.

use thiserror::Error;

use crate::common::{FrameId, PageId};

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the buffer pool and its file collaborators.
///
/// Buffer-pool variants carry the file name, page number and frame index
/// involved so a misuse can be traced back to its caller.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist in the file (never allocated or deleted).
    #[error("page {page_no} not found in file {file}")]
    PageNotFound { file: String, page_no: PageId },

    /// Every frame is pinned, so the clock sweep could not find a victim.
    ///
    /// The caller must unpin pages or build a larger pool.
    #[error("buffer pool exhausted: all {num_frames} frames are pinned")]
    PoolExhausted { num_frames: usize },

    /// Unpin requested on a page whose pin count is already zero.
    ///
    /// This indicates a bug - unpinning should match pinning.
    #[error("page {page_no} of file {file} in {frame} is not pinned")]
    PageNotPinned {
        file: String,
        page_no: PageId,
        frame: FrameId,
    },

    /// Flush or shutdown found a frame that is still pinned.
    #[error("page {page_no} of file {file} in {frame} is still pinned")]
    PagePinned {
        file: String,
        page_no: PageId,
        frame: FrameId,
    },

    /// A frame descriptor is internally inconsistent (invalid but still
    /// associated with a file). The pool instance should not be trusted
    /// afterwards.
    #[error("corrupt descriptor for {frame}: valid={valid} dirty={dirty} ref_bit={ref_bit}")]
    CorruptDescriptor {
        frame: FrameId,
        valid: bool,
        dirty: bool,
        ref_bit: bool,
    },

    /// A (file, page) key was inserted into the page index twice.
    #[error("page {page_no} of file {file} is already mapped to {frame}")]
    PageAlreadyMapped {
        file: String,
        page_no: PageId,
        frame: FrameId,
    },

    /// Stored page checksum does not match the page contents.
    #[error("checksum mismatch on page {page_no}: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        page_no: PageId,
        stored: u32,
        computed: u32,
    },

    /// Rejected buffer pool configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PoolExhausted { num_frames: 3 };
        assert_eq!(
            format!("{}", err),
            "buffer pool exhausted: all 3 frames are pinned"
        );

        let err = Error::PageNotPinned {
            file: "a.db".to_string(),
            page_no: PageId::new(7),
            frame: FrameId::new(2),
        };
        assert_eq!(
            format!("{}", err),
            "page Page(7) of file a.db in Frame(2) is not pinned"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error as _;

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = Error::from(io_err);
        assert!(err.source().is_some());
        assert!(Error::PoolExhausted { num_frames: 1 }.source().is_none());
    }
}
