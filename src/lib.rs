//! clockbuf - a fixed-capacity page buffer pool with clock replacement.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Callers (access methods)                     │
//! │        read_page / alloc_page / unpin_page / dispose_page       │
//! │                     flush_file / shutdown                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Buffer Pool (buffer/)                       │   │
//! │  │   ┌─────────────────────────────────────────────────┐   │   │
//! │  │   │   Clock replacer (second chance, 2× sweep cap)  │   │   │
//! │  │   └─────────────────────────────────────────────────┘   │   │
//! │  │   BufferManager + FrameDescriptor table + PageTable     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │   PageFile trait + FileHandle, DiskFile, MemFile, Page   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, FileId, Error, config)
//! - [`buffer`] - Buffer pool management and the clock replacer
//! - [`storage`] - Page files and page formats
//!
//! # Quick Start
//! ```no_run
//! use clockbuf::{BufferManager, DiskFile, FileHandle};
//!
//! let file = FileHandle::new(DiskFile::create("my_table.db").unwrap());
//! let mut bpm = BufferManager::new(64);
//!
//! let (page_no, page) = bpm.alloc_page(&file).unwrap();
//! page.data_mut()[..5].copy_from_slice(b"hello");
//! bpm.unpin_page(&file, page_no, true).unwrap();
//!
//! bpm.flush_file(&file).unwrap();
//! bpm.shutdown().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{BufferPoolConfig, PAGE_SIZE};
pub use common::{Error, FileId, FrameId, PageId, Result};

pub use buffer::{BufferManager, BufferPoolStats, PinnedPage, SharedBufferManager, StatsSnapshot};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::{DiskFile, FileHandle, MemFile, PageFile};
