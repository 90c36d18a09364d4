//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache layer between storage engines
//! and page files. It manages a fixed pool of frames, each holding one page.
//!
//! # Components
//! - [`BufferManager`] - The page cache and its pin/unpin/flush protocol
//! - [`FrameDescriptor`] - Per-frame metadata (validity, pins, dirty, ref bit)
//! - [`PageTable`] - (file, page) → frame index
//! - [`replacer`] - Clock eviction policy
//! - [`SharedBufferManager`] / [`PinnedPage`] - Locked pool with RAII pins
//! - [`BufferPoolStats`] - Performance statistics

mod buffer_manager;
mod descriptor;
mod page_guard;
mod page_table;
pub mod replacer;
mod shared;
mod stats;

pub use buffer_manager::BufferManager;
pub use descriptor::FrameDescriptor;
pub use page_guard::PinnedPage;
pub use page_table::PageTable;
pub use shared::SharedBufferManager;
pub use stats::{BufferPoolStats, StatsSnapshot};
