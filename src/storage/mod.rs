//! Storage layer - page files and page formats.
//!
//! This module provides the file collaborator the buffer pool consumes:
//! - [`PageFile`] / [`FileHandle`] - The contract and its shared handle
//! - [`DiskFile`] - Pages in a single file on disk
//! - [`MemFile`] - Pages in memory, with observable counters
//! - [`page`] - Page types and layouts

mod disk_file;
mod file;
mod mem_file;
pub mod page;

pub use disk_file::DiskFile;
pub use file::{FileHandle, PageFile};
pub use mem_file::{MemFile, MemFileProbe};
