//! Disk-backed page file.
//!
//! The [`DiskFile`] handles all direct file operations:
//! - Reading and writing pages with checksum verification
//! - Allocating pages, reusing deleted ones first
//! - Deleting pages by marking them free on disk

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, trace};

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::file::PageFile;
use crate::storage::page::{Page, PageHeader, PageType};

/// A single file of pages laid out sequentially.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Each page's header says whether it holds data or is free. Deleted pages
/// stay in the file as `Free` pages and are handed out again, lowest number
/// first, by [`PageFile::allocate_page`].
///
/// # Durability
/// All writes are followed by `fsync()`.
pub struct DiskFile {
    file: File,
    name: String,
    /// Number of page slots in the file, live or free.
    page_count: u32,
    free_pages: BTreeSet<PageId>,
}

impl DiskFile {
    /// Create a new page file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;

        Ok(Self {
            file,
            name: path.as_ref().display().to_string(),
            page_count: 0,
            free_pages: BTreeSet::new(),
        })
    }

    /// Open an existing page file, rebuilding the free list from page headers.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;

        let page_count = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;
        let mut free_pages = BTreeSet::new();
        let mut header = [0u8; PageHeader::SIZE];
        for n in 0..page_count {
            let page_no = PageId::new(n);
            file.seek(SeekFrom::Start(page_no.byte_offset()))?;
            file.read_exact(&mut header)?;
            if PageHeader::from_bytes(&header).page_type != PageType::Data {
                free_pages.insert(page_no);
            }
        }

        debug!(
            "opened {}: {} pages, {} free",
            path.as_ref().display(),
            page_count,
            free_pages.len()
        );

        Ok(Self {
            file,
            name: path.as_ref().display().to_string(),
            page_count,
            free_pages,
        })
    }

    /// Open an existing page file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Number of page slots in the file, including free ones.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Number of pages currently holding data.
    #[inline]
    pub fn live_page_count(&self) -> u32 {
        self.page_count - self.free_pages.len() as u32
    }

    fn is_live(&self, page_no: PageId) -> bool {
        page_no.0 < self.page_count && !self.free_pages.contains(&page_no)
    }

    fn not_found(&self, page_no: PageId) -> Error {
        Error::PageNotFound {
            file: self.name.clone(),
            page_no,
        }
    }

    /// Stamp the checksum on a copy of `page` and write it at its slot.
    fn write_slot(&mut self, page: &Page) -> Result<()> {
        let mut stamped = Page::new();
        stamped.copy_from(page);
        stamped.update_checksum();

        self.file.seek(SeekFrom::Start(page.page_no().byte_offset()))?;
        self.file.write_all(stamped.as_slice())?;
        self.file.sync_all()?;
        Ok(())
    }
}

impl PageFile for DiskFile {
    fn filename(&self) -> &str {
        &self.name
    }

    fn read_page(&mut self, page_no: PageId) -> Result<Page> {
        if !self.is_live(page_no) {
            return Err(self.not_found(page_no));
        }

        self.file.seek(SeekFrom::Start(page_no.byte_offset()))?;
        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;

        let header = page.header();
        let computed = PageHeader::compute_checksum(page.as_slice());
        if header.checksum != computed {
            return Err(Error::ChecksumMismatch {
                page_no,
                stored: header.checksum,
                computed,
            });
        }

        trace!("read {} from {}", page_no, self.name);
        Ok(page)
    }

    fn write_page(&mut self, page: &Page) -> Result<()> {
        let page_no = page.page_no();
        if !self.is_live(page_no) {
            return Err(self.not_found(page_no));
        }

        self.write_slot(page)?;
        trace!("wrote {} to {}", page_no, self.name);
        Ok(())
    }

    fn allocate_page(&mut self) -> Result<Page> {
        let page_no = match self.free_pages.first().copied() {
            Some(page_no) => page_no,
            None => PageId::new(self.page_count),
        };

        let page = Page::with_page_no(page_no);
        self.write_slot(&page)?;

        if !self.free_pages.remove(&page_no) {
            self.page_count += 1;
        }
        debug!("allocated {} in {}", page_no, self.name);
        Ok(page)
    }

    fn delete_page(&mut self, page_no: PageId) -> Result<()> {
        if !self.is_live(page_no) {
            return Err(self.not_found(page_no));
        }

        let mut page = Page::new();
        page.set_header(&PageHeader::new(PageType::Free, page_no.0));
        self.write_slot(&page)?;

        self.free_pages.insert(page_no);
        debug!("deleted {} from {}", page_no, self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_existing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        DiskFile::create(&path).unwrap();
        assert!(DiskFile::create(&path).is_err());
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let dir = tempdir().unwrap();
        assert!(DiskFile::open(dir.path().join("nonexistent.db")).is_err());
    }

    #[test]
    fn test_allocate_and_read_page() {
        let dir = tempdir().unwrap();
        let mut file = DiskFile::create(dir.path().join("test.db")).unwrap();

        let page = file.allocate_page().unwrap();
        assert_eq!(page.page_no(), PageId::new(0));
        assert_eq!(file.page_count(), 1);

        let read = file.read_page(PageId::new(0)).unwrap();
        assert_eq!(read.page_no(), PageId::new(0));
        assert!(read.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_and_read_page() {
        let dir = tempdir().unwrap();
        let mut file = DiskFile::create(dir.path().join("test.db")).unwrap();

        let mut page = file.allocate_page().unwrap();
        page.data_mut()[0] = 0xAB;
        page.data_mut()[Page::PAYLOAD_SIZE - 1] = 0xEF;
        file.write_page(&page).unwrap();

        let read = file.read_page(page.page_no()).unwrap();
        assert_eq!(read.data()[0], 0xAB);
        assert_eq!(read.data()[Page::PAYLOAD_SIZE - 1], 0xEF);
    }

    #[test]
    fn test_read_unallocated_page() {
        let dir = tempdir().unwrap();
        let mut file = DiskFile::create(dir.path().join("test.db")).unwrap();
        file.allocate_page().unwrap();

        assert!(matches!(
            file.read_page(PageId::new(1)),
            Err(Error::PageNotFound { .. })
        ));
    }

    #[test]
    fn test_write_unallocated_page() {
        let dir = tempdir().unwrap();
        let mut file = DiskFile::create(dir.path().join("test.db")).unwrap();

        let page = Page::with_page_no(PageId::new(0));
        assert!(file.write_page(&page).is_err());
    }

    #[test]
    fn test_delete_and_reuse() {
        let dir = tempdir().unwrap();
        let mut file = DiskFile::create(dir.path().join("test.db")).unwrap();

        for _ in 0..3 {
            file.allocate_page().unwrap();
        }
        file.delete_page(PageId::new(1)).unwrap();

        assert!(file.read_page(PageId::new(1)).is_err());
        assert!(file.delete_page(PageId::new(1)).is_err());
        assert_eq!(file.live_page_count(), 2);

        // Freed slot comes back before the file grows.
        let page = file.allocate_page().unwrap();
        assert_eq!(page.page_no(), PageId::new(1));
        assert_eq!(file.page_count(), 3);
    }

    #[test]
    fn test_persistence_and_free_list_rebuild() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut file = DiskFile::create(&path).unwrap();
            let mut page = file.allocate_page().unwrap();
            page.data_mut()[0] = 0x42;
            file.write_page(&page).unwrap();
            file.allocate_page().unwrap();
            file.delete_page(PageId::new(1)).unwrap();
        }

        let mut file = DiskFile::open(&path).unwrap();
        assert_eq!(file.page_count(), 2);
        assert_eq!(file.live_page_count(), 1);
        assert_eq!(file.read_page(PageId::new(0)).unwrap().data()[0], 0x42);
        assert!(file.read_page(PageId::new(1)).is_err());
    }

    #[test]
    fn test_corruption_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut file = DiskFile::create(&path).unwrap();
            file.allocate_page().unwrap();
        }

        // Flip a payload byte behind the file's back.
        {
            let mut raw = OpenOptions::new().write(true).open(&path).unwrap();
            raw.seek(SeekFrom::Start(100)).unwrap();
            raw.write_all(&[0xFF]).unwrap();
        }

        let mut file = DiskFile::open(&path).unwrap();
        assert!(matches!(
            file.read_page(PageId::new(0)),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_open_or_create() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut file = DiskFile::open_or_create(&path).unwrap();
            assert_eq!(file.page_count(), 0);
            file.allocate_page().unwrap();
        }

        let file = DiskFile::open_or_create(&path).unwrap();
        assert_eq!(file.page_count(), 1);
    }
}
