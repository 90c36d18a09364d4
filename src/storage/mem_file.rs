//! In-memory page file.
//!
//! [`MemFile`] keeps pages in a `Vec` and counts every operation through a
//! shared [`MemFileProbe`], which stays observable after the file has been
//! moved into a [`FileHandle`](crate::storage::FileHandle). The probe can
//! also make writes fail, to exercise error propagation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::common::{Error, PageId, Result};
use crate::storage::file::PageFile;
use crate::storage::page::Page;

/// Counters and fault switch shared between a [`MemFile`] and its owner.
#[derive(Debug, Default)]
pub struct MemFileProbe {
    pub reads: AtomicU64,
    pub writes: AtomicU64,
    pub allocations: AtomicU64,
    pub deletions: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemFileProbe {
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn allocations(&self) -> u64 {
        self.allocations.load(Ordering::Relaxed)
    }

    pub fn deletions(&self) -> u64 {
        self.deletions.load(Ordering::Relaxed)
    }

    /// Make every subsequent `write_page` fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }
}

/// A page file living entirely in memory.
///
/// Page numbers are handed out sequentially and deleted numbers are not
/// reused, which keeps test expectations simple.
pub struct MemFile {
    name: String,
    pages: Vec<Option<Box<Page>>>,
    probe: Arc<MemFileProbe>,
}

impl MemFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pages: Vec::new(),
            probe: Arc::new(MemFileProbe::default()),
        }
    }

    /// Shared handle to this file's counters.
    pub fn probe(&self) -> Arc<MemFileProbe> {
        Arc::clone(&self.probe)
    }

    fn slot(&self, page_no: PageId) -> Option<&Page> {
        self.pages.get(page_no.0 as usize)?.as_deref()
    }

    fn not_found(&self, page_no: PageId) -> Error {
        Error::PageNotFound {
            file: self.name.clone(),
            page_no,
        }
    }
}

impl PageFile for MemFile {
    fn filename(&self) -> &str {
        &self.name
    }

    fn read_page(&mut self, page_no: PageId) -> Result<Page> {
        let stored = self.slot(page_no).ok_or_else(|| self.not_found(page_no))?;
        let mut page = Page::new();
        page.copy_from(stored);
        self.probe.reads.fetch_add(1, Ordering::Relaxed);
        Ok(page)
    }

    fn write_page(&mut self, page: &Page) -> Result<()> {
        if self.probe.fail_writes.load(Ordering::Relaxed) {
            return Err(Error::Io(std::io::Error::other(format!(
                "injected write failure on {}",
                self.name
            ))));
        }

        let page_no = page.page_no();
        let not_found = self.not_found(page_no);
        let stored = self
            .pages
            .get_mut(page_no.0 as usize)
            .and_then(|slot| slot.as_deref_mut())
            .ok_or(not_found)?;
        stored.copy_from(page);
        self.probe.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn allocate_page(&mut self) -> Result<Page> {
        let page_no = PageId::new(self.pages.len() as u32);
        self.pages.push(Some(Box::new(Page::with_page_no(page_no))));
        self.probe.allocations.fetch_add(1, Ordering::Relaxed);
        Ok(Page::with_page_no(page_no))
    }

    fn delete_page(&mut self, page_no: PageId) -> Result<()> {
        let not_found = self.not_found(page_no);
        let slot = self
            .pages
            .get_mut(page_no.0 as usize)
            .filter(|slot| slot.is_some())
            .ok_or(not_found)?;
        *slot = None;
        self.probe.deletions.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_is_sequential() {
        let mut file = MemFile::new("mem.db");
        assert_eq!(file.allocate_page().unwrap().page_no(), PageId::new(0));
        assert_eq!(file.allocate_page().unwrap().page_no(), PageId::new(1));
        assert_eq!(file.probe().allocations(), 2);
    }

    #[test]
    fn test_write_then_read() {
        let mut file = MemFile::new("mem.db");
        let mut page = file.allocate_page().unwrap();
        page.data_mut()[3] = 9;
        file.write_page(&page).unwrap();

        assert_eq!(file.read_page(page.page_no()).unwrap().data()[3], 9);
        assert_eq!(file.probe().writes(), 1);
        assert_eq!(file.probe().reads(), 1);
    }

    #[test]
    fn test_deleted_page_is_gone() {
        let mut file = MemFile::new("mem.db");
        let page = file.allocate_page().unwrap();
        file.delete_page(page.page_no()).unwrap();

        assert!(file.read_page(page.page_no()).is_err());
        assert!(file.write_page(&page).is_err());
        assert!(file.delete_page(page.page_no()).is_err());
    }

    #[test]
    fn test_injected_write_failure() {
        let mut file = MemFile::new("mem.db");
        let page = file.allocate_page().unwrap();
        let probe = file.probe();

        probe.set_fail_writes(true);
        assert!(matches!(file.write_page(&page), Err(Error::Io(_))));

        probe.set_fail_writes(false);
        assert!(file.write_page(&page).is_ok());
    }
}
