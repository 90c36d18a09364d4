//! Thread-safe wrapper around a [`BufferManager`].
//!
//! The clock hand, the descriptor table and the page table are only
//! consistent as a whole, so every operation (and every sweep) runs behind
//! one `parking_lot::Mutex` per pool.

use parking_lot::{Mutex, MutexGuard};

use crate::buffer::{BufferManager, PinnedPage};
use crate::common::{PageId, Result};
use crate::storage::FileHandle;

/// A [`BufferManager`] that can be shared between threads.
///
/// Pages are handed out as [`PinnedPage`] guards, which reach the frame
/// contents through the lock and unpin themselves when dropped.
///
/// # Example
/// ```
/// use clockbuf::{BufferManager, FileHandle, MemFile, SharedBufferManager};
///
/// let file = FileHandle::new(MemFile::new("shared.db"));
/// let pool = SharedBufferManager::new(BufferManager::new(4));
///
/// let page_no = {
///     let mut guard = pool.new_page(&file).unwrap();
///     guard.write(|page| page.data_mut()[0] = 1).unwrap();
///     guard.page_no()
/// }; // unpinned (dirty) here
///
/// let guard = pool.fetch_page(&file, page_no).unwrap();
/// assert_eq!(guard.read(|page| page.data()[0]).unwrap(), 1);
/// ```
pub struct SharedBufferManager {
    inner: Mutex<BufferManager>,
}

impl SharedBufferManager {
    pub fn new(bpm: BufferManager) -> Self {
        Self {
            inner: Mutex::new(bpm),
        }
    }

    /// Pin an existing page.
    pub fn fetch_page(&self, file: &FileHandle, page_no: PageId) -> Result<PinnedPage<'_>> {
        let residency = self.inner.lock().pin_resident(file, page_no)?;
        Ok(PinnedPage::new(self, file.clone(), page_no, residency))
    }

    /// Allocate and pin a new page.
    pub fn new_page(&self, file: &FileHandle) -> Result<PinnedPage<'_>> {
        let (page_no, residency) = self.inner.lock().alloc_resident(file)?;
        Ok(PinnedPage::new(self, file.clone(), page_no, residency))
    }

    pub fn unpin_page(&self, file: &FileHandle, page_no: PageId, dirty: bool) -> Result<()> {
        self.inner.lock().unpin_page(file, page_no, dirty)
    }

    pub fn dispose_page(&self, file: &FileHandle, page_no: PageId) -> Result<()> {
        self.inner.lock().dispose_page(file, page_no)
    }

    pub fn flush_file(&self, file: &FileHandle) -> Result<()> {
        self.inner.lock().flush_file(file)
    }

    /// Lock the pool for a batch of operations.
    pub fn lock(&self) -> MutexGuard<'_, BufferManager> {
        self.inner.lock()
    }

    /// Take the manager back, e.g. to call [`BufferManager::shutdown`].
    pub fn into_inner(self) -> BufferManager {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use crate::storage::{DiskFile, MemFile};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_guard_unpins_on_drop() {
        let file = FileHandle::new(MemFile::new("s.db"));
        let pool = SharedBufferManager::new(BufferManager::new(2));

        let guard = pool.new_page(&file).unwrap();
        let page_no = guard.page_no();
        assert_eq!(pool.lock().pin_count(&file, page_no), Some(1));

        drop(guard);
        assert_eq!(pool.lock().pin_count(&file, page_no), Some(0));
        assert_eq!(pool.lock().is_dirty(&file, page_no), Some(false));
    }

    #[test]
    fn test_write_marks_dirty() {
        let file = FileHandle::new(MemFile::new("s.db"));
        let pool = SharedBufferManager::new(BufferManager::new(2));

        let mut guard = pool.new_page(&file).unwrap();
        let page_no = guard.page_no();
        guard.write(|page| page.data_mut()[0] = 0xCD).unwrap();
        guard.release().unwrap();

        assert_eq!(pool.lock().is_dirty(&file, page_no), Some(true));
    }

    #[test]
    fn test_guards_exhaust_pool() {
        let file = FileHandle::new(MemFile::new("s.db"));
        let pool = SharedBufferManager::new(BufferManager::new(2));

        let _a = pool.new_page(&file).unwrap();
        let _b = pool.new_page(&file).unwrap();
        assert!(matches!(
            pool.new_page(&file),
            Err(Error::PoolExhausted { .. })
        ));
    }

    #[test]
    fn test_read_after_dispose_fails() {
        let file = FileHandle::new(MemFile::new("s.db"));
        let pool = SharedBufferManager::new(BufferManager::new(2));

        let guard = pool.new_page(&file).unwrap();
        pool.dispose_page(&file, guard.page_no()).unwrap();
        assert!(matches!(
            guard.read(|page| page.data()[0]),
            Err(Error::PageNotFound { .. })
        ));
    }

    /// A guard outliving its page must not reach a later page that reuses
    /// the same number, nor release that page's pin.
    #[test]
    fn test_disposed_guard_does_not_touch_reused_page() {
        let dir = tempfile::tempdir().unwrap();
        let file = FileHandle::new(DiskFile::create(dir.path().join("reuse.db")).unwrap());
        let pool = SharedBufferManager::new(BufferManager::new(4));

        let mut old = pool.new_page(&file).unwrap();
        let page_no = old.page_no();
        pool.dispose_page(&file, page_no).unwrap();

        let fresh = pool.new_page(&file).unwrap();
        assert_eq!(fresh.page_no(), page_no);

        assert!(matches!(
            old.write(|page| page.data_mut()[0] = 0xEE),
            Err(Error::PageNotFound { .. })
        ));
        assert!(matches!(
            old.read(|page| page.data()[0]),
            Err(Error::PageNotFound { .. })
        ));
        drop(old);

        assert_eq!(fresh.read(|page| page.data()[0]).unwrap(), 0);
        assert_eq!(pool.lock().pin_count(&file, page_no), Some(1));

        fresh.release().unwrap();
        assert_eq!(pool.lock().pin_count(&file, page_no), Some(0));
        assert_eq!(pool.lock().is_dirty(&file, page_no), Some(false));
    }

    /// Same for a page flushed out and read back into the pool.
    #[test]
    fn test_released_guard_after_flush_is_stale() {
        let file = FileHandle::new(MemFile::new("s.db"));
        let pool = SharedBufferManager::new(BufferManager::new(2));

        let guard = pool.new_page(&file).unwrap();
        let page_no = guard.page_no();
        pool.unpin_page(&file, page_no, false).unwrap();
        pool.flush_file(&file).unwrap();

        let again = pool.fetch_page(&file, page_no).unwrap();
        drop(guard);
        assert_eq!(pool.lock().pin_count(&file, page_no), Some(1));
        drop(again);
        assert_eq!(pool.lock().pin_count(&file, page_no), Some(0));
    }

    #[test]
    fn test_concurrent_writers() {
        let file = FileHandle::new(MemFile::new("s.db"));
        let pool = Arc::new(SharedBufferManager::new(BufferManager::new(4)));

        let page_nos: Vec<PageId> = (0..4)
            .map(|_| pool.new_page(&file).unwrap().page_no())
            .collect();

        let handles: Vec<_> = page_nos
            .iter()
            .enumerate()
            .map(|(i, &page_no)| {
                let pool = Arc::clone(&pool);
                let file = file.clone();
                thread::spawn(move || {
                    for j in 0..50u8 {
                        let mut guard = pool.fetch_page(&file, page_no).unwrap();
                        guard
                            .write(|page| page.data_mut()[0] = (i as u8).wrapping_mul(50).wrapping_add(j))
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        for (i, &page_no) in page_nos.iter().enumerate() {
            let guard = pool.fetch_page(&file, page_no).unwrap();
            let expected = (i as u8).wrapping_mul(50).wrapping_add(49);
            assert_eq!(guard.read(|page| page.data()[0]).unwrap(), expected);
        }
    }
}
