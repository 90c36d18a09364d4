//! RAII guard for pinned pages in a shared pool.
//!
//! A [`PinnedPage`] holds one pin on a page of a
//! [`SharedBufferManager`]. Contents are reached through closures that run
//! under the pool lock, and the pin is released when the guard drops.
//!
//! A guard is tied to one residency of its page, not just to the
//! `(file, page_no)` key. Once that page is disposed or flushed out, the
//! guard goes stale: reads and writes fail with `PageNotFound` and dropping
//! it leaves the pool alone, even if the same page number is cached again.

use log::{debug, warn};

use super::descriptor::Residency;
use super::shared::SharedBufferManager;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;
use crate::storage::FileHandle;

/// One pin on a cached page.
///
/// Any [`write`](PinnedPage::write) marks the page dirty, and the dirty flag
/// is passed to `unpin_page` when the guard is released.
///
/// # Example
/// ```ignore
/// let mut guard = pool.fetch_page(&file, page_no)?;
/// guard.write(|page| page.data_mut()[0] = 0xFF)?;
/// // guard drops here, page unpinned as dirty
/// ```
pub struct PinnedPage<'a> {
    /// Pool to unpin from on drop.
    pool: &'a SharedBufferManager,
    file: FileHandle,
    page_no: PageId,
    residency: Residency,
    dirty: bool,
    released: bool,
}

impl<'a> PinnedPage<'a> {
    /// Wrap a pin that the caller has already taken.
    pub(crate) fn new(
        pool: &'a SharedBufferManager,
        file: FileHandle,
        page_no: PageId,
        residency: Residency,
    ) -> Self {
        Self {
            pool,
            file,
            page_no,
            residency,
            dirty: false,
            released: false,
        }
    }

    #[inline]
    pub fn page_no(&self) -> PageId {
        self.page_no
    }

    #[inline]
    pub fn file(&self) -> &FileHandle {
        &self.file
    }

    /// Run `f` on the page contents.
    ///
    /// # Errors
    /// `Error::PageNotFound` if the page left the pool while pinned.
    pub fn read<R>(&self, f: impl FnOnce(&Page) -> R) -> Result<R> {
        let bpm = self.pool.lock();
        let page = bpm
            .resident_page(self.residency)
            .ok_or_else(|| self.gone())?;
        Ok(f(page))
    }

    /// Run `f` on the page contents mutably and mark the page dirty.
    ///
    /// # Errors
    /// `Error::PageNotFound` if the page left the pool while pinned.
    pub fn write<R>(&mut self, f: impl FnOnce(&mut Page) -> R) -> Result<R> {
        let mut bpm = self.pool.lock();
        let page = bpm
            .resident_page_mut(self.residency)
            .ok_or_else(|| self.gone())?;
        let out = f(page);
        self.dirty = true;
        Ok(out)
    }

    /// Unpin now and report any error instead of logging it.
    ///
    /// A stale guard releases nothing and returns `Ok(())`.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.unpin().map(|_| ())
    }

    fn unpin(&self) -> Result<bool> {
        let unpinned = self
            .pool
            .lock()
            .unpin_resident(self.residency, self.dirty)?;
        if !unpinned {
            debug!("stale guard for {} of {} released nothing", self.page_no, self.file);
        }
        Ok(unpinned)
    }

    fn gone(&self) -> Error {
        Error::PageNotFound {
            file: self.file.filename().to_string(),
            page_no: self.page_no,
        }
    }
}

impl Drop for PinnedPage<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.unpin() {
            warn!("unpin of {} of {} on drop failed: {}", self.page_no, self.file, e);
        }
    }
}
