//! The page-file collaborator consumed by the buffer pool.
//!
//! The buffer pool never touches storage directly. It talks to a
//! [`PageFile`] through a [`FileHandle`], which gives every open file a
//! process-unique [`FileId`] and lets frame descriptors keep a reference to
//! the file that owns their page.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::{FileId, PageId, Result};
use crate::storage::page::Page;

/// A file of fixed-size pages.
///
/// Implementations decide where pages live; the buffer pool only relies on
/// the contract below.
pub trait PageFile {
    /// Human-readable name used in diagnostics.
    fn filename(&self) -> &str;

    /// Read a page. Fails with `Error::PageNotFound` if the page was never
    /// allocated or has been deleted.
    fn read_page(&mut self, page_no: PageId) -> Result<Page>;

    /// Write a page back. The target is the number stored in the page header.
    fn write_page(&mut self, page: &Page) -> Result<()>;

    /// Allocate a fresh page and return its initial contents; the new page
    /// number is `page.page_no()`.
    fn allocate_page(&mut self) -> Result<Page>;

    /// Delete a page. Irreversible.
    fn delete_page(&mut self, page_no: PageId) -> Result<()>;
}

/// Shared handle to an open [`PageFile`].
///
/// Cloning is cheap and clones compare equal; handles wrapping different
/// files never do, even if the files share a name.
///
/// # Thread Safety
/// The file itself sits behind a `parking_lot::Mutex`, so I/O through any
/// clone of the handle is serialized.
#[derive(Clone)]
pub struct FileHandle {
    id: FileId,
    name: Arc<str>,
    inner: Arc<Mutex<Box<dyn PageFile + Send>>>,
}

impl FileHandle {
    /// Wrap an open file and assign it a fresh identity.
    pub fn new<F: PageFile + Send + 'static>(file: F) -> Self {
        let name: Arc<str> = Arc::from(file.filename());
        Self {
            id: FileId::next(),
            name,
            inner: Arc::new(Mutex::new(Box::new(file))),
        }
    }

    #[inline]
    pub fn id(&self) -> FileId {
        self.id
    }

    #[inline]
    pub fn filename(&self) -> &str {
        &self.name
    }

    pub fn read_page(&self, page_no: PageId) -> Result<Page> {
        self.inner.lock().read_page(page_no)
    }

    pub fn write_page(&self, page: &Page) -> Result<()> {
        self.inner.lock().write_page(page)
    }

    pub fn allocate_page(&self) -> Result<Page> {
        self.inner.lock().allocate_page()
    }

    pub fn delete_page(&self, page_no: PageId) -> Result<()> {
        self.inner.lock().delete_page(page_no)
    }
}

impl PartialEq for FileHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FileHandle {}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemFile;

    #[test]
    fn test_handle_identity() {
        let a = FileHandle::new(MemFile::new("same.db"));
        let b = FileHandle::new(MemFile::new("same.db"));

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.filename(), b.filename());
    }

    #[test]
    fn test_handle_forwards_io() {
        let handle = FileHandle::new(MemFile::new("io.db"));

        let mut page = handle.allocate_page().unwrap();
        let page_no = page.page_no();
        page.data_mut()[0] = 0x5A;
        handle.write_page(&page).unwrap();

        assert_eq!(handle.read_page(page_no).unwrap().data()[0], 0x5A);

        handle.delete_page(page_no).unwrap();
        assert!(handle.read_page(page_no).is_err());
    }
}
