//! Buffer Manager - the core page caching layer.
//!
//! The [`BufferManager`] provides:
//! - Page caching between page files and memory
//! - Pin-based reference counting
//! - Clock (second-chance) replacement
//! - Dirty page write-back before reuse, on flush and at shutdown

use std::fmt;
use std::io;

use log::{debug, error, trace, warn};

use crate::buffer::descriptor::{FrameDescriptor, Residency};
use crate::buffer::page_table::PageTable;
use crate::buffer::replacer::{ClockReplacer, Victim};
use crate::buffer::BufferPoolStats;
use crate::common::config::BufferPoolConfig;
use crate::common::{FrameId, PageId, Result};
use crate::storage::page::Page;
use crate::storage::FileHandle;

/// Caches pages of any number of files in a fixed pool of frames.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                       BufferManager                         │
/// │  ┌──────────────────┐  ┌───────────────────────────────┐    │
/// │  │   page_table     │  │      frames: Vec<Page>        │    │
/// │  │(File,Page) → Fid │─▶│  [Frame0] [Frame1] [Frame2]   │    │
/// │  └──────────────────┘  └───────────────────────────────┘    │
/// │                        ┌───────────────────────────────┐    │
/// │  ┌──────────────────┐  │ descriptors: Vec<FrameDesc>   │    │
/// │  │ replacer (clock) │─▶│  [Desc0]  [Desc1]  [Desc2]    │    │
/// │  └──────────────────┘  └───────────────────────────────┘    │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// Frames and descriptors are parallel arrays allocated once; a
/// [`FrameId`] indexes both.
///
/// # Pinning
/// `read_page` and `alloc_page` each add one pin and return the frame's
/// page. The reference is only meaningful until the matching
/// `unpin_page`; after that the frame may be reused for another page.
///
/// # Thread Safety
/// All operations take `&mut self`. Wrap the manager in a
/// [`SharedBufferManager`](crate::buffer::SharedBufferManager) to share it
/// between threads.
///
/// # Usage
/// ```
/// use clockbuf::{BufferManager, FileHandle, MemFile};
///
/// let file = FileHandle::new(MemFile::new("users.db"));
/// let mut bpm = BufferManager::new(8);
///
/// let (page_no, page) = bpm.alloc_page(&file).unwrap();
/// page.data_mut()[0] = 0xAB;
/// bpm.unpin_page(&file, page_no, true).unwrap();
///
/// let page = bpm.read_page(&file, page_no).unwrap();
/// assert_eq!(page.data()[0], 0xAB);
/// bpm.unpin_page(&file, page_no, false).unwrap();
///
/// bpm.flush_file(&file).unwrap();
/// bpm.shutdown().unwrap();
/// ```
pub struct BufferManager {
    /// Page contents, one per frame.
    frames: Vec<Page>,

    /// Per-frame metadata, index-aligned with `frames`.
    descriptors: Vec<FrameDescriptor>,

    /// Maps (file, page) keys to frame IDs.
    page_table: PageTable,

    /// Chooses frames for new pages.
    replacer: ClockReplacer,

    /// Performance statistics.
    stats: BufferPoolStats,

    /// Set once `shutdown` has run, so `Drop` does not write back twice.
    shut_down: bool,
}

impl BufferManager {
    /// Create a buffer manager with `num_frames` frames.
    ///
    /// # Panics
    /// Panics if `num_frames` is 0.
    pub fn new(num_frames: usize) -> Self {
        assert!(num_frames > 0, "num_frames must be > 0");
        Self::build(num_frames)
    }

    /// Create a buffer manager from a validated configuration.
    ///
    /// # Errors
    /// `Error::InvalidConfig` if the configuration is rejected.
    pub fn with_config(config: BufferPoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config.num_frames))
    }

    fn build(num_frames: usize) -> Self {
        debug!("creating buffer pool with {} frames", num_frames);
        Self {
            frames: (0..num_frames).map(|_| Page::new()).collect(),
            descriptors: (0..num_frames)
                .map(|i| FrameDescriptor::new(FrameId::new(i)))
                .collect(),
            page_table: PageTable::with_capacity(num_frames),
            replacer: ClockReplacer::new(num_frames),
            stats: BufferPoolStats::new(),
            shut_down: false,
        }
    }

    // ========================================================================
    // Public API: Pin pages
    // ========================================================================

    /// Pin `page_no` of `file` and return its cached contents.
    ///
    /// A hit sets the frame's reference bit and adds a pin. A miss loads the
    /// page from the file first, then takes a frame from the clock replacer
    /// (writing back its old page if dirty), so a page the file cannot
    /// produce never costs a cached one.
    ///
    /// # Errors
    /// - `Error::PoolExhausted` if every frame is pinned
    /// - Errors from the file, e.g. `Error::PageNotFound`
    pub fn read_page(&mut self, file: &FileHandle, page_no: PageId) -> Result<&mut Page> {
        let frame_id = self.pin_existing(file, page_no)?;
        Ok(&mut self.frames[frame_id.0])
    }

    /// Allocate a new page in `file`, pin it and return its number and
    /// contents.
    ///
    /// The frame is secured before the file grows, so a full pool does not
    /// leave an orphaned page behind.
    ///
    /// # Errors
    /// - `Error::PoolExhausted` if every frame is pinned
    /// - Errors from the file's allocation
    pub fn alloc_page(&mut self, file: &FileHandle) -> Result<(PageId, &mut Page)> {
        let (page_no, frame_id) = self.pin_new(file)?;
        Ok((page_no, &mut self.frames[frame_id.0]))
    }

    /// Release one pin on `page_no` of `file`, marking it dirty if `dirty`.
    ///
    /// Unpinning a page that is not cached does nothing.
    ///
    /// # Errors
    /// `Error::PageNotPinned` if the page is cached with a pin count of 0.
    pub fn unpin_page(&mut self, file: &FileHandle, page_no: PageId, dirty: bool) -> Result<()> {
        let Some(frame_id) = self.page_table.lookup(file.id(), page_no) else {
            trace!("unpin of uncached {} of {} ignored", page_no, file);
            return Ok(());
        };

        self.descriptors[frame_id.0].unpin(dirty)?;
        Ok(())
    }

    // ========================================================================
    // Public API: Delete and flush
    // ========================================================================

    /// Delete `page_no` from `file` and drop any cached copy without
    /// writing it back.
    ///
    /// # Errors
    /// Errors from the file's deletion; the pool is left untouched then.
    pub fn dispose_page(&mut self, file: &FileHandle, page_no: PageId) -> Result<()> {
        file.delete_page(page_no)?;
        BufferPoolStats::bump(&self.stats.pages_disposed);

        if let Some(frame_id) = self.page_table.remove(file.id(), page_no) {
            let desc = &mut self.descriptors[frame_id.0];
            if desc.is_pinned() {
                warn!(
                    "disposing {} of {} with {} pins outstanding",
                    page_no,
                    file,
                    desc.pin_count()
                );
            }
            desc.clear();
            debug!("disposed {} of {}, freed {}", page_no, file, frame_id);
        }
        Ok(())
    }

    /// Write back every dirty page of `file` and release all its frames.
    ///
    /// Every frame of the file is checked before anything is written, so a
    /// pinned page leaves the whole file's cache untouched.
    ///
    /// # Errors
    /// - `Error::CorruptDescriptor` if an invalid frame is still tied to `file`
    /// - `Error::PagePinned` if any page of `file` is pinned
    /// - Write errors from the file; frames flushed before the failure stay
    ///   released
    pub fn flush_file(&mut self, file: &FileHandle) -> Result<()> {
        let owned: Vec<FrameId> = self
            .descriptors
            .iter()
            .filter(|desc| desc.belongs_to(file.id()))
            .map(|desc| desc.frame())
            .collect();

        for &frame_id in &owned {
            let desc = &self.descriptors[frame_id.0];
            if !desc.is_valid() {
                error!("{} is invalid but still tied to {}", frame_id, file);
                return Err(desc.corrupt_error());
            }
            if desc.is_pinned() {
                return Err(desc.pinned_error());
            }
        }

        for &frame_id in &owned {
            self.write_back(frame_id)?;
            let page_no = self.descriptors[frame_id.0].page_no();
            self.page_table.remove(file.id(), page_no);
            self.descriptors[frame_id.0].clear();
        }

        debug!("flushed {} frames of {}", owned.len(), file);
        Ok(())
    }

    /// Write back all dirty pages and retire the pool.
    ///
    /// # Errors
    /// - `Error::PagePinned` at the first frame still pinned
    /// - Write errors from the files
    ///
    /// Either way the pool is finished: `Drop` will not retry.
    pub fn shutdown(mut self) -> Result<()> {
        self.shut_down = true;

        for i in 0..self.descriptors.len() {
            let desc = &self.descriptors[i];
            if !desc.is_valid() {
                continue;
            }
            if desc.is_pinned() {
                return Err(desc.pinned_error());
            }
            self.write_back(FrameId::new(i))?;
        }

        debug!("buffer pool shut down");
        Ok(())
    }

    // ========================================================================
    // Public API: Stats and diagnostics
    // ========================================================================

    /// Get buffer pool statistics.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Number of frames in the pool.
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Number of frames holding a page.
    pub fn valid_frame_count(&self) -> usize {
        self.descriptors.iter().filter(|d| d.is_valid()).count()
    }

    /// The descriptor table, in frame order.
    pub fn frame_descriptors(&self) -> &[FrameDescriptor] {
        &self.descriptors
    }

    /// Pin count of a cached page, or `None` if it is not cached.
    pub fn pin_count(&self, file: &FileHandle, page_no: PageId) -> Option<u32> {
        self.descriptor_of(file, page_no).map(|d| d.pin_count())
    }

    /// Dirty flag of a cached page, or `None` if it is not cached.
    pub fn is_dirty(&self, file: &FileHandle, page_no: PageId) -> Option<bool> {
        self.descriptor_of(file, page_no).map(|d| d.is_dirty())
    }

    /// Write a line per frame plus the count of valid frames to `out`.
    pub fn dump<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{}", self)
    }

    /// Print the frame table to stdout.
    pub fn print_self(&self) {
        print!("{}", self);
    }

    // ========================================================================
    // Internal: Frame allocation and eviction
    // ========================================================================

    fn descriptor_of(&self, file: &FileHandle, page_no: PageId) -> Option<&FrameDescriptor> {
        self.page_table
            .lookup(file.id(), page_no)
            .map(|fid| &self.descriptors[fid.0])
    }

    fn pin_existing(&mut self, file: &FileHandle, page_no: PageId) -> Result<FrameId> {
        if let Some(frame_id) = self.page_table.lookup(file.id(), page_no) {
            let pins = self.descriptors[frame_id.0].pin();
            BufferPoolStats::bump(&self.stats.cache_hits);
            trace!("hit {} of {} in {} (pins={})", page_no, file, frame_id, pins);
            return Ok(frame_id);
        }

        BufferPoolStats::bump(&self.stats.cache_misses);
        let page = file.read_page(page_no)?;
        BufferPoolStats::bump(&self.stats.pages_read);

        let frame_id = self.allocate_frame()?;
        self.install(file, page_no, frame_id, &page)?;
        trace!("loaded {} of {} into {}", page_no, file, frame_id);
        Ok(frame_id)
    }

    fn pin_new(&mut self, file: &FileHandle) -> Result<(PageId, FrameId)> {
        let frame_id = self.allocate_frame()?;

        let page = file.allocate_page()?;
        let page_no = page.page_no();
        BufferPoolStats::bump(&self.stats.pages_allocated);

        self.install(file, page_no, frame_id, &page)?;
        debug!("allocated {} of {} in {}", page_no, file, frame_id);
        Ok((page_no, frame_id))
    }

    // ========================================================================
    // Internal: Residency-checked access for page guards
    // ========================================================================

    /// `read_page`, returning the residency the new pin belongs to.
    pub(crate) fn pin_resident(&mut self, file: &FileHandle, page_no: PageId) -> Result<Residency> {
        let frame_id = self.pin_existing(file, page_no)?;
        Ok(self.descriptors[frame_id.0].residency())
    }

    /// `alloc_page`, returning the residency the new pin belongs to.
    pub(crate) fn alloc_resident(&mut self, file: &FileHandle) -> Result<(PageId, Residency)> {
        let (page_no, frame_id) = self.pin_new(file)?;
        Ok((page_no, self.descriptors[frame_id.0].residency()))
    }

    fn is_resident(&self, residency: Residency) -> bool {
        self.descriptors[residency.frame.0].residency() == residency
    }

    /// Page contents, if the frame still holds that residency.
    pub(crate) fn resident_page(&self, residency: Residency) -> Option<&Page> {
        self.is_resident(residency).then(|| &self.frames[residency.frame.0])
    }

    pub(crate) fn resident_page_mut(&mut self, residency: Residency) -> Option<&mut Page> {
        if self.is_resident(residency) {
            Some(&mut self.frames[residency.frame.0])
        } else {
            None
        }
    }

    /// Drop a pin taken on `residency`.
    ///
    /// Returns `Ok(false)` and leaves the pool alone if the page was disposed
    /// or flushed out since, even if the same key is cached again.
    pub(crate) fn unpin_resident(&mut self, residency: Residency, dirty: bool) -> Result<bool> {
        if !self.is_resident(residency) {
            return Ok(false);
        }
        self.descriptors[residency.frame.0].unpin(dirty)?;
        Ok(true)
    }

    /// Copy `page` into an empty frame, map it and pin it once.
    fn install(
        &mut self,
        file: &FileHandle,
        page_no: PageId,
        frame_id: FrameId,
        page: &Page,
    ) -> Result<()> {
        self.page_table.insert(file, page_no, frame_id)?;
        self.frames[frame_id.0].copy_from(page);
        self.descriptors[frame_id.0].set(file.clone(), page_no);
        Ok(())
    }

    /// Get an empty frame, evicting the clock's victim if needed.
    fn allocate_frame(&mut self) -> Result<FrameId> {
        let steps_before = self.replacer.steps();
        let victim = self.replacer.select_victim(&mut self.descriptors);
        BufferPoolStats::add(&self.stats.clock_steps, self.replacer.steps() - steps_before);

        match victim? {
            Victim::Empty(frame_id) => Ok(frame_id),
            Victim::Occupied(frame_id) => {
                self.evict(frame_id)?;
                Ok(frame_id)
            }
        }
    }

    /// Write back (if dirty), unmap and clear a valid, unpinned frame.
    ///
    /// If the write-back fails the frame keeps its page and dirty flag.
    fn evict(&mut self, frame_id: FrameId) -> Result<()> {
        self.write_back(frame_id)?;

        let desc = &mut self.descriptors[frame_id.0];
        let page_no = desc.page_no();
        if let Some(file) = desc.file() {
            self.page_table.remove(file.id(), page_no);
            debug!("evicted {} of {} from {}", page_no, file, frame_id);
        }
        desc.clear();

        BufferPoolStats::bump(&self.stats.evictions);
        Ok(())
    }

    /// Write a frame to its owning file if it is dirty, then mark it clean.
    fn write_back(&mut self, frame_id: FrameId) -> Result<()> {
        let desc = &mut self.descriptors[frame_id.0];
        if !desc.is_dirty() {
            return Ok(());
        }
        let Some(file) = desc.file().cloned() else {
            return Err(desc.corrupt_error());
        };

        // The header decides where the file puts the page; callers may have
        // overwritten it through `as_mut_slice` or `set_header`.
        let page = &mut self.frames[frame_id.0];
        let mut header = page.header();
        if header.page_no != desc.page_no().0 {
            warn!(
                "{} header names page {}, restoring {} of {}",
                frame_id,
                header.page_no,
                desc.page_no(),
                file
            );
            header.page_no = desc.page_no().0;
            page.set_header(&header);
        }
        file.write_page(page)?;

        desc.clear_dirty();
        BufferPoolStats::bump(&self.stats.pages_written);
        trace!("wrote back {} of {} from {}", desc.page_no(), file, frame_id);
        Ok(())
    }

    #[cfg(test)]
    fn descriptor(&self, frame_id: FrameId) -> &FrameDescriptor {
        &self.descriptors[frame_id.0]
    }

    #[cfg(test)]
    fn descriptor_mut(&mut self, frame_id: FrameId) -> &mut FrameDescriptor {
        &mut self.descriptors[frame_id.0]
    }
}

impl fmt::Display for BufferManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for desc in &self.descriptors {
            writeln!(f, "{}", desc)?;
        }
        writeln!(f, "valid frames: {}", self.valid_frame_count())
    }
}

impl Drop for BufferManager {
    /// Best-effort write-back when `shutdown` was never called.
    fn drop(&mut self) {
        if self.shut_down {
            return;
        }

        for i in 0..self.descriptors.len() {
            let desc = &self.descriptors[i];
            if !desc.is_valid() {
                continue;
            }
            if desc.is_pinned() {
                warn!(
                    "dropping buffer pool with {} of {} still pinned",
                    desc.page_no(),
                    desc.file_name()
                );
                continue;
            }
            if let Err(e) = self.write_back(FrameId::new(i)) {
                error!("write-back of {} failed during drop: {}", FrameId::new(i), e);
            }
        }
    }
}
