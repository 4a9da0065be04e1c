//! Buffer Pool Manager - the core page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between disk and memory in a fixed array of frames
//! - Pin-based reference counting
//! - Dirty page write-back through the disk scheduler
//! - LRU-K eviction

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::buffer::page_store::PageStore;
use crate::buffer::replacer::LruKReplacer;
use crate::buffer::stats::{Stats, StatsSnapshot};
use crate::buffer::Frame;
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::page::Page;
use crate::storage::{DiskManager, DiskRequest, DiskScheduler};

/// State guarded by the single pool lock: page table, frame array,
/// replacer, and the page id allocator form one mutual-exclusion domain.
struct PoolInner {
    frames: Vec<Frame>,
    /// Maps resident page ids to frame ids; the single source of truth.
    page_table: HashMap<PageId, FrameId>,
    /// Stack of free frame ids (LIFO for cache locality).
    free_list: Vec<FrameId>,
    replacer: LruKReplacer,
    /// Next page id to hand out; explicit state, never ambient.
    next_page_id: u32,
    /// Page ids allocated in this session. Ids below `pages_on_disk` were
    /// allocated by an earlier session and already have bytes on disk.
    used_pages: HashSet<PageId>,
    pages_on_disk: u32,
    stats: Stats,
}

/// Manages a pool of buffer frames caching disk pages.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                     BufferPoolManager                        │
/// │  ┌─────────────────── Mutex<PoolInner> ──────────────────┐   │
/// │  │ page_table   free_list   replacer    frames[..]       │   │
/// │  │ PageId→Fid   Vec<Fid>    LRU-K       pin/dirty/bytes  │   │
/// │  └────────────────────────────────────────────────────────┘  │
/// │  ┌──────────────┐                                            │
/// │  │DiskScheduler │→ one worker thread → DiskManager → file    │
/// │  └──────────────┘                                            │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// # Locking
/// One mutex serializes all pool bookkeeping. Disk I/O never runs while
/// the lock is held: requests are scheduled under the lock (preserving
/// FIFO order against later requests) and awaited after releasing it, so
/// pool traffic is not serialized behind disk latency.
///
/// # Pin discipline
/// `fetch_page`/`new_page` pin; the caller reads and writes the returned
/// buffer and must route visibility of changes through
/// `unpin_page(dirty=true)`. A page with a nonzero pin count is never
/// evicted. Once the pin count reaches zero a dirty page is flushed
/// immediately and its frame becomes evictable.
pub struct BufferPoolManager {
    inner: Mutex<PoolInner>,
    scheduler: DiskScheduler,
    pool_size: usize,
}

impl BufferPoolManager {
    /// Create a new buffer pool over `disk_manager`.
    ///
    /// # Arguments
    /// * `pool_size` - Number of frames in the pool
    /// * `replacer_k` - K for the LRU-K replacer
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, replacer_k: usize, disk_manager: DiskManager) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let pages_on_disk = disk_manager.page_count();
        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();
        let free_list: Vec<FrameId> = (0..pool_size).rev().map(FrameId::new).collect();

        Self {
            inner: Mutex::new(PoolInner {
                frames,
                page_table: HashMap::new(),
                free_list,
                replacer: LruKReplacer::new(replacer_k),
                next_page_id: pages_on_disk,
                used_pages: HashSet::new(),
                pages_on_disk,
                stats: Stats::default(),
            }),
            scheduler: DiskScheduler::new(disk_manager),
            pool_size,
        }
    }

    // ========================================================================
    // Public API
    // ========================================================================

    /// Pin a page and return its buffer, loading it from disk on a miss.
    ///
    /// Page ids that have never been written come back zero-filled with no
    /// disk read.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if every frame is pinned
    /// - Disk errors surfaced through the scheduler's completion handle
    pub fn fetch_page(&self, page_id: PageId) -> Result<Arc<RwLock<Page>>> {
        let mut inner = self.inner.lock();

        // Fast path: resident page.
        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            inner.stats.cache_hits += 1;
            let frame = &mut inner.frames[frame_id.0];
            frame.pin_count += 1;
            let page = Arc::clone(&frame.page);
            inner.replacer.record_access(frame_id);
            inner.replacer.set_evictable(frame_id, false);
            return Ok(page);
        }

        inner.stats.cache_misses += 1;
        let (mut inner, frame_id) = self.acquire_frame(inner)?;

        // A dirty eviction releases the pool lock; a concurrent caller
        // can have brought the page in meanwhile. Re-check before
        // installing, or two frames would hold the same id.
        if let Some(&resident) = inner.page_table.get(&page_id) {
            inner.free_list.push(frame_id);
            let frame = &mut inner.frames[resident.0];
            frame.pin_count += 1;
            let page = Arc::clone(&frame.page);
            inner.replacer.record_access(resident);
            inner.replacer.set_evictable(resident, false);
            return Ok(page);
        }

        let needs_read =
            page_id.0 < inner.pages_on_disk || inner.used_pages.contains(&page_id);
        inner.used_pages.insert(page_id);

        let page = {
            let frame = &mut inner.frames[frame_id.0];
            frame.page_id = Some(page_id);
            frame.pin_count = 1;
            frame.is_dirty = false;
            frame.page.write().reset();
            Arc::clone(&frame.page)
        };
        inner.page_table.insert(page_id, frame_id);
        inner.replacer.record_access(frame_id);
        inner.replacer.set_evictable(frame_id, false);

        if !needs_read {
            return Ok(page);
        }

        inner.stats.pages_read += 1;

        // Hold the page's write lock across the read so concurrent
        // fetchers of the same id block until the bytes have landed.
        let mut page_guard = page.write();
        let scratch = Arc::new(Mutex::new(Page::new()));
        let completion = self
            .scheduler
            .schedule(DiskRequest::read(page_id, Arc::clone(&scratch)));
        drop(inner);

        match completion.wait() {
            Ok(()) => {
                page_guard.copy_from(&scratch.lock());
                drop(page_guard);
                Ok(page)
            }
            // The id was claimed but its bytes never reached the file (a
            // clean page evicted without a flush): zero-filled is the
            // correct content, same as the first fetch of the id.
            Err(Error::PageNotOnDisk(_)) => {
                drop(page_guard);
                Ok(page)
            }
            Err(e) => {
                drop(page_guard);
                // Release only our own pin. Concurrent fetchers may hold
                // pins and the buffer already; the frame can only be
                // recycled once the last of them lets go.
                let mut inner = self.inner.lock();
                let remaining = {
                    let frame = &mut inner.frames[frame_id.0];
                    frame.pin_count -= 1;
                    frame.pin_count
                };
                if remaining == 0 {
                    inner.page_table.remove(&page_id);
                    inner.replacer.remove(frame_id);
                    inner.frames[frame_id.0].reset();
                    inner.free_list.push(frame_id);
                }
                Err(e)
            }
        }
    }

    /// Allocate a fresh page id and return its zeroed, pinned buffer.
    ///
    /// The page is born dirty so an eviction extends the file before any
    /// later read of the id.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if every frame is pinned
    pub fn new_page(&self) -> Result<(PageId, Arc<RwLock<Page>>)> {
        let inner = self.inner.lock();
        let (mut inner, frame_id) = self.acquire_frame(inner)?;

        // Skip ids already claimed through fetch_page; handing one out
        // again would bind two frames to the same page id.
        let page_id = loop {
            let candidate = PageId::new(inner.next_page_id);
            inner.next_page_id += 1;
            if !inner.used_pages.contains(&candidate) {
                break candidate;
            }
        };
        inner.used_pages.insert(page_id);

        let page = {
            let frame = &mut inner.frames[frame_id.0];
            frame.page_id = Some(page_id);
            frame.pin_count = 1;
            frame.is_dirty = true;
            frame.page.write().reset();
            Arc::clone(&frame.page)
        };
        inner.page_table.insert(page_id, frame_id);
        inner.replacer.record_access(frame_id);
        inner.replacer.set_evictable(frame_id, false);

        Ok((page_id, page))
    }

    /// Release one pin, merging the dirty flag.
    ///
    /// When the pin count reaches zero the frame becomes evictable and a
    /// dirty page is flushed to disk immediately.
    ///
    /// # Errors
    /// - `Error::PageNotResident` if the page is not in the pool
    /// - `Error::PageNotPinned` if the pin count is already zero
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<()> {
        let mut inner = self.inner.lock();

        let frame_id = match inner.page_table.get(&page_id) {
            Some(&fid) => fid,
            None => return Err(Error::PageNotResident(page_id.0)),
        };

        let flush_now = {
            let frame = &mut inner.frames[frame_id.0];
            if frame.pin_count == 0 {
                return Err(Error::PageNotPinned(page_id.0));
            }
            if is_dirty {
                frame.is_dirty = true;
            }
            frame.pin_count -= 1;
            frame.pin_count == 0
        };

        if !flush_now {
            return Ok(());
        }

        inner.replacer.set_evictable(frame_id, true);
        if inner.frames[frame_id.0].is_dirty {
            self.flush_frame(inner, frame_id, page_id)?;
        }
        Ok(())
    }

    /// Drop a page from the pool, flushing it first if dirty.
    ///
    /// Returns `Ok(false)` if the page is still pinned or not resident.
    /// The on-disk bytes are not reclaimed.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.inner.lock();

        let frame_id = match inner.page_table.get(&page_id) {
            Some(&fid) => fid,
            None => return Ok(false),
        };
        if inner.frames[frame_id.0].is_pinned() {
            return Ok(false);
        }

        let dirty_copy = {
            let frame = &mut inner.frames[frame_id.0];
            if frame.is_dirty {
                let mut scratch = Page::new();
                scratch.copy_from(&frame.page.read());
                Some(scratch)
            } else {
                None
            }
        };

        inner.page_table.remove(&page_id);
        inner.replacer.remove(frame_id);
        inner.frames[frame_id.0].reset();
        inner.free_list.push(frame_id);

        if let Some(scratch) = dirty_copy {
            let completion = self
                .scheduler
                .schedule(DiskRequest::write(page_id, Arc::new(Mutex::new(scratch))));
            drop(inner);
            completion.wait()?;
            self.inner.lock().stats.pages_written += 1;
        }

        Ok(true)
    }

    /// Write one page back to disk if it is resident and dirty.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let inner = self.inner.lock();
        let frame_id = match inner.page_table.get(&page_id) {
            Some(&fid) => fid,
            None => return Ok(()), // not resident, nothing to flush
        };
        if !inner.frames[frame_id.0].is_dirty {
            return Ok(());
        }
        self.flush_frame(inner, frame_id, page_id)
    }

    /// Write every resident dirty page back to disk (durability
    /// checkpoint).
    pub fn flush_all_pages(&self) -> Result<()> {
        let mut inner = self.inner.lock();

        let resident: Vec<(PageId, FrameId)> =
            inner.page_table.iter().map(|(&p, &f)| (p, f)).collect();

        // Schedule all writes under the lock so they stay ordered ahead
        // of later traffic, then wait with the lock released.
        let mut completions = Vec::new();
        for (page_id, frame_id) in resident {
            let frame = &mut inner.frames[frame_id.0];
            if !frame.is_dirty {
                continue;
            }
            let mut scratch = Page::new();
            scratch.copy_from(&frame.page.read());
            frame.is_dirty = false;
            inner.stats.pages_written += 1;
            completions.push((
                page_id,
                self.scheduler
                    .schedule(DiskRequest::write(page_id, Arc::new(Mutex::new(scratch)))),
            ));
        }
        drop(inner);

        let mut first_err = None;
        for (page_id, completion) in completions {
            if let Err(e) = completion.wait() {
                // The bytes never made it out; mark the page dirty again
                // so a retry (or eviction) still writes it.
                let mut inner = self.inner.lock();
                if let Some(&frame_id) = inner.page_table.get(&page_id) {
                    inner.frames[frame_id.0].is_dirty = true;
                }
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Info and stats
    // ========================================================================

    /// Number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of currently free frames.
    pub fn free_frame_count(&self) -> usize {
        self.inner.lock().free_list.len()
    }

    /// Number of resident pages.
    pub fn resident_page_count(&self) -> usize {
        self.inner.lock().page_table.len()
    }

    /// Current pin count of a resident page, if any.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let inner = self.inner.lock();
        let &frame_id = inner.page_table.get(&page_id)?;
        Some(inner.frames[frame_id.0].pin_count)
    }

    /// Snapshot of the pool's counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.lock().stats.snapshot()
    }

    /// Stop the I/O worker so every later disk request fails. Lets tests
    /// exercise the pool's write-failure paths.
    #[cfg(test)]
    fn stop_io_worker(&mut self) {
        self.scheduler.shutdown();
    }

    // ========================================================================
    // Internal: frame acquisition and write-back
    // ========================================================================

    /// Obtain a free frame, evicting a victim if necessary.
    ///
    /// Takes the pool guard by value: a dirty victim's flush releases the
    /// lock while the write is outstanding, then re-locks.
    fn acquire_frame<'a>(
        &'a self,
        mut inner: MutexGuard<'a, PoolInner>,
    ) -> Result<(MutexGuard<'a, PoolInner>, FrameId)> {
        if let Some(frame_id) = inner.free_list.pop() {
            return Ok((inner, frame_id));
        }

        let frame_id = inner.replacer.evict().ok_or(Error::NoFreeFrames)?;
        inner.stats.evictions += 1;

        let (old_page_id, dirty_copy) = {
            let frame = &mut inner.frames[frame_id.0];
            // The replacer only tracks occupied frames.
            let old_page_id = frame
                .page_id
                .take()
                .expect("replacer returned a free frame");
            let dirty_copy = if frame.is_dirty {
                let mut scratch = Page::new();
                scratch.copy_from(&frame.page.read());
                frame.is_dirty = false;
                Some(scratch)
            } else {
                None
            };
            (old_page_id, dirty_copy)
        };
        inner.page_table.remove(&old_page_id);

        if let Some(scratch) = dirty_copy {
            // Schedule under the lock (keeps FIFO order against a re-fetch
            // of the victim id), wait with the lock released.
            let completion = self.scheduler.schedule(DiskRequest::write(
                old_page_id,
                Arc::new(Mutex::new(scratch)),
            ));
            drop(inner);
            if let Err(e) = completion.wait() {
                let mut inner = self.inner.lock();
                inner.frames[frame_id.0].reset();
                inner.free_list.push(frame_id);
                return Err(e);
            }
            inner = self.inner.lock();
            inner.stats.pages_written += 1;
        }

        Ok((inner, frame_id))
    }

    /// Flush one dirty frame; the guard is released while the write is in
    /// flight.
    fn flush_frame(
        &self,
        mut inner: MutexGuard<'_, PoolInner>,
        frame_id: FrameId,
        page_id: PageId,
    ) -> Result<()> {
        let scratch = {
            let frame = &mut inner.frames[frame_id.0];
            let mut scratch = Page::new();
            scratch.copy_from(&frame.page.read());
            frame.is_dirty = false;
            scratch
        };
        inner.stats.pages_written += 1;

        let completion = self
            .scheduler
            .schedule(DiskRequest::write(page_id, Arc::new(Mutex::new(scratch))));
        drop(inner);

        if let Err(e) = completion.wait() {
            // Keep the page marked dirty so the data is not silently lost.
            let mut inner = self.inner.lock();
            if let Some(&fid) = inner.page_table.get(&page_id) {
                inner.frames[fid.0].is_dirty = true;
            }
            return Err(e);
        }
        Ok(())
    }
}

impl PageStore for BufferPoolManager {
    fn fetch_page(&self, page_id: PageId) -> Result<Arc<RwLock<Page>>> {
        BufferPoolManager::fetch_page(self, page_id)
    }

    fn new_page(&self) -> Result<(PageId, Arc<RwLock<Page>>)> {
        BufferPoolManager::new_page(self)
    }

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<()> {
        BufferPoolManager::unpin_page(self, page_id, is_dirty)
    }

    fn delete_page(&self, page_id: PageId) -> Result<bool> {
        BufferPoolManager::delete_page(self, page_id)
    }

    fn flush_page(&self, page_id: PageId) -> Result<()> {
        BufferPoolManager::flush_page(self, page_id)
    }

    fn flush_all_pages(&self) -> Result<()> {
        BufferPoolManager::flush_all_pages(self)
    }
}
