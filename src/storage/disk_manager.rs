//! Disk Manager - low-level file I/O for database pages.
//!
//! The [`DiskManager`] handles all direct file operations: reading and
//! writing fixed-size pages against a single backing file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for a single database file.
///
/// # File Layout
/// The database is stored as a flat file of fixed 4KB pages:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │  ...    │ Page N  │
/// └─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096    ...    N×4096
/// ```
///
/// # Thread Safety
/// `DiskManager` takes `&mut self` for every file operation, so access is
/// single-writer by construction. The [`DiskScheduler`] owns the manager on
/// its worker thread and serializes all requests through it.
///
/// [`DiskScheduler`]: crate::storage::DiskScheduler
pub struct DiskManager {
    file: File,
    /// Number of whole pages currently backed by the file.
    page_count: u32,
}

impl DiskManager {
    /// Create a new database file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            page_count: 0,
        })
    }

    /// Open an existing database file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_size = file.metadata()?.len();
        let page_count = (file_size / PAGE_SIZE as u64) as u32;

        Ok(Self { file, page_count })
    }

    /// Open an existing database file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Read a page from disk into `page`.
    ///
    /// Short reads (a page that starts inside the file but ends past it)
    /// are zero-padded to the full page size.
    ///
    /// # Errors
    /// Returns `Error::PageNotOnDisk` if the page's offset is at or beyond
    /// the current end of the file.
    pub fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        let file_len = self.file.metadata()?.len();
        if offset >= file_len {
            return Err(Error::PageNotOnDisk(page_id.0));
        }

        self.file.seek(SeekFrom::Start(offset))?;

        let buf = page.as_mut_slice();
        let mut read = 0;
        while read < PAGE_SIZE {
            let n = self.file.read(&mut buf[read..])?;
            if n == 0 {
                break;
            }
            read += n;
        }
        // Zero-pad a short read at the tail of the file
        buf[read..].fill(0);

        Ok(())
    }

    /// Write `data` at the page's offset, zero-padded to the page size.
    ///
    /// # Errors
    /// Returns `Error::PageOverflow` if `data` is larger than `PAGE_SIZE`;
    /// data is never silently truncated.
    pub fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        if data.len() > PAGE_SIZE {
            return Err(Error::PageOverflow(data.len()));
        }

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        if data.len() < PAGE_SIZE {
            let padding = [0u8; PAGE_SIZE];
            self.file.write_all(&padding[data.len()..])?;
        }

        if page_id.0 >= self.page_count {
            self.page_count = page_id.0 + 1;
        }
        Ok(())
    }

    /// Flush file contents and close the backing file.
    pub fn shutdown(self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Sync file contents to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Get the number of whole pages backed by the file.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Get the total size of the database file in bytes.
    pub fn file_size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}
