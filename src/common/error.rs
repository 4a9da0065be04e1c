//! Error types for burrowdb.

use thiserror::Error;

/// Convenient Result type alias, in the style of `std::io::Result`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in burrowdb.
///
/// A single error type keeps handling consistent across the storage,
/// buffer, and index layers.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from file read/write operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Attempted to read a page at an offset beyond the end of the file.
    #[error("page {0} is beyond the end of the database file")]
    PageNotOnDisk(u32),

    /// Attempted to write more than `PAGE_SIZE` bytes into one page.
    #[error("page payload of {0} bytes exceeds the page size")]
    PageOverflow(usize),

    /// Buffer pool has no free frame and no evictable frame.
    ///
    /// This happens when every resident page is pinned.
    #[error("no free or evictable frame available in buffer pool")]
    NoFreeFrames,

    /// Operation on a page id that is not resident in the buffer pool.
    #[error("page {0} is not resident in the buffer pool")]
    PageNotResident(u32),

    /// Attempted to unpin a page whose pin count is already zero.
    ///
    /// This indicates a bug - unpins must match pins.
    #[error("page {0} is not pinned")]
    PageNotPinned(u32),

    /// A request was scheduled after the disk scheduler shut down, or the
    /// worker died before resolving the completion.
    #[error("disk scheduler is shut down")]
    SchedulerShutdown,

    /// A structural invariant of the tree does not hold.
    ///
    /// Retrying cannot fix structural corruption, so callers should treat
    /// this as fatal for the affected tree.
    #[error("b+tree corruption detected: {0}")]
    Corrupted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotOnDisk(42);
        assert_eq!(
            format!("{}", err),
            "page 42 is beyond the end of the database file"
        );

        let err = Error::NoFreeFrames;
        assert_eq!(
            format!("{}", err),
            "no free or evictable frame available in buffer pool"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }
}
