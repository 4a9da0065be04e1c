//! Disk Scheduler - asynchronous page I/O over a single worker thread.
//!
//! The [`DiskScheduler`] decouples callers from disk latency: requests are
//! enqueued without blocking, a dedicated background worker services them
//! strictly in submission order, and each request resolves a [`Completion`]
//! handle with success or the captured disk failure.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::common::{Error, PageId, Result};
use crate::storage::disk_manager::DiskManager;
use crate::storage::page::Page;

/// Direction of a scheduled disk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Fill the request buffer from disk.
    Read,
    /// Persist the request buffer to disk.
    Write,
}

/// A single page I/O request.
///
/// The buffer is shared with the caller: a `Read` fills it, a `Write`
/// drains it. The worker holds the buffer lock only while the I/O runs,
/// and the caller must not touch the buffer until the completion resolves.
pub struct DiskRequest {
    pub kind: RequestKind,
    pub page_id: PageId,
    pub data: Arc<Mutex<Page>>,
}

impl DiskRequest {
    /// Build a read request backed by `data`.
    pub fn read(page_id: PageId, data: Arc<Mutex<Page>>) -> Self {
        Self {
            kind: RequestKind::Read,
            page_id,
            data,
        }
    }

    /// Build a write request draining `data`.
    pub fn write(page_id: PageId, data: Arc<Mutex<Page>>) -> Self {
        Self {
            kind: RequestKind::Write,
            page_id,
            data,
        }
    }
}

/// Completion handle for a scheduled request.
///
/// `wait` blocks the caller until the worker has serviced the request and
/// yields the outcome. Dropping the handle without waiting is allowed; the
/// request still runs to completion (cancellation is not supported).
pub struct Completion {
    rx: Receiver<Result<()>>,
}

impl Completion {
    /// Block until the request has been serviced.
    pub fn wait(self) -> Result<()> {
        match self.rx.recv() {
            Ok(outcome) => outcome,
            // Worker died before resolving us
            Err(_) => Err(Error::SchedulerShutdown),
        }
    }
}

enum WorkerMessage {
    Request(DiskRequest, Sender<Result<()>>),
    Shutdown,
}

/// Serializes page I/O onto one background worker thread.
///
/// # Ordering
/// Requests are serviced strictly in FIFO submission order, which gives
/// read-after-write consistency per page id as long as callers synchronize
/// overlapping requests for the same id through pin counts.
///
/// # Failure model
/// A failed request resolves its completion with the error; the worker
/// keeps running and serves subsequent unrelated requests.
pub struct DiskScheduler {
    tx: Sender<WorkerMessage>,
    worker: Option<JoinHandle<()>>,
}

impl DiskScheduler {
    /// Start the scheduler; the disk manager moves onto the worker thread.
    pub fn new(mut disk_manager: DiskManager) -> Self {
        let (tx, rx) = mpsc::channel::<WorkerMessage>();

        let worker = thread::spawn(move || {
            while let Ok(message) = rx.recv() {
                match message {
                    WorkerMessage::Request(request, done) => {
                        let outcome = match request.kind {
                            RequestKind::Read => {
                                let mut buf = request.data.lock();
                                disk_manager.read_page(request.page_id, &mut buf)
                            }
                            RequestKind::Write => {
                                let buf = request.data.lock();
                                disk_manager.write_page(request.page_id, buf.as_slice())
                            }
                        };
                        // Receiver may have dropped its handle; that's fine
                        let _ = done.send(outcome);
                    }
                    WorkerMessage::Shutdown => break,
                }
            }
            let _ = disk_manager.sync();
        });

        Self {
            tx,
            worker: Some(worker),
        }
    }

    /// Enqueue a request without blocking.
    ///
    /// If the scheduler has already shut down, the returned completion
    /// resolves with `Error::SchedulerShutdown`.
    pub fn schedule(&self, request: DiskRequest) -> Completion {
        let (done_tx, done_rx) = mpsc::channel();

        if self
            .tx
            .send(WorkerMessage::Request(request, done_tx.clone()))
            .is_err()
        {
            let _ = done_tx.send(Err(Error::SchedulerShutdown));
        }

        Completion { rx: done_rx }
    }

    /// Stop the worker after draining every pending request.
    ///
    /// The shutdown sentinel is queued behind all previously scheduled
    /// requests, so in-flight work completes normally and nothing is
    /// dropped.
    pub fn shutdown(&mut self) {
        let _ = self.tx.send(WorkerMessage::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn scratch() -> Arc<Mutex<Page>> {
        Arc::new(Mutex::new(Page::new()))
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db")).unwrap();
        let scheduler = DiskScheduler::new(dm);

        let out = scratch();
        out.lock().as_mut_slice()[0] = 0xAB;
        scheduler
            .schedule(DiskRequest::write(PageId::new(0), Arc::clone(&out)))
            .wait()
            .unwrap();

        let back = scratch();
        scheduler
            .schedule(DiskRequest::read(PageId::new(0), Arc::clone(&back)))
            .wait()
            .unwrap();

        assert_eq!(back.lock().as_slice()[0], 0xAB);
    }

    #[test]
    fn test_requests_serviced_in_fifo_order() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db")).unwrap();
        let scheduler = DiskScheduler::new(dm);

        // Two writes to the same page: the later one must win.
        let first = scratch();
        first.lock().as_mut_slice()[0] = 1;
        let second = scratch();
        second.lock().as_mut_slice()[0] = 2;

        let c1 = scheduler.schedule(DiskRequest::write(PageId::new(0), first));
        let c2 = scheduler.schedule(DiskRequest::write(PageId::new(0), second));
        c1.wait().unwrap();
        c2.wait().unwrap();

        let back = scratch();
        scheduler
            .schedule(DiskRequest::read(PageId::new(0), Arc::clone(&back)))
            .wait()
            .unwrap();
        assert_eq!(back.lock().as_slice()[0], 2);
    }

    #[test]
    fn test_read_failure_propagates_and_worker_survives() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db")).unwrap();
        let scheduler = DiskScheduler::new(dm);

        // Nothing on disk yet: read must fail through the handle.
        let buf = scratch();
        let err = scheduler
            .schedule(DiskRequest::read(PageId::new(5), Arc::clone(&buf)))
            .wait();
        assert!(matches!(err, Err(Error::PageNotOnDisk(5))));

        // Worker still serves subsequent requests.
        let out = scratch();
        out.lock().as_mut_slice()[0] = 7;
        scheduler
            .schedule(DiskRequest::write(PageId::new(0), out))
            .wait()
            .unwrap();
    }

    #[test]
    fn test_shutdown_drains_pending_requests() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let dm = DiskManager::create(&path).unwrap();
        let mut scheduler = DiskScheduler::new(dm);

        let mut completions = Vec::new();
        for i in 0u8..8 {
            let buf = scratch();
            buf.lock().as_mut_slice()[0] = i;
            completions.push(scheduler.schedule(DiskRequest::write(PageId::new(i as u32), buf)));
        }
        scheduler.shutdown();

        // Every request queued before shutdown completed successfully.
        for completion in completions {
            completion.wait().unwrap();
        }

        let mut dm = DiskManager::open(&path).unwrap();
        let mut page = Page::new();
        dm.read_page(PageId::new(7), &mut page).unwrap();
        assert_eq!(page.as_slice()[0], 7);
    }

    #[test]
    fn test_schedule_after_shutdown_fails() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db")).unwrap();
        let mut scheduler = DiskScheduler::new(dm);
        scheduler.shutdown();

        let outcome = scheduler
            .schedule(DiskRequest::write(PageId::new(0), scratch()))
            .wait();
        assert!(matches!(outcome, Err(Error::SchedulerShutdown)));
    }
}
