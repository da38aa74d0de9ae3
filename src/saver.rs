//! # Ordered save delivery
//!
//! A single worker task owns every call to [`RatingStore::save`].
//!
//! ## Guarantees
//! - Saves reach the store one at a time, in request order. A slow save can
//!   never land after a newer one.
//! - When the worker picks up a request it drains everything else already
//!   queued and sends one snapshot, taken at that moment. The snapshot is
//!   never older than the newest request it answers.
//! - Requests never block the caller; clicks keep landing while a save is
//!   in flight.
//!
//! ## NOT Responsible For
//! - Retrying failed saves (the next request sends a fresh full snapshot)
//! - Debouncing (see [`DebouncedPersister`](crate::persister::DebouncedPersister))

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::remote::RatingStore;
use crate::snapshot::RemoteSnapshot;

/// Outcome of one save: the HTTP status or the failure.
pub type SaveResult = Result<u16, SyncError>;

enum Request {
    /// Send a fresh snapshot, optionally reporting the outcome.
    Save(Option<oneshot::Sender<SaveResult>>),
    /// Report the latest outcome once every earlier request is done.
    Wait(oneshot::Sender<Option<SaveResult>>),
}

/// Cheap, cloneable handle for queueing saves from the debounce timer.
#[derive(Clone)]
pub struct SaveSender {
    tx: mpsc::UnboundedSender<Request>,
    outstanding: Arc<AtomicUsize>,
}

impl SaveSender {
    /// Queue a save without waiting for it.
    pub fn request(&self) {
        self.send_save(None);
    }

    fn send_save(&self, reply: Option<oneshot::Sender<SaveResult>>) -> bool {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(Request::Save(reply)).is_err() {
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
            warn!("save worker has stopped; save request dropped");
            return false;
        }
        true
    }
}

/// The save worker and the handle used to feed it.
///
/// Dropping the queue does not cancel queued saves. The worker finishes them
/// and exits once every [`SaveSender`] is gone.
pub struct SaveQueue {
    sender: SaveSender,
    worker: JoinHandle<()>,
}

impl SaveQueue {
    /// Spawn the worker. `snapshot` is called once per save, right before it is sent.
    /// Must be called from within a tokio runtime.
    pub fn spawn<S, F>(store: Arc<S>, snapshot: F) -> Self
    where
        S: RatingStore,
        F: Fn() -> RemoteSnapshot + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let outstanding = Arc::new(AtomicUsize::new(0));
        let worker = tokio::spawn(run(store, snapshot, rx, Arc::clone(&outstanding)));
        Self {
            sender: SaveSender { tx, outstanding },
            worker,
        }
    }

    pub fn sender(&self) -> SaveSender {
        self.sender.clone()
    }

    /// Queue a save without waiting for it.
    pub fn request(&self) {
        self.sender.request();
    }

    /// Queue a save and wait for its outcome.
    pub async fn save(&self) -> SaveResult {
        let (reply, rx) = oneshot::channel();
        if !self.sender.send_save(Some(reply)) {
            return Err(SyncError::Stopped);
        }
        rx.await.unwrap_or(Err(SyncError::Stopped))
    }

    /// Wait for every queued or in-flight save and return the latest outcome.
    /// `None` when nothing was ever saved.
    pub async fn wait(&self) -> Option<SaveResult> {
        let (reply, rx) = oneshot::channel();
        if self.sender.tx.send(Request::Wait(reply)).is_err() {
            return None;
        }
        rx.await.ok().flatten()
    }

    /// Whether a save is queued or on the wire.
    pub fn is_busy(&self) -> bool {
        self.sender.outstanding.load(Ordering::SeqCst) > 0
    }

    /// Whether the worker task has exited.
    pub fn is_stopped(&self) -> bool {
        self.worker.is_finished()
    }
}

impl std::fmt::Debug for SaveQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveQueue")
            .field("busy", &self.is_busy())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

async fn run<S, F>(
    store: Arc<S>,
    snapshot: F,
    mut rx: mpsc::UnboundedReceiver<Request>,
    outstanding: Arc<AtomicUsize>,
) where
    S: RatingStore,
    F: Fn() -> RemoteSnapshot + Send + 'static,
{
    let mut last: Option<SaveResult> = None;

    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        while let Ok(more) = rx.try_recv() {
            batch.push(more);
        }

        let saves = batch.iter().filter(|r| matches!(r, Request::Save(_))).count();
        if saves > 0 {
            if saves > 1 {
                debug!(coalesced = saves, "merging queued save requests");
            }
            let snap = snapshot();
            let result = store.save(&snap).await;
            log_save(&result, snap.len());
            last = Some(result);
            outstanding.fetch_sub(saves, Ordering::SeqCst);
        }

        for request in batch {
            match request {
                Request::Save(Some(reply)) => {
                    if let Some(outcome) = &last {
                        let _ = reply.send(outcome.clone());
                    }
                }
                Request::Save(None) => {}
                Request::Wait(reply) => {
                    let _ = reply.send(last.clone());
                }
            }
        }
    }
    debug!("save worker stopped");
}

fn log_save(result: &SaveResult, rows: usize) {
    match result {
        Ok(status) => info!(status, rows, "ratings saved"),
        Err(e) => warn!(error = %e, rows, "saving ratings failed; edits stay in memory until the next save"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{Category, CategorySet, Rating};
    use crate::remote::MemoryStore;
    use crate::snapshot::RatingRecord;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::sleep;

    fn sauce(v: i64) -> RemoteSnapshot {
        RemoteSnapshot {
            rows: vec![RatingRecord::new("Margherita").with(Category::Sauce, Rating::new(v).unwrap())],
        }
    }

    /// Queue whose snapshot source the test can change between requests.
    fn queue(store: &Arc<MemoryStore>) -> (SaveQueue, Arc<Mutex<i64>>) {
        let current = Arc::new(Mutex::new(0));
        let c = Arc::clone(&current);
        let q = SaveQueue::spawn(Arc::clone(store), move || sauce(*c.lock().unwrap()));
        (q, current)
    }

    #[tokio::test]
    async fn save_reports_status() {
        let store = Arc::new(MemoryStore::new(CategorySet::standard()));
        let (q, current) = queue(&store);
        *current.lock().unwrap() = 3;
        assert_eq!(q.save().await.unwrap(), 200);
        assert_eq!(store.last_save(), Some(sauce(3)));
        assert!(!q.is_busy());
    }

    #[tokio::test]
    async fn wait_without_saves_is_none() {
        let store = Arc::new(MemoryStore::new(CategorySet::standard()));
        let (q, _) = queue(&store);
        assert!(q.wait().await.is_none());
    }

    #[tokio::test]
    async fn wait_covers_fire_and_forget_requests() {
        let store = Arc::new(MemoryStore::new(CategorySet::standard()));
        let (q, current) = queue(&store);
        *current.lock().unwrap() = 2;
        q.sender().request();
        assert!(matches!(q.wait().await, Some(Ok(200))));
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.last_save(), Some(sauce(2)));
    }

    #[tokio::test]
    async fn failures_are_reported_not_retried() {
        let store = Arc::new(MemoryStore::new(CategorySet::standard()));
        store.fail_saves(true);
        let (q, _) = queue(&store);
        assert!(matches!(q.save().await, Err(SyncError::Http { status: 500, .. })));
        sleep(Duration::from_millis(10)).await;
        assert_eq!(store.save_count(), 0);
        assert!(!q.is_busy());
    }

    #[tokio::test]
    async fn dropped_queue_still_delivers_queued_save() {
        let store = Arc::new(MemoryStore::new(CategorySet::standard()));
        let (q, current) = queue(&store);
        *current.lock().unwrap() = 4;
        q.request();
        drop(q);
        sleep(Duration::from_millis(10)).await;
        assert_eq!(store.last_save(), Some(sauce(4)));
    }
}
