//! Download progress reporting for capability models.
//!
//! The host receives a [`ProgressMonitor`] during creation and pushes events
//! into it. The acquirer holds the matching [`ProgressSubscription`], which
//! forwards events to the shared [`ProgressBoard`] and is released exactly
//! once when dropped, whether creation completed, failed or was cancelled.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::capability::cache::CacheKey;
use crate::capability::kinds::CapabilityKind;

/// Bytes loaded so far for a model download.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// Bytes received.
    pub loaded_bytes: u64,
    /// Expected total, `0` when unknown.
    pub total_bytes: u64,
}

impl DownloadProgress {
    /// Create a progress event.
    #[must_use]
    pub const fn new(loaded_bytes: u64, total_bytes: u64) -> Self {
        Self {
            loaded_bytes,
            total_bytes,
        }
    }

    /// Completed fraction in `[0, 1]`, `None` when the total is unknown.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        Some((self.loaded_bytes as f64 / self.total_bytes as f64).clamp(0.0, 1.0))
    }
}

/// Sending half handed to the host during model creation.
#[derive(Clone, Debug)]
pub struct ProgressMonitor {
    tx: mpsc::UnboundedSender<DownloadProgress>,
}

impl ProgressMonitor {
    /// Report a progress event.
    ///
    /// Returns `false` once the subscription has been released.
    pub fn emit(&self, loaded_bytes: u64, total_bytes: u64) -> bool {
        self.tx
            .send(DownloadProgress::new(loaded_bytes, total_bytes))
            .is_ok()
    }

    /// Whether the acquirer is still listening.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Latest download progress per model, keyed like the capability cache.
#[derive(Debug, Default)]
pub struct ProgressBoard {
    latest: DashMap<CacheKey, DownloadProgress>,
    released: AtomicUsize,
}

impl ProgressBoard {
    /// Create an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest progress of any download in flight for `kind`.
    #[must_use]
    pub fn get(&self, kind: CapabilityKind) -> Option<DownloadProgress> {
        self.latest
            .iter()
            .find(|entry| entry.key().kind() == kind)
            .map(|entry| *entry.value())
    }

    /// Latest progress of the download in flight for `key`.
    #[must_use]
    pub fn get_key(&self, key: &CacheKey) -> Option<DownloadProgress> {
        self.latest.get(key).map(|entry| *entry)
    }

    /// Number of subscriptions released so far.
    #[must_use]
    pub fn released_subscriptions(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Open a subscription for one creation call.
    #[must_use]
    pub fn subscribe(self: &Arc<Self>, key: CacheKey) -> (ProgressMonitor, ProgressSubscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ProgressMonitor { tx },
            ProgressSubscription {
                key,
                rx,
                board: Arc::clone(self),
            },
        )
    }

    fn record(&self, key: &CacheKey, progress: DownloadProgress) {
        self.latest.insert(key.clone(), progress);
    }

    fn release(&self, key: &CacheKey) {
        self.latest.remove(key);
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Receiving half held by the acquirer; releases on drop.
#[derive(Debug)]
pub struct ProgressSubscription {
    key: CacheKey,
    rx: mpsc::UnboundedReceiver<DownloadProgress>,
    board: Arc<ProgressBoard>,
}

impl ProgressSubscription {
    /// Wait for the next event and publish it to the board.
    ///
    /// Returns `None` once every monitor clone has been dropped.
    pub async fn next(&mut self) -> Option<DownloadProgress> {
        let progress = self.rx.recv().await?;
        debug!(
            key = %self.key,
            loaded = progress.loaded_bytes,
            total = progress.total_bytes,
            "Model download progress"
        );
        self.board.record(&self.key, progress);
        Some(progress)
    }

    /// Publish events that arrived without being awaited.
    pub fn drain(&mut self) {
        while let Ok(progress) = self.rx.try_recv() {
            self.board.record(&self.key, progress);
        }
    }
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        self.rx.close();
        self.board.release(&self.key);
        debug!(key = %self.key, "Progress subscription released");
    }
}
