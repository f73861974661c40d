//! Self-clearing transient item errors.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::conversation::store::ConversationStore;
use crate::core::config::DwellPolicy;
use crate::core::ids::ItemId;

/// Arms one clear timer per raised error.
///
/// Timers are never cancelled by later activity on the item, only by scope
/// teardown.
#[derive(Clone)]
pub struct ErrorDwell {
    store: Arc<ConversationStore>,
    dwell: Duration,
    policy: DwellPolicy,
    scope: CancellationToken,
}

impl ErrorDwell {
    /// Create a dwell scheduler writing to `store`.
    #[must_use]
    pub const fn new(
        store: Arc<ConversationStore>,
        dwell: Duration,
        policy: DwellPolicy,
        scope: CancellationToken,
    ) -> Self {
        Self {
            store,
            dwell,
            policy,
            scope,
        }
    }

    /// Schedule clearing of the error raised at `generation`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn arm(&self, id: ItemId, generation: u64) {
        let store = Arc::clone(&self.store);
        let scope = self.scope.clone();
        let dwell = self.dwell;
        let only = match self.policy {
            DwellPolicy::Rearm => Some(generation),
            DwellPolicy::FirstTimerWins => None,
        };

        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(dwell) => {
                    if store.clear_error(id, only) {
                        debug!(item = %id, generation, "Transient error cleared");
                    }
                }
                () = scope.cancelled() => {}
            }
        });
    }
}
