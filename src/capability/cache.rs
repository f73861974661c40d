//! Single-flight cache of acquired model instances.

use std::fmt;
use std::future::Future;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use tracing::debug;

use crate::capability::acquirer::{AcquireParams, TranslationPair};
use crate::capability::kinds::CapabilityKind;
use crate::capability::provider::ModelHandle;
use crate::core::errors::CapabilityResult;

type Acquisition = Shared<BoxFuture<'static, CapabilityResult<ModelHandle>>>;

/// Identity of a cached model instance.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum CacheKey {
    /// Detector and summarizer: one instance per kind.
    Capability(CapabilityKind),
    /// Translator: one instance per language pair.
    Pair(TranslationPair),
}

impl CacheKey {
    /// Key for an acquisition of `kind` with `params`.
    ///
    /// # Errors
    /// Returns [`crate::core::errors::CapabilityError::InvalidLanguagePair`]
    /// for translator requests without a valid pair.
    pub fn for_request(kind: CapabilityKind, params: &AcquireParams) -> CapabilityResult<Self> {
        match kind {
            CapabilityKind::Translator => Ok(Self::Pair(params.pair()?)),
            CapabilityKind::Detector | CapabilityKind::Summarizer => Ok(Self::Capability(kind)),
        }
    }

    /// Capability the key belongs to.
    #[must_use]
    pub const fn kind(&self) -> CapabilityKind {
        match self {
            Self::Capability(kind) => *kind,
            Self::Pair(_) => CapabilityKind::Translator,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capability(kind) => write!(f, "{}", kind.as_str()),
            Self::Pair(pair) => write!(f, "translator:{}->{}", pair.source, pair.target),
        }
    }
}

enum Slot {
    Ready(ModelHandle),
    Loading(WeakShared<BoxFuture<'static, CapabilityResult<ModelHandle>>>),
}

/// Memoizes model instances for the orchestrator's lifetime.
///
/// Concurrent callers for one key await a single in-flight acquisition and
/// all observe its outcome. A failed acquisition leaves the slot empty, and
/// an acquisition abandoned by every caller is dropped, so the next caller
/// starts over.
#[derive(Default)]
pub struct CapabilityCache {
    entries: DashMap<CacheKey, Slot>,
}

impl CapabilityCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached instance for `key`, acquiring it at most once.
    ///
    /// # Errors
    /// Returns the acquisition error, shared by every caller that waited on
    /// it; nothing is retained for `key`.
    pub async fn get_or_create<F, Fut>(
        &self,
        key: &CacheKey,
        acquire: F,
    ) -> CapabilityResult<ModelHandle>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CapabilityResult<ModelHandle>> + Send + 'static,
    {
        let acquisition = match self.entries.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let in_flight = match entry.get() {
                    Slot::Ready(handle) => {
                        debug!(key = %key, "Capability cache hit");
                        return Ok(handle.clone());
                    }
                    Slot::Loading(weak) => weak.upgrade(),
                };
                if let Some(acquisition) = in_flight {
                    debug!(key = %key, "Joining in-flight acquisition");
                    acquisition
                } else {
                    debug!(key = %key, "Capability cache miss");
                    let (acquisition, slot) = launch(acquire);
                    if let Some(slot) = slot {
                        entry.insert(slot);
                    }
                    acquisition
                }
            }
            Entry::Vacant(entry) => {
                debug!(key = %key, "Capability cache miss");
                let (acquisition, slot) = launch(acquire);
                if let Some(slot) = slot {
                    entry.insert(slot);
                }
                acquisition
            }
        };

        let result = acquisition.clone().await;
        self.settle(key, &acquisition, &result);
        result
    }

    /// Record the outcome of `acquisition` if it still owns the slot.
    fn settle(
        &self,
        key: &CacheKey,
        acquisition: &Acquisition,
        result: &CapabilityResult<ModelHandle>,
    ) {
        let owned = |slot: &Slot| match slot {
            Slot::Loading(weak) => weak
                .upgrade()
                .is_some_and(|current| current.ptr_eq(acquisition)),
            Slot::Ready(_) => false,
        };
        match result {
            Ok(handle) => {
                if let Some(mut slot) = self.entries.get_mut(key) {
                    if owned(slot.value()) {
                        *slot.value_mut() = Slot::Ready(handle.clone());
                    }
                }
            }
            Err(_) => {
                self.entries.remove_if(key, |_, slot| owned(slot));
            }
        }
    }

    /// Whether a ready instance exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .get(key)
            .is_some_and(|slot| matches!(*slot, Slot::Ready(_)))
    }

    /// Number of ready instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.value(), Slot::Ready(_)))
            .count()
    }

    /// Whether no instance is ready.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached instance and forget in-flight acquisitions.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Start a shared acquisition and the slot pointing at it.
///
/// The slot only holds a weak reference, so an acquisition every caller
/// abandoned is dropped along with its progress subscription.
fn launch<F, Fut>(acquire: F) -> (Acquisition, Option<Slot>)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = CapabilityResult<ModelHandle>> + Send + 'static,
{
    let acquisition = acquire().boxed().shared();
    let slot = acquisition.downgrade().map(Slot::Loading);
    (acquisition, slot)
}
