//! Ordered conversation item store.
//!
//! Every write is a single `previous list -> next list` transition on a
//! `watch` channel, so readers always observe whole transitions and two
//! writers never interleave inside one item.

use tokio::sync::watch;
use tracing::debug;

use crate::capability::kinds::CapabilityKind;
use crate::core::errors::{CapabilityError, CapabilityResult};
use crate::core::ids::ItemId;
use crate::core::item::ConversationItem;
use crate::core::language::LanguageCode;

/// Change to an item's error field.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum ErrorPatch {
    /// Leave the error as is.
    #[default]
    Keep,
    /// Show a new error.
    Set(String),
    /// Remove any error.
    Clear,
}

/// Field-scoped update for one item.
///
/// Fields left at their default are not touched, so concurrent operations
/// on the same item keep each other's results.
#[derive(Clone, Debug, Default)]
pub struct ItemPatch {
    /// Detection result; ignored once a language is recorded.
    pub detection: Option<(LanguageCode, f64)>,
    /// New translation target.
    pub target_language: Option<LanguageCode>,
    /// Summary; ignored once a summary is recorded.
    pub summary: Option<String>,
    /// Translation; replaces any previous one.
    pub translation: Option<String>,
    /// Loading flag change for one operation.
    pub in_flight: Option<(CapabilityKind, bool)>,
    /// Error change.
    pub error: ErrorPatch,
}

impl ItemPatch {
    /// Patch ending `kind` with an error.
    #[must_use]
    pub fn failed(kind: CapabilityKind, message: impl Into<String>) -> Self {
        Self {
            in_flight: Some((kind, false)),
            error: ErrorPatch::Set(message.into()),
            ..Self::default()
        }
    }

    /// Patch ending `kind` successfully; clears any stale error.
    #[must_use]
    pub fn succeeded(kind: CapabilityKind) -> Self {
        Self {
            in_flight: Some((kind, false)),
            error: ErrorPatch::Clear,
            ..Self::default()
        }
    }

    fn merge_into(self, item: &mut ConversationItem) {
        if let Some((language, confidence)) = self.detection {
            if item.detected_language.is_none() {
                item.detected_language = Some(language);
                item.detection_confidence =
                    (!confidence.is_nan()).then(|| confidence.clamp(0.0, 1.0));
            } else {
                debug!(item = %item.id, "Ignoring repeated detection result");
            }
        }
        if let Some(target) = self.target_language {
            item.target_language = target;
        }
        if let Some(summary) = self.summary {
            if item.summary.is_none() {
                item.summary = Some(summary);
            } else {
                debug!(item = %item.id, "Ignoring repeated summary");
            }
        }
        if let Some(translation) = self.translation {
            item.translation = Some(translation);
        }
        if let Some((kind, value)) = self.in_flight {
            item.in_flight.set(kind, value);
        }
        match self.error {
            ErrorPatch::Keep => {}
            ErrorPatch::Set(message) => {
                item.error = Some(message);
                item.error_generation = item.error_generation.wrapping_add(1);
            }
            ErrorPatch::Clear => item.error = None,
        }
    }
}

/// Append-only list of conversation items.
pub struct ConversationStore {
    items: watch::Sender<Vec<ConversationItem>>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (items, _) = watch::channel(Vec::new());
        Self { items }
    }

    /// Append a new item and return it.
    ///
    /// Nothing is in flight yet; detection is claimed through [`Self::begin`].
    pub fn append(&self, text: &str, target_language: LanguageCode) -> ConversationItem {
        let mut item = ConversationItem::new(ItemId::FIRST, text, target_language);
        self.items.send_modify(|items| {
            item.id = items.last().map_or(ItemId::FIRST, |last| last.id.next());
            items.push(item.clone());
        });
        debug!(item = %item.id, "Appended conversation item");
        item
    }

    /// Current copy of one item.
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<ConversationItem> {
        self.items.borrow().iter().find(|item| item.id == id).cloned()
    }

    /// Current copy of the whole list, in submission order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ConversationItem> {
        self.items.borrow().clone()
    }

    /// Receiver notified after every transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<ConversationItem>> {
        self.items.subscribe()
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// Whether no item was submitted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Check `precondition` and raise the loading flag for `kind` in one
    /// transition.
    ///
    /// # Errors
    /// Returns [`CapabilityError::UnknownItem`] for a missing item,
    /// [`CapabilityError::OperationInProgress`] if `kind` is already running,
    /// or the precondition's error. The item is unchanged on error.
    pub fn begin(
        &self,
        id: ItemId,
        kind: CapabilityKind,
        precondition: impl FnOnce(&ConversationItem) -> CapabilityResult<()>,
    ) -> CapabilityResult<ConversationItem> {
        let mut outcome = Err(CapabilityError::UnknownItem(id));
        self.items.send_if_modified(|items| {
            let Some(item) = items.iter_mut().find(|item| item.id == id) else {
                return false;
            };
            if item.in_flight.get(kind) {
                outcome = Err(CapabilityError::OperationInProgress(kind));
                return false;
            }
            if let Err(err) = precondition(item) {
                outcome = Err(err);
                return false;
            }
            item.in_flight.set(kind, true);
            outcome = Ok(item.clone());
            true
        });
        outcome
    }

    /// Merge `patch` into one item in a single transition.
    ///
    /// # Errors
    /// Returns [`CapabilityError::UnknownItem`] if no item has this id.
    pub fn apply(&self, id: ItemId, patch: ItemPatch) -> CapabilityResult<ConversationItem> {
        let mut outcome = Err(CapabilityError::UnknownItem(id));
        self.items.send_if_modified(|items| {
            let Some(item) = items.iter_mut().find(|item| item.id == id) else {
                return false;
            };
            patch.merge_into(item);
            outcome = Ok(item.clone());
            true
        });
        outcome
    }

    /// Remove the item's error.
    ///
    /// With `generation`, only the error raised at that generation is
    /// removed. Returns whether anything changed.
    pub fn clear_error(&self, id: ItemId, generation: Option<u64>) -> bool {
        self.items.send_if_modified(|items| {
            let Some(item) = items.iter_mut().find(|item| item.id == id) else {
                return false;
            };
            let current = generation.is_none_or(|expected| expected == item.error_generation);
            if item.error.is_none() || !current {
                return false;
            }
            item.error = None;
            true
        })
    }
}
