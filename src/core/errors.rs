//! Error types for capability orchestration.

use std::sync::Arc;

use thiserror::Error;

use crate::capability::kinds::CapabilityKind;
use crate::core::ids::ItemId;

/// Orchestration error type.
///
/// Every variant renders to the message shown on the failing item. Errors
/// are cheap to clone so one failed acquisition can be reported to every
/// caller that waited on it.
#[derive(Clone, Debug, Error)]
pub enum CapabilityError {
    /// The host exposes no provider for this capability at all.
    #[error("{0} is not supported")]
    CapabilityUnsupported(CapabilityKind),
    /// The provider exists but reports no usable model.
    #[error("{0} is not available")]
    CapabilityUnavailable(CapabilityKind),
    /// The host did not hand back a usable model instance.
    #[error("failed to create {kind}: {reason}")]
    AcquisitionFailed {
        /// Capability being created.
        kind: CapabilityKind,
        /// Host-supplied or local reason.
        reason: String,
    },
    /// Translation pair is missing a side or maps a language onto itself.
    #[error("invalid language pair: {0}")]
    InvalidLanguagePair(String),
    /// The item's source language is not known yet.
    #[error("Language not detected")]
    LanguageNotDetected,
    /// Source and target languages are the same.
    #[error("Cannot translate to the same language")]
    SameLanguage,
    /// The item does not qualify for the requested operation.
    #[error("not eligible: {0}")]
    NotEligible(String),
    /// The detector returned no candidates.
    #[error("language detector returned no result")]
    DetectionEmpty,
    /// The detector's top candidate cannot be recorded.
    #[error("language detector returned an invalid result: {0}")]
    InvalidDetection(String),
    /// A created model rejected the request.
    #[error("{kind} failed: {reason}")]
    InvocationFailed {
        /// Capability being invoked.
        kind: CapabilityKind,
        /// Host-supplied reason.
        reason: String,
    },
    /// The same operation is already running for this item.
    #[error("{0} already in progress")]
    OperationInProgress(CapabilityKind),
    /// No item with this id exists in the store.
    #[error("unknown item: {0}")]
    UnknownItem(ItemId),
    /// Submitted text is blank.
    #[error("cannot submit an empty message")]
    EmptyText,
    /// Language code is malformed or not offered.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    /// The owning scope was torn down.
    #[error("operation cancelled")]
    Cancelled,
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(Arc<serde_json::Error>),
}

impl From<serde_json::Error> for CapabilityError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(Arc::new(err))
    }
}

impl CapabilityError {
    /// Whether this error should be written onto the item it concerns.
    ///
    /// Bookkeeping rejections leave the item as it was.
    #[must_use]
    pub const fn marks_item(&self) -> bool {
        !matches!(
            self,
            Self::Cancelled | Self::UnknownItem(_) | Self::OperationInProgress(_)
        )
    }
}

/// Convenience result alias for orchestration operations.
pub type CapabilityResult<T> = Result<T, CapabilityError>;
