//! Host capability provider contract.
//!
//! The host supplies one [`CapabilityFactory`] per capability it exposes.
//! Factories report availability and create model instances; instances are
//! then invoked through the per-kind model traits.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::capability::kinds::{Availability, CapabilityKind};
use crate::capability::progress::ProgressMonitor;
use crate::core::language::LanguageCode;

/// Boxed future type for host calls.
pub type HostFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Failure reported by the host runtime.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HostError(pub String);

impl HostError {
    /// Create a host error from any message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for HostError {}

/// Result type for host calls.
pub type HostResult<T> = Result<T, HostError>;

/// One ranked language guess.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionCandidate {
    /// Detected language tag as reported by the host.
    pub detected_language: String,
    /// Host confidence, nominally in `[0, 1]`.
    pub confidence: f64,
}

impl DetectionCandidate {
    /// Create a candidate.
    #[must_use]
    pub fn new(detected_language: impl Into<String>, confidence: f64) -> Self {
        Self {
            detected_language: detected_language.into(),
            confidence,
        }
    }
}

/// Language detection model.
pub trait LanguageDetector: Send + Sync {
    /// Rank candidate languages for `text`, most confident first.
    fn detect(&self, text: &str) -> HostFuture<'_, HostResult<Vec<DetectionCandidate>>>;
}

/// Summarization model.
pub trait Summarizer: Send + Sync {
    /// Summarize `text`.
    fn summarize(&self, text: &str) -> HostFuture<'_, HostResult<String>>;
}

/// Translation model bound to one language pair.
pub trait Translator: Send + Sync {
    /// Translate `text` from the bound source to the bound target language.
    fn translate(&self, text: &str) -> HostFuture<'_, HostResult<String>>;
}

/// A created model instance, tagged by capability.
#[derive(Clone)]
pub enum ModelHandle {
    /// Language detector instance.
    Detector(Arc<dyn LanguageDetector>),
    /// Summarizer instance.
    Summarizer(Arc<dyn Summarizer>),
    /// Translator instance.
    Translator(Arc<dyn Translator>),
}

impl ModelHandle {
    /// Capability this handle serves.
    #[must_use]
    pub const fn kind(&self) -> CapabilityKind {
        match self {
            Self::Detector(_) => CapabilityKind::Detector,
            Self::Summarizer(_) => CapabilityKind::Summarizer,
            Self::Translator(_) => CapabilityKind::Translator,
        }
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelHandle").field(&self.kind()).finish()
    }
}

/// Recognized creation options.
#[derive(Clone, Debug, Default)]
pub struct CreateOptions {
    /// Source language, translation only.
    pub source_language: Option<LanguageCode>,
    /// Target language, translation only.
    pub target_language: Option<LanguageCode>,
    /// Progress sink, present when a download is expected.
    pub monitor: Option<ProgressMonitor>,
}

/// Host entry point for one capability.
pub trait CapabilityFactory: Send + Sync {
    /// Report the current availability tier.
    fn availability(&self) -> HostFuture<'_, HostResult<Availability>>;

    /// Create a model instance; `Ok(None)` means the host produced nothing usable.
    fn create(&self, options: CreateOptions) -> HostFuture<'_, HostResult<Option<ModelHandle>>>;
}

/// Host capability namespace.
pub trait CapabilityProvider: Send + Sync {
    /// Factory for `kind`, or `None` when the host does not expose it.
    fn factory(&self, kind: CapabilityKind) -> Option<Arc<dyn CapabilityFactory>>;
}

/// Provider for hosts without any capability namespace.
#[derive(Clone, Copy, Debug, Default)]
pub struct AbsentProvider;

impl CapabilityProvider for AbsentProvider {
    fn factory(&self, _kind: CapabilityKind) -> Option<Arc<dyn CapabilityFactory>> {
        None
    }
}
