//! Host capabilities and their lifecycle.
//!
//! This module is organized leaves first:
//! - `kinds`: capability kinds, host availability and tiers
//! - `provider`: the host contract (factories and model traits)
//! - `progress`: download progress events and subscriptions
//! - `prober`: availability probing
//! - `acquirer`: model creation with download monitoring
//! - `cache`: single-flight memoization of created models

pub mod acquirer;
pub mod cache;
pub mod kinds;
pub mod prober;
pub mod progress;
pub mod provider;

#[cfg(test)]
pub(crate) mod fake;

pub use acquirer::{AcquireParams, ModelAcquirer, TranslationPair};
pub use cache::{CacheKey, CapabilityCache};
pub use kinds::{Availability, CapabilityKind, Tier};
pub use prober::AvailabilityProber;
pub use progress::{DownloadProgress, ProgressBoard, ProgressMonitor, ProgressSubscription};
pub use provider::{
    AbsentProvider, CapabilityFactory, CapabilityProvider, CreateOptions, DetectionCandidate,
    HostError, HostFuture, HostResult, LanguageDetector, ModelHandle, Summarizer, Translator,
};
