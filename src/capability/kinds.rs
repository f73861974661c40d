//! Capability kinds and readiness tiers.
//!
//! The host reports availability as one of three stable strings
//! (`"no"`, `"readily"`, `"after-download"`), modelled by [`Availability`]
//! and mapped onto the orchestrator-facing [`Tier`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named on-device capability exposed by the host.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    /// Language detection.
    Detector,
    /// Text summarization.
    Summarizer,
    /// Text translation between a language pair.
    Translator,
}

impl CapabilityKind {
    /// Stable identifier (for logs and cache keys).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Detector => "detector",
            Self::Summarizer => "summarizer",
            Self::Translator => "translator",
        }
    }

    /// Human label used in item error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Detector => "Language detector",
            Self::Summarizer => "Summarizer",
            Self::Translator => "Translator",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Raw availability answer from the host.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Availability {
    /// No model can be used.
    #[serde(rename = "no")]
    No,
    /// A model is present and can be created immediately.
    #[serde(rename = "readily")]
    Readily,
    /// A model must be downloaded during creation.
    #[serde(rename = "after-download")]
    AfterDownload,
}

impl Availability {
    /// Wire string as reported by the host.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Readily => "readily",
            Self::AfterDownload => "after-download",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Readiness tier of a capability before use.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Provider exists but has no model.
    Unavailable,
    /// Model must be downloaded first.
    Downloadable,
    /// Model can be created right away.
    Readily,
}

impl Tier {
    /// Stable string representation (for logs).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::Downloadable => "downloadable",
            Self::Readily => "readily",
        }
    }
}

impl From<Availability> for Tier {
    fn from(value: Availability) -> Self {
        match value {
            Availability::No => Self::Unavailable,
            Availability::Readily => Self::Readily,
            Availability::AfterDownload => Self::Downloadable,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
