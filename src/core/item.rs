//! Conversation item model with eligibility helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capability::kinds::CapabilityKind;
use crate::core::config::OrchestratorConfig;
use crate::core::ids::ItemId;
use crate::core::language::LanguageCode;

/// Which operation an item is currently showing as running.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Nothing in flight.
    #[default]
    Idle,
    /// Language detection running.
    Detecting,
    /// Summarization running.
    Summarizing,
    /// Translation running.
    Translating,
}

/// Per-operation loading flags.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct InFlight {
    /// Detection is running.
    pub detecting: bool,
    /// Summarization is running.
    pub summarizing: bool,
    /// Translation is running.
    pub translating: bool,
}

impl InFlight {
    /// Loading flag for the operation backed by `kind`.
    #[must_use]
    pub const fn get(self, kind: CapabilityKind) -> bool {
        match kind {
            CapabilityKind::Detector => self.detecting,
            CapabilityKind::Summarizer => self.summarizing,
            CapabilityKind::Translator => self.translating,
        }
    }

    /// Set the loading flag for the operation backed by `kind`.
    pub const fn set(&mut self, kind: CapabilityKind, value: bool) {
        match kind {
            CapabilityKind::Detector => self.detecting = value,
            CapabilityKind::Summarizer => self.summarizing = value,
            CapabilityKind::Translator => self.translating = value,
        }
    }

    /// Whether any operation is running.
    #[must_use]
    pub const fn any(self) -> bool {
        self.detecting || self.summarizing || self.translating
    }
}

/// One user-submitted message and everything derived from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationItem {
    /// Submission sequence number.
    pub id: ItemId,
    /// Source text as submitted.
    pub text: String,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Detected source language; written at most once.
    pub detected_language: Option<LanguageCode>,
    /// Confidence of the detection in `[0, 1]`.
    pub detection_confidence: Option<f64>,
    /// User-selected translation target.
    pub target_language: LanguageCode,
    /// One-shot summary.
    pub summary: Option<String>,
    /// Latest translation.
    pub translation: Option<String>,
    /// Running operations.
    pub in_flight: InFlight,
    /// Transient error message.
    pub error: Option<String>,
    /// Incremented every time an error is raised on the item.
    pub error_generation: u64,
}

impl ConversationItem {
    /// Create a freshly submitted item with nothing in flight.
    #[must_use]
    pub fn new(id: ItemId, text: impl Into<String>, target_language: LanguageCode) -> Self {
        Self {
            id,
            text: text.into(),
            created_at: Utc::now(),
            detected_language: None,
            detection_confidence: None,
            target_language,
            summary: None,
            translation: None,
            in_flight: InFlight::default(),
            error: None,
            error_generation: 0,
        }
    }

    /// Length of the text in UTF-16 code units.
    #[must_use]
    pub fn text_units(&self) -> usize {
        self.text.encode_utf16().count()
    }

    /// Status shown for the item; detection takes precedence.
    #[must_use]
    pub const fn status(&self) -> ItemStatus {
        if self.in_flight.detecting {
            ItemStatus::Detecting
        } else if self.in_flight.translating {
            ItemStatus::Translating
        } else if self.in_flight.summarizing {
            ItemStatus::Summarizing
        } else {
            ItemStatus::Idle
        }
    }

    /// Whether the summarize action should be shown.
    #[must_use]
    pub fn offers_summarize(&self, config: &OrchestratorConfig) -> bool {
        self.summary.is_none()
            && self.text_units() >= config.summarize_min_units
            && self
                .detected_language
                .as_ref()
                .is_some_and(|language| config.summarizes(language))
    }

    /// Whether the translate action can succeed on eligibility alone.
    #[must_use]
    pub fn offers_translate(&self) -> bool {
        self.detected_language
            .as_ref()
            .is_some_and(|language| *language != self.target_language)
    }
}
