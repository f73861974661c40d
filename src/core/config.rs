//! Configuration for the capability orchestrator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{CapabilityError, CapabilityResult};
use crate::core::language::LanguageCode;

/// Environment variable overriding the error dwell time in milliseconds.
pub const ERROR_DWELL_ENV: &str = "LINGO_ERROR_DWELL_MS";
/// Environment variable overriding the default target language.
pub const DEFAULT_TARGET_ENV: &str = "LINGO_DEFAULT_TARGET";
/// Environment variable overriding the summarize length threshold.
pub const SUMMARIZE_MIN_UNITS_ENV: &str = "LINGO_SUMMARIZE_MIN_UNITS";

/// How overlapping error clear timers interact.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DwellPolicy {
    /// A timer only clears the error it was armed for.
    #[default]
    Rearm,
    /// Any pending timer clears whatever error is shown when it fires.
    FirstTimerWins,
}

/// Top-level configuration for the orchestrator.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// How long a transient item error stays visible, in milliseconds.
    pub error_dwell_ms: u64,
    /// Behaviour of overlapping error timers.
    pub dwell_policy: DwellPolicy,
    /// Minimum text length, in UTF-16 code units, for summarization.
    pub summarize_min_units: usize,
    /// Target language assigned to new items.
    pub default_target_language: String,
    /// Languages the summarizer is offered for.
    pub summarizer_languages: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            error_dwell_ms: 4_000,
            dwell_policy: DwellPolicy::Rearm,
            summarize_min_units: 150,
            default_target_language: "en".to_string(),
            summarizer_languages: vec!["en".to_string()],
        }
    }
}

impl OrchestratorConfig {
    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> CapabilityResult<()> {
        if self.error_dwell_ms == 0 {
            return Err(CapabilityError::InvalidConfig(
                "error_dwell_ms must be > 0".to_string(),
            ));
        }

        if self.summarize_min_units == 0 {
            return Err(CapabilityError::InvalidConfig(
                "summarize_min_units must be > 0".to_string(),
            ));
        }

        let target = LanguageCode::new(&self.default_target_language).map_err(|_| {
            CapabilityError::InvalidConfig(format!(
                "default_target_language {:?} is not a language code",
                self.default_target_language
            ))
        })?;
        if !target.is_pickable() {
            return Err(CapabilityError::InvalidConfig(format!(
                "default_target_language {target} is not offered by the picker"
            )));
        }

        for language in &self.summarizer_languages {
            LanguageCode::new(language).map_err(|_| {
                CapabilityError::InvalidConfig(format!(
                    "summarizer_languages entry {language:?} is not a language code"
                ))
            })?;
        }

        Ok(())
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_json_str(json: &str) -> CapabilityResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `LINGO_*` environment variables.
    ///
    /// # Errors
    /// Returns an error if an override cannot be parsed or fails validation.
    pub fn from_env() -> CapabilityResult<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> CapabilityResult<Self> {
        if let Some(raw) = lookup(ERROR_DWELL_ENV) {
            self.error_dwell_ms = raw.trim().parse().map_err(|_| {
                CapabilityError::InvalidConfig(format!("{ERROR_DWELL_ENV} must be an integer"))
            })?;
        }

        if let Some(raw) = lookup(SUMMARIZE_MIN_UNITS_ENV) {
            self.summarize_min_units = raw.trim().parse().map_err(|_| {
                CapabilityError::InvalidConfig(format!(
                    "{SUMMARIZE_MIN_UNITS_ENV} must be an integer"
                ))
            })?;
        }

        if let Some(raw) = lookup(DEFAULT_TARGET_ENV) {
            self.default_target_language = raw.trim().to_string();
        }

        self.validate()?;
        Ok(self)
    }

    /// Error dwell time as a [`Duration`].
    #[must_use]
    pub const fn error_dwell(&self) -> Duration {
        Duration::from_millis(self.error_dwell_ms)
    }

    /// Default target language, parsed.
    ///
    /// # Errors
    /// Returns an error if the configured code is malformed.
    pub fn default_target(&self) -> CapabilityResult<LanguageCode> {
        LanguageCode::new(&self.default_target_language)
    }

    /// Whether summaries are offered for text in `language`.
    #[must_use]
    pub fn summarizes(&self, language: &LanguageCode) -> bool {
        self.summarizer_languages
            .iter()
            .any(|code| code.eq_ignore_ascii_case(language.primary()))
    }
}
