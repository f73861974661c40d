//! Language codes and display names.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::errors::{CapabilityError, CapabilityResult};

const LANGUAGE_TAG_PATTERN: &str = r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$";
static LANGUAGE_TAG: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(LANGUAGE_TAG_PATTERN));

/// Languages offered by the target-language picker, in display order.
pub const PICKER_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("pt", "Portuguese"),
    ("fr", "French"),
    ("ru", "Russian"),
    ("tr", "Turkish"),
    ("es", "Spanish"),
];

const EXTRA_DISPLAY_NAMES: &[(&str, &str)] = &[
    ("ar", "Arabic"),
    ("de", "German"),
    ("hi", "Hindi"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("nl", "Dutch"),
    ("pl", "Polish"),
    ("zh", "Chinese"),
];

/// A BCP 47-shaped language tag such as `en` or `pt-BR`.
///
/// The primary subtag is stored lowercase; region and script subtags are
/// kept as given.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Parse and normalize a language tag.
    ///
    /// # Errors
    /// Returns [`CapabilityError::UnsupportedLanguage`] if the tag is malformed.
    pub fn new(value: &str) -> CapabilityResult<Self> {
        let trimmed = value.trim();
        let regex = LANGUAGE_TAG
            .as_ref()
            .map_err(|err| CapabilityError::InvalidConfig(format!("invalid regex: {err}")))?;
        if !regex.is_match(trimmed) {
            return Err(CapabilityError::UnsupportedLanguage(value.to_string()));
        }

        let normalized = match trimmed.split_once('-') {
            Some((primary, rest)) => format!("{}-{rest}", primary.to_ascii_lowercase()),
            None => trimmed.to_ascii_lowercase(),
        };
        Ok(Self(normalized))
    }

    /// Borrow the tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary language subtag (`pt` for `pt-BR`).
    #[must_use]
    pub fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    /// English display name, if the language is known.
    #[must_use]
    pub fn display_name(&self) -> Option<&'static str> {
        display_name(self.primary())
    }

    /// Whether the picker offers this language as a translation target.
    #[must_use]
    pub fn is_pickable(&self) -> bool {
        PICKER_LANGUAGES.iter().any(|(code, _)| *code == self.0)
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LanguageCode {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = CapabilityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<LanguageCode> for String {
    fn from(value: LanguageCode) -> Self {
        value.0
    }
}

impl PartialEq<str> for LanguageCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// English display name for a language code.
#[must_use]
pub fn display_name(code: &str) -> Option<&'static str> {
    PICKER_LANGUAGES
        .iter()
        .chain(EXTRA_DISPLAY_NAMES)
        .find(|(known, _)| known.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_primary_subtag() {
        let code = LanguageCode::new(" PT-BR ").unwrap();
        assert_eq!(code.as_str(), "pt-BR");
        assert_eq!(code.primary(), "pt");
        assert_eq!(code.display_name(), Some("Portuguese"));
    }

    #[test]
    fn test_rejects_malformed_tags() {
        assert!(LanguageCode::new("").is_err());
        assert!(LanguageCode::new("english").is_err());
        assert!(LanguageCode::new("e1").is_err());
    }

    #[test]
    fn test_picker_membership() {
        assert!(LanguageCode::new("tr").unwrap().is_pickable());
        assert!(!LanguageCode::new("de").unwrap().is_pickable());
        assert_eq!(display_name("de"), Some("German"));
        assert_eq!(display_name("xx"), None);
    }

    #[test]
    fn test_serde_validates() {
        let code: LanguageCode = serde_json::from_str("\"fr\"").unwrap();
        assert_eq!(code.as_str(), "fr");
        assert!(serde_json::from_str::<LanguageCode>("\"not a code\"").is_err());
    }
}
