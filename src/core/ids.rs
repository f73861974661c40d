//! Identifier types for conversation items.
//!
//! Items are numbered in submission order starting at 1. The number is
//! assigned once by the store and never reused.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stable sequence number of a conversation item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Identifier of the first item in a conversation.
    pub const FIRST: Self = Self(1);

    /// Identifier following this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = core::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('#').parse::<u64>().map(Self)
    }
}

impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
