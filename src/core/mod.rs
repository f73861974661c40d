//! Core types: configuration, errors, identifiers, languages and items.

pub mod config;
pub mod errors;
pub mod ids;
pub mod item;
pub mod language;

pub use config::{DwellPolicy, OrchestratorConfig};
pub use errors::{CapabilityError, CapabilityResult};
pub use ids::ItemId;
pub use item::{ConversationItem, InFlight, ItemStatus};
pub use language::{LanguageCode, PICKER_LANGUAGES, display_name};
