//! Conversation state shared with the presentation layer.

pub mod store;

pub use store::{ConversationStore, ErrorPatch, ItemPatch};
