//! Conversation history assembly.

pub mod history;

pub use history::{HistoryEntry, Role, assemble_history};
