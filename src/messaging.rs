//! Chat transport: the boundary trait, the Discord adapter and message splitting.

pub mod discord;
pub mod split;
pub mod traits;

pub use discord::{DiscordAdapter, DiscordTransport};
pub use split::split_message;
pub use traits::Transport;
