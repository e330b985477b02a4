//! Event handling: one handler per inbound message, plus reply delivery.

pub mod delivery;
pub mod turn;

pub use delivery::{DeliveryReport, deliver_reply};
pub use turn::{Intent, Relay, classify};
