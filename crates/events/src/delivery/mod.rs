//! Delivery channels.

pub mod email;
pub mod notifier;
