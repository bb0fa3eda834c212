//! Notification delivery for vigil alerts.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable notification channels
//! - Webhook, email, and Telegram notifier implementations
//! - Dispatcher that fans a decision out to named channels

pub mod dispatcher;
pub mod email;
pub mod telegram;
pub mod traits;
pub mod webhook;

pub use dispatcher::Dispatcher;
pub use traits::{AlertMessage, DispatchResult, Notifier, NotifyError};
