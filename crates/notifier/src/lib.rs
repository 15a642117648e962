//! Out-of-band delivery of issued credentials
//!
//! Defines the `Notifier` trait that decouples credential issuance from the
//! delivery channel. Delivery is best-effort: the pool treats a credential as
//! issued whether or not the message arrives.
//!
//! - `DisabledNotifier` is used when no channel is configured
//! - `TwilioNotifier` sends SMS through the Twilio Messages API

pub mod twilio;

pub use twilio::TwilioNotifier;

use std::future::Future;
use std::pin::Pin;

/// Errors from a delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification channel not configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("delivery rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid delivery response: {0}")]
    InvalidResponse(String),
}

/// Result alias for notifier operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Delivery channel for issued credentials.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Notifier>`).
pub trait Notifier: Send + Sync {
    /// Identifier for logging (e.g. "twilio", "disabled")
    fn id(&self) -> &str;

    /// Whether the channel has the credentials it needs to send anything.
    fn is_configured(&self) -> bool;

    /// Deliver `message` to `address`, returning the channel's delivery id.
    ///
    /// Any non-empty id is a success.
    fn send<'a>(
        &'a self,
        address: &'a str,
        message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
}

/// Notifier used when no channel is configured. Every send fails.
#[derive(Debug, Default)]
pub struct DisabledNotifier;

impl Notifier for DisabledNotifier {
    fn id(&self) -> &str {
        "disabled"
    }

    fn is_configured(&self) -> bool {
        false
    }

    fn send<'a>(
        &'a self,
        _address: &'a str,
        _message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async { Err(NotifyError::NotConfigured) })
    }
}
