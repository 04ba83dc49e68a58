//! # Notifications
//!
//! The SMS seam used by the notification processor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Twilio-backed gateway.
#[cfg(feature = "retrieve")]
pub mod twilio;

#[cfg(feature = "retrieve")]
pub use twilio::TwilioGateway;

/// What the gateway reported for one message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsReceipt {
    /// Provider id of the message.
    pub sid: Option<String>,
    /// Provider delivery status, e.g. "queued".
    pub status: Option<String>,
    /// Set when the provider accepted the request but failed the message.
    pub error_message: Option<String>,
}

impl SmsReceipt {
    /// Whether the provider reported an error for this message.
    pub fn is_error(&self) -> bool {
        self.error_message
            .as_deref()
            .is_some_and(|message| !message.trim().is_empty())
    }
}

/// Sends a text message.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Sends `body` from `from` to `to`.
    async fn send(&self, from: &str, to: &str, body: &str) -> Result<SmsReceipt>;
}
