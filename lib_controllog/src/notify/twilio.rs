//! # Twilio SMS Gateway
//!
//! Sends messages through the Twilio Messages REST resource. Requests are not
//! retried: a timed-out send may still have been delivered.

use async_trait::async_trait;

use crate::error::{ControlLogError, Result};
use crate::notify::{SmsGateway, SmsReceipt};
use crate::retrieve::{ApiAuth, ApiClient};

const TWILIO_BASE_URL: &str = "https://api.twilio.com/2010-04-01/";

/// SMS gateway backed by a Twilio account.
pub struct TwilioGateway {
    client: ApiClient,
    account_sid: String,
}

impl TwilioGateway {
    /// Creates a gateway authenticating with the account SID and auth token.
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Result<Self> {
        let account_sid = account_sid.into();
        let auth = ApiAuth::Basic {
            username: account_sid.clone(),
            password: auth_token.into(),
        };
        let client = ApiClient::new(TWILIO_BASE_URL, Some(auth), 0)
            .map_err(|e| ControlLogError::Config(e.to_string()))?;
        Ok(Self {
            client,
            account_sid,
        })
    }
}

#[async_trait]
impl SmsGateway for TwilioGateway {
    async fn send(&self, from: &str, to: &str, body: &str) -> Result<SmsReceipt> {
        let url = self
            .client
            .endpoint(&["Accounts", self.account_sid.as_str(), "Messages.json"], &[])
            .map_err(|e| ControlLogError::Sms(e.to_string()))?;

        let response = self
            .client
            .post_form::<SmsReceipt>(url, &[("From", from), ("To", to), ("Body", body)])
            .await
            .map_err(|e| ControlLogError::Sms(e.to_string()))?;

        if !response.success {
            return Err(ControlLogError::Sms(format!(
                "Twilio returned {}: {}",
                response.status,
                response.error_body.unwrap_or_default()
            )));
        }

        Ok(response.data.unwrap_or_default())
    }
}
