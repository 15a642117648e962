//! Twilio SMS notifier
//!
//! POSTs a form to `{api_base}/2010-04-01/Accounts/{sid}/Messages.json` with
//! HTTP basic auth (account SID + auth token). The message SID in the JSON
//! response is the delivery id.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use common::Secret;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{Notifier, NotifyError, Result};

/// Public Twilio REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    sid: String,
}

/// SMS channel backed by a Twilio account.
pub struct TwilioNotifier {
    client: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: Secret<String>,
    from_number: String,
    timeout: Duration,
}

impl TwilioNotifier {
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: Secret<String>,
        from_number: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            account_sid: account_sid.into(),
            auth_token,
            from_number: from_number.into(),
            timeout,
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }

    async fn deliver(&self, address: &str, message: &str) -> Result<String> {
        if !self.is_configured() {
            return Err(NotifyError::NotConfigured);
        }
        let to = e164(address);

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(self.auth_token.expose()))
            .timeout(self.timeout)
            .form(&[
                ("From", self.from_number.as_str()),
                ("To", to.as_str()),
                ("Body", message),
            ])
            .send()
            .await
            .map_err(|e| NotifyError::Http(format!("sms request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            warn!(status = status.as_u16(), "sms delivery rejected");
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = response
            .json::<MessageResponse>()
            .await
            .map_err(|e| NotifyError::InvalidResponse(e.to_string()))?;
        if parsed.sid.is_empty() {
            return Err(NotifyError::InvalidResponse("empty message sid".into()));
        }
        info!(sid = %parsed.sid, "sms sent");
        Ok(parsed.sid)
    }
}

/// Prefix `+` when the caller sent a bare number.
fn e164(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed.starts_with('+') {
        trimmed.to_string()
    } else {
        format!("+{trimmed}")
    }
}

impl Notifier for TwilioNotifier {
    fn id(&self) -> &str {
        "twilio"
    }

    fn is_configured(&self) -> bool {
        !self.account_sid.is_empty()
            && !self.from_number.is_empty()
            && !self.auth_token.expose().is_empty()
    }

    fn send<'a>(
        &'a self,
        address: &'a str,
        message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(self.deliver(address, message))
    }
}
