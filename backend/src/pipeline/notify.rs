use crate::config::Config;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// Proof that the messaging backend accepted a message.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReceipt {
    /// Backend message identifier (a Twilio SID).
    pub message_id: String,
    pub to: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, contact_address: &str, link_url: &str) -> Result<DeliveryReceipt>;
}

pub fn compose_message(link_url: &str) -> String {
    format!(
        "Dear Student, your marks report is ready. You can download your report from the following link: {}",
        link_url
    )
}

/// Prefixes a trimmed address with the channel scheme, e.g. `whatsapp:+91...`.
pub fn channel_address(prefix: &str, address: &str) -> String {
    format!("{}{}", prefix, address.trim())
}

/// Sends WhatsApp messages through the Twilio Messages API.
pub struct TwilioNotifier {
    client: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    channel_prefix: String,
    sender_address: String,
}

#[derive(Deserialize)]
struct MessageResource {
    sid: String,
    to: String,
}

#[derive(Deserialize)]
struct TwilioError {
    code: Option<u64>,
    message: Option<String>,
}

impl TwilioNotifier {
    pub fn new(config: &Config, client: reqwest::Client) -> Self {
        Self {
            client,
            api_base: config.twilio_api_base.trim_end_matches('/').to_string(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            channel_prefix: config.channel_prefix.clone(),
            sender_address: config.sender_address.clone(),
        }
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn notify(&self, contact_address: &str, link_url: &str) -> Result<DeliveryReceipt> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        );
        let to = channel_address(&self.channel_prefix, contact_address);
        let from = channel_address(&self.channel_prefix, &self.sender_address);
        let body = compose_message(link_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to.as_str()), ("From", from.as_str()), ("Body", body.as_str())])
            .send()
            .await
            .map_err(|e| PipelineError::Notify(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PipelineError::Notify(e.to_string()))?;
        if !status.is_success() {
            return Err(PipelineError::Notify(describe_failure(status.as_u16(), &text)));
        }
        let message: MessageResource =
            serde_json::from_str(&text).map_err(|e| PipelineError::Notify(e.to_string()))?;
        Ok(DeliveryReceipt {
            message_id: message.sid,
            to: message.to,
        })
    }
}

fn describe_failure(status: u16, body: &str) -> String {
    match serde_json::from_str::<TwilioError>(body) {
        Ok(TwilioError {
            code,
            message: Some(message),
        }) => match code {
            Some(code) => format!("HTTP {} (code {}): {}", status, code, message),
            None => format!("HTTP {}: {}", status, message),
        },
        _ => format!("HTTP {}: {}", status, body),
    }
}
