//! Outbound email seam
//!
//! Sends are best-effort: the outbox worker logs failures and retries
//! later; nothing upstream ever blocks on delivery.

use pfw_common::{Error, Result};
use serde_json::json;

/// Outbound notification transport
#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    /// Render and send one templated message
    async fn send(
        &self,
        template_key: &str,
        recipient_address: &str,
        variables: &serde_json::Value,
    ) -> Result<()>;
}

/// Production sender: POSTs the template request to an HTTP mail relay
pub struct RelayEmailSender {
    client: reqwest::Client,
    relay_url: String,
}

impl RelayEmailSender {
    pub fn new(relay_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            relay_url,
        }
    }
}

#[async_trait::async_trait]
impl EmailSender for RelayEmailSender {
    async fn send(
        &self,
        template_key: &str,
        recipient_address: &str,
        variables: &serde_json::Value,
    ) -> Result<()> {
        let body = json!({
            "template": template_key,
            "to": recipient_address,
            "variables": variables,
        });

        let response = self
            .client
            .post(&self.relay_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Internal(format!("Email relay request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Internal(format!(
                "Email relay returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}
