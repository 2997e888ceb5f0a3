use crate::traits::Notifier;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

const SLACK_API_URL: &str = "https://slack.com/api/chat.postMessage";

/// Slack notification sink.
///
/// Best effort by contract: a missing token turns it into a no-op, and any
/// transport or API failure is logged and swallowed — a lost notification
/// must never fail the control loop.
pub struct SlackNotifier {
    token: Option<String>,
    channel: String,
    username: String,
    api_url: String,
    client: Client,
}

impl SlackNotifier {
    pub fn new(token: Option<String>, channel: impl Into<String>) -> Self {
        Self {
            token,
            channel: channel.into(),
            username: "autoscaler".to_string(),
            api_url: SLACK_API_URL.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Point at a different endpoint (tests)
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.to_string();
        self
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, message: &str) {
        let token = match &self.token {
            Some(t) => t,
            None => {
                debug!("No slack token configured, skipping notification");
                return;
            }
        };

        let result = self
            .client
            .get(&self.api_url)
            .query(&[
                ("token", token.as_str()),
                ("channel", self.channel.as_str()),
                ("text", message),
                ("username", self.username.as_str()),
                ("as_user", "true"),
            ])
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                debug!(channel = %self.channel, "Slack notification sent");
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "Slack notification rejected");
            }
            Err(e) => {
                warn!("Slack notification failed: {}", e);
            }
        }
    }
}

/// Notifier that discards everything
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_token_is_a_noop() {
        // Points at an unroutable endpoint: must return without sending.
        let notifier =
            SlackNotifier::new(None, "C0000").with_api_url("http://127.0.0.1:1/chat.postMessage");
        notifier.notify("hello").await;
    }

    #[tokio::test]
    async fn transport_failure_is_swallowed() {
        let notifier = SlackNotifier::new(Some("xoxb-test".to_string()), "C0000")
            .with_api_url("http://127.0.0.1:1/chat.postMessage");
        // Connection refused; must not panic or error.
        notifier.notify("hello").await;
    }
}
