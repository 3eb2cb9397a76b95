use async_trait::async_trait;
use reqwest::Client;

use crate::error::{Error, Result};
use crate::integrations::{CompletionEvent, NotificationIntegration};

/// Posts completion events as JSON to a single configured URL. This is
/// the only concrete integration shipped; anything richer (Slack,
/// Teams, JIRA) lives behind the same traits out of tree.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl NotificationIntegration for WebhookNotifier {
    async fn notify(&self, event: &CompletionEvent) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(|err| Error::integration("webhook", err))?;

        response
            .error_for_status()
            .map_err(|err| Error::integration("webhook", err))?;
        Ok(())
    }
}
