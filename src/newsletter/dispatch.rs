use std::time::Duration;

use futures::future::join_all;

use crate::domain::subscriber::Subscriber;
use crate::email_client::EmailClient;
use crate::newsletter::template::{render, RecipientFields};

/// How many recipients go out concurrently before the pipeline pauses. Sized
/// with the inter-batch delay to stay under the provider's per-second
/// send-rate ceiling.
const BATCH_SIZE: usize = 50;
const BATCH_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientOutcome {
    pub email: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<RecipientOutcome>,
}

pub struct NewsletterDispatcher {
    email_client: EmailClient,
    batch_size: usize,
    batch_delay: Duration,
}

impl NewsletterDispatcher {
    pub fn new(email_client: EmailClient) -> NewsletterDispatcher {
        Self::with_batching(email_client, BATCH_SIZE, BATCH_DELAY)
    }

    pub fn with_batching(
        email_client: EmailClient,
        batch_size: usize,
        batch_delay: Duration,
    ) -> NewsletterDispatcher {
        NewsletterDispatcher {
            email_client,
            batch_size,
            batch_delay,
        }
    }

    pub fn email_client(&self) -> &EmailClient {
        &self.email_client
    }

    /// Delivers one campaign to every subscriber in the list, personalized
    /// per recipient. Recipients are processed in order-preserving batches;
    /// within a batch all sends run concurrently and every outcome is
    /// captured before the next batch starts. One bad address never aborts
    /// delivery to the rest.
    #[tracing::instrument(
        name = "Dispatching a newsletter",
        skip(self, subscribers, html_content, text_content),
        fields(recipients = subscribers.len(), subject = %subject)
    )]
    pub async fn send_newsletter(
        &self,
        subscribers: &[Subscriber],
        subject: &str,
        html_content: &str,
        text_content: Option<&str>,
    ) -> SendSummary {
        let mut results: Vec<RecipientOutcome> = Vec::with_capacity(subscribers.len());

        for (batch_index, batch) in subscribers.chunks(self.batch_size).enumerate() {
            if batch_index > 0 {
                tokio::time::sleep(self.batch_delay).await;
            }

            let sends = batch
                .iter()
                .map(|subscriber| self.send_one(subscriber, subject, html_content, text_content));
            results.extend(join_all(sends).await);

            tracing::debug!(batch = batch_index, delivered = results.len(), "Batch settled");
        }

        let successful = results.iter().filter(|outcome| outcome.success).count();

        SendSummary {
            total: subscribers.len(),
            successful,
            failed: results.len() - successful,
            results,
        }
    }

    async fn send_one(
        &self,
        subscriber: &Subscriber,
        subject: &str,
        html_content: &str,
        text_content: Option<&str>,
    ) -> RecipientOutcome {
        let fields = RecipientFields::from(subscriber);
        let html = render(html_content, fields);
        let text = text_content.map(|text| render(text, fields));

        match self
            .email_client
            .send_email(&subscriber.email, subject, &html, text.as_deref())
            .await
        {
            Ok(message_id) => RecipientOutcome {
                email: subscriber.email.as_ref().to_string(),
                success: true,
                message_id: Some(message_id),
                error: None,
            },
            Err(err) => {
                tracing::warn!(
                    recipient = %subscriber.email,
                    error = %err,
                    "Failed to deliver newsletter to one recipient"
                );

                RecipientOutcome {
                    email: subscriber.email.as_ref().to_string(),
                    success: false,
                    message_id: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}
