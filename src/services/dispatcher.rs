use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time;

use crate::domain::newsletter::{NewsletterBody, NewsletterSubject};
use crate::domain::subscriber_email::SubscriberEmail;
use crate::ports::{DeliveryError, MailGateway};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered { message_id: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DeliveryOutcome {
    pub email: SubscriberEmail,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self.status, DeliveryStatus::Delivered { .. })
    }
}

/// Sends one message per recipient through the mail gateway.
///
/// Attempts run concurrently, at most `concurrency` at a time. A failed or
/// timed out attempt becomes a `Failed` outcome and never stops the others.
/// Nothing is retried.
pub struct BroadcastDispatcher {
    mail_gateway: Arc<dyn MailGateway>,
    concurrency: usize,
    send_timeout: time::Duration,
}

impl BroadcastDispatcher {
    pub fn new(
        mail_gateway: Arc<dyn MailGateway>,
        concurrency: usize,
        send_timeout: time::Duration,
    ) -> Self {
        Self {
            mail_gateway,
            concurrency: concurrency.max(1),
            send_timeout,
        }
    }

    /// Outcomes are reported in the order of `recipients`.
    #[tracing::instrument(
        name = "Dispatch a broadcast",
        skip(self, subject, body, recipients),
        fields(subject = %subject.as_ref(), recipients = recipients.len())
    )]
    pub async fn dispatch(
        &self,
        subject: &NewsletterSubject,
        body: &NewsletterBody,
        recipients: &[SubscriberEmail],
    ) -> Vec<DeliveryOutcome> {
        let mut outcomes: Vec<(usize, DeliveryOutcome)> = stream::iter(recipients.iter().enumerate())
            .map(|(position, recipient)| async move {
                let status = self.deliver(recipient, subject, body).await;
                (
                    position,
                    DeliveryOutcome {
                        email: recipient.clone(),
                        status,
                    },
                )
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        outcomes.sort_by_key(|(position, _)| *position);

        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn deliver(
        &self,
        recipient: &SubscriberEmail,
        subject: &NewsletterSubject,
        body: &NewsletterBody,
    ) -> DeliveryStatus {
        let attempt = tokio::time::timeout(
            self.send_timeout,
            self.mail_gateway
                .send(recipient, subject.as_ref(), body.as_ref()),
        )
        .await
        .unwrap_or(Err(DeliveryError::TimedOut(self.send_timeout)));

        match attempt {
            Ok(message_id) => DeliveryStatus::Delivered {
                message_id: message_id.as_ref().to_string(),
            },
            Err(err) => {
                tracing::warn!("Failed to deliver the newsletter to {}: {}", recipient, err);
                DeliveryStatus::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}
