use async_trait::async_trait;
use std::time;

use crate::domain::subscriber_email::SubscriberEmail;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> MessageId {
        MessageId(id.into())
    }
}

impl AsRef<str> for MessageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Outbound mail. Unreliable and possibly slow: callers bound every call with a timeout.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailGateway: Send + Sync {
    async fn send(
        &self,
        recipient: &SubscriberEmail,
        subject: &str,
        html_content: &str,
    ) -> Result<MessageId, DeliveryError>;
}

#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[error("Mail gateway request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Mail gateway did not answer within {0:?}")]
    TimedOut(time::Duration),
}
