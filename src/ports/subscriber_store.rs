use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::domain::audience::AudienceFilter;
use crate::domain::subscriber::Subscriber;
use crate::domain::subscriber_email::SubscriberEmail;

/// Durable collection of subscribers, keyed by email.
///
/// Implementations must guarantee that an email maps to at most one record.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn find_by_email(&self, email: &SubscriberEmail)
        -> Result<Option<Subscriber>, StoreError>;

    /// Insert the record, or replace the one sharing its email. Send counters never go down.
    async fn upsert(&self, subscriber: Subscriber) -> Result<Subscriber, StoreError>;

    /// Active subscribers admitted by `filter`, ordered by subscription date then email.
    async fn query_active(&self, filter: &AudienceFilter) -> Result<Vec<Subscriber>, StoreError>;

    /// Bump `send_count` and set `last_sent_at` for every listed subscriber.
    async fn increment_send_counters(
        &self,
        emails: &HashSet<SubscriberEmail>,
        sent_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Subscriber store is unavailable: {context}")]
    Unavailable {
        context: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("Invalid subscriber record in the store: {0}")]
    InvalidRecord(String),
}
