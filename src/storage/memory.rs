use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::domain::audience::AudienceFilter;
use crate::domain::subscriber::Subscriber;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::ports::{StoreError, SubscriberStore};

/// Process-local store, used for tests and local runs without Postgres.
#[derive(Default)]
pub struct InMemorySubscriberStore {
    subscribers: RwLock<HashMap<SubscriberEmail, Subscriber>>,
}

impl InMemorySubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }
}

#[async_trait]
impl SubscriberStore for InMemorySubscriberStore {
    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscriber>, StoreError> {
        Ok(self.subscribers.read().await.get(email).cloned())
    }

    async fn upsert(&self, mut subscriber: Subscriber) -> Result<Subscriber, StoreError> {
        let mut subscribers = self.subscribers.write().await;

        if let Some(existing) = subscribers.get(&subscriber.email) {
            subscriber.id = existing.id;
            subscriber.send_count = subscriber.send_count.max(existing.send_count);
            subscriber.last_sent_at = subscriber.last_sent_at.max(existing.last_sent_at);
        }
        subscribers.insert(subscriber.email.clone(), subscriber.clone());

        Ok(subscriber)
    }

    async fn query_active(&self, filter: &AudienceFilter) -> Result<Vec<Subscriber>, StoreError> {
        let mut audience: Vec<Subscriber> = self
            .subscribers
            .read()
            .await
            .values()
            .filter(|subscriber| subscriber.is_active() && filter.admits(&subscriber.interests))
            .cloned()
            .collect();
        audience.sort_by(|a, b| {
            a.subscribed_at
                .cmp(&b.subscribed_at)
                .then_with(|| a.email.cmp(&b.email))
        });

        Ok(audience)
    }

    async fn increment_send_counters(
        &self,
        emails: &HashSet<SubscriberEmail>,
        sent_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut subscribers = self.subscribers.write().await;

        for email in emails {
            if let Some(subscriber) = subscribers.get_mut(email) {
                subscriber.send_count += 1;
                subscriber.last_sent_at = Some(sent_at);
            }
        }

        Ok(())
    }
}
