use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::ports::{StoreError, SubscriberStore};
use crate::services::dispatcher::DeliveryOutcome;

/// Credits subscribers for confirmed deliveries. Failed outcomes leave records untouched.
pub struct DeliveryAccounting {
    store: Arc<dyn SubscriberStore>,
}

impl DeliveryAccounting {
    pub fn new(store: Arc<dyn SubscriberStore>) -> Self {
        Self { store }
    }

    /// Returns how many subscribers were credited.
    #[tracing::instrument(name = "Record delivery outcomes", skip(self, outcomes))]
    pub async fn record(&self, outcomes: &[DeliveryOutcome]) -> Result<usize, StoreError> {
        let delivered: HashSet<SubscriberEmail> = outcomes
            .iter()
            .filter(|outcome| outcome.is_delivered())
            .map(|outcome| outcome.email.clone())
            .collect();

        if delivered.is_empty() {
            return Ok(0);
        }

        self.store
            .increment_send_counters(&delivered, Utc::now())
            .await?;

        Ok(delivered.len())
    }
}
