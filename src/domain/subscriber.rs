use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::interest::Interests;
use crate::domain::new_subscriber::NewSubscriber;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_name::SubscriberName;
use crate::domain::subscriber_status::{AlreadyActive, SubscriberStatus, Unsubscribed};

/// Where a subscription request came from. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Provenance {
    pub source: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: SubscriberEmail,
    pub name: Option<SubscriberName>,
    pub interests: Interests,
    pub status: SubscriberStatus,
    pub subscribed_at: DateTime<Utc>,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub send_count: i64,
    pub provenance: Provenance,
}

impl Subscriber {
    /// First subscription for an address. Missing interests default to `all`.
    pub fn create(new_subscriber: NewSubscriber, now: DateTime<Utc>) -> Subscriber {
        Subscriber {
            id: Uuid::new_v4(),
            email: new_subscriber.email,
            name: new_subscriber.name,
            interests: new_subscriber
                .interests
                .unwrap_or_else(Interests::everything),
            status: SubscriberStatus::Active,
            subscribed_at: now,
            last_sent_at: None,
            send_count: 0,
            provenance: new_subscriber.provenance,
        }
    }

    /// Brings an inactive record back in place. Name and interests are only
    /// replaced when the request carries new values.
    pub fn reactivate(
        &mut self,
        new_subscriber: NewSubscriber,
        now: DateTime<Utc>,
    ) -> Result<(), AlreadyActive> {
        self.status = self.status.activate()?;
        self.subscribed_at = now;
        self.provenance = new_subscriber.provenance;

        if let Some(name) = new_subscriber.name {
            self.name = Some(name);
        }
        if let Some(interests) = new_subscriber.interests {
            self.interests = interests;
        }

        Ok(())
    }

    pub fn unsubscribe(&mut self) -> Unsubscribed {
        let (status, outcome) = self.status.deactivate();
        self.status = status;

        outcome
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
