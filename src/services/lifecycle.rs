use chrono::Utc;
use std::sync::Arc;
use std::time;

use crate::domain::new_subscriber::NewSubscriber;
use crate::domain::subscriber::Subscriber;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_status::{AlreadyActive, Unsubscribed};
use crate::ports::{MailGateway, StoreError, SubscriberStore};

const WELCOME_SUBJECT: &str = "Welcome to our newsletter";

#[derive(Debug)]
pub enum Subscription {
    Created(Subscriber),
    Reactivated(Subscriber),
}

impl Subscription {
    pub fn subscriber(&self) -> &Subscriber {
        match self {
            Subscription::Created(subscriber) | Subscription::Reactivated(subscriber) => subscriber,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SubscriptionError {
    #[error("{0} is already subscribed")]
    AlreadySubscribed(SubscriberEmail),
    #[error("No subscriber found for {0}")]
    NotFound(SubscriberEmail),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Owns the subscribe / reactivate / unsubscribe transitions.
pub struct LifecycleManager {
    store: Arc<dyn SubscriberStore>,
    mail_gateway: Arc<dyn MailGateway>,
    notification_timeout: time::Duration,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        mail_gateway: Arc<dyn MailGateway>,
        notification_timeout: time::Duration,
    ) -> Self {
        Self {
            store,
            mail_gateway,
            notification_timeout,
        }
    }

    #[tracing::instrument(
        name = "Subscribe to the newsletter",
        skip(self, new_subscriber),
        fields(subscriber_email = %new_subscriber.email)
    )]
    pub async fn subscribe(
        &self,
        new_subscriber: NewSubscriber,
    ) -> Result<Subscription, SubscriptionError> {
        let now = Utc::now();
        let subscription = match self.store.find_by_email(&new_subscriber.email).await? {
            None => {
                let subscriber = self
                    .store
                    .upsert(Subscriber::create(new_subscriber, now))
                    .await?;
                Subscription::Created(subscriber)
            }
            Some(mut subscriber) => {
                subscriber
                    .reactivate(new_subscriber, now)
                    .map_err(|AlreadyActive| {
                        SubscriptionError::AlreadySubscribed(subscriber.email.clone())
                    })?;
                Subscription::Reactivated(self.store.upsert(subscriber).await?)
            }
        };

        self.send_welcome_email(subscription.subscriber()).await;

        Ok(subscription)
    }

    #[tracing::instrument(
        name = "Unsubscribe from the newsletter",
        skip(self),
        fields(subscriber_email = %email)
    )]
    pub async fn unsubscribe(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Unsubscribed, SubscriptionError> {
        let mut subscriber = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(|| SubscriptionError::NotFound(email.clone()))?;

        let outcome = subscriber.unsubscribe();
        if outcome == Unsubscribed::Unsubscribed {
            self.store.upsert(subscriber).await?;
        }

        Ok(outcome)
    }

    /// Best effort: the subscription stands even when the welcome email is lost.
    async fn send_welcome_email(&self, subscriber: &Subscriber) {
        let greeting = subscriber
            .name
            .as_ref()
            .map(|name| format!("Hi {},", name.as_ref()))
            .unwrap_or_else(|| String::from("Hi,"));
        let html_body = format!(
            r#"
            <div>
                <h1>Welcome to our newsletter!</h1>
                <p>{}</p>
                <p>You will now receive our news about the topics you follow.</p>
            </div>
            "#,
            greeting
        );

        let delivery = tokio::time::timeout(
            self.notification_timeout,
            self.mail_gateway
                .send(&subscriber.email, WELCOME_SUBJECT, &html_body),
        )
        .await;

        match delivery {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => tracing::error!(
                "Failed to send a welcome email to {}: {:?}",
                subscriber.email,
                err
            ),
            Err(_) => tracing::error!(
                "Welcome email to {} timed out after {:?}",
                subscriber.email,
                self.notification_timeout
            ),
        }
    }
}
