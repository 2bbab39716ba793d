pub mod mail_gateway;
pub mod subscriber_store;

pub use mail_gateway::{DeliveryError, MailGateway, MessageId};
pub use subscriber_store::{StoreError, SubscriberStore};

#[cfg(test)]
pub use mail_gateway::MockMailGateway;

#[cfg(test)]
pub use subscriber_store::MockSubscriberStore;
