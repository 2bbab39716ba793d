pub mod accounting;
pub mod audience;
pub mod broadcast;
pub mod dispatcher;
pub mod lifecycle;

pub use accounting::DeliveryAccounting;
pub use audience::{AudienceError, AudienceSelector};
pub use broadcast::{BroadcastError, BroadcastReport, BroadcastService};
pub use dispatcher::{BroadcastDispatcher, DeliveryOutcome, DeliveryStatus};
pub use lifecycle::{LifecycleManager, Subscription, SubscriptionError};
