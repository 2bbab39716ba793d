pub mod audience;
pub mod interest;
pub mod new_subscriber;
pub mod newsletter;
pub mod subscriber;
pub mod subscriber_email;
pub mod subscriber_name;
pub mod subscriber_status;
