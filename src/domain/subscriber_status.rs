#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberStatus {
    Active,
    Inactive,
}

/// Result of moving a subscription to the inactive state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unsubscribed {
    Unsubscribed,
    AlreadyUnsubscribed,
}

#[derive(Debug, PartialEq, Eq)]
pub struct AlreadyActive;

impl SubscriberStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SubscriberStatus::Active)
    }

    /// Inactive -> Active. An active subscription cannot be activated twice.
    pub fn activate(self) -> Result<SubscriberStatus, AlreadyActive> {
        match self {
            SubscriberStatus::Active => Err(AlreadyActive),
            SubscriberStatus::Inactive => Ok(SubscriberStatus::Active),
        }
    }

    /// Active -> Inactive. Idempotent on an inactive subscription.
    pub fn deactivate(self) -> (SubscriberStatus, Unsubscribed) {
        match self {
            SubscriberStatus::Active => (SubscriberStatus::Inactive, Unsubscribed::Unsubscribed),
            SubscriberStatus::Inactive => (
                SubscriberStatus::Inactive,
                Unsubscribed::AlreadyUnsubscribed,
            ),
        }
    }

    pub fn parse(status: String) -> Result<SubscriberStatus, String> {
        match status.as_str() {
            "active" => Ok(SubscriberStatus::Active),
            "inactive" => Ok(SubscriberStatus::Inactive),
            _ => Err(format!("{} is not a valid subscriber status", status)),
        }
    }
}

impl AsRef<str> for SubscriberStatus {
    fn as_ref(&self) -> &str {
        match self {
            SubscriberStatus::Active => "active",
            SubscriberStatus::Inactive => "inactive",
        }
    }
}
