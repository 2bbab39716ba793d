use std::sync::Arc;

use crate::domain::audience::{AudienceFilter, TargetKind};
use crate::domain::interest::Interest;
use crate::domain::subscriber::Subscriber;
use crate::ports::{StoreError, SubscriberStore};

#[derive(thiserror::Error, Debug)]
pub enum AudienceError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Turns a targeting expression into the list of subscribers it reaches.
pub struct AudienceSelector {
    store: Arc<dyn SubscriberStore>,
}

impl AudienceSelector {
    pub fn new(store: Arc<dyn SubscriberStore>) -> Self {
        Self { store }
    }

    /// `all` and `active` both mean every active subscriber.
    pub fn filter(
        target_kind: TargetKind,
        interest_tag: Option<&str>,
    ) -> Result<AudienceFilter, AudienceError> {
        match target_kind {
            TargetKind::All | TargetKind::Active => Ok(AudienceFilter::EveryActive),
            TargetKind::SpecificInterest => {
                let tag = interest_tag
                    .filter(|tag| !tag.trim().is_empty())
                    .ok_or_else(|| {
                        AudienceError::InvalidTarget(
                            "specific-interest requires an interest tag".to_string(),
                        )
                    })?;
                let interest = Interest::parse(tag).map_err(AudienceError::InvalidTarget)?;

                Ok(AudienceFilter::Interested(interest))
            }
        }
    }

    /// An empty audience is a valid result.
    #[tracing::instrument(name = "Resolve a newsletter audience", skip(self))]
    pub async fn resolve(
        &self,
        target_kind: TargetKind,
        interest_tag: Option<&str>,
    ) -> Result<Vec<Subscriber>, AudienceError> {
        let filter = Self::filter(target_kind, interest_tag)?;
        let audience = self.store.query_active(&filter).await?;

        tracing::info!("Resolved an audience of {} subscribers", audience.len());

        Ok(audience)
    }
}
