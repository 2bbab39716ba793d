use crate::domain::audience::TargetKind;
use crate::domain::newsletter::{NewsletterBody, NewsletterSubject};
use crate::domain::subscriber_email::SubscriberEmail;
use crate::ports::StoreError;
use crate::services::accounting::DeliveryAccounting;
use crate::services::audience::{AudienceError, AudienceSelector};
use crate::services::dispatcher::{BroadcastDispatcher, DeliveryOutcome};

#[derive(Debug, serde::Serialize)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
    pub outcomes: Vec<DeliveryOutcome>,
}

impl BroadcastReport {
    fn from_outcomes(outcomes: Vec<DeliveryOutcome>) -> Self {
        let sent = outcomes.iter().filter(|outcome| outcome.is_delivered()).count();

        BroadcastReport {
            sent,
            failed: outcomes.len() - sent,
            outcomes,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum BroadcastError {
    #[error(transparent)]
    Audience(#[from] AudienceError),
    #[error("The selected audience has no active subscribers")]
    NoRecipients,
    #[error("Newsletter went out ({sent} delivered, {failed} failed) but delivery outcomes were not recorded")]
    Store {
        sent: usize,
        failed: usize,
        #[source]
        source: StoreError,
    },
}

/// Resolve the audience, send to every recipient, then credit the delivered ones.
pub struct BroadcastService {
    selector: AudienceSelector,
    dispatcher: BroadcastDispatcher,
    accounting: DeliveryAccounting,
}

impl BroadcastService {
    pub fn new(
        selector: AudienceSelector,
        dispatcher: BroadcastDispatcher,
        accounting: DeliveryAccounting,
    ) -> Self {
        Self {
            selector,
            dispatcher,
            accounting,
        }
    }

    pub fn selector(&self) -> &AudienceSelector {
        &self.selector
    }

    #[tracing::instrument(
        name = "Publish a newsletter",
        skip(self, subject, body),
        fields(subject = %subject.as_ref())
    )]
    pub async fn publish(
        &self,
        target_kind: TargetKind,
        interest_tag: Option<&str>,
        subject: &NewsletterSubject,
        body: &NewsletterBody,
    ) -> Result<BroadcastReport, BroadcastError> {
        let recipients: Vec<SubscriberEmail> = self
            .selector
            .resolve(target_kind, interest_tag)
            .await?
            .into_iter()
            .map(|subscriber| subscriber.email)
            .collect();

        if recipients.is_empty() {
            return Err(BroadcastError::NoRecipients);
        }

        let outcomes = self.dispatcher.dispatch(subject, body, &recipients).await;
        let report = BroadcastReport::from_outcomes(outcomes);

        if let Err(source) = self.accounting.record(&report.outcomes).await {
            tracing::error!(
                outcomes = ?report.outcomes,
                "Newsletter went out to {} subscribers but their counters were not updated: {:?}",
                report.sent,
                source
            );
            return Err(BroadcastError::Store {
                sent: report.sent,
                failed: report.failed,
                source,
            });
        }

        tracing::info!(
            "Newsletter sent to {} subscribers, {} failed",
            report.sent,
            report.failed
        );

        Ok(report)
    }
}
