use serde::Deserialize;

use crate::domain::interest::Interests;
use crate::domain::subscriber::Provenance;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_name::SubscriberName;

const DEFAULT_SOURCE: &str = "website";

/// A validated subscribe request.
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub email: SubscriberEmail,
    pub name: Option<SubscriberName>,
    /// `None` when the request did not pick any interest.
    pub interests: Option<Interests>,
    pub provenance: Provenance,
}

#[derive(Deserialize)]
pub struct NewSubscriberBody {
    pub email: String,
    pub name: Option<String>,
    pub interests: Option<Vec<String>>,
    pub source: Option<String>,
}

impl NewSubscriber {
    pub fn parse(
        body: NewSubscriberBody,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<NewSubscriber, String> {
        let email = SubscriberEmail::parse(body.email)?;
        let name = body.name.map(SubscriberName::parse).transpose()?;
        let interests = match body.interests {
            Some(tags) => Interests::parse(tags.as_slice())?,
            None => None,
        };
        let source = body
            .source
            .filter(|source| !source.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());

        Ok(NewSubscriber {
            email,
            name,
            interests,
            provenance: Provenance {
                source,
                ip_address,
                user_agent,
            },
        })
    }
}
