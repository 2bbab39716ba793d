use serde::Deserialize;

use crate::domain::interest::{Interest, Interests};

/// Targeting expression sent by an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    All,
    Active,
    SpecificInterest,
}

/// Predicate the subscriber store applies on top of `status = active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudienceFilter {
    EveryActive,
    Interested(Interest),
}

impl AudienceFilter {
    pub fn admits(&self, interests: &Interests) -> bool {
        match self {
            AudienceFilter::EveryActive => true,
            AudienceFilter::Interested(interest) => interests.covers(*interest),
        }
    }

    pub fn interest(&self) -> Option<Interest> {
        match self {
            AudienceFilter::EveryActive => None,
            AudienceFilter::Interested(interest) => Some(*interest),
        }
    }
}
