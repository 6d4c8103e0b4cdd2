//! Events-platform entities as returned by the Spond API.
//!
//! Only the fields the bridge reads are modelled; everything else in the
//! payload is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::PersonId;

pub const DEFAULT_EVENT_HEADING: &str = "Upcoming event";

fn default_heading() -> String {
    DEFAULT_EVENT_HEADING.to_string()
}

/// RSVP buckets of an event, keyed by person id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponses {
    #[serde(default)]
    pub accepted_ids: Vec<String>,
    #[serde(default)]
    pub declined_ids: Vec<String>,
    #[serde(default)]
    pub unanswered_ids: Vec<String>,
    #[serde(default)]
    pub unconfirmed_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(alias = "uid")]
    pub id: String,
    #[serde(default = "default_heading")]
    pub heading: String,
    #[serde(default)]
    pub start_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub responses: EventResponses,
}

impl Event {
    /// Members who have not answered or not confirmed, de-duplicated.
    ///
    /// Unanswered members come first, both buckets keep their API order.
    pub fn pending_respondents(&self) -> Vec<PersonId> {
        let mut seen = std::collections::HashSet::new();
        self.responses
            .unanswered_ids
            .iter()
            .chain(self.responses.unconfirmed_ids.iter())
            .filter(|id| !id.is_empty() && seen.insert(id.as_str()))
            .map(|id| PersonId::new(id.clone()))
            .collect()
    }
}

/// A group member profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
}

impl Person {
    /// First non-blank of `phoneNumber`, `phone`, `mobile`.
    pub fn contact_phone(&self) -> Option<&str> {
        [&self.phone_number, &self.phone, &self.mobile]
            .into_iter()
            .flatten()
            .map(|p| p.trim())
            .find(|p| !p.is_empty())
    }

    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.id.clone(),
        }
    }
}
