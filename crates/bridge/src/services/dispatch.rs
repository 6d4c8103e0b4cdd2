//! Invite dispatch: upcoming events → availability prompts.

use anyhow::{Context, Result};
use shared_types::{
    ContactId, Event, InviteCorrelation, OptionId, PersonId, SkippedInvite, SyncResponse,
};
use std::fmt;
use std::sync::Arc;

use crate::clients::{EventsPlatform, Messenger};
use crate::repository::IdentityStore;

/// Why a pending member did not receive an invite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The event id cannot be carried in a reply button id.
    UnencodableEventId,
    PersonLookup(String),
    NoPhone,
    IdentityStore(String),
    Send(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnencodableEventId => write!(f, "event id cannot be encoded in a reply"),
            SkipReason::PersonLookup(e) => write!(f, "person lookup failed: {}", e),
            SkipReason::NoPhone => write!(f, "no phone number on profile"),
            SkipReason::IdentityStore(e) => write!(f, "identity store failed: {}", e),
            SkipReason::Send(e) => write!(f, "message send failed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub event_id: String,
    pub person_id: PersonId,
    pub reason: SkipReason,
}

/// Outcome of one dispatch run.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub events_seen: usize,
    pub sent: Vec<InviteCorrelation>,
    pub skipped: Vec<Skipped>,
}

impl DispatchReport {
    pub fn invites_sent(&self) -> usize {
        self.sent.len()
    }
}

impl From<DispatchReport> for SyncResponse {
    fn from(report: DispatchReport) -> Self {
        SyncResponse {
            invites_sent: report.invites_sent(),
            events_seen: report.events_seen,
            skipped: report
                .skipped
                .into_iter()
                .map(|s| SkippedInvite {
                    event_id: s.event_id,
                    person_id: s.person_id.to_string(),
                    reason: s.reason.to_string(),
                })
                .collect(),
        }
    }
}

/// Sends availability prompts to members who have not answered yet.
pub struct InviteDispatcher {
    events: Arc<dyn EventsPlatform>,
    messenger: Arc<dyn Messenger>,
    identities: Arc<dyn IdentityStore>,
}

impl InviteDispatcher {
    pub fn new(
        events: Arc<dyn EventsPlatform>,
        messenger: Arc<dyn Messenger>,
        identities: Arc<dyn IdentityStore>,
    ) -> Self {
        Self {
            events,
            messenger,
            identities,
        }
    }

    /// Invite every pending member of every event in the next `days_ahead`
    /// days.
    ///
    /// Only a failure to list events fails the run; per-member failures are
    /// recorded in the report and the run moves on.
    pub async fn dispatch(&self, days_ahead: u32) -> Result<DispatchReport> {
        let events = self
            .events
            .upcoming_events(days_ahead)
            .await
            .context("Failed to list upcoming events")?;

        let mut report = DispatchReport::default();
        for event in &events {
            self.dispatch_event(event, &mut report).await;
        }

        tracing::info!(
            "Dispatch finished: {} events, {} invites sent, {} skipped",
            report.events_seen,
            report.invites_sent(),
            report.skipped.len()
        );
        Ok(report)
    }

    pub async fn dispatch_event(&self, event: &Event, report: &mut DispatchReport) {
        report.events_seen += 1;

        let pending = event.pending_respondents();
        tracing::debug!(
            "Event {} ({}) has {} pending respondents",
            event.id,
            event.heading,
            pending.len()
        );

        if !OptionId::accepts_event_id(&event.id) {
            tracing::warn!(
                "Event {:?} ({}) has an id that replies cannot carry, not inviting",
                event.id,
                event.heading
            );
            report
                .skipped
                .extend(pending.into_iter().map(|person_id| Skipped {
                    event_id: event.id.clone(),
                    person_id,
                    reason: SkipReason::UnencodableEventId,
                }));
            return;
        }

        for person_id in pending {
            match self.invite(event, &person_id).await {
                Ok(correlation) => report.sent.push(correlation),
                Err(reason) => {
                    tracing::warn!(
                        "Skipping invite for {} on event {}: {}",
                        person_id,
                        event.id,
                        reason
                    );
                    report.skipped.push(Skipped {
                        event_id: event.id.clone(),
                        person_id,
                        reason,
                    });
                }
            }
        }
    }

    async fn invite(
        &self,
        event: &Event,
        person_id: &PersonId,
    ) -> Result<InviteCorrelation, SkipReason> {
        let person = self
            .events
            .get_person(person_id)
            .await
            .map_err(|e| SkipReason::PersonLookup(format!("{:#}", e)))?;

        let contact = person
            .contact_phone()
            .and_then(ContactId::normalise)
            .ok_or(SkipReason::NoPhone)?;

        // The mapping is written before sending so a fast reply can resolve.
        self.identities
            .upsert(&contact, person_id)
            .await
            .map_err(|e| SkipReason::IdentityStore(format!("{:#}", e)))?;

        self.messenger
            .send_availability_prompt(&contact, &event.id, &event.heading)
            .await
            .map_err(|e| SkipReason::Send(format!("{:#}", e)))?;

        tracing::info!(
            "Invited {} ({}) to event {}",
            person.display_name(),
            contact,
            event.id
        );

        Ok(InviteCorrelation {
            event_id: event.id.clone(),
            person_id: person_id.clone(),
            contact_id: contact,
        })
    }
}
