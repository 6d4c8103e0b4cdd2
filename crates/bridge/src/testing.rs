//! In-process fakes for the external platforms.
//!
//! Shared by unit tests and the route tests under `tests/`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared_types::{Availability, ContactId, Event, EventResponses, Person, PersonId};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::clients::{EventsPlatform, Messenger};
use crate::repository::IdentityStore;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Build an event whose pending members are `unanswered` then `unconfirmed`.
pub fn event(id: &str, heading: &str, unanswered: &[&str], unconfirmed: &[&str]) -> Event {
    Event {
        id: id.to_string(),
        heading: heading.to_string(),
        start_timestamp: None,
        responses: EventResponses {
            unanswered_ids: unanswered.iter().map(|s| s.to_string()).collect(),
            unconfirmed_ids: unconfirmed.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        },
    }
}

pub fn person(id: &str, phone: Option<&str>) -> Person {
    Person {
        id: id.to_string(),
        first_name: Some(format!("Player {}", id)),
        phone_number: phone.map(str::to_string),
        ..Default::default()
    }
}

/// Events platform backed by fixed events and people.
#[derive(Default)]
pub struct FakeEventsPlatform {
    events: Vec<Event>,
    people: HashMap<String, Person>,
    fail_listing: bool,
    fail_updates: bool,
    windows: Mutex<Vec<u32>>,
    updates: Mutex<Vec<(String, PersonId, Availability)>>,
}

impl FakeEventsPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_person(mut self, person: Person) -> Self {
        self.people.insert(person.id.clone(), person);
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn failing_updates(mut self) -> Self {
        self.fail_updates = true;
        self
    }

    /// `days_ahead` of every listing request, in order.
    pub fn requested_windows(&self) -> Vec<u32> {
        lock(&self.windows).clone()
    }

    /// Every response update received, in order.
    pub fn updates(&self) -> Vec<(String, PersonId, Availability)> {
        lock(&self.updates).clone()
    }
}

#[async_trait]
impl EventsPlatform for FakeEventsPlatform {
    async fn upcoming_events(&self, days_ahead: u32) -> Result<Vec<Event>> {
        lock(&self.windows).push(days_ahead);
        if self.fail_listing {
            return Err(anyhow!("events listing unavailable"));
        }
        Ok(self.events.clone())
    }

    async fn get_person(&self, person_id: &PersonId) -> Result<Person> {
        self.people
            .get(person_id.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("Person {} not found", person_id))
    }

    async fn set_response(
        &self,
        event_id: &str,
        person_id: &PersonId,
        choice: Availability,
    ) -> Result<()> {
        if self.fail_updates {
            return Err(anyhow!("response update rejected"));
        }
        lock(&self.updates).push((event_id.to_string(), person_id.clone(), choice));
        Ok(())
    }
}

/// Messenger that records instead of sending.
#[derive(Default)]
pub struct RecordingMessenger {
    failing: HashSet<String>,
    prompts: Mutex<Vec<(String, String, String)>>,
    texts: Mutex<Vec<(String, String)>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `contact` fail.
    pub fn failing_for(mut self, contact: &str) -> Self {
        self.failing.insert(contact.to_string());
        self
    }

    /// `(to, event_id, title)` of every prompt sent.
    pub fn prompts(&self) -> Vec<(String, String, String)> {
        lock(&self.prompts).clone()
    }

    /// `(to, body)` of every text sent.
    pub fn texts(&self) -> Vec<(String, String)> {
        lock(&self.texts).clone()
    }

    fn check(&self, to: &ContactId) -> Result<()> {
        if self.failing.contains(to.as_str()) {
            return Err(anyhow!("delivery to {} failed", to));
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_availability_prompt(
        &self,
        to: &ContactId,
        event_id: &str,
        title: &str,
    ) -> Result<()> {
        self.check(to)?;
        lock(&self.prompts).push((to.to_string(), event_id.to_string(), title.to_string()));
        Ok(())
    }

    async fn send_text(&self, to: &ContactId, body: &str) -> Result<()> {
        self.check(to)?;
        lock(&self.texts).push((to.to_string(), body.to_string()));
        Ok(())
    }
}

/// Identity store whose every operation fails.
#[derive(Default)]
pub struct FailingIdentityStore;

#[async_trait]
impl IdentityStore for FailingIdentityStore {
    async fn upsert(&self, _contact: &ContactId, _person: &PersonId) -> Result<()> {
        Err(anyhow!("identity store unavailable"))
    }

    async fn person_for(&self, _contact: &ContactId) -> Result<Option<PersonId>> {
        Err(anyhow!("identity store unavailable"))
    }

    async fn list(&self) -> Result<Vec<(ContactId, PersonId)>> {
        Err(anyhow!("identity store unavailable"))
    }
}
