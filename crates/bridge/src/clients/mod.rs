//! Outbound collaborators: the events platform and the messaging platform.
//!
//! The services only see these traits; the reqwest-backed implementations
//! live in the submodules.

use anyhow::Result;
use async_trait::async_trait;
use shared_types::{Availability, ContactId, Event, Person, PersonId};

pub mod spond;
pub mod whatsapp;

pub use spond::SpondClient;
pub use whatsapp::WhatsAppClient;

#[async_trait]
pub trait EventsPlatform: Send + Sync {
    /// Events starting between now and `days_ahead` days from now.
    async fn upcoming_events(&self, days_ahead: u32) -> Result<Vec<Event>>;

    async fn get_person(&self, person_id: &PersonId) -> Result<Person>;

    /// Record `choice` as the person's response to the event.
    async fn set_response(
        &self,
        event_id: &str,
        person_id: &PersonId,
        choice: Availability,
    ) -> Result<()>;
}

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Interactive message with one reply button per [`Availability`].
    async fn send_availability_prompt(
        &self,
        to: &ContactId,
        event_id: &str,
        title: &str,
    ) -> Result<()>;

    async fn send_text(&self, to: &ContactId, body: &str) -> Result<()>;
}
