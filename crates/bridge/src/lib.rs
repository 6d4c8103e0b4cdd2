//! WhatsApp ⇄ Spond availability bridge.
//!
//! Sends availability prompts over WhatsApp to members who have not
//! answered upcoming Spond events, and writes their button replies back to
//! Spond.

use std::sync::Arc;

pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod pollers;
pub mod repository;
pub mod routes;
mod schema;
pub mod services;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use clients::{EventsPlatform, Messenger};
use repository::IdentityStore;
use services::{InviteDispatcher, ReplyHandler};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<InviteDispatcher>,
    pub replies: Arc<ReplyHandler>,
    pub verify_token: String,
    pub days_ahead: u32,
}

impl AppState {
    pub fn new(
        events: Arc<dyn EventsPlatform>,
        messenger: Arc<dyn Messenger>,
        identities: Arc<dyn IdentityStore>,
        verify_token: impl Into<String>,
        days_ahead: u32,
    ) -> Self {
        let dispatcher = InviteDispatcher::new(
            events.clone(),
            messenger.clone(),
            identities.clone(),
        );
        let replies = ReplyHandler::new(events, messenger, identities);

        Self {
            dispatcher: Arc::new(dispatcher),
            replies: Arc::new(replies),
            verify_token: verify_token.into(),
            days_ahead,
        }
    }
}
