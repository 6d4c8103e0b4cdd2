//! Reply handling: button press → events-platform response.

use shared_types::whatsapp::InboundReply;
use shared_types::{
    Availability, ContactId, InviteCorrelation, OptionId, OptionIdError, ReplyResult,
};
use std::sync::Arc;
use thiserror::Error;

use crate::clients::{EventsPlatform, Messenger};
use crate::repository::IdentityStore;

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("malformed option id: {0}")]
    MalformedOptionId(String),

    #[error("unknown response choice: {0}")]
    InvalidChoice(String),

    #[error("no person linked to {0}")]
    UnresolvableIdentity(ContactId),

    #[error("identity lookup failed")]
    IdentityStore(#[source] anyhow::Error),

    #[error("events platform update failed")]
    Platform(#[source] anyhow::Error),
}

impl From<OptionIdError> for ReplyError {
    fn from(err: OptionIdError) -> Self {
        match err {
            OptionIdError::Malformed(raw) => ReplyError::MalformedOptionId(raw),
            OptionIdError::InvalidChoice(token) => ReplyError::InvalidChoice(token),
        }
    }
}

impl ReplyError {
    /// Status reported back in the webhook acknowledgement.
    pub fn status(&self) -> &'static str {
        match self {
            ReplyError::MalformedOptionId(_) => "bad_button_id",
            ReplyError::InvalidChoice(_) => "invalid_choice",
            ReplyError::UnresolvableIdentity(_) => "unmapped_number",
            ReplyError::IdentityStore(_) => "store_error",
            ReplyError::Platform(_) => "spond_error",
        }
    }

    /// Text sent back to the participant.
    pub fn user_message(&self) -> &'static str {
        match self {
            ReplyError::MalformedOptionId(_) => {
                "Sorry, I couldn't process your response. Please ask the coach."
            }
            ReplyError::InvalidChoice(_) => "Sorry, unknown response choice.",
            ReplyError::UnresolvableIdentity(_) => {
                "Couldn't link your number to any player. Please rejoin via the invite."
            }
            ReplyError::IdentityStore(_) | ReplyError::Platform(_) => {
                "An error occurred updating your status. Try again later."
            }
        }
    }
}

/// A reply matched back to the invite it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReply {
    pub correlation: InviteCorrelation,
    pub choice: Availability,
}

/// Turns button replies into response updates on the events platform.
pub struct ReplyHandler {
    events: Arc<dyn EventsPlatform>,
    messenger: Arc<dyn Messenger>,
    identities: Arc<dyn IdentityStore>,
}

impl ReplyHandler {
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

    /// Decode the option id and find the person behind `contact`.
    pub async fn resolve(
        &self,
        contact: &ContactId,
        option_id: &str,
    ) -> Result<ResolvedReply, ReplyError> {
        let option = OptionId::parse(option_id)?;

        let person_id = self
            .identities
            .person_for(contact)
            .await
            .map_err(ReplyError::IdentityStore)?
            .ok_or_else(|| ReplyError::UnresolvableIdentity(contact.clone()))?;

        Ok(ResolvedReply {
            correlation: InviteCorrelation {
                event_id: option.event_id,
                person_id,
                contact_id: contact.clone(),
            },
            choice: option.choice,
        })
    }

    /// Resolve the reply and write it to the events platform.
    ///
    /// Every call that resolves issues exactly one update, duplicates
    /// included.
    pub async fn handle(
        &self,
        contact: &ContactId,
        option_id: &str,
    ) -> Result<ResolvedReply, ReplyError> {
        let resolved = self.resolve(contact, option_id).await?;
        let correlation = &resolved.correlation;

        self.events
            .set_response(&correlation.event_id, &correlation.person_id, resolved.choice)
            .await
            .map_err(ReplyError::Platform)?;

        Ok(resolved)
    }

    /// Handle one inbound reply and tell the sender how it went.
    ///
    /// Returns `None` when the message carries no usable sender number.
    pub async fn handle_and_notify(&self, reply: &InboundReply) -> Option<ReplyResult> {
        let contact = match ContactId::normalise(&reply.from) {
            Some(contact) => contact,
            None => {
                tracing::warn!("Ignoring reply without sender number");
                return None;
            }
        };

        let (status, message) = match self.handle(&contact, &reply.option_id).await {
            Ok(resolved) => {
                tracing::info!(
                    "Recorded {} for {} ({}) on event {}",
                    resolved.choice,
                    resolved.correlation.person_id,
                    contact,
                    resolved.correlation.event_id
                );
                ("ok", format!("Got it — marked you as {} ✅", resolved.choice))
            }
            Err(e) => {
                tracing::warn!(
                    "Reply from {} with option {:?} not applied: {:?}",
                    contact,
                    reply.option_id,
                    e
                );
                (e.status(), e.user_message().to_string())
            }
        };

        if let Err(e) = self.messenger.send_text(&contact, &message).await {
            tracing::error!("Failed to send confirmation to {}: {:#}", contact, e);
        }

        Some(ReplyResult {
            contact: contact.to_string(),
            status: status.to_string(),
        })
    }
}
