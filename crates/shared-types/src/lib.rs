use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod events;
pub mod whatsapp;

pub use events::{Event, EventResponses, Person};

/// The three mutually exclusive answers offered in an invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Yes,
    Maybe,
    No,
}

impl Availability {
    pub const ALL: [Availability; 3] = [Availability::Yes, Availability::Maybe, Availability::No];

    /// Token embedded in reply button ids.
    pub fn token(&self) -> &'static str {
        match self {
            Availability::Yes => "YES",
            Availability::Maybe => "MAYBE",
            Availability::No => "NO",
        }
    }

    /// Case-insensitive inverse of [`Availability::token`].
    pub fn from_token(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "YES" => Some(Availability::Yes),
            "MAYBE" => Some(Availability::Maybe),
            "NO" => Some(Availability::No),
            _ => None,
        }
    }

    /// Button label shown to the participant.
    pub fn label(&self) -> &'static str {
        match self {
            Availability::Yes => "Yes",
            Availability::Maybe => "Maybe",
            Availability::No => "No",
        }
    }

    /// Response status understood by the events platform.
    pub fn as_status(&self) -> &'static str {
        match self {
            Availability::Yes => "attending",
            Availability::Maybe => "maybe",
            Availability::No => "declined",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_status())
    }
}

// ============================================================================
// Option ids
// ============================================================================

pub const OPTION_ID_PREFIX: &str = "EVT";

/// Why a reply button id could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionIdError {
    #[error("malformed option id: {0}")]
    Malformed(String),

    #[error("unknown response choice: {0}")]
    InvalidChoice(String),
}

/// Reply button id of the form `EVT:<event_id>:<TOKEN>`.
///
/// The event id rides along in every option so a reply can be correlated
/// with its invite without any stored lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OptionId {
    pub event_id: String,
    pub choice: Availability,
}

impl OptionId {
    pub fn new(event_id: impl Into<String>, choice: Availability) -> Self {
        Self {
            event_id: event_id.into(),
            choice,
        }
    }

    /// Whether `event_id` survives an encode/parse round trip.
    ///
    /// The id is the middle field of a `:`-separated triple, so it must be
    /// non-empty and free of `:`.
    pub fn accepts_event_id(event_id: &str) -> bool {
        !event_id.is_empty() && !event_id.contains(':')
    }

    pub fn encode(&self) -> String {
        format!(
            "{}:{}:{}",
            OPTION_ID_PREFIX,
            self.event_id,
            self.choice.token()
        )
    }

    pub fn parse(raw: &str) -> Result<Self, OptionIdError> {
        let mut parts = raw.splitn(3, ':');
        let (prefix, event_id, token) = match (parts.next(), parts.next(), parts.next()) {
            (Some(p), Some(e), Some(t)) => (p, e, t),
            _ => return Err(OptionIdError::Malformed(raw.to_string())),
        };

        if prefix != OPTION_ID_PREFIX || event_id.is_empty() {
            return Err(OptionIdError::Malformed(raw.to_string()));
        }

        let choice = Availability::from_token(token)
            .ok_or_else(|| OptionIdError::InvalidChoice(token.to_string()))?;

        Ok(Self::new(event_id, choice))
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

// ============================================================================
// Identities
// ============================================================================

/// Messaging-platform identity, always E.164 with a leading `+`.
///
/// WhatsApp delivers sender numbers without the plus sign while the events
/// platform usually stores them with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(String);

impl ContactId {
    /// Normalise a raw phone number. Returns `None` for blank input.
    pub fn normalise(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "+" {
            return None;
        }
        if trimmed.starts_with('+') {
            Some(Self(trimmed.to_string()))
        } else {
            Some(Self(format!("+{}", trimmed)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Events-platform identity of a participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Link between a sent prompt and the reply it expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteCorrelation {
    pub event_id: String,
    pub person_id: PersonId,
    pub contact_id: ContactId,
}

// ============================================================================
// API Request/Response types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedInvite {
    pub event_id: String,
    pub person_id: String,
    pub reason: String,
}

/// Body returned by the sync-and-invite trigger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncResponse {
    pub invites_sent: usize,
    pub events_seen: usize,
    #[serde(default)]
    pub skipped: Vec<SkippedInvite>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyResult {
    pub contact: String,
    pub status: String,
}

/// Body returned to the messaging platform for a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub status: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<ReplyResult>,
}

impl WebhookAck {
    pub fn ignored() -> Self {
        Self {
            status: "ignored".to_string(),
            results: Vec::new(),
        }
    }

    /// Overall status is the first non-`ok` result, `ok` otherwise.
    pub fn from_results(results: Vec<ReplyResult>) -> Self {
        if results.is_empty() {
            return Self::ignored();
        }
        let status = results
            .iter()
            .find(|r| r.status != "ok")
            .map(|r| r.status.clone())
            .unwrap_or_else(|| "ok".to_string());
        Self { status, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_id_encode() {
        let id = OptionId::new("A1B2", Availability::Maybe);
        assert_eq!(id.encode(), "EVT:A1B2:MAYBE");
    }

    #[test]
    fn test_option_id_parse_case_insensitive() {
        let id = OptionId::parse("EVT:A1B2:yes").expect("should parse");
        assert_eq!(id.event_id, "A1B2");
        assert_eq!(id.choice, Availability::Yes);
    }

    #[test]
    fn test_option_id_parse_rejects_missing_parts() {
        assert!(matches!(
            OptionId::parse("EVT:A1B2"),
            Err(OptionIdError::Malformed(_))
        ));
        assert!(matches!(
            OptionId::parse(""),
            Err(OptionIdError::Malformed(_))
        ));
        assert!(matches!(
            OptionId::parse("EVT::YES"),
            Err(OptionIdError::Malformed(_))
        ));
    }

    #[test]
    fn test_option_id_parse_rejects_foreign_prefix() {
        assert!(matches!(
            OptionId::parse("BTN:A1B2:YES"),
            Err(OptionIdError::Malformed(_))
        ));
    }

    #[test]
    fn test_option_id_parse_unknown_choice() {
        assert_eq!(
            OptionId::parse("EVT:A1B2:PERHAPS"),
            Err(OptionIdError::InvalidChoice("PERHAPS".to_string()))
        );
        // Extra separators stay with the choice token.
        assert!(matches!(
            OptionId::parse("EVT:A1B2:YES:extra"),
            Err(OptionIdError::InvalidChoice(_))
        ));
    }

    #[test]
    fn test_event_id_must_round_trip() {
        assert!(OptionId::accepts_event_id("A1B2"));
        assert!(!OptionId::accepts_event_id(""));
        assert!(!OptionId::accepts_event_id("A:B"));

        let encoded = OptionId::new("A1B2", Availability::No).encode();
        assert_eq!(
            OptionId::parse(&encoded),
            Ok(OptionId::new("A1B2", Availability::No))
        );
    }

    #[test]
    fn test_availability_status_mapping() {
        assert_eq!(Availability::Yes.as_status(), "attending");
        assert_eq!(Availability::Maybe.as_status(), "maybe");
        assert_eq!(Availability::No.as_status(), "declined");
    }

    #[test]
    fn test_contact_normalise() {
        assert_eq!(
            ContactId::normalise("447700900000").unwrap().as_str(),
            "+447700900000"
        );
        assert_eq!(
            ContactId::normalise("  +447700900000 ").unwrap().as_str(),
            "+447700900000"
        );
        assert!(ContactId::normalise("   ").is_none());
        assert!(ContactId::normalise("").is_none());
    }

    #[test]
    fn test_webhook_ack_overall_status() {
        let ack = WebhookAck::from_results(vec![
            ReplyResult {
                contact: "+1".to_string(),
                status: "ok".to_string(),
            },
            ReplyResult {
                contact: "+2".to_string(),
                status: "unmapped_number".to_string(),
            },
        ]);
        assert_eq!(ack.status, "unmapped_number");
        assert_eq!(WebhookAck::from_results(vec![]).status, "ignored");
    }
}
