//! WhatsApp Cloud API payloads.
//!
//! Inbound types follow the webhook notification envelope
//! (`entry[].changes[].value.messages[]`), outbound types the `/messages`
//! send endpoint.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Availability, OptionId};

pub const MESSAGING_PRODUCT: &str = "whatsapp";

// ============================================================================
// Inbound webhook envelope
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookNotification {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default, deserialize_with = "lenient_messages")]
    pub messages: Vec<InboundMessage>,
}

/// Decode each message on its own; one malformed message is dropped without
/// taking the rest of the batch with it.
fn lenient_messages<'de, D>(deserializer: D) -> Result<Vec<InboundMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub interactive: Option<Interactive>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Interactive {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub button_reply: Option<ButtonReply>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ButtonReply {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// A button press pulled out of a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundReply {
    /// Sender number exactly as delivered (usually without `+`).
    pub from: String,
    /// Raw id of the pressed button.
    pub option_id: String,
}

impl WebhookNotification {
    /// Every `button_reply` in the batch, in delivery order.
    pub fn button_replies(&self) -> Vec<InboundReply> {
        self.entry
            .iter()
            .flat_map(|entry| entry.changes.iter())
            .flat_map(|change| change.value.messages.iter())
            .filter_map(|message| {
                let interactive = message.interactive.as_ref()?;
                if interactive.kind.as_deref() != Some("button_reply") {
                    return None;
                }
                let reply = interactive.button_reply.as_ref()?;
                Some(InboundReply {
                    from: message.from.clone(),
                    option_id: reply.id.clone(),
                })
            })
            .collect()
    }
}

// ============================================================================
// Outbound messages
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage {
    pub messaging_product: &'static str,
    pub to: String,
    #[serde(flatten)]
    pub content: MessageContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextBody },
    Interactive { interactive: InteractiveMessage },
}

#[derive(Debug, Clone, Serialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractiveMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub body: InteractiveBody,
    pub action: ButtonAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractiveBody {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ButtonAction {
    pub buttons: Vec<ReplyButton>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyButton {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub reply: ReplyButtonContent,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyButtonContent {
    pub id: String,
    pub title: String,
}

impl OutboundMessage {
    pub fn text(to: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            messaging_product: MESSAGING_PRODUCT,
            to: to.into(),
            content: MessageContent::Text {
                text: TextBody { body: body.into() },
            },
        }
    }

    /// Yes / Maybe / No buttons, each id carrying `event_id`.
    pub fn availability_prompt(to: impl Into<String>, event_id: &str, title: &str) -> Self {
        let buttons = Availability::ALL
            .iter()
            .map(|choice| ReplyButton {
                kind: "reply",
                reply: ReplyButtonContent {
                    id: OptionId::new(event_id, *choice).encode(),
                    title: choice.label().to_string(),
                },
            })
            .collect();

        Self {
            messaging_product: MESSAGING_PRODUCT,
            to: to.into(),
            content: MessageContent::Interactive {
                interactive: InteractiveMessage {
                    kind: "button",
                    body: InteractiveBody {
                        text: format!("{}\nAre you available?", title),
                    },
                    action: ButtonAction { buttons },
                },
            },
        }
    }
}
