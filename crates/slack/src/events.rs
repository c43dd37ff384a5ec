//! Inbound Events API wire shapes and the domain event they admit to.

use serde::Deserialize;

/// Raw JSON envelope posted by Slack to the events endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type", default)]
    pub envelope_type: String,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub event: Option<CallbackEvent>,
}

/// The inner `event` object of an `event_callback` envelope.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallbackEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
}

/// Event shape as routed by policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// `message` in a one-to-one `im` channel.
    DirectMessage,
    /// `message` in a regular channel.
    ChannelMessage,
    /// `app_mention`.
    Mention,
    Other,
}

/// Immutable record of an admitted event. Everything the pipeline needs,
/// nothing it should not see twice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundEvent {
    pub event_id: Option<String>,
    pub kind: EventKind,
    pub conversation_id: String,
    pub sender_id: String,
    pub raw_text: String,
    pub from_bot: bool,
    pub subtype: Option<String>,
}

impl CallbackEvent {
    pub fn kind(&self) -> EventKind {
        match self.event_type.as_str() {
            "app_mention" => EventKind::Mention,
            "message" => {
                if self.channel_type.as_deref() == Some("im") {
                    EventKind::DirectMessage
                } else {
                    EventKind::ChannelMessage
                }
            }
            _ => EventKind::Other,
        }
    }
}
