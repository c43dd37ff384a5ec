//! Event intake gate: the single entry point deciding whether raw transport
//! input becomes work.
//!
//! Order matters: the signature is verified over the raw bytes before the
//! payload is parsed or trusted; the handshake challenge bypasses all other
//! logic; duplicates are suppressed before routing; only then is the event
//! shape filtered by policy.

use deskmate_core::config::RoutingConfig;
use tracing::debug;

use crate::dedup::SeenEventIds;
use crate::events::{EventEnvelope, EventKind, InboundEvent};
use crate::signature::SignatureVerifier;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision {
    /// Transport-level failure; the caller answers HTTP 400.
    Rejected(&'static str),
    /// Platform handshake; echo the token verbatim.
    Challenge(String),
    /// Valid but unwanted; acknowledged and discarded silently.
    Dropped(DropReason),
    /// Admitted to the answer pipeline.
    Accepted(InboundEvent),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    DuplicateDelivery,
    BotAuthored,
    IgnoredSubtype,
    UnroutedKind,
}

pub struct IntakeGate {
    verifier: SignatureVerifier,
    seen: SeenEventIds,
    routing: RoutingConfig,
}

impl IntakeGate {
    pub fn new(verifier: SignatureVerifier, dedup_capacity: usize, routing: RoutingConfig) -> Self {
        Self { verifier, seen: SeenEventIds::new(dedup_capacity), routing }
    }

    /// Run the full intake sequence over one delivery.
    ///
    /// The only side effect is recording the event id for duplicate
    /// suppression.
    pub fn admit(
        &self,
        raw_body: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
        now_unix: i64,
    ) -> GateDecision {
        let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
            return GateDecision::Rejected("missing signature headers");
        };
        if !self.verifier.verify(raw_body, timestamp, signature, now_unix) {
            return GateDecision::Rejected("invalid signature");
        }

        let envelope: EventEnvelope = match serde_json::from_slice(raw_body) {
            Ok(envelope) => envelope,
            Err(_) => return GateDecision::Rejected("malformed payload"),
        };

        if envelope.envelope_type == "url_verification" {
            let Some(token) = envelope.challenge else {
                return GateDecision::Rejected("handshake without challenge token");
            };
            return GateDecision::Challenge(token);
        }

        if let Some(event_id) = envelope.event_id.as_deref() {
            if !self.seen.insert(event_id) {
                debug!(
                    event_name = "slack.gate.duplicate",
                    slack_event_id = event_id,
                    "duplicate delivery dropped"
                );
                return GateDecision::Dropped(DropReason::DuplicateDelivery);
            }
        }

        let Some(event) = envelope.event else {
            return GateDecision::Dropped(DropReason::UnroutedKind);
        };

        if event.bot_id.is_some() {
            return GateDecision::Dropped(DropReason::BotAuthored);
        }
        if matches!(event.subtype.as_deref(), Some("bot_message") | Some("message_changed")) {
            return GateDecision::Dropped(DropReason::IgnoredSubtype);
        }

        let kind = event.kind();
        let routed = match kind {
            EventKind::DirectMessage => self.routing.allow_direct_messages,
            EventKind::ChannelMessage => self.routing.allow_channel_messages,
            EventKind::Mention => self.routing.allow_mentions,
            EventKind::Other => false,
        };
        if !routed {
            return GateDecision::Dropped(DropReason::UnroutedKind);
        }

        let Some(conversation_id) = event.channel.clone() else {
            return GateDecision::Dropped(DropReason::UnroutedKind);
        };

        GateDecision::Accepted(InboundEvent {
            event_id: envelope.event_id,
            kind,
            conversation_id,
            sender_id: event.user.clone().unwrap_or_default(),
            raw_text: event.text.clone().unwrap_or_default(),
            from_bot: false,
            subtype: event.subtype,
        })
    }
}

#[cfg(test)]
mod tests {
    use deskmate_core::config::RoutingConfig;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    use crate::signature::SignatureVerifier;

    use super::{DropReason, GateDecision, IntakeGate};

    const SECRET: &str = "gate-test-secret";
    const NOW: i64 = 1_700_000_000;

    fn signed(body: &str) -> (String, String) {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).expect("hmac key");
        mac.update(format!("v0:{NOW}:{body}").as_bytes());
        (NOW.to_string(), format!("v0={}", hex::encode(mac.finalize().into_bytes())))
    }

    fn gate() -> IntakeGate {
        IntakeGate::new(
            SignatureVerifier::new(SECRET.to_string().into()),
            16,
            RoutingConfig {
                allow_direct_messages: true,
                allow_channel_messages: false,
                allow_mentions: true,
            },
        )
    }

    fn admit(gate: &IntakeGate, body: &str) -> GateDecision {
        let (timestamp, signature) = signed(body);
        gate.admit(body.as_bytes(), Some(&timestamp), Some(&signature), NOW)
    }

    fn dm_body(event_id: &str, text: &str) -> String {
        format!(
            r#"{{"type":"event_callback","event_id":"{event_id}","event":{{"type":"message","text":"{text}","channel":"D024","channel_type":"im","user":"U777"}}}}"#
        )
    }

    #[test]
    fn missing_headers_are_rejected_before_parsing() {
        let decision = gate().admit(b"{}", None, None, NOW);
        assert_eq!(decision, GateDecision::Rejected("missing signature headers"));
    }

    #[test]
    fn invalid_signature_is_rejected_without_touching_the_payload() {
        let decision =
            gate().admit(b"not even json", Some(&NOW.to_string()), Some("v0=00ff"), NOW);
        assert_eq!(decision, GateDecision::Rejected("invalid signature"));
    }

    #[test]
    fn handshake_echoes_the_challenge_verbatim() {
        let decision = admit(&gate(), r#"{"type":"url_verification","challenge":"abc123"}"#);
        assert_eq!(decision, GateDecision::Challenge("abc123".to_string()));
    }

    #[test]
    fn duplicate_event_ids_are_dropped_on_the_second_delivery() {
        let gate = gate();
        let body = dm_body("Ev900", "hello");

        assert!(matches!(admit(&gate, &body), GateDecision::Accepted(_)));
        assert_eq!(admit(&gate, &body), GateDecision::Dropped(DropReason::DuplicateDelivery));
    }

    #[test]
    fn bot_authored_events_never_reach_the_pipeline() {
        let body = r#"{"type":"event_callback","event_id":"Ev901","event":{"type":"message","text":"hi","channel":"D024","channel_type":"im","bot_id":"B1"}}"#;
        assert_eq!(admit(&gate(), body), GateDecision::Dropped(DropReason::BotAuthored));
    }

    #[test]
    fn edited_messages_are_dropped_by_subtype() {
        let body = r#"{"type":"event_callback","event_id":"Ev902","event":{"type":"message","subtype":"message_changed","text":"edited","channel":"D024","channel_type":"im","user":"U1"}}"#;
        assert_eq!(admit(&gate(), body), GateDecision::Dropped(DropReason::IgnoredSubtype));
    }

    #[test]
    fn routing_policy_filters_channel_messages_when_disabled() {
        let body = r#"{"type":"event_callback","event_id":"Ev903","event":{"type":"message","text":"hi","channel":"C024","channel_type":"channel","user":"U1"}}"#;
        assert_eq!(admit(&gate(), body), GateDecision::Dropped(DropReason::UnroutedKind));
    }

    #[test]
    fn mentions_are_admitted_with_the_event_payload_intact() {
        let body = r#"{"type":"event_callback","event_id":"Ev904","event":{"type":"app_mention","text":"<@U0BOT> hello","channel":"C024","user":"U1"}}"#;
        let decision = admit(&gate(), body);
        let GateDecision::Accepted(event) = decision else {
            panic!("expected acceptance, got {decision:?}");
        };
        assert_eq!(event.conversation_id, "C024");
        assert_eq!(event.sender_id, "U1");
        assert_eq!(event.raw_text, "<@U0BOT> hello");
    }
}
