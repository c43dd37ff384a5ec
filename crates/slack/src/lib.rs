//! Slack transport - inbound intake and outbound delivery
//!
//! This crate owns everything that touches the Slack platform:
//! - **Signature** (`signature`) - signing-v0 verification over raw bytes
//! - **Dedup** (`dedup`) - bounded at-most-once suppression of retries
//! - **Events** (`events`) - wire envelope and the admitted domain event
//! - **Gate** (`gate`) - the intake decision: reject, challenge, drop, accept
//! - **Client** (`client`) - Web API delivery (messages and file uploads)
//!
//! The gate runs before any payload is trusted and its only side effect is
//! recording event ids. Everything past `GateDecision::Accepted` belongs to
//! the agent crate.

pub mod client;
pub mod dedup;
pub mod events;
pub mod gate;
pub mod signature;

pub use client::{DeliveryError, MessageDelivery, RecordingDelivery, SentItem, SlackApiClient};
pub use dedup::SeenEventIds;
pub use events::{CallbackEvent, EventEnvelope, EventKind, InboundEvent};
pub use gate::{DropReason, GateDecision, IntakeGate};
pub use signature::SignatureVerifier;
