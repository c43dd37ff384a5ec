//! HTTP surface: the event webhook plus a plain liveness root.
//!
//! The webhook acknowledges within the delivery deadline by spawning the
//! reply work and returning immediately. Retries of an acknowledged event
//! are absorbed by the intake gate's duplicate suppression.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, Utc};
use deskmate_agent::{ConversationMemory, Orchestrator, Reply};
use deskmate_slack::{DropReason, GateDecision, InboundEvent, IntakeGate, MessageDelivery};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::docgen::DocumentRenderer;

const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
const SIGNATURE_HEADER: &str = "x-slack-signature";

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<IntakeGate>,
    pub memory: Arc<ConversationMemory>,
    pub orchestrator: Arc<Orchestrator>,
    pub delivery: Arc<dyn MessageDelivery>,
    pub renderer: Arc<DocumentRenderer>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/slack/events", post(slack_events))
        .with_state(state)
}

async fn root() -> &'static str {
    "deskmate is running"
}

async fn slack_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let timestamp = header_str(&headers, TIMESTAMP_HEADER);
    let signature = header_str(&headers, SIGNATURE_HEADER);

    let decision =
        state.gate.admit(&body, timestamp, signature, Utc::now().timestamp());

    match decision {
        GateDecision::Rejected(reason) => {
            warn!(event_name = "webhook.rejected", reason, "delivery rejected at intake");
            (StatusCode::BAD_REQUEST, reason).into_response()
        }
        GateDecision::Challenge(token) => {
            info!(event_name = "webhook.handshake", "url verification handshake answered");
            Json(json!({ "challenge": token })).into_response()
        }
        GateDecision::Dropped(reason) => {
            debug!(event_name = "webhook.dropped", reason = ?reason, "delivery dropped");
            drop_status(reason).into_response()
        }
        GateDecision::Accepted(event) => {
            // Ack first; the reply happens off the request path.
            tokio::spawn(handle_event(state, event));
            StatusCode::OK.into_response()
        }
    }
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn drop_status(_reason: DropReason) -> StatusCode {
    // Every drop is acknowledged so the platform stops retrying.
    StatusCode::OK
}

async fn handle_event(state: AppState, event: InboundEvent) {
    let event_id = event.event_id.as_deref().unwrap_or("unknown").to_string();

    let expired = state.memory.prune(Utc::now());
    if expired > 0 {
        debug!(event_name = "memory.pruned", expired, "idle conversations expired");
    }

    let reply = state
        .orchestrator
        .respond(&event.conversation_id, &event.raw_text, Local::now())
        .await;

    let Some(reply) = reply else {
        debug!(
            event_name = "reply.skipped",
            event_id = %event_id,
            "nothing to send for this message"
        );
        return;
    };

    let outcome = match reply {
        Reply::Text(text) => state.delivery.send_text(&event.conversation_id, &text).await,
        Reply::Document(spec) => match state.renderer.render(&spec).await {
            Ok(artifact) => {
                state
                    .delivery
                    .send_file(
                        &event.conversation_id,
                        &artifact.filename,
                        &artifact.title,
                        artifact.bytes,
                    )
                    .await
            }
            Err(error) => {
                warn!(
                    event_name = "document.render_failed",
                    event_id = %event_id,
                    error = %error,
                );
                state
                    .delivery
                    .send_text(
                        &event.conversation_id,
                        "I drafted the document but could not render it. Please try again.",
                    )
                    .await
            }
        },
    };

    if let Err(error) = outcome {
        warn!(
            event_name = "delivery.failed",
            event_id = %event_id,
            conversation_id = %event.conversation_id,
            error = %error,
        );
    }
}
