use std::sync::Arc;
use std::time::Duration;

use deskmate_agent::llm::CompletionError;
use deskmate_agent::lookup::LookupError;
use deskmate_agent::{ConversationMemory, OpenAiClient, Orchestrator, WikipediaClient};
use deskmate_core::config::AppConfig;
use deskmate_core::knowledge::{KnowledgeBase, SequenceRatioScorer};
use deskmate_slack::{
    DeliveryError, IntakeGate, MessageDelivery, SignatureVerifier, SlackApiClient,
};
use thiserror::Error;
use tracing::info;

use crate::docgen::{DocumentRenderer, RenderError};
use crate::routes::AppState;

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("completion client setup failed: {0}")]
    Completion(#[from] CompletionError),
    #[error("lookup client setup failed: {0}")]
    Lookup(#[from] LookupError),
    #[error("delivery client setup failed: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("document renderer setup failed: {0}")]
    Renderer(#[from] RenderError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let completion = Arc::new(OpenAiClient::new(
        config.llm.api_key.clone(),
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        Duration::from_secs(config.llm.timeout_secs),
    )?);

    let lookup = if config.lookup.enabled {
        let client = WikipediaClient::new(
            Duration::from_secs(config.lookup.timeout_secs),
            config.lookup.max_extract_chars,
        )?;
        Some(Arc::new(client) as Arc<dyn deskmate_agent::KnowledgeLookup>)
    } else {
        None
    };

    let memory = Arc::new(ConversationMemory::new(
        config.memory.max_turns,
        Duration::from_secs(config.memory.idle_ttl_secs),
    ));

    let orchestrator = Arc::new(Orchestrator::new(
        completion,
        lookup,
        Arc::clone(&memory),
        KnowledgeBase::builtin(),
        Box::new(SequenceRatioScorer),
        config.knowledge.match_cutoff,
        config.llm.max_output_tokens,
    ));

    let gate = Arc::new(IntakeGate::new(
        SignatureVerifier::new(config.slack.signing_secret.clone()),
        config.memory.dedup_capacity,
        config.routing.clone(),
    ));

    let delivery: Arc<dyn MessageDelivery> = Arc::new(SlackApiClient::new(
        config.slack.bot_token.clone(),
        Duration::from_secs(config.llm.timeout_secs),
    )?);

    let renderer = Arc::new(DocumentRenderer::new()?);

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        lookup_enabled = config.lookup.enabled,
        "application wired"
    );

    let state = AppState { gate, memory, orchestrator, delivery, renderer };
    Ok(Application { config, state })
}
