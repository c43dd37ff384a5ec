//! Intent pipeline: ordered short-circuit stages from cheapest to most
//! expensive. Local facts and curated answers never touch the model or
//! the conversation memory; only the generative stage does.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use deskmate_core::facts::resolve_local_fact;
use deskmate_core::knowledge::{KnowledgeBase, SimilarityScorer};
use deskmate_core::normalize::normalize_text;

use crate::document::DocumentSpec;
use crate::llm::{ChatMessage, CompletionClient, Role};
use crate::lookup::{should_lookup, KnowledgeLookup};
use crate::memory::ConversationMemory;

const APOLOGY_REPLY: &str =
    "Sorry, I ran into a problem while thinking about that. Please try again in a moment.";
const DOCUMENT_FAILURE_REPLY: &str =
    "I could not produce a structured document for that request. Please rephrase it and try again.";

const EXTENDED_PREFIXES: [&str; 2] = ["spec:", "fsd:"];

/// What the channel should receive for one inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Document(DocumentSpec),
}

pub struct Orchestrator {
    completion: Arc<dyn CompletionClient>,
    lookup: Option<Arc<dyn KnowledgeLookup>>,
    memory: Arc<ConversationMemory>,
    knowledge: KnowledgeBase,
    scorer: Box<dyn SimilarityScorer>,
    match_cutoff: f64,
    max_output_tokens: u32,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        lookup: Option<Arc<dyn KnowledgeLookup>>,
        memory: Arc<ConversationMemory>,
        knowledge: KnowledgeBase,
        scorer: Box<dyn SimilarityScorer>,
        match_cutoff: f64,
        max_output_tokens: u32,
    ) -> Self {
        Self { completion, lookup, memory, knowledge, scorer, match_cutoff, max_output_tokens }
    }

    /// Run one message through the pipeline. `None` means nothing should
    /// be sent back (empty input after normalization).
    pub async fn respond(
        &self,
        conversation_id: &str,
        raw_text: &str,
        now: DateTime<Local>,
    ) -> Option<Reply> {
        let text = normalize_text(raw_text);
        if text.is_empty() {
            return None;
        }

        if let Some(topic) = strip_extended_prefix(&text) {
            return Some(self.respond_extended(conversation_id, topic).await);
        }

        if let Some(fact) = resolve_local_fact(&text, now) {
            tracing::debug!(event_name = "pipeline.local_fact", conversation_id);
            return Some(Reply::Text(fact));
        }

        if let Some(answer) =
            self.knowledge.best_match(&text, self.scorer.as_ref(), self.match_cutoff)
        {
            tracing::debug!(event_name = "pipeline.curated_match", conversation_id);
            return Some(Reply::Text(answer.to_string()));
        }

        Some(self.respond_generative(conversation_id, &text, now).await)
    }

    async fn respond_generative(
        &self,
        conversation_id: &str,
        text: &str,
        now: DateTime<Local>,
    ) -> Reply {
        let lookup_context = self.fetch_lookup_context(conversation_id, text).await;

        let now_utc: DateTime<Utc> = now.with_timezone(&Utc);
        self.memory.record(conversation_id, Role::User, text, now_utc);

        let mut messages = vec![ChatMessage::system(system_instruction(
            now,
            lookup_context.as_deref(),
        ))];
        messages.extend(self.memory.history(conversation_id));

        match self.completion.complete(&messages, self.max_output_tokens).await {
            Ok(answer) => {
                self.memory.record(conversation_id, Role::Assistant, &answer, now_utc);
                Reply::Text(answer)
            }
            Err(error) => {
                tracing::warn!(
                    event_name = "pipeline.completion_failed",
                    conversation_id,
                    error = %error,
                );
                Reply::Text(APOLOGY_REPLY.to_string())
            }
        }
    }

    async fn respond_extended(&self, conversation_id: &str, topic: &str) -> Reply {
        let messages = vec![
            ChatMessage::system(document_instruction()),
            ChatMessage::user(format!("Produce the specification document for: {topic}")),
        ];

        let completion = match self.completion.complete(&messages, self.max_output_tokens).await {
            Ok(completion) => completion,
            Err(error) => {
                tracing::warn!(
                    event_name = "document.completion_failed",
                    conversation_id,
                    error = %error,
                );
                return Reply::Text(APOLOGY_REPLY.to_string());
            }
        };

        match DocumentSpec::parse(&completion) {
            Ok(spec) => Reply::Document(spec),
            Err(error) => {
                tracing::warn!(
                    event_name = "document.parse_failed",
                    conversation_id,
                    error = %error,
                );
                Reply::Text(DOCUMENT_FAILURE_REPLY.to_string())
            }
        }
    }

    async fn fetch_lookup_context(&self, conversation_id: &str, text: &str) -> Option<String> {
        let lookup = self.lookup.as_ref()?;
        if !should_lookup(text) {
            return None;
        }

        match lookup.lookup(text).await {
            Ok(Some(context)) => {
                tracing::debug!(
                    event_name = "lookup.hit",
                    conversation_id,
                    topic = %context.topic,
                );
                Some(context.as_prompt_block())
            }
            Ok(None) => None,
            Err(error) => {
                // Advisory stage: a failed lookup never fails the reply.
                tracing::warn!(event_name = "lookup.failed", conversation_id, error = %error);
                None
            }
        }
    }
}

fn strip_extended_prefix(text: &str) -> Option<&str> {
    let lowered = text.to_lowercase();
    for prefix in EXTENDED_PREFIXES {
        if lowered.starts_with(prefix) {
            let topic = text[prefix.len()..].trim();
            if !topic.is_empty() {
                return Some(topic);
            }
        }
    }
    None
}

fn system_instruction(now: DateTime<Local>, lookup_context: Option<&str>) -> String {
    let mut instruction = format!(
        "You are a helpful workplace assistant. Answer accurately and concisely. \
         If you are not certain of a fact, say so instead of guessing. \
         The current server time is {}.",
        now.format("%Y-%m-%d %H:%M:%S %Z")
    );
    if let Some(context) = lookup_context {
        instruction.push_str("\n\n");
        instruction.push_str(context);
        instruction.push_str("\nPrefer this reference material when it is relevant.");
    }
    instruction
}

fn document_instruction() -> String {
    "You produce functional specification documents. Respond with exactly one JSON object \
     and no surrounding prose. The object has these fields: \
     \"title\", \"module\", \"purpose\", \"as_is\", \"to_be\" (strings), \
     \"requirements\" (array of objects with \"id\", \"description\", \"field\", \
     \"validation\", \"source\", \"remarks\"), \
     \"assumptions\", \"dependencies\", \"risks\" (arrays of strings), and \"notes\" (string). \
     Every field must be present. Use \"-\" for cells with nothing to say."
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{Local, TimeZone};
    use deskmate_core::knowledge::{KnowledgeBase, SequenceRatioScorer};

    use super::{Orchestrator, Reply, APOLOGY_REPLY, DOCUMENT_FAILURE_REPLY};
    use crate::llm::{ChatMessage, CompletionClient, CompletionError};
    use crate::lookup::{KnowledgeLookup, LookupContext, LookupError};
    use crate::memory::ConversationMemory;

    struct ScriptedCompletion {
        reply: Result<String, ()>,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedCompletion {
        fn answering(reply: &str) -> Self {
            Self { reply: Ok(reply.to_string()), calls: Mutex::new(Vec::new()) }
        }

        fn failing() -> Self {
            Self { reply: Err(()), calls: Mutex::new(Vec::new()) }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn last_call(&self) -> Vec<ChatMessage> {
            self.calls.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedCompletion {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _max_output_tokens: u32,
        ) -> Result<String, CompletionError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            self.reply
                .clone()
                .map_err(|_| CompletionError::Provider { status: 500, body: "boom".to_string() })
        }
    }

    struct FixedLookup {
        result: Result<Option<LookupContext>, ()>,
    }

    #[async_trait]
    impl KnowledgeLookup for FixedLookup {
        async fn lookup(&self, _query: &str) -> Result<Option<LookupContext>, LookupError> {
            self.result
                .clone()
                .map_err(|_| LookupError::MalformedResponse("bad payload".to_string()))
        }
    }

    fn orchestrator(
        completion: Arc<ScriptedCompletion>,
        lookup: Option<Arc<dyn KnowledgeLookup>>,
    ) -> (Orchestrator, Arc<ConversationMemory>) {
        let memory = Arc::new(ConversationMemory::new(10, std::time::Duration::from_secs(1800)));
        let orchestrator = Orchestrator::new(
            completion,
            lookup,
            Arc::clone(&memory),
            KnowledgeBase::builtin(),
            Box::new(SequenceRatioScorer),
            0.6,
            400,
        );
        (orchestrator, memory)
    }

    fn fixed_now() -> chrono::DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 5, 14, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn empty_text_produces_no_reply() {
        let completion = Arc::new(ScriptedCompletion::answering("unused"));
        let (orchestrator, _) = orchestrator(Arc::clone(&completion), None);

        assert_eq!(orchestrator.respond("C1", "  <@U123>  ", fixed_now()).await, None);
        assert_eq!(completion.call_count(), 0);
    }

    #[tokio::test]
    async fn date_question_is_answered_locally_without_memory() {
        let completion = Arc::new(ScriptedCompletion::answering("unused"));
        let (orchestrator, memory) = orchestrator(Arc::clone(&completion), None);

        let reply = orchestrator.respond("C1", "what is the date today", fixed_now()).await;
        assert_eq!(reply, Some(Reply::Text("Today's date is June 05, 2025.".to_string())));
        assert_eq!(completion.call_count(), 0);
        assert_eq!(memory.session_count(), 0);
    }

    #[tokio::test]
    async fn curated_answer_is_returned_verbatim_without_memory() {
        let completion = Arc::new(ScriptedCompletion::answering("unused"));
        let (orchestrator, memory) = orchestrator(Arc::clone(&completion), None);

        let reply = orchestrator.respond("C1", "What is the leave policy?", fixed_now()).await;
        assert_eq!(
            reply,
            Some(Reply::Text(
                "Avertra provides 12 sick and 12 casual leaves annually.".to_string()
            ))
        );
        assert_eq!(completion.call_count(), 0);
        assert_eq!(memory.session_count(), 0);
    }

    #[tokio::test]
    async fn generative_fallback_records_both_turns() {
        let completion = Arc::new(ScriptedCompletion::answering("Rust is a systems language."));
        let (orchestrator, memory) = orchestrator(Arc::clone(&completion), None);

        let reply =
            orchestrator.respond("C1", "please compare rust and go for me", fixed_now()).await;
        assert_eq!(reply, Some(Reply::Text("Rust is a systems language.".to_string())));
        assert_eq!(completion.call_count(), 1);

        let messages = completion.last_call();
        assert_eq!(messages.last().unwrap().content, "please compare rust and go for me");

        let history = memory.history("C1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "please compare rust and go for me");
        assert_eq!(history[1].content, "Rust is a systems language.");
    }

    #[tokio::test]
    async fn completion_failure_yields_apology_and_no_assistant_turn() {
        let completion = Arc::new(ScriptedCompletion::failing());
        let (orchestrator, memory) = orchestrator(Arc::clone(&completion), None);

        let reply =
            orchestrator.respond("C1", "please compare rust and go for me", fixed_now()).await;
        assert_eq!(reply, Some(Reply::Text(APOLOGY_REPLY.to_string())));

        let history = memory.history("C1");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "please compare rust and go for me");
    }

    #[tokio::test]
    async fn lookup_context_is_injected_into_the_system_message() {
        let completion = Arc::new(ScriptedCompletion::answering("It is a tower in Paris."));
        let lookup: Arc<dyn KnowledgeLookup> = Arc::new(FixedLookup {
            result: Ok(Some(LookupContext {
                topic: "Eiffel Tower".to_string(),
                extract: "A wrought-iron lattice tower in Paris.".to_string(),
                source_url: "https://en.wikipedia.org/wiki/Eiffel_Tower".to_string(),
            })),
        });
        let (orchestrator, _) = orchestrator(Arc::clone(&completion), Some(lookup));

        orchestrator.respond("C1", "tell me about the eiffel tower", fixed_now()).await;

        let messages = completion.last_call();
        assert!(messages[0].content.contains("Eiffel Tower"));
        assert!(messages[0].content.contains("wrought-iron lattice tower"));
    }

    #[tokio::test]
    async fn lookup_failure_still_produces_a_generative_reply() {
        let completion = Arc::new(ScriptedCompletion::answering("Best effort answer."));
        let lookup: Arc<dyn KnowledgeLookup> = Arc::new(FixedLookup { result: Err(()) });
        let (orchestrator, _) = orchestrator(Arc::clone(&completion), Some(lookup));

        let reply =
            orchestrator.respond("C1", "what is the tallest mountain?", fixed_now()).await;
        assert_eq!(reply, Some(Reply::Text("Best effort answer.".to_string())));
    }

    #[tokio::test]
    async fn extended_prefix_produces_a_document_reply() {
        let completion = Arc::new(ScriptedCompletion::answering(
            r#"{"title": "Billing Module", "module": "Billing", "purpose": "Invoice customers."}"#,
        ));
        let (orchestrator, memory) = orchestrator(Arc::clone(&completion), None);

        let reply = orchestrator.respond("C1", "spec: billing module", fixed_now()).await;
        match reply {
            Some(Reply::Document(spec)) => {
                assert_eq!(spec.title, "Billing Module");
            }
            other => panic!("expected document reply, got {other:?}"),
        }
        // Extended mode is stateless.
        assert_eq!(memory.session_count(), 0);

        let messages = completion.last_call();
        assert!(messages[1].content.contains("billing module"));
        assert!(!messages[1].content.contains("spec:"));
    }

    #[tokio::test]
    async fn extended_prefix_is_case_insensitive() {
        let completion = Arc::new(ScriptedCompletion::answering(r#"{"title": "X"}"#));
        let (orchestrator, _) = orchestrator(Arc::clone(&completion), None);

        let reply = orchestrator.respond("C1", "FSD: onboarding flow", fixed_now()).await;
        assert!(matches!(reply, Some(Reply::Document(_))));
    }

    #[tokio::test]
    async fn unparseable_document_completion_yields_explicit_failure_text() {
        let completion = Arc::new(ScriptedCompletion::answering("sorry, no json here"));
        let (orchestrator, _) = orchestrator(Arc::clone(&completion), None);

        let reply = orchestrator.respond("C1", "spec: billing module", fixed_now()).await;
        assert_eq!(reply, Some(Reply::Text(DOCUMENT_FAILURE_REPLY.to_string())));
    }
}
