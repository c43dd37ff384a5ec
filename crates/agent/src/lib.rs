//! Agent runtime - the reply pipeline behind the chat surface.
//!
//! This crate decides what one inbound message gets back:
//! - **Local facts** (`deskmate_core::facts`) and **curated answers**
//!   (`deskmate_core::knowledge`) short-circuit without any network call.
//! - **Knowledge lookup** (`lookup`) optionally enriches the generative
//!   prompt with an encyclopedia extract.
//! - **Conversation memory** (`memory`) carries a bounded, idle-expiring
//!   per-conversation transcript into the model call.
//! - **Generative fallback** (`llm`) is the last resort, one completion
//!   per message.
//! - **Extended mode** (`document`) turns a prefixed request into a
//!   structured specification document instead of chat text.
//!
//! The ordering is cost-ordered and strict: a stage that answers stops the
//! pipeline, and only the generative stage reads or writes memory.

pub mod document;
pub mod llm;
pub mod lookup;
pub mod memory;
pub mod orchestrator;

pub use document::{DocumentError, DocumentSpec, RequirementRow};
pub use llm::{ChatMessage, CompletionClient, CompletionError, OpenAiClient, Role};
pub use lookup::{KnowledgeLookup, LookupContext, LookupError, WikipediaClient};
pub use memory::ConversationMemory;
pub use orchestrator::{Orchestrator, Reply};
