//! Deskmate core - pure decision-pipeline building blocks
//!
//! Everything here is I/O free: configuration loading and validation, the
//! curated knowledge table with its pluggable similarity scorer, raw text
//! normalization, and the local date/time fact resolver. Network-facing
//! collaborators (Slack transport, completion provider, knowledge lookup)
//! live in the `deskmate-slack` and `deskmate-agent` crates and depend on
//! this one, never the other way around.

pub mod config;
pub mod facts;
pub mod knowledge;
pub mod normalize;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use facts::resolve_local_fact;
pub use knowledge::{
    CuratedEntry, KnowledgeBase, KnowledgeError, SequenceRatioScorer, SimilarityScorer,
};
pub use normalize::normalize_text;
