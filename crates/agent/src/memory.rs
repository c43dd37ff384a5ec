//! Bounded per-conversation rolling history.
//!
//! Sessions are created lazily, trimmed to the last N turns on append, and
//! evicted when idle past the TTL. Eviction is opportunistic: `prune` runs
//! at the start of event handling, there is no background timer. State is
//! per-process; a restart forgets everything.
//!
//! Known limitation: the user-append → generate → assistant-append sequence
//! is not atomic across concurrent deliveries for one conversation, so
//! simultaneous events in the same conversation can interleave turns. The
//! deployment assumes low per-conversation concurrency.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::llm::{ChatMessage, Role};

#[derive(Clone, Debug)]
struct Session {
    turns: VecDeque<ChatMessage>,
    last_activity: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ConversationMemory {
    sessions: Mutex<HashMap<String, Session>>,
    max_turns: usize,
    idle_ttl: Duration,
}

impl ConversationMemory {
    pub fn new(max_turns: usize, idle_ttl: Duration) -> Self {
        assert!(max_turns > 0, "history must keep at least one turn");
        Self { sessions: Mutex::new(HashMap::new()), max_turns, idle_ttl }
    }

    /// Append one turn, creating the session on first use, trimming to the
    /// last `max_turns` entries and refreshing the activity timestamp.
    pub fn record(&self, conversation_id: &str, role: Role, content: &str, now: DateTime<Utc>) {
        let mut sessions = self.sessions.lock().expect("memory lock poisoned");
        let session = sessions
            .entry(conversation_id.to_string())
            .or_insert_with(|| Session { turns: VecDeque::new(), last_activity: now });

        session.turns.push_back(ChatMessage { role, content: content.to_string() });
        while session.turns.len() > self.max_turns {
            session.turns.pop_front();
        }
        session.last_activity = now;
    }

    /// Snapshot of the trimmed history, oldest first. Empty when the
    /// conversation has no live session.
    pub fn history(&self, conversation_id: &str) -> Vec<ChatMessage> {
        let sessions = self.sessions.lock().expect("memory lock poisoned");
        sessions
            .get(conversation_id)
            .map(|session| session.turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn touch(&self, conversation_id: &str, now: DateTime<Utc>) {
        let mut sessions = self.sessions.lock().expect("memory lock poisoned");
        if let Some(session) = sessions.get_mut(conversation_id) {
            session.last_activity = now;
        }
    }

    /// Drop sessions idle beyond the TTL. Returns how many were evicted.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let ttl = chrono::Duration::from_std(self.idle_ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::MAX / 2));
        let mut sessions = self.sessions.lock().expect("memory lock poisoned");
        let before = sessions.len();
        sessions.retain(|_, session| now - session.last_activity <= ttl);
        before - sessions.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().expect("memory lock poisoned").len()
    }
}
