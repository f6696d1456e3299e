use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Mutex as TurnLock;
use tripmate_core::ConversationContext;

pub type SharedConversation = Arc<TurnLock<ConversationContext>>;

#[derive(Debug)]
struct SessionEntry {
    conversation: SharedConversation,
    last_used: Instant,
}

impl SessionEntry {
    // the store's own handle is the only one outside a running turn
    fn in_turn(&self) -> bool {
        Arc::strong_count(&self.conversation) > 1
    }
}

/// Session id → conversation. Turns within one session are serialised by the
/// per-session lock; different sessions run concurrently.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, SessionEntry>>>,
    max_sessions: usize,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(max_sessions: usize, idle_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_sessions,
            idle_ttl,
        }
    }

    /// Existing conversation for `session_id`, or a fresh one. When the store
    /// is full, expired sessions go first, then the least recently used one
    /// that is not mid-turn. `None` only if every session is mid-turn.
    pub fn get_or_create(&self, session_id: &str) -> Option<SharedConversation> {
        self.get_or_create_at(session_id, Instant::now())
    }

    fn get_or_create_at(&self, session_id: &str, now: Instant) -> Option<SharedConversation> {
        let mut guard = self.inner.lock();
        if let Some(entry) = guard.get_mut(session_id) {
            entry.last_used = now;
            return Some(entry.conversation.clone());
        }

        if guard.len() >= self.max_sessions {
            let idle_ttl = self.idle_ttl;
            guard.retain(|_, entry| {
                entry.in_turn() || now.saturating_duration_since(entry.last_used) < idle_ttl
            });
        }

        if guard.len() >= self.max_sessions {
            let oldest = guard
                .iter()
                .filter(|(_, entry)| !entry.in_turn())
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone())?;
            guard.remove(&oldest);
        }

        let conversation = SharedConversation::default();
        guard.insert(
            session_id.to_string(),
            SessionEntry {
                conversation: conversation.clone(),
                last_used: now,
            },
        );
        Some(conversation)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.inner.lock().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
