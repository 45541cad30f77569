//! Per-session conversation history.

use crate::error::{CourseError, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Turn {
    role: &'static str,
    content: String,
}

#[derive(Debug, Default)]
struct Session {
    turns: Vec<Turn>,
    last_used: u64,
}

#[derive(Debug, Default)]
struct Sessions {
    by_id: HashMap<String, Session>,
    clock: u64,
}

impl Sessions {
    /// Fetch a session, creating it (and evicting the least recently used one when
    /// full) if it does not exist yet.
    fn touch(&mut self, id: &str, capacity: usize) -> &mut Session {
        self.clock += 1;

        if !self.by_id.contains_key(id) {
            while self.by_id.len() >= capacity.max(1) {
                let Some(oldest) = self
                    .by_id
                    .iter()
                    .min_by_key(|(_, session)| session.last_used)
                    .map(|(id, _)| id.clone())
                else {
                    break;
                };
                debug!("Evicting session {}", oldest);
                self.by_id.remove(&oldest);
            }
        }

        let session = self.by_id.entry(id.to_string()).or_default();
        session.last_used = self.clock;
        session
    }
}

/// Keeps the most recent exchanges of each conversation.
///
/// `max_history` counts user/assistant exchanges; older turns are dropped.
/// At most `max_sessions` conversations are kept.
pub struct SessionManager {
    max_history: usize,
    max_sessions: usize,
    sessions: Mutex<Sessions>,
}

impl SessionManager {
    pub fn new(max_history: usize, max_sessions: usize) -> Self {
        Self {
            max_history,
            max_sessions,
            sessions: Mutex::new(Sessions::default()),
        }
    }

    /// Start a new, empty conversation and return its id.
    pub fn create_session(&self) -> Result<String> {
        let id = format!("session_{}", Uuid::new_v4().simple());
        self.lock()?.touch(&id, self.max_sessions);
        debug!("Created session {}", id);
        Ok(id)
    }

    /// Record one question and its answer. Unknown ids start a new conversation.
    pub fn add_exchange(&self, session_id: &str, user_message: &str, assistant_message: &str) -> Result<()> {
        let limit = self.max_history * 2;
        let mut sessions = self.lock()?;
        let turns = &mut sessions.touch(session_id, self.max_sessions).turns;

        turns.push(Turn {
            role: "User",
            content: user_message.to_string(),
        });
        turns.push(Turn {
            role: "Assistant",
            content: assistant_message.to_string(),
        });

        if turns.len() > limit {
            let excess = turns.len() - limit;
            turns.drain(..excess);
        }
        Ok(())
    }

    /// The retained history as `User: ...` / `Assistant: ...` lines, if any.
    pub fn get_conversation_history(&self, session_id: &str) -> Result<Option<String>> {
        let sessions = self.lock()?;
        let history = sessions
            .by_id
            .get(session_id)
            .filter(|session| !session.turns.is_empty())
            .map(|session| {
                session
                    .turns
                    .iter()
                    .map(|t| format!("{}: {}", t.role, t.content))
                    .collect::<Vec<_>>()
                    .join("\n")
            });
        Ok(history)
    }

    /// Forget a conversation.
    pub fn clear_session(&self, session_id: &str) -> Result<()> {
        self.lock()?.by_id.remove(session_id);
        Ok(())
    }

    #[cfg(test)]
    fn session_count(&self) -> Result<usize> {
        Ok(self.lock()?.by_id.len())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Sessions>> {
        self.sessions
            .lock()
            .map_err(|e| CourseError::Session(format!("Session lock poisoned: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_are_distinct() {
        let manager = SessionManager::new(2, 10);
        let a = manager.create_session().unwrap();
        let b = manager.create_session().unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("session_"));
        assert_eq!(manager.get_conversation_history(&a).unwrap(), None);
    }

    #[test]
    fn test_history_format() {
        let manager = SessionManager::new(2, 10);
        let id = manager.create_session().unwrap();
        manager.add_exchange(&id, "What is MCP?", "A protocol.").unwrap();

        assert_eq!(
            manager.get_conversation_history(&id).unwrap().as_deref(),
            Some("User: What is MCP?\nAssistant: A protocol.")
        );
    }

    #[test]
    fn test_history_bounded_to_max_exchanges() {
        let manager = SessionManager::new(2, 10);
        let id = manager.create_session().unwrap();
        for i in 1..=3 {
            manager
                .add_exchange(&id, &format!("q{}", i), &format!("a{}", i))
                .unwrap();
        }

        let history = manager.get_conversation_history(&id).unwrap().unwrap();
        assert_eq!(history, "User: q2\nAssistant: a2\nUser: q3\nAssistant: a3");
    }

    #[test]
    fn test_unknown_session_and_clear() {
        let manager = SessionManager::new(1, 10);
        manager.add_exchange("external", "q", "a").unwrap();
        assert!(manager.get_conversation_history("external").unwrap().is_some());

        manager.clear_session("external").unwrap();
        assert_eq!(manager.get_conversation_history("external").unwrap(), None);
    }

    #[test]
    fn test_zero_history_keeps_nothing() {
        let manager = SessionManager::new(0, 10);
        let id = manager.create_session().unwrap();
        manager.add_exchange(&id, "q", "a").unwrap();
        assert_eq!(manager.get_conversation_history(&id).unwrap(), None);
    }

    #[test]
    fn test_least_recently_used_session_is_evicted() {
        let manager = SessionManager::new(2, 2);
        manager.add_exchange("a", "qa", "aa").unwrap();
        manager.add_exchange("b", "qb", "ab").unwrap();
        manager.add_exchange("a", "qa2", "aa2").unwrap();

        manager.add_exchange("c", "qc", "ac").unwrap();

        assert_eq!(manager.session_count().unwrap(), 2);
        assert_eq!(manager.get_conversation_history("b").unwrap(), None);
        assert!(manager.get_conversation_history("a").unwrap().is_some());
        assert!(manager.get_conversation_history("c").unwrap().is_some());
    }

    #[test]
    fn test_client_supplied_ids_stay_bounded() {
        let manager = SessionManager::new(1, 3);
        for i in 0..100 {
            manager.add_exchange(&format!("client_{}", i), "q", "a").unwrap();
        }
        assert_eq!(manager.session_count().unwrap(), 3);
        assert!(manager.get_conversation_history("client_99").unwrap().is_some());
    }
}
