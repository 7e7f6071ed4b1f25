//! Per-user conversation state.

use crate::error::{BotError, Result};
use crate::store::{SessionRow, SqlitePreferenceStore, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Which setting a pending change flow targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTarget {
    Motivation,
    Frequency,
    Language,
}

/// Ephemeral flags steering how the next button label is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationSession {
    /// A language keyboard is showing; the next language label is a choice.
    pub selecting_language: bool,
    /// The user asked for a one-off motivation by category.
    pub selecting_motivation: bool,
    /// A settings change is in progress.
    pub changing: Option<ChangeTarget>,
}

impl ConversationSession {
    /// Drop every pending flow.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Coarse state name for logs.
    #[must_use]
    pub fn phase(&self, has_language: bool) -> &'static str {
        if !has_language || self.selecting_language {
            return "language_selection";
        }
        match self.changing {
            Some(ChangeTarget::Motivation) => "changing_motivation",
            Some(ChangeTarget::Frequency) => "changing_frequency",
            Some(ChangeTarget::Language) => "changing_language",
            None if self.selecting_motivation => "ad_hoc_selection",
            None => "ready",
        }
    }
}

/// Storage for conversation sessions.
pub trait SessionStore: Send + Sync {
    /// The user's session, or a fresh one.
    fn load(&self, user_id: UserId, now: i64) -> Result<ConversationSession>;

    fn save(&self, user_id: UserId, session: &ConversationSession, now: i64) -> Result<()>;
}

/// Process-local sessions. Lost on restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<UserId, ConversationSession>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, user_id: UserId, _now: i64) -> Result<ConversationSession> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|e| BotError::Lock(format!("session lock poisoned: {e}")))?;
        Ok(sessions.get(&user_id).cloned().unwrap_or_default())
    }

    fn save(&self, user_id: UserId, session: &ConversationSession, _now: i64) -> Result<()> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| BotError::Lock(format!("session lock poisoned: {e}")))?;
        if *session == ConversationSession::default() {
            sessions.remove(&user_id);
        } else {
            sessions.insert(user_id, session.clone());
        }
        Ok(())
    }
}

/// Sessions persisted in the preference database with a sliding expiry.
pub struct SqliteSessionStore {
    store: Arc<SqlitePreferenceStore>,
    ttl_secs: i64,
}

impl SqliteSessionStore {
    pub fn new(store: Arc<SqlitePreferenceStore>, ttl_secs: i64) -> Self {
        Self { store, ttl_secs }
    }
}

impl SessionStore for SqliteSessionStore {
    fn load(&self, user_id: UserId, now: i64) -> Result<ConversationSession> {
        let Some(row) = self.store.load_session(user_id, now)? else {
            return Ok(ConversationSession::default());
        };
        match serde_json::from_str(&row.state) {
            Ok(session) => Ok(session),
            Err(e) => {
                warn!(user_id, "discarding unreadable session state: {e}");
                Ok(ConversationSession::default())
            }
        }
    }

    fn save(&self, user_id: UserId, session: &ConversationSession, now: i64) -> Result<()> {
        let row = SessionRow {
            user_id,
            state: serde_json::to_string(session)?,
            expires_at: now.saturating_add(self.ttl_secs),
        };
        self.store.save_session(&row)
    }
}
