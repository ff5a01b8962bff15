//! Session storage
//!
//! The store owns every session's history across turns. It also hands out a
//! per-session [`TurnLock`] so that at most one turn mutates a given history
//! at a time; independent sessions never contend.

use super::Message;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Exclusive right to run a turn on one session. Released on drop.
#[derive(Debug)]
pub struct TurnLock {
    session_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl TurnLock {
    pub fn new(session_id: impl Into<String>, guard: OwnedMutexGuard<()>) -> Self {
        Self {
            session_id: session_id.into(),
            _guard: guard,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Storage for session histories
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Full ordered history; empty for a session never seen before
    async fn history(&self, session_id: &str) -> Result<Vec<Message>, StoreError>;

    /// Append one message, creating the session if needed
    async fn append(&self, session_id: &str, message: Message) -> Result<(), StoreError>;

    /// Wait until no other turn holds the session, then claim it
    async fn lock_turn(&self, session_id: &str) -> Result<TurnLock, StoreError>;
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn history(&self, session_id: &str) -> Result<Vec<Message>, StoreError> {
        (**self).history(session_id).await
    }

    async fn append(&self, session_id: &str, message: Message) -> Result<(), StoreError> {
        (**self).append(session_id, message).await
    }

    async fn lock_turn(&self, session_id: &str) -> Result<TurnLock, StoreError> {
        (**self).lock_turn(session_id).await
    }
}

#[derive(Default)]
struct SessionEntry {
    messages: Vec<Message>,
    turn_lock: Arc<Mutex<()>>,
}

/// Process-lifetime session store
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions seen so far
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn history(&self, session_id: &str) -> Result<Vec<Message>, StoreError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .map(|entry| entry.messages.clone())
            .unwrap_or_default())
    }

    async fn append(&self, session_id: &str, message: Message) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .messages
            .push(message);
        Ok(())
    }

    async fn lock_turn(&self, session_id: &str) -> Result<TurnLock, StoreError> {
        let lock = {
            let mut sessions = self.sessions.write().await;
            sessions
                .entry(session_id.to_string())
                .or_default()
                .turn_lock
                .clone()
        };

        if lock.try_lock().is_err() {
            tracing::debug!(session_id = %session_id, "Waiting for in-flight turn to finish");
        }

        Ok(TurnLock::new(session_id, lock.lock_owned().await))
    }
}
