//! Session registry for front ends serving several conversations
//!
//! Each connection opens its own entry and locks it for the duration of a
//! turn. The router never looks entries up by itself.

use crate::context_manager::DialogueContext;
use crate::session::Session;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Connection-scoped session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Everything one conversation carries between turns
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    pub session: Session,
    pub context: DialogueContext,
}

pub struct SessionRegistry {
    conversations: DashMap<SessionId, Arc<Mutex<Conversation>>>,
    model: String,
    ttl_secs: u64,
}

impl SessionRegistry {
    /// New conversations start with `model` and a result TTL of `ttl_secs`
    pub fn new(model: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            conversations: DashMap::new(),
            model: model.into(),
            ttl_secs,
        }
    }

    pub fn open(&self) -> SessionId {
        let id = SessionId::new();
        let conversation = Conversation {
            session: Session::new(self.model.clone()),
            context: DialogueContext::new(self.ttl_secs),
        };
        self.conversations.insert(id, Arc::new(Mutex::new(conversation)));
        log::info!("registry: opened session {}", id);
        id
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Mutex<Conversation>>> {
        self.conversations.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Drop a conversation; returns whether it existed
    pub fn close(&self, id: &SessionId) -> bool {
        let removed = self.conversations.remove(id).is_some();
        if removed {
            log::info!("registry: closed session {}", id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
