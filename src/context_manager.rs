//! Context Manager - dialogue result cache
//!
//! Remembers the last result list (files found, apps launched, links) so that
//! follow-ups like "открой второй" or "открой его" can be resolved:
//! - results expire lazily after a TTL, checked on read
//! - an empty result list always reads as kind `None`
//! - failed resolution leaves the state untouched

use crate::types::{Reference, ResultKind};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Reference resolution failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("Нет сохранённых результатов. Сначала попросите найти или открыть что-то конкретное.")]
    NoResults,

    #[error("Выберите число от 1 до {len}.")]
    OutOfRange { len: usize },
}

/// Time source for expiry
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Short-term memory of one conversation
#[derive(Debug, Clone)]
pub struct DialogueContext {
    last_results: Vec<String>,
    last_kind: ResultKind,
    last_updated: DateTime<Utc>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for DialogueContext {
    fn default() -> Self {
        Self::new(900)
    }
}

impl DialogueContext {
    pub fn new(ttl_secs: u64) -> Self {
        Self::with_clock(ttl_secs, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            last_results: Vec::new(),
            last_kind: ResultKind::None,
            last_updated: now,
            ttl: Duration::seconds(ttl_secs.min(u64::from(u32::MAX)) as i64),
            clock,
        }
    }

    /// Replace the stored results; an empty list clears instead
    pub fn set_results(&mut self, results: Vec<String>, kind: ResultKind) {
        if results.is_empty() || kind == ResultKind::None {
            self.clear_results();
            return;
        }

        log::debug!("context: {} {} result(s) stored", results.len(), kind);
        self.last_results = results;
        self.last_kind = kind;
        self.last_updated = self.clock.now();
    }

    /// Stored results, optionally only when they are of `kind`
    pub fn get_results(&mut self, kind: Option<ResultKind>) -> Vec<String> {
        self.expire_stale();
        match kind {
            Some(kind) if kind != self.last_kind => Vec::new(),
            _ => self.last_results.clone(),
        }
    }

    pub fn last_kind(&mut self) -> ResultKind {
        self.expire_stale();
        self.last_kind
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn is_expired(&self) -> bool {
        !self.last_results.is_empty() && self.clock.now() - self.last_updated > self.ttl
    }

    /// Drop results older than the TTL
    pub fn expire_stale(&mut self) {
        if self.is_expired() {
            log::debug!("context: results expired");
            self.clear_results();
        }
    }

    /// Mark the stored results as just used
    pub fn touch(&mut self) {
        self.last_updated = self.clock.now();
    }

    pub fn clear_results(&mut self) {
        self.last_results.clear();
        self.last_kind = ResultKind::None;
        self.last_updated = self.clock.now();
    }

    pub fn clear(&mut self) {
        self.clear_results();
    }

    /// Dereference a follow-up without changing anything on failure.
    ///
    /// Pronouns pick the first result, numbers are one-based and ordinals
    /// zero-based. On success only `last_updated` moves.
    pub fn resolve(&mut self, reference: &Reference) -> Result<(String, ResultKind), ContextError> {
        self.expire_stale();

        let len = self.last_results.len();
        if len == 0 {
            return Err(ContextError::NoResults);
        }

        let index = match *reference {
            Reference::Pronoun => Some(0),
            Reference::Ordinal(index) => Some(index),
            Reference::Last => Some(len - 1),
            Reference::Number(n) => n.checked_sub(1),
        };

        let target = index
            .and_then(|i| self.last_results.get(i))
            .cloned()
            .ok_or(ContextError::OutOfRange { len })?;

        self.touch();
        Ok((target, self.last_kind))
    }
}
