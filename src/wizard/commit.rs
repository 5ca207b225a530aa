use std::{collections::HashMap, future::Future};

use async_trait::async_trait;

use crate::domain::Persisted;
use crate::errors::{CommitError, StoreError};
use crate::notify::FanOutReport;
use crate::storage::Record;

use super::render::StepForm;

/// Result of a successful commit: the primary output plus the outcome of
/// every notification that followed it.
#[derive(Debug, Clone)]
pub struct CommitReport<O> {
    pub output: O,
    pub notifications: FanOutReport,
}

impl<O> CommitReport<O> {
    pub fn new(output: O, notifications: FanOutReport) -> Self {
        Self {
            output,
            notifications,
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.notifications.is_complete()
    }

    pub fn map<T>(self, f: impl FnOnce(O) -> T) -> CommitReport<T> {
        CommitReport {
            output: f(self.output),
            notifications: self.notifications,
        }
    }
}

/// Writes that an earlier attempt of the same commit already completed.
///
/// The session hands one checkpoint to every attempt and drops it once the
/// wizard commits or closes, so a retry after a failed write picks up after
/// the last completed write instead of creating the primary entity again.
#[derive(Debug, Default)]
pub struct CommitCheckpoint {
    done: HashMap<String, Record>,
}

impl CommitCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.done.contains_key(key)
    }

    /// Runs `write` unless an earlier attempt already completed `key`; then
    /// the entity that attempt stored is returned without touching the store.
    pub async fn persist<E, W, Fut>(&mut self, key: &str, write: W) -> Result<E, CommitError>
    where
        E: Persisted,
        W: FnOnce() -> Fut,
        Fut: Future<Output = Result<E, StoreError>>,
    {
        if let Some(record) = self.done.get(key) {
            tracing::debug!(key, "write completed by an earlier attempt");
            return record
                .clone()
                .into_entity::<E>()
                .map_err(CommitError::store(E::NOUN));
        }
        let entity = write().await.map_err(CommitError::store(E::NOUN))?;
        let record = Record::from_entity(&entity).map_err(CommitError::store(E::NOUN))?;
        self.done.insert(key.to_string(), record);
        Ok(entity)
    }
}

/// A concrete wizard: its render contract plus the commit that turns a
/// finished draft into persisted entities and notifications.
#[async_trait]
pub trait WizardFlow: StepForm {
    type Output: Send;

    /// Collection whose cached views must reload after a commit.
    fn collection(&self) -> &'static str;

    /// Headline for the success notice, e.g. "Member Lea Meier created".
    fn headline(&self, output: &Self::Output) -> String;

    /// Narrows the draft into payloads, resolves references, persists and
    /// fans out. Must not touch the draft; the caller resets it on success.
    /// Every create or update goes through `checkpoint` so a retried commit
    /// skips writes that already happened.
    async fn commit(
        &self,
        draft: &Self::Draft,
        checkpoint: &mut CommitCheckpoint,
    ) -> Result<CommitReport<Self::Output>, CommitError>;
}
