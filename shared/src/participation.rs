use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::model::{EventId, ParticipationStatus};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParticipationError {
    #[error("you are not tagged in event {0}")]
    NotTagged(EventId),
    #[error("a response must be accepted or declined")]
    InvalidResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    pub event_id: EventId,
    #[serde(default)]
    pub status: ParticipationStatus,
}

/// Events the current user is tagged in, keyed by event id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipationStore {
    records: BTreeMap<EventId, ParticipationStatus>,
    latest_writes: HashMap<EventId, String>,
}

impl ParticipationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hydrate(&mut self, records: Vec<ParticipationRecord>) {
        self.records = records
            .into_iter()
            .map(|r| (r.event_id, r.status))
            .collect();
        self.latest_writes.clear();
        debug!(records = self.records.len(), "participation hydrated");
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.latest_writes.clear();
    }

    #[must_use]
    pub fn status_for(&self, event_id: &EventId) -> Option<ParticipationStatus> {
        self.records.get(event_id).copied()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.records
            .values()
            .filter(|s| **s == ParticipationStatus::Pending)
            .count()
    }

    pub fn records(&self) -> impl Iterator<Item = ParticipationRecord> + '_ {
        self.records.iter().map(|(event_id, status)| ParticipationRecord {
            event_id: event_id.clone(),
            status: *status,
        })
    }

    /// Applies the answer locally. Returns the mutation id of the remote
    /// write, or `None` when the status was already the requested one.
    pub fn respond(
        &mut self,
        event_id: &EventId,
        status: ParticipationStatus,
    ) -> Result<Option<String>, ParticipationError> {
        if status == ParticipationStatus::Pending {
            return Err(ParticipationError::InvalidResponse);
        }
        let current = self
            .records
            .get_mut(event_id)
            .ok_or_else(|| ParticipationError::NotTagged(event_id.clone()))?;
        if *current == status {
            return Ok(None);
        }
        *current = status;

        let mutation_id = Uuid::new_v4().to_string();
        self.latest_writes.insert(event_id.clone(), mutation_id.clone());
        Ok(Some(mutation_id))
    }

    pub fn accept(&mut self, event_id: &EventId) -> Result<Option<String>, ParticipationError> {
        self.respond(event_id, ParticipationStatus::Accepted)
    }

    pub fn decline(&mut self, event_id: &EventId) -> Result<Option<String>, ParticipationError> {
        self.respond(event_id, ParticipationStatus::Declined)
    }

    /// Returns whether the completion belongs to the newest write for
    /// `event_id`, and forgets it if so.
    pub fn complete_write(&mut self, event_id: &EventId, mutation_id: &str) -> bool {
        let latest = self
            .latest_writes
            .get(event_id)
            .is_some_and(|current| current == mutation_id);
        if latest {
            self.latest_writes.remove(event_id);
        }
        latest
    }
}
