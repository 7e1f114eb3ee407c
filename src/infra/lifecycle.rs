//! In-memory lifecycle index of generated artifacts.
//!
//! Mutations are single-writer per artifact id: generation inserts new
//! entries, only the archival path transitions state. Ids are unique by
//! construction, so no cross-field races occur.

use std::collections::BTreeMap;

use dashmap::{DashMap, mapref::entry::Entry};
use serde::Serialize;
use time::Date;

use crate::domain::artifact::{ArchiveOutcome, ArtifactState, GeneratedArtifact};

/// Result of asking the store to mark an artifact archived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// State moved Active → Archived.
    Archived,
    /// Already archived; the request is a no-op.
    AlreadyArchived,
    /// No artifact with that id is tracked.
    Unknown,
}

/// Counts exposed to the monitoring layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LifecycleStats {
    pub active_count: usize,
    pub archived_count: usize,
}

#[derive(Debug, Default)]
pub struct LifecycleStore {
    entries: DashMap<String, GeneratedArtifact>,
}

impl LifecycleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly generated artifact. Returns `false` when the id is
    /// already tracked (the caller should re-allocate).
    pub fn insert(&self, artifact: GeneratedArtifact) -> bool {
        match self.entries.entry(artifact.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(artifact);
                true
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<GeneratedArtifact> {
        self.entries.get(id).map(|entry| entry.clone())
    }

    /// Drop a tracked artifact, used to roll back a failed generation.
    pub fn remove(&self, id: &str) {
        self.entries.remove(id);
    }

    /// Transition an artifact Active → Archived. Idempotent: a second call
    /// reports `AlreadyArchived` and changes nothing.
    pub fn mark_archived(&self, id: &str) -> Transition {
        match self.entries.get_mut(id) {
            None => Transition::Unknown,
            Some(mut entry) => match entry.state {
                ArtifactState::Archived => Transition::AlreadyArchived,
                ArtifactState::Active => {
                    entry.state = ArtifactState::Archived;
                    entry.outcome = ArchiveOutcome::Succeeded;
                    Transition::Archived
                }
            },
        }
    }

    /// Record a failed archival attempt; the artifact stays Active.
    pub fn mark_archive_failed(&self, id: &str) {
        if let Some(mut entry) = self.entries.get_mut(id) {
            if entry.state == ArtifactState::Active {
                entry.outcome = ArchiveOutcome::Failed;
            }
        }
    }

    pub fn count_active(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.state == ArtifactState::Active)
            .count()
    }

    pub fn count_archived(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.state == ArtifactState::Archived)
            .count()
    }

    pub fn stats(&self) -> LifecycleStats {
        LifecycleStats {
            active_count: self.count_active(),
            archived_count: self.count_archived(),
        }
    }

    /// Archived artifact ids grouped by creation date, ids sorted within
    /// each day.
    pub fn list_archive_by_date(&self) -> BTreeMap<Date, Vec<String>> {
        let mut by_date: BTreeMap<Date, Vec<String>> = BTreeMap::new();
        for entry in self.entries.iter() {
            if entry.state == ArtifactState::Archived {
                by_date
                    .entry(entry.created_at.date())
                    .or_default()
                    .push(entry.id.clone());
            }
        }
        for ids in by_date.values_mut() {
            ids.sort();
        }
        by_date
    }

    /// Ids of active artifacts whose expiry has passed.
    pub fn overdue_ids(&self, now: time::OffsetDateTime) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.is_overdue(now))
            .map(|entry| entry.id.clone())
            .collect()
    }
}
