//! Delayed archival of generated artifacts.
//!
//! Every artifact gets its own one-shot task that fires once the delay
//! window elapses and moves the document/source pair into the
//! date-partitioned archive. Jobs are independent: a slow or failed move
//! never blocks other artifacts, and a failure leaves the artifact Active
//! with its outcome recorded. Schedules are not persisted; the timestamp
//! prefix baked into every artifact id lets `restore` + `reconcile` catch
//! up after a restart.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::artifact::{ArchiveOutcome, ArtifactState, GeneratedArtifact};
use crate::domain::naming;
use crate::infra::lifecycle::{LifecycleStore, Transition};
use crate::infra::store::{ArtifactStore, StoreError};

pub struct ArchiveScheduler {
    lifecycle: Arc<LifecycleStore>,
    storage: Arc<dyn ArtifactStore>,
    delay: Duration,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ArchiveScheduler {
    pub fn new(
        lifecycle: Arc<LifecycleStore>,
        storage: Arc<dyn ArtifactStore>,
        delay: Duration,
    ) -> Self {
        Self {
            lifecycle,
            storage,
            delay,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Register a one-shot job firing at the artifact's expiry.
    pub fn schedule(self: &Arc<Self>, artifact: &GeneratedArtifact) {
        let remaining = Duration::try_from(artifact.expires_at - OffsetDateTime::now_utc())
            .unwrap_or(Duration::ZERO);
        let scheduler = Arc::clone(self);
        let id = artifact.id.clone();

        debug!(
            target = "application::archive",
            id, remaining_secs = remaining.as_secs(), "archival scheduled"
        );

        let handle = tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            scheduler.fire(&id).await;
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Execute the archival move for one artifact.
    ///
    /// Idempotent: firing against an already-archived artifact is a no-op
    /// reported as `Succeeded`. A move failure leaves the artifact Active
    /// and is surfaced through its recorded outcome; it never affects other
    /// jobs or the scheduler itself.
    pub async fn fire(&self, id: &str) -> ArchiveOutcome {
        let Some(artifact) = self.lifecycle.get(id) else {
            warn!(target = "application::archive", id, "fired for unknown artifact");
            return ArchiveOutcome::Failed;
        };

        if artifact.state == ArtifactState::Archived {
            debug!(target = "application::archive", id, "already archived; skipping move");
            return ArchiveOutcome::Succeeded;
        }

        let names = [naming::document_name(id), naming::source_name(id)];
        match self.storage.archive(&names, &artifact.archive_date_dir()).await {
            Ok(()) => {
                if self.lifecycle.mark_archived(id) == Transition::AlreadyArchived {
                    return ArchiveOutcome::Succeeded;
                }
                metrics::counter!("scrivano_archive_success_total").increment(1);
                info!(
                    target = "application::archive",
                    id,
                    date_dir = artifact.archive_date_dir(),
                    "artifact archived"
                );
                ArchiveOutcome::Succeeded
            }
            Err(err) => {
                self.lifecycle.mark_archive_failed(id);
                metrics::counter!("scrivano_archive_failure_total").increment(1);
                error!(
                    target = "application::archive",
                    id, error = %err, "archival move failed; artifact stays active"
                );
                ArchiveOutcome::Failed
            }
        }
    }

    /// Rebuild the lifecycle index from the storage backend.
    ///
    /// Creation times come from the filename prefix; entries whose name does
    /// not parse are left untracked. Returns how many artifacts were
    /// registered.
    pub async fn restore(&self) -> Result<usize, StoreError> {
        let mut restored = 0;

        for name in self.storage.list_active().await? {
            let Some(id) = naming::artifact_id_of(&name) else {
                continue;
            };
            let Some(created_at) = naming::parse_timestamp_prefix(id) else {
                warn!(
                    target = "application::archive",
                    name, "active entry without a timestamp prefix; not tracked"
                );
                continue;
            };
            let artifact = GeneratedArtifact::new(
                id.to_string(),
                created_at,
                self.delay,
                self.storage.active_path(&naming::document_name(id)),
                self.storage.active_path(&naming::source_name(id)),
            );
            if self.lifecycle.insert(artifact) {
                restored += 1;
            }
        }

        for (date_dir, name) in self.storage.list_archived().await? {
            let Some(id) = naming::artifact_id_of(&name) else {
                continue;
            };
            let Some(created_at) = naming::parse_timestamp_prefix(id) else {
                continue;
            };
            let artifact = GeneratedArtifact::new(
                id.to_string(),
                created_at,
                self.delay,
                self.storage.archive_path(&date_dir, &naming::document_name(id)),
                self.storage.archive_path(&date_dir, &naming::source_name(id)),
            );
            if self.lifecycle.insert(artifact) {
                self.lifecycle.mark_archived(id);
                restored += 1;
            }
        }

        Ok(restored)
    }

    /// Archive every tracked artifact whose delay window has already
    /// passed. Run after `restore` on startup so artifacts cannot stay
    /// stuck Active across restarts.
    pub async fn reconcile(&self) -> ReconcileReport {
        let overdue = self.lifecycle.overdue_ids(OffsetDateTime::now_utc());
        let outcomes = join_all(overdue.iter().map(|id| self.fire(id))).await;

        let report = ReconcileReport {
            archived: outcomes
                .iter()
                .filter(|outcome| **outcome == ArchiveOutcome::Succeeded)
                .count(),
            failed: outcomes
                .iter()
                .filter(|outcome| **outcome == ArchiveOutcome::Failed)
                .count(),
        };
        if report.archived > 0 || report.failed > 0 {
            info!(
                target = "application::archive",
                archived = report.archived,
                failed = report.failed,
                "reconciled overdue artifacts"
            );
        }
        report
    }

    /// Drop all pending jobs. Schedules are lost by design; a later
    /// `restore` + `reconcile` pass picks the overdue ones back up.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let pending = tasks.len();
        for task in tasks.drain(..) {
            task.abort();
        }
        if pending > 0 {
            debug!(target = "application::archive", pending, "pending archival jobs dropped");
        }
    }
}

impl Drop for ArchiveScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub archived: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use time::macros::datetime;

    use crate::infra::store::MemoryArtifactStore;

    use super::*;

    fn setup(delay: Duration) -> (Arc<LifecycleStore>, Arc<MemoryArtifactStore>, Arc<ArchiveScheduler>) {
        let lifecycle = Arc::new(LifecycleStore::new());
        let storage = Arc::new(MemoryArtifactStore::new());
        let scheduler = Arc::new(ArchiveScheduler::new(
            Arc::clone(&lifecycle),
            Arc::clone(&storage) as Arc<dyn ArtifactStore>,
            delay,
        ));
        (lifecycle, storage, scheduler)
    }

    async fn seed(
        lifecycle: &LifecycleStore,
        storage: &MemoryArtifactStore,
        id: &str,
        created_at: OffsetDateTime,
        delay: Duration,
    ) {
        storage
            .persist(&naming::document_name(id), b"doc")
            .await
            .expect("persist doc");
        storage
            .persist(&naming::source_name(id), b"src")
            .await
            .expect("persist txt");
        lifecycle.insert(GeneratedArtifact::new(
            id.to_string(),
            created_at,
            delay,
            PathBuf::from(naming::document_name(id)),
            PathBuf::from(naming::source_name(id)),
        ));
    }

    #[tokio::test]
    async fn firing_twice_is_idempotent() {
        let delay = Duration::from_secs(60);
        let (lifecycle, storage, scheduler) = setup(delay);
        seed(&lifecycle, &storage, "251207_1200_report", datetime!(2025-12-07 12:00 UTC), delay)
            .await;

        assert_eq!(scheduler.fire("251207_1200_report").await, ArchiveOutcome::Succeeded);
        assert_eq!(scheduler.fire("251207_1200_report").await, ArchiveOutcome::Succeeded);

        assert!(storage
            .archived_contents("251207", "251207_1200_report.docx")
            .is_some());
        assert_eq!(
            lifecycle.get("251207_1200_report").expect("entry").state,
            ArtifactState::Archived
        );
    }

    #[tokio::test]
    async fn fire_converges_when_half_the_pair_is_missing() {
        let delay = Duration::from_secs(60);
        let (lifecycle, storage, scheduler) = setup(delay);
        let id = "251207_1200_report";

        // Only the document is left in the active store, as after a move
        // that failed between the two renames.
        storage
            .persist(&naming::document_name(id), b"doc")
            .await
            .expect("persist doc");
        lifecycle.insert(GeneratedArtifact::new(
            id.to_string(),
            datetime!(2025-12-07 12:00 UTC),
            delay,
            PathBuf::from(naming::document_name(id)),
            PathBuf::from(naming::source_name(id)),
        ));

        assert_eq!(scheduler.fire(id).await, ArchiveOutcome::Succeeded);
        assert!(storage
            .archived_contents("251207", "251207_1200_report.docx")
            .is_some());
        assert_eq!(
            lifecycle.get(id).expect("entry").state,
            ArtifactState::Archived
        );
    }

    #[tokio::test]
    async fn move_failure_keeps_artifact_active() {
        let delay = Duration::from_secs(60);
        let (lifecycle, storage, scheduler) = setup(delay);
        seed(&lifecycle, &storage, "251207_1200_report", datetime!(2025-12-07 12:00 UTC), delay)
            .await;

        storage.fail_archive(true);
        assert_eq!(scheduler.fire("251207_1200_report").await, ArchiveOutcome::Failed);

        let entry = lifecycle.get("251207_1200_report").expect("entry");
        assert_eq!(entry.state, ArtifactState::Active);
        assert_eq!(entry.outcome, ArchiveOutcome::Failed);

        // A later retry succeeds once the store recovers.
        storage.fail_archive(false);
        assert_eq!(scheduler.fire("251207_1200_report").await, ArchiveOutcome::Succeeded);
    }

    #[tokio::test]
    async fn restore_rebuilds_index_from_storage() {
        let delay = Duration::from_secs(60);
        let (lifecycle, storage, scheduler) = setup(delay);

        storage.persist("251207_1200_a.docx", b"doc").await.expect("persist");
        storage.persist("251207_1200_a.txt", b"src").await.expect("persist");
        storage.persist("stray-file", b"junk").await.expect("persist");

        let restored = scheduler.restore().await.expect("restore");
        assert_eq!(restored, 1);
        let entry = lifecycle.get("251207_1200_a").expect("entry");
        assert_eq!(entry.created_at, datetime!(2025-12-07 12:00 UTC));
        assert_eq!(entry.state, ArtifactState::Active);
    }

    #[tokio::test]
    async fn reconcile_archives_only_overdue_artifacts() {
        let delay = Duration::from_secs(3_600);
        let (lifecycle, storage, scheduler) = setup(delay);

        let overdue_created = OffsetDateTime::now_utc() - Duration::from_secs(7_200);
        let fresh_created = OffsetDateTime::now_utc();
        seed(&lifecycle, &storage, "251207_1200_old", overdue_created, delay).await;
        seed(&lifecycle, &storage, "251207_1200_new", fresh_created, delay).await;

        let report = scheduler.reconcile().await;
        assert_eq!(report, ReconcileReport { archived: 1, failed: 0 });
        assert_eq!(
            lifecycle.get("251207_1200_old").expect("old").state,
            ArtifactState::Archived
        );
        assert_eq!(
            lifecycle.get("251207_1200_new").expect("new").state,
            ArtifactState::Active
        );
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_job_fires_after_the_delay_window() {
        let delay = Duration::from_secs(60);
        let (lifecycle, storage, scheduler) = setup(delay);
        let id = "251207_1200_timed";
        seed(&lifecycle, &storage, id, OffsetDateTime::now_utc(), delay).await;

        scheduler.schedule(&lifecycle.get(id).expect("entry"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(lifecycle.get(id).expect("entry").state, ArtifactState::Active);

        tokio::time::advance(Duration::from_secs(2)).await;
        // Let the spawned job run to completion.
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert_eq!(lifecycle.get(id).expect("entry").state, ArtifactState::Archived);
    }
}
