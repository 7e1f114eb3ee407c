//! Document generation service.
//!
//! Generation is the only writer of new artifacts: it allocates a unique id,
//! persists the source text and the encoded document under that id, registers
//! the pair in the lifecycle index, and hands the artifact to the archival
//! scheduler. Any failure after allocation rolls the lifecycle entry back and
//! deletes whatever was already persisted under the id, so nothing pair-less
//! is left in the active store.

use std::path::PathBuf;
use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::application::archive::ArchiveScheduler;
use crate::application::convert;
use crate::application::error::GenerationError;
use crate::application::templates;
use crate::domain::artifact::GeneratedArtifact;
use crate::domain::naming;
use crate::infra::lifecycle::{LifecycleStats, LifecycleStore};
use crate::infra::store::ArtifactStore;

/// Where the generated pair landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPaths {
    pub id: String,
    pub document: PathBuf,
    pub source_text: PathBuf,
}

pub struct DocumentService {
    storage: Arc<dyn ArtifactStore>,
    lifecycle: Arc<LifecycleStore>,
    scheduler: Arc<ArchiveScheduler>,
    template_dir: PathBuf,
}

impl DocumentService {
    pub fn new(
        storage: Arc<dyn ArtifactStore>,
        lifecycle: Arc<LifecycleStore>,
        scheduler: Arc<ArchiveScheduler>,
        template_dir: PathBuf,
    ) -> Self {
        Self {
            storage,
            lifecycle,
            scheduler,
            template_dir,
        }
    }

    /// Convert markdown text into a stored document/source pair and schedule
    /// its archival.
    ///
    /// `base_name` overrides the name derived from the text's first line;
    /// `style_set` selects the template, degrading to the fallback catalog
    /// when it cannot be loaded.
    pub async fn generate(
        &self,
        text: &str,
        base_name: Option<&str>,
        style_set: &str,
    ) -> Result<GeneratedPaths, GenerationError> {
        let now = OffsetDateTime::now_utc();
        let catalog = templates::load_catalog(&self.template_dir, style_set).await;

        let derived;
        let base = match base_name {
            Some(base) => base,
            None => {
                derived = naming::derive_base_from_text(text);
                &derived
            }
        };

        let id = self.allocate_id(base, now).await;
        let document_name = naming::document_name(&id);
        let source_name = naming::source_name(&id);

        let source_text = match self.storage.persist(&source_name, text.as_bytes()).await {
            Ok(path) => path,
            Err(source) => {
                self.lifecycle.remove(&id);
                return Err(GenerationError::Storage {
                    name: source_name,
                    source,
                });
            }
        };

        let bytes = match convert::render_document(text, &catalog) {
            Ok(bytes) => bytes,
            Err(source) => {
                self.rollback(&id, &source_name).await;
                return Err(GenerationError::Encode { id, source });
            }
        };

        let document = match self.storage.persist(&document_name, &bytes).await {
            Ok(path) => path,
            Err(source) => {
                self.rollback(&id, &source_name).await;
                return Err(GenerationError::Storage {
                    name: document_name,
                    source,
                });
            }
        };

        let artifact = GeneratedArtifact::new(
            id.clone(),
            now,
            self.scheduler.delay(),
            document.clone(),
            source_text.clone(),
        );
        // The placeholder from allocation carries the same id; swap in the
        // final paths before scheduling.
        self.lifecycle.remove(&id);
        self.lifecycle.insert(artifact.clone());
        self.scheduler.schedule(&artifact);

        metrics::counter!("scrivano_convert_total").increment(1);
        info!(
            target = "application::generate",
            id,
            style_set,
            bytes = bytes.len(),
            "document generated"
        );

        Ok(GeneratedPaths {
            id,
            document,
            source_text,
        })
    }

    /// Undo an aborted generation: release the id and delete the already
    /// persisted source text so no pair-less entry is left for `restore` to
    /// pick up.
    async fn rollback(&self, id: &str, source_name: &str) {
        self.lifecycle.remove(id);
        if let Err(err) = self.storage.remove(source_name).await {
            warn!(
                target = "application::generate",
                id,
                error = %err,
                "failed to delete source text of aborted generation"
            );
        }
    }

    /// Allocate a unique id and reserve it in the lifecycle index.
    ///
    /// Uniqueness is checked against both the index and the active store;
    /// the reservation closes the gap between the check and the insert, so
    /// concurrent generations in the same minute get distinct suffixes.
    async fn allocate_id(&self, base: &str, now: OffsetDateTime) -> String {
        loop {
            let id = naming::allocate_async(Some(base), now, |candidate| async move {
                if self.lifecycle.contains(&candidate) {
                    return false;
                }
                if self.storage.exists(&naming::document_name(&candidate)).await {
                    return false;
                }
                !self.storage.exists(&naming::source_name(&candidate)).await
            })
            .await;

            let placeholder = GeneratedArtifact::new(
                id.clone(),
                now,
                self.scheduler.delay(),
                self.storage.active_path(&naming::document_name(&id)),
                self.storage.active_path(&naming::source_name(&id)),
            );
            if self.lifecycle.insert(placeholder) {
                return id;
            }
            // Lost the reservation race; re-run allocation against the
            // updated index.
            debug!(target = "application::generate", id, "id taken concurrently; retrying");
        }
    }

    pub fn stats(&self) -> LifecycleStats {
        self.lifecycle.stats()
    }

    /// Archived artifact ids grouped by creation date.
    pub fn list_archive_by_date(&self) -> std::collections::BTreeMap<time::Date, Vec<String>> {
        self.lifecycle.list_archive_by_date()
    }
}
