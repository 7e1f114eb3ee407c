//! Artifact storage backends.
//!
//! Generation only ever creates new, uniquely-named entries in the active
//! store; archival jobs move the single artifact pair they own into the
//! date-partitioned archive. The trait keeps the surface small enough that
//! tests can substitute the in-memory backend for real file I/O.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid artifact name")]
    InvalidName,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Minimal capability surface over the active and archive stores.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Create a new entry in the active store. Fails with `AlreadyExists`
    /// instead of overwriting.
    async fn persist(&self, name: &str, data: &[u8]) -> Result<PathBuf, StoreError>;

    /// Whether an entry with this name exists in the active store.
    async fn exists(&self, name: &str) -> bool;

    /// Delete an entry from the active store. Deleting a missing entry is a
    /// no-op.
    async fn remove(&self, name: &str) -> Result<(), StoreError>;

    /// Move the named entries from the active store into
    /// `archive/<date_dir>/`. Entries missing from the active store are
    /// skipped, so a retry after a partial move converges instead of
    /// failing on the entries already moved.
    async fn archive(&self, names: &[String], date_dir: &str) -> Result<(), StoreError>;

    /// Entry names currently in the active store.
    async fn list_active(&self) -> Result<Vec<String>, StoreError>;

    /// `(date_dir, name)` pairs currently in the archive store.
    async fn list_archived(&self) -> Result<Vec<(String, String)>, StoreError>;

    fn active_path(&self, name: &str) -> PathBuf;

    fn archive_path(&self, date_dir: &str, name: &str) -> PathBuf;
}

/// Filesystem-backed artifact storage rooted at an active and an archive
/// directory.
#[derive(Debug)]
pub struct FsArtifactStore {
    active_root: PathBuf,
    archive_root: PathBuf,
}

impl FsArtifactStore {
    /// Initialise storage, creating both roots if necessary.
    pub fn new(active_root: PathBuf, archive_root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&active_root)?;
        std::fs::create_dir_all(&archive_root)?;
        Ok(Self {
            active_root,
            archive_root,
        })
    }

    fn checked(name: &str) -> Result<&Path, StoreError> {
        let relative = Path::new(name);
        let simple = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if relative.components().count() != 1 || !simple {
            return Err(StoreError::InvalidName);
        }
        Ok(relative)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn persist(&self, name: &str, data: &[u8]) -> Result<PathBuf, StoreError> {
        let path = self.active_root.join(Self::checked(name)?);
        let mut file = fs::File::create_new(&path).await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(path)
    }

    async fn exists(&self, name: &str) -> bool {
        match Self::checked(name) {
            Ok(relative) => fs::try_exists(self.active_root.join(relative))
                .await
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn remove(&self, name: &str) -> Result<(), StoreError> {
        let path = self.active_root.join(Self::checked(name)?);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn archive(&self, names: &[String], date_dir: &str) -> Result<(), StoreError> {
        let target_dir = self.archive_root.join(Self::checked(date_dir)?);
        fs::create_dir_all(&target_dir).await?;

        for name in names {
            let relative = Self::checked(name)?;
            let source = self.active_root.join(relative);
            let target = target_dir.join(relative);
            match fs::rename(&source, &target).await {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!(target = "infra::store", name, "entry already gone; skipping move");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.active_root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Ok(name) = entry.file_name().into_string() {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn list_archived(&self) -> Result<Vec<(String, String)>, StoreError> {
        let mut pairs = Vec::new();
        let mut dates = fs::read_dir(&self.archive_root).await?;
        while let Some(date_entry) = dates.next_entry().await? {
            if !date_entry.file_type().await?.is_dir() {
                continue;
            }
            let Ok(date_dir) = date_entry.file_name().into_string() else {
                continue;
            };
            let mut entries = fs::read_dir(date_entry.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_file() {
                    if let Ok(name) = entry.file_name().into_string() {
                        pairs.push((date_dir.clone(), name));
                    }
                }
            }
        }
        pairs.sort();
        Ok(pairs)
    }

    fn active_path(&self, name: &str) -> PathBuf {
        self.active_root.join(name)
    }

    fn archive_path(&self, date_dir: &str, name: &str) -> PathBuf {
        self.archive_root.join(date_dir).join(name)
    }
}

/// In-memory artifact storage for tests and storage-free embedding.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    active: DashMap<String, Vec<u8>>,
    archived: DashMap<(String, String), Vec<u8>>,
    fail_archive: AtomicBool,
    fail_persist: AtomicBool,
    fail_persist_suffix: Mutex<Option<String>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `archive` calls fail, simulating a move failure.
    pub fn fail_archive(&self, fail: bool) {
        self.fail_archive.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `persist` calls fail, simulating a write failure.
    pub fn fail_persist(&self, fail: bool) {
        self.fail_persist.store(fail, Ordering::SeqCst);
    }

    /// Make `persist` fail only for names ending in `suffix`, simulating a
    /// write failure partway through a multi-file operation.
    pub fn fail_persist_suffix(&self, suffix: Option<&str>) {
        let mut slot = self
            .fail_persist_suffix
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = suffix.map(str::to_string);
    }

    pub fn active_contents(&self, name: &str) -> Option<Vec<u8>> {
        self.active.get(name).map(|entry| entry.clone())
    }

    pub fn archived_contents(&self, date_dir: &str, name: &str) -> Option<Vec<u8>> {
        self.archived
            .get(&(date_dir.to_string(), name.to_string()))
            .map(|entry| entry.clone())
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn persist(&self, name: &str, data: &[u8]) -> Result<PathBuf, StoreError> {
        let suffix_failed = self
            .fail_persist_suffix
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_deref()
            .is_some_and(|suffix| name.ends_with(suffix));
        if self.fail_persist.load(Ordering::SeqCst) || suffix_failed {
            return Err(StoreError::Io(std::io::Error::other(
                "simulated write failure",
            )));
        }

        match self.active.entry(name.to_string()) {
            Entry::Occupied(_) => Err(StoreError::Io(ErrorKind::AlreadyExists.into())),
            Entry::Vacant(vacant) => {
                vacant.insert(data.to_vec());
                Ok(self.active_path(name))
            }
        }
    }

    async fn exists(&self, name: &str) -> bool {
        self.active.contains_key(name)
    }

    async fn remove(&self, name: &str) -> Result<(), StoreError> {
        self.active.remove(name);
        Ok(())
    }

    async fn archive(&self, names: &[String], date_dir: &str) -> Result<(), StoreError> {
        if self.fail_archive.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other(
                "simulated archive failure",
            )));
        }

        for name in names {
            let Some((name, data)) = self.active.remove(name) else {
                continue;
            };
            self.archived.insert((date_dir.to_string(), name), data);
        }
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.active.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn list_archived(&self) -> Result<Vec<(String, String)>, StoreError> {
        let mut pairs: Vec<(String, String)> =
            self.archived.iter().map(|entry| entry.key().clone()).collect();
        pairs.sort();
        Ok(pairs)
    }

    fn active_path(&self, name: &str) -> PathBuf {
        PathBuf::from("active").join(name)
    }

    fn archive_path(&self, date_dir: &str, name: &str) -> PathBuf {
        PathBuf::from("archive").join(date_dir).join(name)
    }
}
