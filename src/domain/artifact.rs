//! Generated artifacts and their lifecycle state machine.

use std::path::PathBuf;
use std::time::Duration;

use time::OffsetDateTime;

/// Lifecycle state of a generated artifact. Transitions exactly once,
/// `Active` → `Archived`, and never reverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    Active,
    Archived,
}

impl ArtifactState {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactState::Active => "active",
            ArtifactState::Archived => "archived",
        }
    }
}

/// Outcome of the one-shot archival job attached to an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Pending,
    Succeeded,
    Failed,
}

impl ArchiveOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ArchiveOutcome::Pending => "pending",
            ArchiveOutcome::Succeeded => "succeeded",
            ArchiveOutcome::Failed => "failed",
        }
    }
}

/// A generated document together with its paired source-text file, tracked as
/// one lifecycle unit. The id doubles as the on-disk filename stem.
#[derive(Debug, Clone)]
pub struct GeneratedArtifact {
    pub id: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub state: ArtifactState,
    pub outcome: ArchiveOutcome,
    pub document_path: PathBuf,
    pub source_text_path: PathBuf,
}

impl GeneratedArtifact {
    pub fn new(
        id: String,
        created_at: OffsetDateTime,
        delay: Duration,
        document_path: PathBuf,
        source_text_path: PathBuf,
    ) -> Self {
        Self {
            id,
            created_at,
            expires_at: created_at + delay,
            state: ArtifactState::Active,
            outcome: ArchiveOutcome::Pending,
            document_path,
            source_text_path,
        }
    }

    /// Name of the date-partitioned archive directory (`YYMMDD` of creation).
    pub fn archive_date_dir(&self) -> String {
        let date = self.created_at.date();
        format!(
            "{:02}{:02}{:02}",
            date.year().rem_euclid(100),
            u8::from(date.month()),
            date.day()
        )
    }

    pub fn is_overdue(&self, now: OffsetDateTime) -> bool {
        self.state == ArtifactState::Active && self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn expiry_is_creation_plus_delay() {
        let artifact = GeneratedArtifact::new(
            "251207_1200_report".to_string(),
            datetime!(2025-12-07 12:00 UTC),
            Duration::from_secs(86_400),
            PathBuf::from("251207_1200_report.docx"),
            PathBuf::from("251207_1200_report.txt"),
        );

        assert_eq!(artifact.expires_at, datetime!(2025-12-08 12:00 UTC));
        assert_eq!(artifact.state, ArtifactState::Active);
        assert_eq!(artifact.outcome, ArchiveOutcome::Pending);
    }

    #[test]
    fn archive_dir_uses_creation_date() {
        let artifact = GeneratedArtifact::new(
            "x".to_string(),
            datetime!(2026-01-03 23:59 UTC),
            Duration::from_secs(60),
            PathBuf::from("x.docx"),
            PathBuf::from("x.txt"),
        );

        assert_eq!(artifact.archive_date_dir(), "260103");
    }

    #[test]
    fn overdue_only_after_expiry() {
        let artifact = GeneratedArtifact::new(
            "x".to_string(),
            datetime!(2025-12-07 12:00 UTC),
            Duration::from_secs(86_400),
            PathBuf::from("x.docx"),
            PathBuf::from("x.txt"),
        );

        assert!(!artifact.is_overdue(datetime!(2025-12-08 11:59:59 UTC)));
        assert!(artifact.is_overdue(datetime!(2025-12-08 12:00 UTC)));
    }
}
