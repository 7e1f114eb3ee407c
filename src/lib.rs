//! Scrivano converts lightweight structured text (markdown) into styled DOCX
//! artifacts and manages each artifact's lifetime from creation through timed
//! archival. The conversion path is total: malformed-but-parseable input is
//! absorbed with deterministic style and formatting fallbacks, and only
//! storage-level failures surface to callers.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
