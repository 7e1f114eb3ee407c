use thiserror::Error;

use crate::application::convert::EncodeError;
use crate::infra::error::InfraError;
use crate::infra::store::StoreError;

/// Errors surfaced by the application layer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

/// A failed document generation. The artifact id names the allocation that
/// was rolled back.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to store `{name}`")]
    Storage {
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to encode document for `{id}`")]
    Encode {
        id: String,
        #[source]
        source: EncodeError,
    },
}
