use crate::types::{ProfileId, SliceKind};
use thiserror::Error;

/// Store-level failures. Each one aborts a single save/load call.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No profile stored in slot {id}")]
    SlotNotFound { id: ProfileId },

    #[error("Corrupt payload in slot {id}: {reason}")]
    CorruptPayload { id: ProfileId, reason: String },

    #[error("Failed to write slot {id}: {source}")]
    WriteFailure {
        id: ProfileId,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot for slot {id} cannot be saved: {reason}")]
    UnsavableSnapshot { id: ProfileId, reason: String },

    #[error("Invalid profile id: {reason}")]
    InvalidProfileId { reason: String },

    #[error("Load of slot {id} was cancelled")]
    Cancelled { id: ProfileId },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background save worker for slot {id} panicked")]
    WorkerPanicked { id: ProfileId },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A collaborator could not supply or accept its slice.
/// Recoverable: the builder/applier handles these per slice.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("Collaborator for slice '{slice}' unavailable: {reason}")]
    Unavailable { slice: SliceKind, reason: String },

    #[error("Collaborator for slice '{slice}' rejected data: {reason}")]
    Rejected { slice: SliceKind, reason: String },
}

impl CollaboratorError {
    pub fn unavailable(slice: SliceKind, reason: impl Into<String>) -> Self {
        Self::Unavailable { slice, reason: reason.into() }
    }

    pub fn rejected(slice: SliceKind, reason: impl Into<String>) -> Self {
        Self::Rejected { slice, reason: reason.into() }
    }

    pub fn slice(&self) -> SliceKind {
        match self {
            Self::Unavailable { slice, .. } | Self::Rejected { slice, .. } => *slice,
        }
    }
}

pub type CollabResult<T> = Result<T, CollaboratorError>;

/// Raised by the builder when the missing-slice policy is `Abort`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("Cannot build snapshot: slice '{slice}' collaborator unavailable: {reason}")]
    CollaboratorUnavailable { slice: SliceKind, reason: String },
}

/// Errors from the full save/load pipeline in `engine.rs`.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ProfileResult<T> = Result<T, ProfileError>;
