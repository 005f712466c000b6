//! Error types for stagegraph operations.
//!
//! Every failure the engine can report is a value of [`Error`]. The
//! user-facing kinds (cycles, blocked transitions, unknown stages) are
//! recoverable: the caller leaves its state untouched and tells the user.
//! [`Error::Internal`] is reserved for broken invariants.

use crate::domain::{StageId, StageStatus};
use std::fmt;
use std::io;
use thiserror::Error;

/// A prerequisite that prevents a status transition.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Blocker {
    /// ID of the unfinished prerequisite
    pub id: StageId,
    /// Display name of the unfinished prerequisite
    pub name: String,
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// The error type for stagegraph operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization or parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Stage not found in the current graph snapshot.
    #[error("Stage not found: {0}")]
    StageNotFound(StageId),

    /// A stage was asked to depend on itself.
    #[error("Stage {0} cannot depend on itself")]
    SelfDependency(StageId),

    /// Adding the edge `from -> to` would close a dependency cycle.
    ///
    /// `path` is the closing walk, starting and ending at `from`.
    #[error("Circular dependency: {from} cannot depend on {to} (cycle: {})", format_path(.path))]
    CircularDependency {
        /// The stage that would wait
        from: StageId,
        /// The proposed prerequisite
        to: StageId,
        /// The cycle the edge would create
        path: Vec<StageId>,
    },

    /// The edge already exists.
    #[error("Dependency already exists: {from} -> {to}")]
    DuplicateDependency {
        /// The dependent stage
        from: StageId,
        /// The prerequisite stage
        to: StageId,
    },

    /// The edge does not exist.
    #[error("Dependency not found: {from} -> {to}")]
    DependencyNotFound {
        /// The dependent stage
        from: StageId,
        /// The prerequisite stage
        to: StageId,
    },

    /// A status change was refused because prerequisites are unfinished.
    #[error("Cannot move {stage} to {status}: finish {} first", format_blockers(.blockers))]
    BlockedTransition {
        /// The stage whose transition was refused
        stage: StageId,
        /// The requested status
        status: StageStatus,
        /// Unfinished same-item prerequisites
        blockers: Vec<Blocker>,
    },

    /// An internal invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `.stagegraph/` directory was found.
    #[error("Not a stagegraph repository (or any parent). Run 'stagegraph init' first.")]
    NotInitialized,

    /// The repository was already initialized.
    #[error("Stagegraph is already initialized in {0}")]
    AlreadyInitialized(String),

    /// The configuration file is invalid.
    #[error("Configuration error: {0}")]
    Invalid(String),
}

fn format_path(path: &[StageId]) -> String {
    path.iter()
        .map(StageId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn format_blockers(blockers: &[Blocker]) -> String {
    blockers
        .iter()
        .map(|b| b.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Whether the error is a user-facing, recoverable condition.
    ///
    /// Internal errors and I/O failures are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::SelfDependency(_)
                | Error::CircularDependency { .. }
                | Error::DuplicateDependency { .. }
                | Error::DependencyNotFound { .. }
                | Error::BlockedTransition { .. }
        )
    }
}

/// A specialized Result type for stagegraph operations.
pub type Result<T> = std::result::Result<T, Error>;
