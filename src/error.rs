//! Error types
//!
//! Only invariant violations and configuration failures are errors. Numeric
//! degeneracy inside a tick (near-zero overlap, non-finite corrections) is
//! handled by canceling the contact and never shows up here.

use thiserror::Error;

use crate::sim::BodyId;

/// Programming errors surfaced to the owning scene.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollisionError {
    /// The body already has a leaf in the broad phase.
    #[error("body {0} is already registered with the broad phase")]
    DuplicateBody(BodyId),

    /// The body was never registered (or was already removed).
    #[error("body {0} is not registered with the broad phase")]
    UnknownBody(BodyId),

    /// A contact was built with a zero-length or non-finite normal.
    #[error("degenerate contact normal between bodies {a} and {b}")]
    DegenerateNormal {
        /// First body of the contact.
        a: BodyId,
        /// Second body of the contact.
        b: BodyId,
    },

    /// A shape description could not be turned into a collider.
    #[error("invalid shape: {0}")]
    InvalidShape(&'static str),

    /// A body description is unusable (no shapes, bad mass, ...).
    #[error("invalid body: {0}")]
    InvalidBody(&'static str),

    /// Structural check of the broad phase tree failed.
    #[error("dynamic tree is inconsistent: {0}")]
    CorruptTree(String),
}

/// Failures while loading a [`crate::PhysicsConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The JSON could not be parsed into a config.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
