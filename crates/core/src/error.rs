//! Core error types
//!
//! Shared failure taxonomy for the routing engine. Synchronous operations hand
//! these straight back to the caller; the asynchronous threat pipeline logs them.

use thiserror::Error;

/// Core error type for the convoy routing engine
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown convoy, alert, mission, threat, or segment identifier
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Resource kind ("convoy", "alert", ...)
        kind: &'static str,
        /// Identifier as supplied by the caller
        id: String,
    },

    /// Endpoints are disconnected or absent from the graph
    #[error("No path found")]
    NoPathFound,

    /// Malformed mode, out-of-range coordinate, or other bad input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Caller presented no role
    #[error("Unauthorized")]
    Unauthorized,

    /// Caller role may not execute the operation
    #[error("Forbidden: role {role} may not {operation}")]
    Forbidden {
        /// Role presented by the caller
        role: String,
        /// Operation that was refused
        operation: String,
    },

    /// Persistence or proximity-query failure
    #[error("Transient backend failure: {0}")]
    TransientBackend(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a `NotFound` error for any displayable identifier.
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// True for conditions the caller may retry wholesale.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientBackend(_) | Error::Io(_))
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;
