//! Error types for the system metrics dashboard

use thiserror::Error;

use crate::domain::ports::StatQuery;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the system metrics dashboard
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // =========================================================================
    // Host Statistics Errors
    // =========================================================================
    /// An OS statistics query failed
    #[error("{query} query failed: {reason}")]
    HostStat { query: StatQuery, reason: String },

    /// No mounted filesystem contains the requested path
    #[error("No mounted filesystem found for path: {path}")]
    MountNotFound { path: String },

    // =========================================================================
    // Metrics Pipeline Errors
    // =========================================================================
    /// Gauge could not be created
    #[error("Failed to create gauge '{name}': {reason}")]
    GaugeCreation { name: String, reason: String },

    /// Observation callback could not be registered
    #[error("Failed to register observation callback: {0}")]
    CallbackRegistration(String),

    /// Observation callback failed while running
    #[error("Observation callback failed: {0}")]
    Observation(String),

    /// Prometheus client error
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    // =========================================================================
    // Dashboard Errors
    // =========================================================================
    /// Dashboard template could not be compiled
    #[error("Template error at byte {offset}: {reason}")]
    Template { offset: usize, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a host statistics error for the given query
    pub fn host_stat(query: StatQuery, reason: impl Into<String>) -> Self {
        Error::HostStat {
            query,
            reason: reason.into(),
        }
    }

    /// Create a gauge creation error
    pub fn gauge_creation(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::GaugeCreation {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for errors that must stop the process before it serves.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::HostStat { .. } | Error::MountNotFound { .. } | Error::Observation(_)
        )
    }
}
