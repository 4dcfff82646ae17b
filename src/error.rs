//! Error Handling Infrastructure
//!
//! This module defines the failure kinds the adapter reports to its host.
//! Every backend failure is translated into exactly one of these kinds; the
//! original cause is kept as the error's `source()` and its text is the
//! user-visible message.
//!
//! # Error Categories
//! - `ConnectionFailure`: Session establishment failed (auth, network, invalid workgroup)
//! - `QueryExecution`: Statement submission or result materialization failed
//! - `SchemaUnavailable`: Result metadata missing when columns are requested
//! - `CatalogUnavailable`: Catalog discovery failed in either strategy
//! - `InvalidOption`: An adapter option failed validation
//! - `Resource`: A bundled resource (completion list) could not be loaded

use thiserror::Error;

/// Error type produced by backend capabilities (AWS SDK calls, fakes in tests)
///
/// Backends report plain causes; the adapter layers decide which kind they map to.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for backend capability calls
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Main error type for adapter operations
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Session establishment failed
    #[error("{message}")]
    ConnectionFailure {
        message: String,
        #[source]
        source: BackendError,
    },

    /// Statement submission or result fetching failed
    #[error("{message}")]
    QueryExecution {
        message: String,
        #[source]
        source: BackendError,
    },

    /// Result metadata was requested but the statement produced none
    #[error("Result metadata is not available for this statement")]
    SchemaUnavailable,

    /// Catalog discovery failed
    #[error("{message}")]
    CatalogUnavailable {
        message: String,
        #[source]
        source: BackendError,
    },

    /// Adapter option failed validation
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Bundled resource could not be loaded
    #[error("Resource error: {0}")]
    Resource(String),
}

impl AdapterError {
    /// Convert error to error code string for JSON output
    ///
    /// Error codes are stable and suitable for programmatic handling by hosts.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConnectionFailure { .. } => "CONNECTION_FAILURE",
            Self::QueryExecution { .. } => "QUERY_EXECUTION_ERROR",
            Self::SchemaUnavailable => "SCHEMA_UNAVAILABLE",
            Self::CatalogUnavailable { .. } => "CATALOG_UNAVAILABLE",
            Self::InvalidOption(_) => "INVALID_OPTION",
            Self::Resource(_) => "RESOURCE_ERROR",
        }
    }

    /// Fixed, user-facing title the host displays above the message
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::ConnectionFailure { .. } => "Could not connect to Athena.",
            Self::QueryExecution { .. } => "Encountered an error while executing your query.",
            Self::SchemaUnavailable => "Query results have no column metadata.",
            Self::CatalogUnavailable { .. } => "Could not load the Athena data catalog.",
            Self::InvalidOption(_) => "Invalid Athena adapter option.",
            Self::Resource(_) => "Could not load adapter resources.",
        }
    }

    /// Get the human-readable message (the original cause's message for wrapped kinds)
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Wrap a session establishment failure
    pub fn connection_failure(cause: impl Into<BackendError>) -> Self {
        let source = cause.into();
        Self::ConnectionFailure {
            message: source.to_string(),
            source,
        }
    }

    /// Wrap a statement submission or fetch failure
    pub fn query_execution(cause: impl Into<BackendError>) -> Self {
        let source = cause.into();
        Self::QueryExecution {
            message: source.to_string(),
            source,
        }
    }

    /// Wrap a catalog discovery failure
    pub fn catalog_unavailable(cause: impl Into<BackendError>) -> Self {
        let source = cause.into();
        Self::CatalogUnavailable {
            message: source.to_string(),
            source,
        }
    }

    /// Create an invalid option error
    pub fn invalid_option(message: impl Into<String>) -> Self {
        Self::InvalidOption(message.into())
    }

    /// Create a resource error
    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource(message.into())
    }
}

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;
