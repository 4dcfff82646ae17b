//! JSON Output Envelopes
//!
//! Every command of the CLI harness prints exactly one envelope on stdout.
//!
//! # Output Contract
//! - Success: `{"ok": true, "command": "...", "data": {...}, "meta": {...}}`
//! - Error: `{"ok": false, "command": "...", "error": {"code": "...", "title": "...", "message": "..."}}`

use serde::{Deserialize, Serialize};

use crate::error::AdapterError;

/// Success envelope, generic over the command's payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// Always true for success envelopes
    pub ok: bool,

    /// Command that was executed (query, catalog, columns, ...)
    pub command: String,

    pub data: T,

    pub meta: Metadata,
}

impl<T> SuccessEnvelope<T> {
    pub fn new(command: impl Into<String>, data: T, meta: Metadata) -> Self {
        Self {
            ok: true,
            command: command.into(),
            data,
            meta,
        }
    }
}

/// Error envelope for failed commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false for error envelopes
    pub ok: bool,

    pub command: String,

    pub error: ErrorInfo,
}

impl ErrorEnvelope {
    pub fn new(command: impl Into<String>, error: ErrorInfo) -> Self {
        Self {
            ok: false,
            command: command.into(),
            error,
        }
    }

    /// Build the envelope for an adapter failure
    pub fn from_error(command: impl Into<String>, err: &AdapterError) -> Self {
        Self::new(command, ErrorInfo::new(err.error_code(), err.title(), err.message()))
    }
}

/// Error details as the host displays them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code (e.g. "QUERY_EXECUTION_ERROR")
    pub code: String,

    /// Fixed title per error kind
    pub title: String,

    /// Message of the underlying cause
    pub message: String,
}

impl ErrorInfo {
    pub fn new(
        code: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Execution metadata included in all success responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Wall-clock time of the command in milliseconds
    pub execution_ms: u64,

    /// Number of rows returned (query results only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_returned: Option<usize>,
}

impl Metadata {
    pub fn new(execution_ms: u64) -> Self {
        Self {
            execution_ms,
            rows_returned: None,
        }
    }

    pub fn with_rows(execution_ms: u64, rows_returned: usize) -> Self {
        Self {
            execution_ms,
            rows_returned: Some(rows_returned),
        }
    }
}
