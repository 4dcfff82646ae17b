//! Backend Capability Traits and Core Types
//!
//! This module defines what the adapter needs from the query service and the
//! catalog control plane. The connection, cursor and catalog layers only talk
//! to these traits; the AWS implementation lives in [`athena`] and [`glue`].
//!
//! # Capabilities
//! - [`Backend`]: establishes a [`Session`] and, on request, a [`MetadataService`]
//! - [`Session`]: submits one statement and returns its [`ResultHandle`]
//! - [`ResultHandle`]: column metadata plus the two fetch paths
//! - [`MetadataService`]: control-plane listing of databases and tables
//!
//! # Threading
//! Sessions and handles are `Send` but not `Sync`. The adapter issues at most
//! one call at a time per session; sharing one across threads needs an
//! exclusive-access guard around it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ClientParams;
use crate::error::BackendResult;

#[cfg(feature = "aws")]
pub mod athena;

#[cfg(feature = "aws")]
pub mod glue;

/// Column metadata of an executed statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    /// Column label as returned by the service (may repeat)
    pub name: String,

    /// Raw service type name, e.g. `varchar` or `decimal(10,2)`
    pub type_name: String,
}

impl ColumnDescription {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// A row from the paginated row-wise API, keyed by column name
///
/// Keying by name means a repeated column label keeps only its last value.
pub type KeyedRow = Map<String, Value>;

/// Tabular data materialized from a statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Column names in result order
    pub columns: Vec<String>,

    /// Rows, positionally aligned with `columns`
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Build a result from name-keyed rows
    ///
    /// Columns are the distinct names of `description` in first-seen order, so
    /// duplicate labels collapse into one column holding the last value written.
    pub fn from_keyed_rows(description: &[ColumnDescription], keyed: Vec<KeyedRow>) -> Self {
        let mut columns: Vec<String> = Vec::with_capacity(description.len());
        for col in description {
            if !columns.contains(&col.name) {
                columns.push(col.name.clone());
            }
        }

        let rows = keyed
            .into_iter()
            .map(|row| {
                columns.iter().map(|name| row.get(name).cloned().unwrap_or(Value::Null)).collect()
            })
            .collect();

        Self { columns, rows }
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Per-statement options, set by the adapter rather than the client library
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Host asked for bulk transfer acceleration; backends that always
    /// download complete results may only record it
    pub unload: bool,
}

/// Handle to one executed statement's results
pub trait ResultHandle: Send {
    /// Column metadata, `None` if the service returned none
    fn description(&self) -> Option<&[ColumnDescription]>;

    /// Materialize the entire result positionally (duplicate labels preserved)
    fn fetch_all(&mut self) -> BackendResult<ResultSet>;

    /// Fetch at most `size` rows through the row-wise API
    fn fetch_many(&mut self, size: usize) -> BackendResult<Vec<KeyedRow>>;
}

/// An authenticated session with the query service
pub trait Session: Send {
    /// Submit `sql` and wait for it to complete
    fn execute(&self, sql: &str, options: &ExecuteOptions) -> BackendResult<Box<dyn ResultHandle>>;
}

/// Table entry from the control plane, columns inline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,

    /// Raw table type, e.g. `EXTERNAL_TABLE` or `VIRTUAL_VIEW`
    pub table_type: String,

    /// Columns as (name, raw type), storage columns then partition keys
    pub columns: Vec<ColumnDescription>,
}

/// Control-plane catalog API, independent of the query engine
pub trait MetadataService: Send {
    /// All database names, across every page
    fn list_databases(&self) -> BackendResult<Vec<String>>;

    /// All tables of `database` with their inline columns, across every page
    fn list_tables(&self, database: &str) -> BackendResult<Vec<TableMetadata>>;
}

/// Factory for sessions and metadata clients
pub trait Backend {
    /// Establish a session with the forwarded client parameters
    fn connect(&self, params: &ClientParams) -> BackendResult<Box<dyn Session>>;

    /// Create a control-plane client for the same account and region
    fn metadata_service(&self, params: &ClientParams) -> BackendResult<Box<dyn MetadataService>>;
}

/// Render a JSON cell as text (strings unquoted, null as `None`)
#[must_use]
pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
