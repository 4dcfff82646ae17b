//! Result Cursor
//!
//! Wraps one executed statement's [`ResultHandle`]. A cursor is consumed by
//! its single fetch, so the handle can never be materialized twice.

use tracing::debug;

use crate::engine::{ResultHandle, ResultSet};
use crate::error::{AdapterError, Result};
use crate::glyph;

/// Row limit applied at fetch time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Maximum rows to return; `None` fetches everything
    pub limit: Option<usize>,
}

impl FetchOptions {
    /// Fetch every row
    #[must_use]
    pub const fn unbounded() -> Self {
        Self { limit: None }
    }

    /// Fetch at most `limit` rows
    #[must_use]
    pub const fn limited(limit: usize) -> Self {
        Self { limit: Some(limit) }
    }
}

/// Cursor over one statement's results
pub struct ResultCursor {
    handle: Box<dyn ResultHandle>,
}

impl std::fmt::Debug for ResultCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCursor")
            .field("columns", &self.handle.description())
            .finish()
    }
}

impl ResultCursor {
    pub fn new(handle: Box<dyn ResultHandle>) -> Self {
        Self { handle }
    }

    /// Column (name, glyph) pairs in result order; duplicate names are kept
    pub fn columns(&self) -> Result<Vec<(String, &'static str)>> {
        let description = self
            .handle
            .description()
            .ok_or(AdapterError::SchemaUnavailable)?;

        Ok(description
            .iter()
            .map(|col| (col.name.clone(), glyph::normalize(&col.type_name)))
            .collect())
    }

    /// Materialize the results
    ///
    /// Unbounded fetches take the bulk path and keep every column positionally.
    /// Bounded fetches go through the row-wise API, which keys rows by column
    /// name: repeated labels collapse to a single column.
    pub fn fetch(mut self, options: FetchOptions) -> Result<ResultSet> {
        let result = match options.limit {
            None => self
                .handle
                .fetch_all()
                .map_err(AdapterError::query_execution)?,
            Some(limit) => {
                let keyed = self
                    .handle
                    .fetch_many(limit)
                    .map_err(AdapterError::query_execution)?;
                let description = self.handle.description().unwrap_or_default();
                ResultSet::from_keyed_rows(description, keyed)
            }
        };

        debug!(
            limit = ?options.limit,
            rows = result.row_count(),
            columns = result.column_count(),
            "Fetched results"
        );
        Ok(result)
    }

    /// Shorthand for [`fetch`](Self::fetch) with no limit
    pub fn fetchall(self) -> Result<ResultSet> {
        self.fetch(FetchOptions::unbounded())
    }
}
