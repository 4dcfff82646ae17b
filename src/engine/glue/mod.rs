//! Glue Data Catalog metadata service
//!
//! Lists databases and tables through the Glue control-plane API. Table
//! listings carry their columns inline, so one paginated `GetTables` call per
//! database is enough to describe every relation in it.

use std::sync::Arc;

use aws_sdk_glue::types::Table;
use aws_sdk_glue::Client as GlueClient;
use tokio::runtime::Runtime;
use tracing::debug;

use super::athena::sdk_error;
use super::{ColumnDescription, MetadataService, TableMetadata};
use crate::error::BackendResult;

/// Glue-backed [`MetadataService`]
pub struct GlueMetadataService {
    runtime: Arc<Runtime>,
    client: GlueClient,
}

impl GlueMetadataService {
    pub fn new(runtime: Arc<Runtime>, client: GlueClient) -> Self {
        Self { runtime, client }
    }
}

impl MetadataService for GlueMetadataService {
    fn list_databases(&self) -> BackendResult<Vec<String>> {
        self.runtime.block_on(async {
            let mut pages = self.client.get_databases().into_paginator().send();
            let mut names = Vec::new();

            while let Some(page) = pages.next().await {
                let page = page.map_err(sdk_error)?;
                names.extend(page.database_list().iter().map(|db| db.name().to_string()));
            }

            debug!(count = names.len(), "Listed Glue databases");
            Ok(names)
        })
    }

    fn list_tables(&self, database: &str) -> BackendResult<Vec<TableMetadata>> {
        self.runtime.block_on(async {
            let mut pages = self
                .client
                .get_tables()
                .database_name(database)
                .into_paginator()
                .send();
            let mut tables = Vec::new();

            while let Some(page) = pages.next().await {
                let page = page.map_err(sdk_error)?;
                tables.extend(page.table_list().iter().map(table_metadata));
            }

            debug!(database = %database, count = tables.len(), "Listed Glue tables");
            Ok(tables)
        })
    }
}

/// Flatten a Glue table: storage columns first, then partition keys
fn table_metadata(table: &Table) -> TableMetadata {
    let storage_columns = table
        .storage_descriptor()
        .map(|sd| sd.columns())
        .unwrap_or_default()
        .iter();

    let columns = storage_columns
        .chain(table.partition_keys().iter())
        .map(|col| ColumnDescription::new(col.name(), col.r#type().unwrap_or_default()))
        .collect();

    TableMetadata {
        name: table.name().to_string(),
        table_type: table.table_type().unwrap_or_default().to_string(),
        columns,
    }
}
