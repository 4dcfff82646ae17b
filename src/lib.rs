//! Athena Workbench Adapter
//!
//! Connects an interactive SQL workbench to Amazon Athena: runs queries,
//! materializes their results, and browses the Glue data catalog as a
//! four-level tree (catalog, database, relation, column).
//!
//! # Module Organization
//! - [`adapter`] - Host extension-point traits and the adapter entry point
//! - [`connection`] - Session ownership and error translation
//! - [`cursor`] - Result materialization (bulk or bounded)
//! - [`catalog`] - Catalog discovery strategies and tree assembly
//! - [`glyph`] - Column type to display glyph mapping
//! - [`engine`] - Backend capability traits and the AWS implementation
//! - [`config`] - Option validation, declarations and option files
//! - [`completions`] - Bundled keyword and function completions
//! - [`error`] - Error kinds reported to the host
//! - [`output`] - JSON envelopes for the CLI harness
//! - [`logging`] - `tracing` subscriber setup

pub mod adapter;
pub mod catalog;
pub mod completions;
pub mod config;
pub mod connection;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod glyph;
pub mod logging;
pub mod output;

pub use adapter::{AthenaAdapter, WorkbenchAdapter, WorkbenchConnection, WorkbenchCursor};
pub use catalog::{CatalogNode, NodeKind, CATALOG_NAME};
pub use completions::Completion;
pub use config::{AdapterOptions, ClientParams, DiscoveryMode, ResultReuse, ADAPTER_OPTIONS};
pub use connection::Connection;
pub use cursor::{FetchOptions, ResultCursor};
pub use engine::{
    Backend, ColumnDescription, ExecuteOptions, KeyedRow, MetadataService, ResultHandle,
    ResultSet, Session, TableMetadata,
};
pub use error::{AdapterError, BackendError, BackendResult, Result};
pub use output::{ErrorEnvelope, ErrorInfo, Metadata, SuccessEnvelope};
