//! Workbench Extension Points
//!
//! The host workbench talks to adapters through three object-safe traits:
//! [`WorkbenchAdapter`] creates connections, [`WorkbenchConnection`] runs
//! queries and lists the catalog, [`WorkbenchCursor`] exposes one result.
//! [`AthenaAdapter`] is the entry point a host instantiates with its option map.

use serde_json::{Map, Value};
use tracing::debug;

use crate::catalog::CatalogNode;
use crate::completions::Completion;
use crate::config::{AdapterOptions, OptionSpec};
use crate::connection::Connection;
use crate::cursor::{FetchOptions, ResultCursor};
use crate::engine::{Backend, ResultSet};
use crate::error::Result;

/// Name a host shows for this adapter
pub const ADAPTER_NAME: &str = "athena";

/// One executed statement, as the host sees it
pub trait WorkbenchCursor {
    /// Column (name, glyph) pairs
    fn columns(&self) -> Result<Vec<(String, &'static str)>>;

    /// Materialize the results, consuming the cursor
    fn fetch(self: Box<Self>, options: FetchOptions) -> Result<ResultSet>;
}

/// An open connection, as the host sees it
pub trait WorkbenchConnection {
    /// Run a query; `None` when there was nothing to run
    fn execute(&self, query: &str) -> Result<Option<Box<dyn WorkbenchCursor>>>;

    fn get_catalog(&self) -> Result<CatalogNode>;

    fn get_completions(&self) -> Result<Vec<Completion>>;
}

/// Connection factory registered with the host
pub trait WorkbenchAdapter {
    /// Options the host should expose as flags
    fn declared_options(&self) -> &'static [OptionSpec];

    fn connect(&self) -> Result<Box<dyn WorkbenchConnection>>;
}

impl WorkbenchCursor for ResultCursor {
    fn columns(&self) -> Result<Vec<(String, &'static str)>> {
        ResultCursor::columns(self)
    }

    fn fetch(self: Box<Self>, options: FetchOptions) -> Result<ResultSet> {
        ResultCursor::fetch(*self, options)
    }
}

impl WorkbenchConnection for Connection {
    fn execute(&self, query: &str) -> Result<Option<Box<dyn WorkbenchCursor>>> {
        let cursor = Connection::execute(self, query)?;
        Ok(cursor.map(|c| Box::new(c) as Box<dyn WorkbenchCursor>))
    }

    fn get_catalog(&self) -> Result<CatalogNode> {
        Connection::get_catalog(self)
    }

    fn get_completions(&self) -> Result<Vec<Completion>> {
        Connection::get_completions(self)
    }
}

/// Athena adapter: validated options plus the means to connect
#[derive(Debug, Clone)]
pub struct AthenaAdapter {
    options: AdapterOptions,
}

impl AthenaAdapter {
    /// Validate a host option map
    pub fn new(options: &Map<String, Value>) -> Result<Self> {
        let options = AdapterOptions::from_map(options)?;
        debug!(?options, "Adapter configured");
        Ok(Self { options })
    }

    pub fn from_options(options: AdapterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AdapterOptions {
        &self.options
    }

    /// Open a connection through the given backend
    pub fn connect_with(&self, backend: &dyn Backend) -> Result<Connection> {
        Connection::open(self.options.clone(), backend)
    }

    /// Open a connection to AWS
    #[cfg(feature = "aws")]
    pub fn connect_aws(&self) -> Result<Connection> {
        let backend = crate::engine::athena::AwsBackend::new()
            .map_err(crate::error::AdapterError::connection_failure)?;
        self.connect_with(&backend)
    }
}

#[cfg(feature = "aws")]
impl WorkbenchAdapter for AthenaAdapter {
    fn declared_options(&self) -> &'static [OptionSpec] {
        crate::config::ADAPTER_OPTIONS
    }

    fn connect(&self) -> Result<Box<dyn WorkbenchConnection>> {
        Ok(Box::new(self.connect_aws()?))
    }
}
