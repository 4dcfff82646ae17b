//! Connection
//!
//! Owns the backend session for its whole lifetime and translates every
//! backend failure into an [`AdapterError`] kind the host recognizes.

use tracing::{debug, info};

use crate::catalog::{self, CatalogNode, ControlPlaneStrategy, InformationSchemaStrategy};
use crate::completions::{self, Completion};
use crate::config::{AdapterOptions, DiscoveryMode};
use crate::cursor::ResultCursor;
use crate::engine::{Backend, ExecuteOptions, MetadataService, Session};
use crate::error::{AdapterError, Result};

/// Open connection to the query service
pub struct Connection {
    session: Box<dyn Session>,
    /// Present only in control-plane discovery mode
    metadata: Option<Box<dyn MetadataService>>,
    options: AdapterOptions,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("options", &self.options)
            .field("control_plane", &self.metadata.is_some())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Establish the session (and, in control-plane mode, the metadata client)
    pub fn open(options: AdapterOptions, backend: &dyn Backend) -> Result<Self> {
        let params = options.client_params();

        let session = backend.connect(&params).map_err(AdapterError::connection_failure)?;

        let metadata = match options.discovery {
            DiscoveryMode::ControlPlane => Some(
                backend.metadata_service(&params).map_err(AdapterError::connection_failure)?,
            ),
            DiscoveryMode::InformationSchema => None,
        };

        info!(discovery = ?options.discovery, unload = options.unload, "Connection opened");
        Ok(Self {
            session,
            metadata,
            options,
        })
    }

    pub fn options(&self) -> &AdapterOptions {
        &self.options
    }

    /// Submit a query; a blank query submits nothing and yields no cursor
    pub fn execute(&self, query: &str) -> Result<Option<ResultCursor>> {
        if query.trim().is_empty() {
            debug!("Skipping blank query");
            return Ok(None);
        }

        let execute_options = ExecuteOptions {
            unload: self.options.unload,
        };
        let handle = self
            .session
            .execute(query, &execute_options)
            .map_err(AdapterError::query_execution)?;

        Ok(Some(ResultCursor::new(handle)))
    }

    /// Discover the catalog from scratch
    pub fn get_catalog(&self) -> Result<CatalogNode> {
        match self.metadata.as_deref() {
            Some(service) => catalog::discover(&ControlPlaneStrategy::new(service)),
            None => catalog::discover(&InformationSchemaStrategy::new(self.session.as_ref())),
        }
    }

    /// Static keyword and function completions
    pub fn get_completions(&self) -> Result<Vec<Completion>> {
        completions::load()
    }
}
