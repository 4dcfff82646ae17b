//! Catalog Browser
//!
//! Builds the four-level catalog tree a workbench shows in its sidebar:
//!
//! ```text
//! "awsdatacatalog"                      (c)
//! └── "awsdatacatalog"."db"             (s)
//!     └── "awsdatacatalog"."db"."tbl"   (t / v)
//!         └── "...".."tbl"."col"        (type glyph)
//! ```
//!
//! Discovery is delegated to a [`DiscoveryStrategy`]; the tree is assembled
//! here, identically for every strategy. Trees are immutable and rebuilt from
//! scratch on every request.

mod strategy;

pub use strategy::{
    ColumnEntry, ControlPlaneStrategy, DiscoveryStrategy, InformationSchemaStrategy,
    RelationEntry, RelationKind,
};

use serde::Serialize;
use tracing::debug;

use crate::error::{AdapterError, Result};
use crate::glyph;

/// Name of the root catalog every qualified identifier starts with
pub const CATALOG_NAME: &str = "awsdatacatalog";

/// Type label of the root catalog node
pub const CATALOG_TYPE_LABEL: &str = "c";

/// Type label of database nodes
pub const DATABASE_TYPE_LABEL: &str = "s";

/// Kind of a catalog node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Catalog,
    Database,
    Relation,
    Column,
}

/// Quote one identifier segment (`"` doubled inside)
#[must_use]
pub fn quote_identifier(segment: &str) -> String {
    format!("\"{}\"", segment.replace('"', "\"\""))
}

/// Quote and dot-join identifier segments
#[must_use]
pub fn qualify<S: AsRef<str>>(segments: &[S]) -> String {
    segments.iter().map(|s| quote_identifier(s.as_ref())).collect::<Vec<_>>().join(".")
}

/// One node of the catalog tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogNode {
    kind: NodeKind,
    segments: Vec<String>,
    qualified_identifier: String,
    query_name: String,
    label: String,
    type_label: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<CatalogNode>,
}

impl CatalogNode {
    fn branch(
        kind: NodeKind,
        segments: Vec<String>,
        type_label: &str,
        children: Vec<Self>,
    ) -> Self {
        let qualified_identifier = qualify(&segments);
        let label = segments.last().cloned().unwrap_or_default();
        Self {
            kind,
            query_name: qualified_identifier.clone(),
            qualified_identifier,
            segments,
            label,
            type_label: type_label.to_string(),
            children,
        }
    }

    /// Column leaf; its query name is the bare column name
    fn column(database: &str, relation: &str, column: &ColumnEntry) -> Self {
        let segments = vec![
            CATALOG_NAME.to_string(),
            database.to_string(),
            relation.to_string(),
            column.name.clone(),
        ];
        Self {
            kind: NodeKind::Column,
            qualified_identifier: qualify(&segments),
            segments,
            query_name: column.name.clone(),
            label: column.name.clone(),
            type_label: glyph::normalize(&column.type_name).to_string(),
            children: Vec::new(),
        }
    }

    fn relation(database: &str, relation: &RelationEntry) -> Self {
        let children = relation
            .columns
            .iter()
            .map(|col| Self::column(database, &relation.name, col))
            .collect();
        Self::branch(
            NodeKind::Relation,
            vec![CATALOG_NAME.to_string(), database.to_string(), relation.name.clone()],
            relation.kind.type_label(),
            children,
        )
    }

    fn database(name: &str, relations: &[RelationEntry]) -> Self {
        let children = relations
            .iter()
            .map(|rel| Self::relation(name, rel))
            .collect();
        Self::branch(
            NodeKind::Database,
            vec![CATALOG_NAME.to_string(), name.to_string()],
            DATABASE_TYPE_LABEL,
            children,
        )
    }

    fn root(databases: Vec<Self>) -> Self {
        Self::branch(
            NodeKind::Catalog,
            vec![CATALOG_NAME.to_string()],
            CATALOG_TYPE_LABEL,
            databases,
        )
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Unquoted identifier segments from the catalog down to this node
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Fully-qualified, quoted reference, e.g. `"awsdatacatalog"."db"."tbl"`
    pub fn qualified_identifier(&self) -> &str {
        &self.qualified_identifier
    }

    /// Fragment to splice into a generated query
    pub fn query_name(&self) -> &str {
        &self.query_name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn type_label(&self) -> &str {
        &self.type_label
    }

    pub fn children(&self) -> &[CatalogNode] {
        &self.children
    }

    /// Find a direct child by label
    pub fn child(&self, label: &str) -> Option<&CatalogNode> {
        self.children.iter().find(|c| c.label == label)
    }

    /// Depth-first iterator over this node and all descendants
    pub fn walk(&self) -> impl Iterator<Item = &CatalogNode> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

/// Assemble the catalog tree from discovered databases, bottom-up
#[must_use]
pub fn assemble(databases: &[(String, Vec<RelationEntry>)]) -> CatalogNode {
    let db_nodes =
        databases.iter().map(|(name, relations)| CatalogNode::database(name, relations)).collect();
    CatalogNode::root(db_nodes)
}

/// Run a discovery strategy to completion and assemble its tree
///
/// Any failure aborts the whole discovery; no partial tree is returned.
pub fn discover(strategy: &dyn DiscoveryStrategy) -> Result<CatalogNode> {
    let databases = strategy.list_databases().map_err(AdapterError::catalog_unavailable)?;
    debug!(strategy = strategy.name(), databases = databases.len(), "Discovered databases");

    let mut discovered = Vec::with_capacity(databases.len());
    for database in databases {
        let relations =
            strategy.list_relations(&database).map_err(AdapterError::catalog_unavailable)?;
        debug!(database = %database, relations = relations.len(), "Discovered relations");
        discovered.push((database, relations));
    }

    Ok(assemble(&discovered))
}
