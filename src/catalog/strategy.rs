//! Discovery strategies
//!
//! Two ways of listing the same catalog:
//! - [`ControlPlaneStrategy`]: Glue `GetDatabases` / `GetTables`, columns inline
//!   with each table (one paginated call per database)
//! - [`InformationSchemaStrategy`]: `SHOW DATABASES`, then `information_schema`
//!   queries per database and per relation (1 + D + R round-trips)

use tracing::debug;

use crate::engine::{value_as_text, ExecuteOptions, MetadataService, ResultSet, Session};
use crate::error::BackendResult;

/// Relation kind shown as `t` or `v`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Table,
    View,
}

impl RelationKind {
    /// Glue table types: anything containing `TABLE` is a table
    #[must_use]
    pub fn from_glue_table_type(table_type: &str) -> Self {
        if table_type.contains("TABLE") {
            Self::Table
        } else {
            Self::View
        }
    }

    /// `information_schema.tables.table_type`: `BASE TABLE` vs `VIEW`
    #[must_use]
    pub fn from_information_schema(table_type: &str) -> Self {
        if table_type.ends_with("TABLE") {
            Self::Table
        } else {
            Self::View
        }
    }

    #[must_use]
    pub const fn type_label(self) -> &'static str {
        match self {
            Self::Table => "t",
            Self::View => "v",
        }
    }
}

/// Discovered column: name and raw type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnEntry {
    pub name: String,
    pub type_name: String,
}

impl ColumnEntry {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Discovered relation with its columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationEntry {
    pub name: String,
    pub kind: RelationKind,
    pub columns: Vec<ColumnEntry>,
}

/// A way of enumerating databases, relations and columns
pub trait DiscoveryStrategy {
    /// Short name for logs
    fn name(&self) -> &'static str;

    fn list_databases(&self) -> BackendResult<Vec<String>>;

    /// Relations of `database`, each with its columns
    fn list_relations(&self, database: &str) -> BackendResult<Vec<RelationEntry>>;
}

// ============================================================================
// Control plane
// ============================================================================

/// Discovery through the control-plane metadata service
pub struct ControlPlaneStrategy<'a> {
    service: &'a dyn MetadataService,
}

impl<'a> ControlPlaneStrategy<'a> {
    pub fn new(service: &'a dyn MetadataService) -> Self {
        Self { service }
    }
}

impl DiscoveryStrategy for ControlPlaneStrategy<'_> {
    fn name(&self) -> &'static str {
        "control_plane"
    }

    fn list_databases(&self) -> BackendResult<Vec<String>> {
        self.service.list_databases()
    }

    fn list_relations(&self, database: &str) -> BackendResult<Vec<RelationEntry>> {
        let tables = self.service.list_tables(database)?;

        Ok(tables
            .into_iter()
            .map(|table| RelationEntry {
                kind: RelationKind::from_glue_table_type(&table.table_type),
                columns: table
                    .columns
                    .into_iter()
                    .map(|c| ColumnEntry {
                        name: c.name,
                        type_name: c.type_name,
                    })
                    .collect(),
                name: table.name,
            })
            .collect())
    }
}

// ============================================================================
// information_schema
// ============================================================================

/// Discovery through SQL queries on the connection's own session
pub struct InformationSchemaStrategy<'a> {
    session: &'a dyn Session,
}

impl<'a> InformationSchemaStrategy<'a> {
    pub fn new(session: &'a dyn Session) -> Self {
        Self { session }
    }

    fn query(&self, sql: &str) -> BackendResult<ResultSet> {
        debug!(sql = %sql, "Running catalog query");
        let mut handle = self.session.execute(sql, &ExecuteOptions::default())?;
        handle.fetch_all()
    }

    fn list_columns(&self, database: &str, relation: &str) -> BackendResult<Vec<ColumnEntry>> {
        let result = self.query(&columns_query(database, relation))?;
        result
            .rows
            .iter()
            .map(|row| {
                Ok(ColumnEntry {
                    name: text_cell(row, 0)?,
                    type_name: text_cell(row, 1)?,
                })
            })
            .collect()
    }
}

impl DiscoveryStrategy for InformationSchemaStrategy<'_> {
    fn name(&self) -> &'static str {
        "information_schema"
    }

    fn list_databases(&self) -> BackendResult<Vec<String>> {
        let result = self.query(SHOW_DATABASES)?;
        result.rows.iter().map(|row| text_cell(row, 0)).collect()
    }

    fn list_relations(&self, database: &str) -> BackendResult<Vec<RelationEntry>> {
        let result = self.query(&tables_query(database))?;

        let mut relations = Vec::with_capacity(result.rows.len());
        for row in &result.rows {
            let name = text_cell(row, 0)?;
            let table_type = text_cell(row, 1)?;
            let columns = self.list_columns(database, &name)?;
            relations.push(RelationEntry {
                kind: RelationKind::from_information_schema(&table_type),
                name,
                columns,
            });
        }

        Ok(relations)
    }
}

const SHOW_DATABASES: &str = "SHOW DATABASES";

/// Quote a string literal for SQL (`'` doubled)
fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn tables_query(database: &str) -> String {
    format!(
        "SELECT table_name, table_type \
         FROM information_schema.tables \
         WHERE table_schema = {}",
        sql_literal(database)
    )
}

fn columns_query(database: &str, relation: &str) -> String {
    format!(
        "SELECT column_name, data_type \
         FROM information_schema.columns \
         WHERE table_schema = {} AND table_name = {} \
         ORDER BY ordinal_position",
        sql_literal(database),
        sql_literal(relation)
    )
}

/// Read a non-null text cell
fn text_cell(row: &[serde_json::Value], idx: usize) -> BackendResult<String> {
    row.get(idx)
        .and_then(value_as_text)
        .ok_or_else(|| format!("catalog query returned no value in column {idx}").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ColumnDescription, KeyedRow, ResultHandle, TableMetadata};
    use serde_json::json;
    use std::cell::RefCell;

    #[test]
    fn test_relation_kind_from_glue() {
        assert_eq!(RelationKind::from_glue_table_type("EXTERNAL_TABLE"), RelationKind::Table);
        assert_eq!(RelationKind::from_glue_table_type("MANAGED_TABLE"), RelationKind::Table);
        assert_eq!(RelationKind::from_glue_table_type("GOVERNED_TABLE_X"), RelationKind::Table);
        assert_eq!(RelationKind::from_glue_table_type("VIRTUAL_VIEW"), RelationKind::View);
        assert_eq!(RelationKind::from_glue_table_type(""), RelationKind::View);
    }

    #[test]
    fn test_relation_kind_from_information_schema() {
        assert_eq!(RelationKind::from_information_schema("BASE TABLE"), RelationKind::Table);
        assert_eq!(RelationKind::from_information_schema("VIEW"), RelationKind::View);
        assert_eq!(RelationKind::from_information_schema("TABLE VIEW"), RelationKind::View);
    }

    #[test]
    fn test_queries_escape_literals() {
        let sql = columns_query("o'brien", "t");
        assert!(sql.contains("table_schema = 'o''brien'"));
        assert!(sql.contains("table_name = 't'"));
        assert!(sql.contains("information_schema.columns"));

        let sql = tables_query("sales");
        assert!(sql.contains("FROM information_schema.tables"));
        assert!(sql.ends_with("WHERE table_schema = 'sales'"));
    }

    struct StaticMetadata;

    impl MetadataService for StaticMetadata {
        fn list_databases(&self) -> BackendResult<Vec<String>> {
            Ok(vec!["db".to_string()])
        }

        fn list_tables(&self, _database: &str) -> BackendResult<Vec<TableMetadata>> {
            Ok(vec![TableMetadata {
                name: "events".to_string(),
                table_type: "EXTERNAL_TABLE".to_string(),
                columns: vec![
                    ColumnDescription::new("ts", "timestamp"),
                    ColumnDescription::new("dt", "string"),
                ],
            }])
        }
    }

    #[test]
    fn test_control_plane_maps_tables_inline() {
        let service = StaticMetadata;
        let strategy = ControlPlaneStrategy::new(&service);

        assert_eq!(strategy.list_databases().unwrap(), vec!["db"]);
        let relations = strategy.list_relations("db").unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].kind, RelationKind::Table);
        assert_eq!(
            relations[0].columns,
            vec![ColumnEntry::new("ts", "timestamp"), ColumnEntry::new("dt", "string")]
        );
    }

    struct Canned(ResultSet);

    impl ResultHandle for Canned {
        fn description(&self) -> Option<&[ColumnDescription]> {
            None
        }

        fn fetch_all(&mut self) -> BackendResult<ResultSet> {
            Ok(std::mem::take(&mut self.0))
        }

        fn fetch_many(&mut self, _size: usize) -> BackendResult<Vec<KeyedRow>> {
            Ok(vec![])
        }
    }

    /// Answers catalog queries and records every statement it sees
    struct RecordingSession {
        seen: RefCell<Vec<String>>,
    }

    impl Session for RecordingSession {
        fn execute(
            &self,
            sql: &str,
            _options: &ExecuteOptions,
        ) -> BackendResult<Box<dyn ResultHandle>> {
            self.seen.borrow_mut().push(sql.to_string());
            let rows = if sql == SHOW_DATABASES {
                vec![vec![json!("db")]]
            } else if sql.contains("information_schema.tables") {
                vec![vec![json!("t1"), json!("BASE TABLE")], vec![json!("v1"), json!("VIEW")]]
            } else if sql.contains("table_name = 't1'") {
                vec![vec![json!("id"), json!("integer")]]
            } else {
                vec![]
            };
            Ok(Box::new(Canned(ResultSet::new(vec![], rows))))
        }
    }

    #[test]
    fn test_information_schema_round_trips() {
        let session = RecordingSession {
            seen: RefCell::new(Vec::new()),
        };
        let strategy = InformationSchemaStrategy::new(&session);

        assert_eq!(strategy.list_databases().unwrap(), vec!["db"]);
        let relations = strategy.list_relations("db").unwrap();

        assert_eq!(relations.len(), 2);
        assert_eq!(relations[0].kind, RelationKind::Table);
        assert_eq!(relations[0].columns, vec![ColumnEntry::new("id", "integer")]);
        assert_eq!(relations[1].kind, RelationKind::View);
        assert!(relations[1].columns.is_empty());

        // 1 database query + 1 tables query + 1 columns query per relation
        assert_eq!(session.seen.borrow().len(), 4);
    }

    #[test]
    fn test_null_cell_is_an_error() {
        let row = vec![serde_json::Value::Null];
        assert!(text_cell(&row, 0).is_err());
        assert!(text_cell(&row, 3).is_err());
    }
}
