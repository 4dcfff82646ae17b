//! Scripted in-memory warehouse
//!
//! Implements the backend capability traits without AWS. It answers the
//! catalog queries (`SHOW DATABASES`, `information_schema`), a handful of
//! scripted statements, and the control-plane listing, and counts every call.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use athena_adapter::{
    Backend, BackendResult, ClientParams, ColumnDescription, ExecuteOptions, KeyedRow,
    MetadataService, ResultHandle, ResultSet, Session, TableMetadata,
};

/// One relation of the fake catalog
#[derive(Clone)]
pub struct FakeTable {
    pub name: String,
    /// Glue-style type, e.g. `EXTERNAL_TABLE` or `VIRTUAL_VIEW`
    pub glue_type: String,
    pub columns: Vec<(String, String)>,
}

impl FakeTable {
    pub fn table(name: &str, columns: &[(&str, &str)]) -> Self {
        Self::new(name, "EXTERNAL_TABLE", columns)
    }

    pub fn view(name: &str, columns: &[(&str, &str)]) -> Self {
        Self::new(name, "VIRTUAL_VIEW", columns)
    }

    fn new(name: &str, glue_type: &str, columns: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            glue_type: glue_type.to_string(),
            columns: columns.iter().map(|(n, t)| (n.to_string(), t.to_string())).collect(),
        }
    }

    fn information_schema_type(&self) -> &'static str {
        if self.glue_type.contains("TABLE") {
            "BASE TABLE"
        } else {
            "VIEW"
        }
    }
}

/// Canned answer for one statement
#[derive(Clone)]
pub struct Scripted {
    pub description: Option<Vec<ColumnDescription>>,
    pub rows: Vec<Vec<Value>>,
}

/// Call counters shared by every object the warehouse hands out
#[derive(Default)]
pub struct Counters {
    pub connects: AtomicUsize,
    pub metadata_clients: AtomicUsize,
    pub statements: AtomicUsize,
    pub control_plane_calls: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

struct State {
    databases: Vec<(String, Vec<FakeTable>)>,
    scripted: HashMap<String, Scripted>,
    counters: Arc<Counters>,
    connect_error: Option<String>,
    metadata_error: Option<String>,
    listing_error: Option<String>,
    seen_params: std::sync::Mutex<Vec<ClientParams>>,
    seen_options: std::sync::Mutex<Vec<ExecuteOptions>>,
}

/// Fake query service plus control plane
#[derive(Clone)]
pub struct FakeWarehouse {
    state: Arc<State>,
}

impl Default for FakeWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeWarehouse {
    /// Empty catalog with the standard scripted statements
    pub fn new() -> Self {
        Self::with_catalog(Vec::new())
    }

    pub fn with_catalog(databases: Vec<(String, Vec<FakeTable>)>) -> Self {
        let mut scripted = HashMap::new();
        let int = |name: &str| ColumnDescription::new(name, "integer");

        scripted.insert(
            "select 1 as a, 2 as a, 3 as a".to_string(),
            Scripted {
                description: Some(vec![int("a"), int("a"), int("a")]),
                rows: vec![vec![json!(1), json!(2), json!(3)]],
            },
        );
        scripted.insert(
            "select 1 union all select 2 union all select 3".to_string(),
            Scripted {
                description: Some(vec![int("_col0")]),
                rows: vec![vec![json!(1)], vec![json!(2)], vec![json!(3)]],
            },
        );
        scripted.insert(
            "select 1 as a".to_string(),
            Scripted {
                description: Some(vec![int("a")]),
                rows: vec![vec![json!(1)]],
            },
        );
        scripted.insert(
            "select cast(1.5 as decimal(10,2)) as price, 'x' as label, current_date as day"
                .to_string(),
            Scripted {
                description: Some(vec![
                    ColumnDescription::new("price", "decimal(10,2)"),
                    ColumnDescription::new("label", "varchar"),
                    ColumnDescription::new("day", "date"),
                ]),
                rows: vec![vec![json!("1.50"), json!("x"), json!("2024-01-01")]],
            },
        );
        scripted.insert(
            "create table t (a int)".to_string(),
            Scripted {
                description: Some(Vec::new()),
                rows: Vec::new(),
            },
        );
        scripted.insert(
            "drop table t".to_string(),
            Scripted {
                description: Some(Vec::new()),
                rows: Vec::new(),
            },
        );
        scripted.insert(
            "msck repair table t".to_string(),
            Scripted {
                description: None,
                rows: Vec::new(),
            },
        );

        Self {
            state: Arc::new(State {
                databases,
                scripted,
                counters: Arc::new(Counters::default()),
                connect_error: None,
                metadata_error: None,
                listing_error: None,
                seen_params: std::sync::Mutex::new(Vec::new()),
                seen_options: std::sync::Mutex::new(Vec::new()),
            }),
        }
    }

    /// The catalog most tests browse
    pub fn sample() -> Self {
        Self::with_catalog(sample_catalog())
    }

    pub fn failing_connect(message: &str) -> Self {
        Self::new().configure(|s| s.connect_error = Some(message.to_string()))
    }

    pub fn failing_metadata_client(message: &str) -> Self {
        Self::new().configure(|s| s.metadata_error = Some(message.to_string()))
    }

    /// Every catalog listing (control plane and SQL) fails with `message`
    pub fn failing_listings(message: &str) -> Self {
        Self::sample().configure(|s| s.listing_error = Some(message.to_string()))
    }

    fn configure(mut self, apply: impl FnOnce(&mut State)) -> Self {
        if let Some(state) = Arc::get_mut(&mut self.state) {
            apply(state);
        }
        self
    }

    pub fn counters(&self) -> &Counters {
        &self.state.counters
    }

    pub fn seen_params(&self) -> Vec<ClientParams> {
        self.state.seen_params.lock().unwrap().clone()
    }

    pub fn seen_options(&self) -> Vec<ExecuteOptions> {
        self.state.seen_options.lock().unwrap().clone()
    }
}

pub fn sample_catalog() -> Vec<(String, Vec<FakeTable>)> {
    vec![
        (
            "sales".to_string(),
            vec![
                FakeTable::table(
                    "orders",
                    &[("id", "bigint"), ("amount", "decimal(10,2)"), ("placed_at", "timestamp")],
                ),
                FakeTable::view("big_orders", &[("id", "bigint"), ("amount", "decimal(10,2)")]),
            ],
        ),
        (
            "weird\"db".to_string(),
            vec![FakeTable::table(
                "events",
                &[("payload", "row(a integer)"), ("tags", "array(varchar)")],
            )],
        ),
        ("empty".to_string(), Vec::new()),
    ]
}

impl Backend for FakeWarehouse {
    fn connect(&self, params: &ClientParams) -> BackendResult<Box<dyn Session>> {
        self.state.counters.connects.fetch_add(1, Ordering::SeqCst);
        self.state.seen_params.lock().unwrap().push(params.clone());
        if let Some(message) = &self.state.connect_error {
            return Err(message.clone().into());
        }
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
        }))
    }

    fn metadata_service(&self, _params: &ClientParams) -> BackendResult<Box<dyn MetadataService>> {
        self
            .state
            .counters
            .metadata_clients
            .fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.state.metadata_error {
            return Err(message.clone().into());
        }
        Ok(Box::new(FakeMetadata {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSession {
    state: Arc<State>,
}

impl FakeSession {
    fn answer(&self, sql: &str) -> BackendResult<Scripted> {
        let text = |name: &str| ColumnDescription::new(name, "varchar");
        let is_catalog_query = sql == "SHOW DATABASES" || sql.contains("information_schema");

        if is_catalog_query {
            if let Some(message) = &self.state.listing_error {
                return Err(message.clone().into());
            }
        }

        if sql == "SHOW DATABASES" {
            return Ok(Scripted {
                description: Some(vec![text("database_name")]),
                rows: self.state.databases.iter().map(|(db, _)| vec![json!(db)]).collect(),
            });
        }

        if sql.contains("information_schema.tables") {
            let schema = literal_after(sql, "table_schema = ").unwrap_or_default();
            let rows = self
                .tables(&schema)
                .iter()
                .map(|t| vec![json!(t.name), json!(t.information_schema_type())])
                .collect();
            return Ok(Scripted {
                description: Some(vec![text("table_name"), text("table_type")]),
                rows,
            });
        }

        if sql.contains("information_schema.columns") {
            let schema = literal_after(sql, "table_schema = ").unwrap_or_default();
            let table = literal_after(sql, "table_name = ").unwrap_or_default();
            let rows = self
                .tables(&schema)
                .iter()
                .filter(|t| t.name == table)
                .flat_map(|t| t.columns.iter().map(|(n, ty)| vec![json!(n), json!(ty)]))
                .collect();
            return Ok(Scripted {
                description: Some(vec![text("column_name"), text("data_type")]),
                rows,
            });
        }

        self.state
            .scripted
            .get(sql.trim())
            .cloned()
            .ok_or_else(|| format!("line 1:1: mismatched input '{}'", sql.trim()).into())
    }

    fn tables(&self, schema: &str) -> Vec<FakeTable> {
        self.state
            .databases
            .iter()
            .find(|(db, _)| db == schema)
            .map(|(_, tables)| tables.clone())
            .unwrap_or_default()
    }
}

impl Session for FakeSession {
    fn execute(&self, sql: &str, options: &ExecuteOptions) -> BackendResult<Box<dyn ResultHandle>> {
        self
            .state
            .counters
            .statements
            .fetch_add(1, Ordering::SeqCst);
        self.state.seen_options.lock().unwrap().push(*options);

        let answer = self.answer(sql)?;
        Ok(Box::new(FakeHandle {
            description: answer.description,
            rows: answer.rows.into(),
        }))
    }
}

struct FakeHandle {
    description: Option<Vec<ColumnDescription>>,
    rows: VecDeque<Vec<Value>>,
}

impl ResultHandle for FakeHandle {
    fn description(&self) -> Option<&[ColumnDescription]> {
        self.description.as_deref()
    }

    fn fetch_all(&mut self) -> BackendResult<ResultSet> {
        let columns = self
            .description
            .iter()
            .flatten()
            .map(|c| c.name.clone())
            .collect::<Vec<_>>();
        Ok(ResultSet::new(columns, self.rows.drain(..).collect()))
    }

    fn fetch_many(&mut self, size: usize) -> BackendResult<Vec<KeyedRow>> {
        let names: Vec<String> = self
            .description
            .iter()
            .flatten()
            .map(|c| c.name.clone())
            .collect();
        let take = size.min(self.rows.len());
        Ok(self
            .rows
            .drain(..take)
            .map(|values| {
                let mut row = KeyedRow::new();
                for (name, value) in names.iter().zip(values) {
                    row.insert(name.clone(), value);
                }
                row
            })
            .collect())
    }
}

struct FakeMetadata {
    state: Arc<State>,
}

impl FakeMetadata {
    fn check(&self) -> BackendResult<()> {
        self
            .state
            .counters
            .control_plane_calls
            .fetch_add(1, Ordering::SeqCst);
        match &self.state.listing_error {
            Some(message) => Err(message.clone().into()),
            None => Ok(()),
        }
    }
}

impl MetadataService for FakeMetadata {
    fn list_databases(&self) -> BackendResult<Vec<String>> {
        self.check()?;
        Ok(self.state.databases.iter().map(|(db, _)| db.clone()).collect())
    }

    fn list_tables(&self, database: &str) -> BackendResult<Vec<TableMetadata>> {
        self.check()?;
        let tables = self
            .state
            .databases
            .iter()
            .find(|(db, _)| db == database)
            .map(|(_, tables)| tables.clone())
            .unwrap_or_default();

        Ok(tables
            .into_iter()
            .map(|t| TableMetadata {
                name: t.name,
                table_type: t.glue_type,
                columns: t
                    .columns
                    .into_iter()
                    .map(|(n, ty)| ColumnDescription::new(n, ty))
                    .collect(),
            })
            .collect())
    }
}

/// Decode the single-quoted literal following `key` (`''` unescaped)
fn literal_after(sql: &str, key: &str) -> Option<String> {
    let start = sql.find(key)? + key.len();
    let mut chars = sql[start..].chars().peekable();
    if chars.next()? != '\'' {
        return None;
    }

    let mut value = String::new();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
                value.push('\'');
            } else {
                return Some(value);
            }
        } else {
            value.push(c);
        }
    }
    None
}

/// Option map from JSON
pub fn options(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("options must be a JSON object"),
    }
}
