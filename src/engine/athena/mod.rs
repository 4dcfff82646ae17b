//! Athena Query Backend
//!
//! Implements [`Backend`], [`Session`] and [`ResultHandle`] on top of the AWS
//! SDK. The SDK is async; this layer is synchronous, so the backend owns a
//! private current-thread tokio runtime and blocks on every call.
//!
//! # Statement lifecycle
//! 1. `StartQueryExecution` with workgroup, output location and result reuse
//! 2. `GetQueryExecution` polled at a fixed interval until a terminal state
//! 3. First `GetQueryResults` page fetched eagerly for the column metadata
//! 4. Remaining pages fetched on demand for bounded fetches; an unbounded
//!    fetch of a SELECT downloads the CSV result object from S3 instead

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::operation::get_query_results::GetQueryResultsOutput;
use aws_sdk_athena::types::{
    QueryExecutionState, ResultConfiguration, ResultReuseByAgeConfiguration,
    ResultReuseConfiguration, StatementType,
};
use aws_sdk_athena::Client as AthenaClient;
use aws_sdk_s3::Client as S3Client;
use serde_json::{Number, Value};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use super::glue::GlueMetadataService;
use super::{
    Backend, ColumnDescription, ExecuteOptions, KeyedRow, MetadataService, ResultHandle,
    ResultSet, Session,
};
use crate::config::ClientParams;
use crate::error::{BackendError, BackendResult};

/// Interval between `GetQueryExecution` polls
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum rows per `GetQueryResults` page (service limit)
const PAGE_SIZE: i32 = 1000;

/// Provider name attached to explicitly configured credentials
const CREDENTIALS_PROVIDER: &str = "athena-adapter";

/// Render an SDK failure with its full context chain
///
/// The bare `Display` of an SDK error is just "service error"; the context
/// carries the service's own message, which is what users need to see.
pub(crate) fn sdk_error<E: std::error::Error>(err: E) -> BackendError {
    DisplayErrorContext(err).to_string().into()
}

// ============================================================================
// Backend
// ============================================================================

/// AWS-backed session factory
pub struct AwsBackend {
    runtime: Arc<Runtime>,
}

impl AwsBackend {
    /// Create a backend with its own blocking runtime
    pub fn new() -> BackendResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }

    /// Resolve the shared SDK configuration (region and credentials)
    ///
    /// Without explicit credentials the default provider chain applies
    /// (environment, profile, instance metadata).
    fn load_config(&self, params: &ClientParams) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &params.region_name {
            loader = loader.region(Region::new(region.clone()));
        }

        if let Some(creds) = &params.credentials {
            loader = loader.credentials_provider(aws_sdk_athena::config::Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                creds.session_token.clone(),
                None,
                CREDENTIALS_PROVIDER,
            ));
        }

        self.runtime.block_on(loader.load())
    }
}

impl Backend for AwsBackend {
    fn connect(&self, params: &ClientParams) -> BackendResult<Box<dyn Session>> {
        let config = self.load_config(params);
        let athena = AthenaClient::new(&config);

        // Surfaces bad credentials and unknown workgroups at connect time
        if let Some(work_group) = &params.work_group {
            self.runtime
                .block_on(athena.get_work_group().work_group(work_group).send())
                .map_err(sdk_error)?;
            debug!(work_group = %work_group, "Validated workgroup");
        }

        info!(
            region = ?config.region().map(ToString::to_string),
            work_group = ?params.work_group,
            "Established Athena session"
        );

        Ok(Box::new(AthenaSession {
            runtime: Arc::clone(&self.runtime),
            athena,
            s3: S3Client::new(&config),
            params: params.clone(),
        }))
    }

    fn metadata_service(&self, params: &ClientParams) -> BackendResult<Box<dyn MetadataService>> {
        let config = self.load_config(params);
        Ok(Box::new(GlueMetadataService::new(
            Arc::clone(&self.runtime),
            aws_sdk_glue::Client::new(&config),
        )))
    }
}

// ============================================================================
// Session
// ============================================================================

/// One authenticated Athena session
pub struct AthenaSession {
    runtime: Arc<Runtime>,
    athena: AthenaClient,
    s3: S3Client,
    params: ClientParams,
}

impl AthenaSession {
    fn result_configuration(&self) -> Option<ResultConfiguration> {
        self.params
            .s3_staging_dir
            .as_ref()
            .map(|dir| ResultConfiguration::builder().output_location(dir).build())
    }

    fn result_reuse_configuration(&self) -> BackendResult<ResultReuseConfiguration> {
        let reuse = self.params.result_reuse;
        let max_age = i32::try_from(reuse.max_age_minutes)?;

        let by_age = ResultReuseByAgeConfiguration::builder()
            .enabled(reuse.enabled)
            .max_age_in_minutes(max_age)
            .build();

        Ok(ResultReuseConfiguration::builder().result_reuse_by_age_configuration(by_age).build())
    }

    /// Submit a statement and return its execution id
    fn start(&self, sql: &str) -> BackendResult<String> {
        let output = self
            .runtime
            .block_on(
                self.athena
                    .start_query_execution()
                    .query_string(sql)
                    .set_work_group(self.params.work_group.clone())
                    .set_result_configuration(self.result_configuration())
                    .result_reuse_configuration(self.result_reuse_configuration()?)
                    .send(),
            )
            .map_err(sdk_error)?;

        output
            .query_execution_id()
            .map(ToString::to_string)
            .ok_or_else(|| "Athena returned no query execution id".into())
    }

    /// Poll until the execution reaches a terminal state
    fn wait(&self, execution_id: &str) -> BackendResult<CompletedExecution> {
        loop {
            let output = self
                .runtime
                .block_on(
                    self.athena
                        .get_query_execution()
                        .query_execution_id(execution_id)
                        .send(),
                )
                .map_err(sdk_error)?;

            let execution = output
                .query_execution()
                .ok_or_else(|| format!("No execution details for query {execution_id}"))?;
            let status = execution.status();

            match progress(status.and_then(|s| s.state()))? {
                Progress::Pending => {
                    debug!(execution_id = %execution_id, "Query still running");
                    std::thread::sleep(POLL_INTERVAL);
                }
                Progress::Succeeded => {
                    return Ok(CompletedExecution {
                        is_dml: matches!(execution.statement_type(), Some(StatementType::Dml)),
                        output_location: execution
                            .result_configuration()
                            .and_then(|c| c.output_location())
                            .map(ToString::to_string),
                    });
                }
                Progress::Stopped => {
                    let reason = status
                        .and_then(|s| s.state_change_reason())
                        .unwrap_or("Query did not complete");
                    return Err(reason.to_string().into());
                }
            }
        }
    }
}

/// Where an execution stands after one poll
#[derive(Debug, PartialEq, Eq)]
enum Progress {
    Pending,
    Succeeded,
    Stopped,
}

/// Classify a polled execution state
///
/// Only `QUEUED` and `RUNNING` keep the poll loop going; a missing or
/// unrecognized state ends it with an error.
fn progress(state: Option<&QueryExecutionState>) -> BackendResult<Progress> {
    match state {
        Some(QueryExecutionState::Queued | QueryExecutionState::Running) => Ok(Progress::Pending),
        Some(QueryExecutionState::Succeeded) => Ok(Progress::Succeeded),
        Some(QueryExecutionState::Failed | QueryExecutionState::Cancelled) => Ok(Progress::Stopped),
        Some(other) => Err(format!("Unexpected query state {}", other.as_str()).into()),
        None => Err("Athena reported no query state".into()),
    }
}

impl Session for AthenaSession {
    fn execute(&self, sql: &str, options: &ExecuteOptions) -> BackendResult<Box<dyn ResultHandle>> {
        let execution_id = self.start(sql)?;
        debug!(execution_id = %execution_id, unload = options.unload, "Submitted query");

        let completed = self.wait(&execution_id)?;
        let download_location = completed.download_location();

        let mut handle = AthenaResultHandle {
            runtime: Arc::clone(&self.runtime),
            athena: self.athena.clone(),
            s3: self.s3.clone(),
            execution_id,
            rows: PagedRows::new(completed.is_dml),
            download_location,
        };
        handle.fetch_first_page()?;

        Ok(Box::new(handle))
    }
}

/// What the adapter needs from a finished execution
struct CompletedExecution {
    is_dml: bool,
    output_location: Option<String>,
}

impl CompletedExecution {
    /// The CSV result object, if this execution wrote one
    ///
    /// Only SELECT-style statements produce a downloadable CSV; DDL and
    /// utility statements write text or metadata objects instead.
    fn download_location(&self) -> Option<String> {
        match &self.output_location {
            Some(location) if self.is_dml && location.ends_with(".csv") => Some(location.clone()),
            Some(location) if self.is_dml => {
                warn!(output_location = %location, "Result object is not CSV, paging instead");
                None
            }
            _ => None,
        }
    }
}

// ============================================================================
// Result Paging
// ============================================================================

/// One `GetQueryResults` page, reduced to plain data
#[derive(Debug, Default)]
struct Page {
    /// Column metadata (present on every page, only read from the first)
    columns: Option<Vec<ColumnDescription>>,
    rows: Vec<Vec<Option<String>>>,
    next_token: Option<String>,
}

impl Page {
    fn from_output(output: &GetQueryResultsOutput) -> Self {
        let Some(result_set) = output.result_set() else {
            return Self {
                next_token: output.next_token().map(ToString::to_string),
                ..Self::default()
            };
        };

        let columns = result_set.result_set_metadata().map(|meta| {
            meta.column_info()
                .iter()
                .map(|col| ColumnDescription::new(col.name(), col.r#type()))
                .collect()
        });

        let rows = result_set
            .rows()
            .iter()
            .map(|row| {
                row.data()
                    .iter()
                    .map(|datum| datum.var_char_value().map(ToString::to_string))
                    .collect()
            })
            .collect();

        Self {
            columns,
            rows,
            next_token: output.next_token().map(ToString::to_string),
        }
    }
}

/// Converted rows of a paged result, buffered until fetched
///
/// Knows nothing about transport: pages arrive through the closure given to
/// [`PagedRows::fill`].
#[derive(Debug)]
struct PagedRows {
    /// SELECT results repeat the column labels as the first row of page one
    skip_header: bool,
    description: Option<Vec<ColumnDescription>>,
    buffer: VecDeque<Vec<Value>>,
    next_token: Option<String>,
    exhausted: bool,
}

impl PagedRows {
    fn new(skip_header: bool) -> Self {
        Self {
            skip_header,
            description: None,
            buffer: VecDeque::new(),
            next_token: None,
            exhausted: false,
        }
    }

    /// Convert and buffer one page
    fn absorb(&mut self, page: Page) {
        let first_page = self.description.is_none();
        if first_page {
            self.description = Some(page.columns.unwrap_or_default());
        }

        let types = self.column_types();
        let skip = usize::from(first_page && self.skip_header);
        for row in page.rows.into_iter().skip(skip) {
            let values = row
                .into_iter()
                .enumerate()
                .map(|(idx, raw)| {
                    convert_value(raw.as_deref(), types.get(idx).map(String::as_str))
                })
                .collect();
            self.buffer.push_back(values);
        }

        self.next_token = page.next_token;
        self.exhausted = self.next_token.is_none();
    }

    /// Pull pages until `wanted` rows are buffered or the result runs out
    ///
    /// `wanted = None` pulls everything. Each call of `next_page` receives the
    /// continuation token of the previous page.
    fn fill<F>(&mut self, wanted: Option<usize>, mut next_page: F) -> BackendResult<()>
    where
        F: FnMut(Option<String>) -> BackendResult<Page>,
    {
        while !self.exhausted && wanted.map_or(true, |n| self.buffer.len() < n) {
            let page = next_page(self.next_token.take())?;
            self.absorb(page);
        }
        Ok(())
    }

    /// Remove up to `size` buffered rows, keyed by column name
    fn take_keyed(&mut self, size: usize) -> Vec<KeyedRow> {
        let names = self.column_names();
        let take = size.min(self.buffer.len());

        self.buffer
            .drain(..take)
            .map(|values| {
                let mut row = KeyedRow::new();
                for (name, value) in names.iter().zip(values) {
                    row.insert(name.clone(), value);
                }
                row
            })
            .collect()
    }

    fn take_all(&mut self) -> Vec<Vec<Value>> {
        self.buffer.drain(..).collect()
    }

    fn column_types(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.type_name.clone()).collect()
    }

    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name.clone()).collect()
    }

    fn columns(&self) -> &[ColumnDescription] {
        self.description.as_deref().unwrap_or_default()
    }
}

/// Request one `GetQueryResults` page
fn request_page(
    runtime: &Runtime,
    athena: &AthenaClient,
    execution_id: &str,
    next_token: Option<String>,
) -> BackendResult<Page> {
    let output = runtime
        .block_on(
            athena
                .get_query_results()
                .query_execution_id(execution_id)
                .max_results(PAGE_SIZE)
                .set_next_token(next_token)
                .send(),
        )
        .map_err(sdk_error)?;

    Ok(Page::from_output(&output))
}

// ============================================================================
// Result Handle
// ============================================================================

/// Results of one completed execution
pub struct AthenaResultHandle {
    runtime: Arc<Runtime>,
    athena: AthenaClient,
    s3: S3Client,
    execution_id: String,
    rows: PagedRows,
    /// CSV result object for the unbounded fetch, when one was written
    download_location: Option<String>,
}

impl AthenaResultHandle {
    /// Fetch page one eagerly; it carries the column metadata
    fn fetch_first_page(&mut self) -> BackendResult<()> {
        let (runtime, athena, id) = (&self.runtime, &self.athena, &self.execution_id);
        let page = request_page(runtime, athena, id, None)?;
        self.rows.absorb(page);
        self.log_progress();
        Ok(())
    }

    /// Fetch pages until `wanted` rows are buffered (all when `None`)
    fn fill(&mut self, wanted: Option<usize>) -> BackendResult<()> {
        let (runtime, athena, id) = (&self.runtime, &self.athena, &self.execution_id);
        self.rows.fill(wanted, |token| request_page(runtime, athena, id, token))?;
        self.log_progress();
        Ok(())
    }

    fn log_progress(&self) {
        debug!(
            execution_id = %self.execution_id,
            buffered = self.rows.buffer.len(),
            exhausted = self.rows.exhausted,
            "Fetched result pages"
        );
    }

    /// Download the CSV result object in one transfer
    fn download(&self, location: &str) -> BackendResult<Vec<Vec<Value>>> {
        let (bucket, key) = parse_s3_uri(location)
            .ok_or_else(|| format!("Not an S3 location: {location}"))?;
        debug!(bucket = %bucket, key = %key, "Downloading result object");

        let bytes = self.runtime.block_on(async {
            let response = self
                .s3
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(sdk_error)?;
            let data = response.body.collect().await?;
            Ok::<_, BackendError>(data.into_bytes())
        })?;

        parse_csv_rows(&bytes, &self.rows.column_types())
    }
}

impl ResultHandle for AthenaResultHandle {
    fn description(&self) -> Option<&[ColumnDescription]> {
        self.rows.description.as_deref()
    }

    /// One S3 download when a CSV object exists and page one was not the last
    fn fetch_all(&mut self) -> BackendResult<ResultSet> {
        let columns = self.rows.column_names();

        match self.download_location.take() {
            Some(location) if !self.rows.exhausted => {
                let rows = self.download(&location)?;
                self.rows.buffer.clear();
                self.rows.exhausted = true;
                Ok(ResultSet::new(columns, rows))
            }
            _ => {
                self.fill(None)?;
                Ok(ResultSet::new(columns, self.rows.take_all()))
            }
        }
    }

    fn fetch_many(&mut self, size: usize) -> BackendResult<Vec<KeyedRow>> {
        self.fill(Some(size))?;
        Ok(self.rows.take_keyed(size))
    }
}

// ============================================================================
// Value Conversion
// ============================================================================

/// Convert one Athena cell (always text on the wire) to a JSON value
///
/// Booleans, integers and floats become native JSON; decimals and every other
/// type stay text so no precision is lost. Values that fail to parse also
/// stay text.
fn convert_value(raw: Option<&str>, type_name: Option<&str>) -> Value {
    let Some(raw) = raw else {
        return Value::Null;
    };

    let converted = match type_name.map(str::to_ascii_lowercase).as_deref() {
        Some("boolean") => raw.parse::<bool>().ok().map(Value::Bool),
        Some("tinyint" | "smallint" | "integer" | "bigint") => {
            raw.parse::<i64>().ok().map(Value::from)
        }
        Some("real" | "float" | "double") => {
            raw.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
        }
        _ => None,
    };

    converted.unwrap_or_else(|| Value::String(raw.to_string()))
}

/// Split `s3://bucket/key` into its parts
fn parse_s3_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("s3://")?;
    let (bucket, key) = rest.split_once('/')?;
    if bucket.is_empty() || key.is_empty() {
        return None;
    }
    Some((bucket, key))
}

/// Parse an Athena CSV result object (header row first)
///
/// Athena writes NULL as an empty unquoted field; the `csv` reader cannot tell
/// that apart from an empty quoted string, so every empty field reads as null.
fn parse_csv_rows(data: &[u8], types: &[String]) -> BackendResult<Vec<Vec<Value>>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(data);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let values = record
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let raw = (!field.is_empty()).then_some(field);
                convert_value(raw, types.get(idx).map(String::as_str))
            })
            .collect();
        rows.push(values);
    }

    Ok(rows)
}
