//! athena-adapter CLI
//!
//! A small host harness around the adapter, for trying it against a real
//! Athena workgroup without a workbench:
//! - `query` - Run a statement and print its rows
//! - `columns` - Run a statement and print its (name, glyph) pairs
//! - `catalog` - Print the catalog tree
//! - `completions` - Print the bundled completion list
//! - `options` - Print the adapter's option declarations
//!
//! All output to stdout is JSON. Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Map, Value};

use athena_adapter::config::load_with_precedence;
use athena_adapter::logging::{init_logging, LogConfig, LogLevel};
use athena_adapter::{
    completions, AdapterError, AthenaAdapter, Connection, ErrorEnvelope, FetchOptions, Metadata,
    SuccessEnvelope, ADAPTER_OPTIONS,
};

/// Query Amazon Athena and browse its data catalog
#[derive(Parser)]
#[command(name = "athena-adapter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Log level for this crate; overrides RUST_LOG
    #[arg(long, global = true, value_enum, ignore_case = true)]
    log_level: Option<LogLevel>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a SQL statement and print the results
    Query {
        sql: String,

        /// Fetch at most this many rows
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Run a SQL statement and print its column names and type glyphs
    Columns { sql: String },

    /// Print the full catalog tree
    Catalog,

    /// Print the keyword and function completions
    Completions,

    /// Print the option declarations
    Options,
}

/// Connection options; each overrides the option files when given
#[derive(Args, Default)]
struct ConnectionArgs {
    /// Athena workgroup
    #[arg(short = 'w', long, global = true)]
    work_group: Option<String>,

    /// S3 location for query results
    #[arg(long, global = true)]
    s3_staging_dir: Option<String>,

    #[arg(long, global = true)]
    result_reuse_enable: Option<bool>,

    /// Result reuse TTL in minutes
    #[arg(long, global = true)]
    result_reuse_minutes: Option<String>,

    /// Browse the catalog with Glue (true) or information_schema (false)
    #[arg(long, global = true)]
    use_glue_catalog: Option<bool>,

    #[arg(long, global = true)]
    unload: Option<bool>,

    #[arg(long, global = true)]
    region_name: Option<String>,

    #[arg(long, global = true)]
    aws_access_key_id: Option<String>,

    #[arg(long, global = true)]
    aws_secret_access_key: Option<String>,

    #[arg(long, global = true)]
    aws_session_token: Option<String>,
}

impl ConnectionArgs {
    /// Only the flags actually given, so option files fill in the rest
    fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                map.insert(key.to_string(), value);
            }
        };

        put("work_group", self.work_group.clone().map(Value::from));
        put("s3_staging_dir", self.s3_staging_dir.clone().map(Value::from));
        put("result_reuse_enable", self.result_reuse_enable.map(Value::from));
        put("result_reuse_minutes", self.result_reuse_minutes.clone().map(Value::from));
        put("use_glue_catalog", self.use_glue_catalog.map(Value::from));
        put("unload", self.unload.map(Value::from));
        put("region_name", self.region_name.clone().map(Value::from));
        put("aws_access_key_id", self.aws_access_key_id.clone().map(Value::from));
        put("aws_secret_access_key", self.aws_secret_access_key.clone().map(Value::from));
        put("aws_session_token", self.aws_session_token.clone().map(Value::from));

        map
    }
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Query { .. } => "query",
            Self::Columns { .. } => "columns",
            Self::Catalog => "catalog",
            Self::Completions => "completions",
            Self::Options => "options",
        }
    }
}

/// Payload plus optional row count for the envelope
struct Outcome {
    data: Value,
    rows: Option<usize>,
}

impl Outcome {
    fn of<T: Serialize>(data: &T) -> anyhow::Result<Self> {
        Ok(Self {
            data: serde_json::to_value(data)?,
            rows: None,
        })
    }
}

fn connect(args: &ConnectionArgs) -> Result<Connection, AdapterError> {
    let options = load_with_precedence(args.to_map())?;
    AthenaAdapter::new(&options)?.connect_aws()
}

fn run(cli: &Cli) -> anyhow::Result<Result<Outcome, AdapterError>> {
    let outcome = match &cli.command {
        Commands::Options => Ok(Outcome::of(&ADAPTER_OPTIONS)?),
        Commands::Completions => match completions::load() {
            Ok(list) => Ok(Outcome::of(&list)?),
            Err(e) => Err(e),
        },
        Commands::Catalog => match connect(&cli.connection).and_then(|conn| conn.get_catalog()) {
            Ok(tree) => Ok(Outcome::of(&tree)?),
            Err(e) => Err(e),
        },
        Commands::Columns { sql } => {
            let columns = connect(&cli.connection).and_then(|conn| match conn.execute(sql)? {
                Some(cursor) => cursor.columns(),
                None => Ok(Vec::new()),
            });
            match columns {
                Ok(columns) => Ok(Outcome::of(&columns)?),
                Err(e) => Err(e),
            }
        }
        Commands::Query { sql, limit } => {
            let result = connect(&cli.connection).and_then(|conn| match conn.execute(sql)? {
                Some(cursor) => cursor.fetch(FetchOptions { limit: *limit }).map(Some),
                None => Ok(None),
            });
            match result {
                Ok(Some(result)) => {
                    let rows = result.row_count();
                    Ok(Outcome {
                        data: serde_json::to_value(&result)?,
                        rows: Some(rows),
                    })
                }
                Ok(None) => Ok(Outcome {
                    data: json!(null),
                    rows: Some(0),
                }),
                Err(e) => Err(e),
            }
        }
    };

    Ok(outcome)
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_config = LogConfig {
        level: cli.log_level,
        file: cli.log_file.clone(),
    };
    init_logging(&log_config).context("failed to open log file")?;

    let command = cli.command.name();
    let started = Instant::now();
    let outcome = run(&cli).context("failed to render command output")?;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match outcome {
        Ok(Outcome { data, rows }) => {
            let meta = match rows {
                Some(n) => Metadata::with_rows(elapsed_ms, n),
                None => Metadata::new(elapsed_ms),
            };
            println!("{}", serde_json::to_string(&SuccessEnvelope::new(command, data, meta))?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::debug!(error = ?err, "Command failed");
            println!("{}", serde_json::to_string(&ErrorEnvelope::from_error(command, &err))?);
            Ok(ExitCode::FAILURE)
        }
    }
}
