//! Live Athena tests
//!
//! Run with `cargo test --test live_athena -- --ignored` and these set:
//! - `AWS_ATHENA_WORKGROUP`
//! - `AWS_ATHENA_S3_STAGING_DIR`
//! - `AWS_DEFAULT_REGION`
//!
//! plus credentials the default AWS provider chain can find.

#![cfg(feature = "aws")]

use serde_json::{json, Map, Value};

use athena_adapter::{AdapterError, AthenaAdapter, Connection, FetchOptions};

fn live_options() -> Map<String, Value> {
    let mut map = Map::new();
    for (key, var) in [
        ("work_group", "AWS_ATHENA_WORKGROUP"),
        ("s3_staging_dir", "AWS_ATHENA_S3_STAGING_DIR"),
        ("region_name", "AWS_DEFAULT_REGION"),
    ] {
        if let Ok(value) = std::env::var(var) {
            map.insert(key.to_string(), Value::String(value));
        }
    }
    map
}

fn connect() -> Connection {
    AthenaAdapter::new(&live_options()).unwrap().connect_aws().unwrap()
}

#[test]
#[ignore = "Requires AWS Athena access"]
fn test_live_connect() {
    let conn = connect();
    assert!(conn.get_completions().unwrap().len() > 1);
}

#[test]
#[ignore = "Requires AWS Athena access"]
fn test_live_bad_credentials() {
    let mut options = live_options();
    options.insert("aws_access_key_id".to_string(), json!("AKIAINVALIDINVALID00"));
    options.insert("aws_secret_access_key".to_string(), json!("not-a-real-secret"));
    options.insert("work_group".to_string(), json!("primary"));

    let err = AthenaAdapter::new(&options)
        .unwrap()
        .connect_aws()
        .unwrap_err();
    assert!(matches!(err, AdapterError::ConnectionFailure { .. }));
}

#[test]
#[ignore = "Requires AWS Athena access"]
fn test_live_duplicate_columns() {
    let conn = connect();

    let result = conn
        .execute("select 1 as a, 2 as a, 3 as a")
        .unwrap()
        .unwrap()
        .fetchall()
        .unwrap();
    assert_eq!(result.column_count(), 3);
    assert_eq!(result.row_count(), 1);

    let limited = conn
        .execute("select 1 as a, 2 as a, 3 as a")
        .unwrap()
        .unwrap()
        .fetch(FetchOptions::limited(5))
        .unwrap();
    assert_eq!(limited.column_count(), 1);
    assert_eq!(limited.row_count(), 1);
}

#[test]
#[ignore = "Requires AWS Athena access"]
fn test_live_limit() {
    let conn = connect();
    let result = conn
        .execute("select 1 union all select 2 union all select 3")
        .unwrap()
        .unwrap()
        .fetch(FetchOptions::limited(2))
        .unwrap();
    assert_eq!(result.row_count(), 2);
}

#[test]
#[ignore = "Requires AWS Athena access"]
fn test_live_columns() {
    let conn = connect();
    let cursor = conn.execute("select 1 as a").unwrap().unwrap();
    assert_eq!(cursor.columns().unwrap(), vec![("a".to_string(), "#")]);
}

#[test]
#[ignore = "Requires AWS Athena access"]
fn test_live_bad_query() {
    let conn = connect();
    let err = conn.execute("selec;").unwrap_err();
    assert!(matches!(err, AdapterError::QueryExecution { .. }));
}

#[test]
#[ignore = "Requires AWS Athena access"]
fn test_live_catalog() {
    let conn = connect();
    let tree = conn.get_catalog().unwrap();
    assert_eq!(tree.label(), "awsdatacatalog");
}
