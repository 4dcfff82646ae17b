//! Configuration Management
//!
//! This module turns the host's option map into the immutable [`AdapterOptions`]
//! value, declares the options a host should render as flags, and loads option
//! files.
//!
//! # Option Files
//! - Local: `.athena-adapter.json` in the working directory (per-project)
//! - Global: `~/.config/athena-adapter/options.json` (per-user)
//!
//! # Resolution Precedence
//! 1. Explicit options (CLI flags / host-provided map) (highest priority)
//! 2. Local option file
//! 3. Global option file
//! 4. Built-in defaults
//!
//! The discovery-mode and unload flags are adapter concerns: they are kept on
//! [`AdapterOptions`] but stripped from the [`ClientParams`] forwarded to the
//! backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AdapterError, Result};

/// Catalog discovery strategy selected by `use_glue_catalog`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// Glue control-plane metadata service
    ControlPlane,
    /// SQL queries against `information_schema`
    InformationSchema,
}

impl DiscoveryMode {
    /// Map the `use_glue_catalog` flag to a mode
    #[must_use]
    pub const fn from_glue_flag(use_glue_catalog: bool) -> Self {
        if use_glue_catalog {
            Self::ControlPlane
        } else {
            Self::InformationSchema
        }
    }
}

/// Query result reuse settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultReuse {
    /// Whether Athena may answer from a cached result of the same query
    pub enabled: bool,
    /// Maximum age of a reusable result, in minutes
    pub max_age_minutes: u32,
}

/// AWS credential triple
///
/// WARNING: Sensitive data, do not log or include in error messages.
/// The `Debug` implementation redacts the secret and the session token.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Parameters forwarded to the backend client library
///
/// This is the option set with the adapter-level flags (discovery mode,
/// unload) removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientParams {
    pub work_group: Option<String>,
    pub s3_staging_dir: Option<String>,
    pub result_reuse: ResultReuse,
    pub region_name: Option<String>,
    /// Explicit credentials; `None` means the default AWS provider chain
    pub credentials: Option<Credentials>,
}

/// Validated, immutable adapter options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterOptions {
    pub work_group: Option<String>,
    pub s3_staging_dir: Option<String>,
    pub result_reuse: ResultReuse,
    pub discovery: DiscoveryMode,
    pub unload: bool,
    pub region_name: Option<String>,
    pub credentials: Option<Credentials>,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            work_group: None,
            s3_staging_dir: None,
            result_reuse: ResultReuse {
                enabled: true,
                max_age_minutes: DEFAULT_RESULT_REUSE_MINUTES,
            },
            discovery: DiscoveryMode::ControlPlane,
            unload: false,
            region_name: None,
            credentials: None,
        }
    }
}

/// Default result reuse TTL in minutes
pub const DEFAULT_RESULT_REUSE_MINUTES: u32 = 60;

/// Longest result reuse TTL Athena accepts (seven days)
pub const MAX_RESULT_REUSE_MINUTES: u32 = 10_080;

/// Integer-or-string option value (`result_reuse_minutes` arrives either way)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Str(String),
}

/// Raw option map as received from the host, before validation
///
/// Unknown keys are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawOptions {
    work_group: Option<String>,
    s3_staging_dir: Option<String>,
    result_reuse_enable: bool,
    result_reuse_minutes: Option<IntOrString>,
    use_glue_catalog: bool,
    unload: bool,
    region_name: Option<String>,
    aws_access_key_id: Option<String>,
    aws_secret_access_key: Option<String>,
    aws_session_token: Option<String>,
}

impl Default for RawOptions {
    fn default() -> Self {
        Self {
            work_group: None,
            s3_staging_dir: None,
            result_reuse_enable: true,
            result_reuse_minutes: None,
            use_glue_catalog: true,
            unload: false,
            region_name: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_session_token: None,
        }
    }
}

impl AdapterOptions {
    /// Build options from a host option map
    ///
    /// Applies defaults for missing keys, ignores unknown keys and validates
    /// every recognized value.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        // Hosts commonly pass null for "not set"; treat it as absent so defaults apply
        let cleaned: Map<String, Value> =
            map.iter().filter(|(_, v)| !v.is_null()).map(|(k, v)| (k.clone(), v.clone())).collect();

        let raw: RawOptions = serde_json::from_value(Value::Object(cleaned))
            .map_err(|e| AdapterError::invalid_option(e.to_string()))?;

        let max_age_minutes = match raw.result_reuse_minutes {
            None => DEFAULT_RESULT_REUSE_MINUTES,
            Some(IntOrString::Int(n)) => checked_minutes(n)?,
            Some(IntOrString::Str(s)) => parse_minutes(&s)?,
        };

        let credentials = match (raw.aws_access_key_id, raw.aws_secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Some(Credentials {
                access_key_id,
                secret_access_key,
                session_token: raw.aws_session_token,
            }),
            (None, None) => {
                if raw.aws_session_token.is_some() {
                    return Err(AdapterError::invalid_option(
                        "aws_session_token requires aws_access_key_id and aws_secret_access_key",
                    ));
                }
                None
            }
            (Some(_), None) => {
                return Err(AdapterError::invalid_option(
                    "aws_access_key_id was given without aws_secret_access_key",
                ))
            }
            (None, Some(_)) => {
                return Err(AdapterError::invalid_option(
                    "aws_secret_access_key was given without aws_access_key_id",
                ))
            }
        };

        Ok(Self {
            work_group: raw.work_group,
            s3_staging_dir: raw.s3_staging_dir,
            result_reuse: ResultReuse {
                enabled: raw.result_reuse_enable,
                max_age_minutes,
            },
            discovery: DiscoveryMode::from_glue_flag(raw.use_glue_catalog),
            unload: raw.unload,
            region_name: raw.region_name,
            credentials,
        })
    }

    /// Parameters forwarded to the backend (adapter-level flags stripped)
    #[must_use]
    pub fn client_params(&self) -> ClientParams {
        ClientParams {
            work_group: self.work_group.clone(),
            s3_staging_dir: self.s3_staging_dir.clone(),
            result_reuse: self.result_reuse,
            region_name: self.region_name.clone(),
            credentials: self.credentials.clone(),
        }
    }
}

/// Parse a string-encoded minute count
fn parse_minutes(s: &str) -> Result<u32> {
    let n = s
        .trim()
        .parse::<i64>()
        .map_err(|_| AdapterError::invalid_option(format!("Cannot convert {s} to an int!")))?;
    checked_minutes(n)
}

/// Bound a minute count to what Athena accepts for result reuse
fn checked_minutes(n: i64) -> Result<u32> {
    u32::try_from(n)
        .ok()
        .filter(|minutes| *minutes <= MAX_RESULT_REUSE_MINUTES)
        .ok_or_else(|| {
            AdapterError::invalid_option(format!(
                "result_reuse_minutes must be between 0 and {MAX_RESULT_REUSE_MINUTES}, got {n}"
            ))
        })
}

// ============================================================================
// Option Declarations
// ============================================================================

/// Kind of an adapter option, as a host should render it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptionKind {
    /// Boolean flag with a default
    Flag { default: bool },
    /// Free-text option with an optional default
    Text { default: Option<&'static str> },
}

/// Validator for a text option: `Ok(())` or a message to show the user
pub type OptionValidator = fn(&str) -> std::result::Result<(), String>;

/// Declaration of one adapter option
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OptionSpec {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(flatten)]
    pub kind: OptionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<&'static str>,
    #[serde(skip)]
    pub validator: Option<OptionValidator>,
}

impl OptionSpec {
    /// Run the option's validator, if any
    pub fn validate(&self, value: &str) -> std::result::Result<(), String> {
        match self.validator {
            Some(validate) => validate(value),
            None => Ok(()),
        }
    }
}

/// Check that a text option holds an integer
pub fn validate_int(value: &str) -> std::result::Result<(), String> {
    value
        .trim()
        .parse::<i64>()
        .map(|_| ())
        .map_err(|_| format!("Cannot convert {value} to an int!"))
}

/// Options the adapter recognizes, in the order a host should list them
pub const ADAPTER_OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        name: "work_group",
        description: "Athena workgroup to run queries on.",
        kind: OptionKind::Text { default: None },
        short: Some("-w"),
        validator: None,
    },
    OptionSpec {
        name: "s3_staging_dir",
        description: "S3 location where Athena writes query results.",
        kind: OptionKind::Text { default: None },
        short: None,
        validator: None,
    },
    OptionSpec {
        name: "result_reuse_enable",
        description: "Reuse cached results of an identical query (see result_reuse_minutes). Enabled by default.",
        kind: OptionKind::Flag { default: true },
        short: None,
        validator: None,
    },
    OptionSpec {
        name: "result_reuse_minutes",
        description: "How long results of a query may be reused, in minutes. Default is 60 minutes.",
        kind: OptionKind::Text {
            default: Some("60"),
        },
        short: None,
        validator: Some(validate_int),
    },
    OptionSpec {
        name: "use_glue_catalog",
        description: "Browse the catalog through the Glue API instead of information_schema queries.",
        kind: OptionKind::Flag { default: true },
        short: None,
        validator: None,
    },
    OptionSpec {
        name: "unload",
        description: "Accepted for compatibility. Complete SELECT results are always downloaded from S3 in one transfer.",
        kind: OptionKind::Flag { default: false },
        short: None,
        validator: None,
    },
    OptionSpec {
        name: "region_name",
        description: "AWS region of the Athena workgroup.",
        kind: OptionKind::Text { default: None },
        short: None,
        validator: None,
    },
    OptionSpec {
        name: "aws_access_key_id",
        description: "AWS access key id.",
        kind: OptionKind::Text { default: None },
        short: None,
        validator: None,
    },
    OptionSpec {
        name: "aws_secret_access_key",
        description: "AWS secret access key.",
        kind: OptionKind::Text { default: None },
        short: None,
        validator: None,
    },
    OptionSpec {
        name: "aws_session_token",
        description: "AWS session token for temporary credentials.",
        kind: OptionKind::Text { default: None },
        short: None,
        validator: None,
    },
];

/// Look up an option declaration by name
#[must_use]
pub fn option_spec(name: &str) -> Option<&'static OptionSpec> {
    ADAPTER_OPTIONS.iter().find(|spec| spec.name == name)
}

// ============================================================================
// Option Files
// ============================================================================

/// Get path to local option file (`.athena-adapter.json`)
pub fn local_options_path() -> Result<PathBuf> {
    let current_dir = std::env::current_dir().map_err(|e| {
        AdapterError::invalid_option(format!("Could not determine current directory: {e}"))
    })?;

    Ok(current_dir.join(".athena-adapter.json"))
}

/// Get path to global option file (`~/.config/athena-adapter/options.json`)
pub fn global_options_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AdapterError::invalid_option("Could not determine user config directory"))?;

    Ok(config_dir.join("athena-adapter").join("options.json"))
}

/// Load an option file
///
/// A missing file yields an empty map; the file must otherwise hold a JSON object.
pub fn load_option_file(path: &Path) -> Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        AdapterError::invalid_option(format!("Could not read option file {}: {e}", path.display()))
    })?;

    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AdapterError::invalid_option(format!(
            "Option file {} must contain a JSON object",
            path.display()
        ))),
        Err(e) => Err(AdapterError::invalid_option(format!(
            "Invalid option file {}: {e}",
            path.display()
        ))),
    }
}

/// Merge option maps; later maps override earlier ones key by key
#[must_use]
pub fn merge_option_maps(layers: &[Map<String, Value>]) -> Map<String, Value> {
    let mut merged = Map::new();
    for layer in layers {
        for (key, value) in layer {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Load global then local option files and overlay `explicit` on top
pub fn load_with_precedence(explicit: Map<String, Value>) -> Result<Map<String, Value>> {
    let global = load_option_file(&global_options_path()?)?;
    let local = load_option_file(&local_options_path()?)?;

    Ok(merge_option_maps(&[global, local, explicit]))
}
