//! Static completion list
//!
//! Athena SQL keywords and functions, bundled with the crate as JSON and
//! parsed on every request.

use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, Result};

const COMPLETIONS_JSON: &str = include_str!("../../resources/completions.json");

/// Type label of keyword completions
pub const KEYWORD_TYPE_LABEL: &str = "kw";

/// Type label of function completions
pub const FUNCTION_TYPE_LABEL: &str = "fn";

/// Keywords rank ahead of functions (lower priority sorts first)
const KEYWORD_PRIORITY: u32 = 100;
const FUNCTION_PRIORITY: u32 = 1000;

/// One autocompletion candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    /// Text shown in the completion menu
    pub label: String,
    pub type_label: &'static str,
    /// Text inserted into the editor
    pub value: String,
    pub priority: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResource {
    keywords: Vec<String>,
    functions: Vec<String>,
}

/// Parse the bundled completion list: keywords first, then functions
pub fn load() -> Result<Vec<Completion>> {
    let resource: CompletionResource = serde_json::from_str(COMPLETIONS_JSON)
        .map_err(|e| AdapterError::resource(format!("Invalid completion list: {e}")))?;

    let keywords = resource.keywords.into_iter().map(|kw| Completion {
        label: kw.to_lowercase(),
        type_label: KEYWORD_TYPE_LABEL,
        value: kw,
        priority: KEYWORD_PRIORITY,
    });

    let functions = resource.functions.into_iter().map(|func| Completion {
        label: func.clone(),
        type_label: FUNCTION_TYPE_LABEL,
        value: func,
        priority: FUNCTION_PRIORITY,
    });

    Ok(keywords.chain(functions).collect())
}
