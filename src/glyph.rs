//! Column type glyphs
//!
//! Maps an Athena / Glue column type name to the short glyph a workbench shows
//! next to column names, e.g. `decimal(10,2)` -> `#.#`.

/// Glyph returned for any type name not in the table
pub const UNKNOWN_GLYPH: &str = "?";

/// Normalize a raw backend type name to its display glyph.
///
/// Parameters are dropped (everything from the first `(` or `<`), as is any
/// trailing qualifier after the first space (`timestamp with time zone`).
/// Matching is case-insensitive. Never fails: unknown input yields `?`.
#[must_use]
pub fn normalize(raw_type: &str) -> &'static str {
    let base = raw_type.split(['(', '<']).next().unwrap_or(raw_type);
    let base = base.split(' ').next().unwrap_or(base);

    match base.to_ascii_lowercase().as_str() {
        "array" => "[]",
        "bigint" => "##",
        "boolean" => "t/f",
        "char" => "s",
        "date" => "d",
        "decimal" | "double" | "real" => "#.#",
        "ipaddress" => "ip",
        "integer" | "smallint" | "tinyint" => "#",
        "interval" => "|-|",
        "json" | "row" | "struct" => "{}",
        "time" => "t",
        "timestamp" => "ts",
        "uuid" => "uid",
        "varchar" | "string" => "t",
        _ => UNKNOWN_GLYPH,
    }
}
