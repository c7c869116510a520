//! Flat names for (schema, table) pairs.
//!
//! A reflected table is registered under `__<schema>__<table>`. Names are not
//! escaped: a schema or table name containing `__` does not round-trip.

use crate::error::{Result, SqlFrameError};
use crate::types::TableHandle;

pub const DELIMITER: &str = "__";

/// Joins a schema and table into `__<schema>__<table>`.
pub fn encode(schema: &str, table: &str) -> String {
    format!("{DELIMITER}{schema}{DELIMITER}{table}")
}

/// Splits `__<schema>__<table>` back into its parts.
pub fn decode(name: &str) -> Result<(String, String)> {
    let segments: Vec<&str> = name.split(DELIMITER).collect();
    match segments.as_slice() {
        ["", schema, table] => Ok((schema.to_string(), table.to_string())),
        _ => Err(SqlFrameError::MalformedName {
            name: name.to_string(),
            segments: segments.len(),
        }),
    }
}

/// Naming strategy used by reflection.
pub fn schema_qualified_name(table: &TableHandle) -> String {
    encode(table.schema(), table.name())
}
