use std::collections::HashMap;

use crate::error::{Result, SqlFrameError};
use crate::types::SqlValue;

/// Driver-agnostic raw result from a database query.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQueryResult {
    /// Column names in order
    pub columns: Vec<String>,
    /// Rows, where each row is a vector of values in column order
    pub rows: Vec<Vec<SqlValue>>,
}

impl RawQueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }
}

/// A single row result from a query.
/// Values are accessed by column name.
#[derive(Debug, Clone)]
pub struct Row {
    values: HashMap<String, SqlValue>,
}

impl Row {
    /// Creates a new Row from column names and values.
    pub(crate) fn new(columns: &[String], values: Vec<SqlValue>) -> Self {
        let values = columns
            .iter()
            .zip(values)
            .map(|(col, val)| (col.clone(), val))
            .collect();
        Self { values }
    }

    /// Gets a value by column name.
    pub fn get(&self, column: &str) -> Result<&SqlValue> {
        self.values
            .get(column)
            .ok_or_else(|| SqlFrameError::ColumnNotFound(column.to_string()))
    }

    /// Returns all column names in this row.
    pub fn columns(&self) -> Vec<&str> {
        self.values.keys().map(|s| s.as_str()).collect()
    }

    /// Returns the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Result of a query execution, containing zero or more rows.
///
/// Keeps the values in column order as well, which is what the frame loader
/// reads from.
#[derive(Debug, Clone)]
pub struct QueryResult {
    raw: RawQueryResult,
}

impl QueryResult {
    /// Creates a QueryResult from a RawQueryResult.
    pub fn from_raw(raw: RawQueryResult) -> Self {
        Self { raw }
    }

    /// Extracts a single row from the result.
    /// Returns an error if the result contains zero or more than one row.
    pub fn single_row(self) -> Result<Row> {
        if self.raw.rows.len() != 1 {
            return Err(SqlFrameError::UnexpectedRowCount {
                expected: 1,
                actual: self.raw.rows.len(),
            });
        }
        Ok(self.rows().remove(0))
    }

    /// Returns all rows from the result.
    pub fn rows(self) -> Vec<Row> {
        let columns = self.raw.columns;
        self.raw
            .rows
            .into_iter()
            .map(|values| Row::new(&columns, values))
            .collect()
    }

    /// Returns the values of every row in column order.
    pub fn values(&self) -> &[Vec<SqlValue>] {
        &self.raw.rows
    }

    /// Returns the column names from this result.
    pub fn columns(&self) -> &[String] {
        &self.raw.columns
    }

    /// Returns the number of rows in this result.
    pub fn len(&self) -> usize {
        self.raw.rows.len()
    }

    /// Returns true if this result contains no rows.
    pub fn is_empty(&self) -> bool {
        self.raw.rows.is_empty()
    }
}
