use thiserror::Error;

/// Error type for sqlframe operations
#[derive(Debug, Error)]
pub enum SqlFrameError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Malformed qualified name '{name}': expected __<schema>__<table>, got {segments} segment(s)")]
    MalformedName { name: String, segments: usize },

    #[error("No schema named {0}")]
    UnknownSchema(String),

    #[error("No table named {table} in schema {schema}")]
    UnknownTable { schema: String, table: String },

    #[error("Table target of type {0} is not supported")]
    UnsupportedTarget(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Expected {expected} row(s), got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },

    #[error("Table {0} already exists")]
    TableExists(String),

    #[error("Frame written to {0} has no columns")]
    NoColumns(String),

    #[error("Column {column} has unsupported type {data_type}")]
    UnsupportedColumnType { column: String, data_type: String },

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Result type alias for sqlframe operations
pub type Result<T> = std::result::Result<T, SqlFrameError>;
