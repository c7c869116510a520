//! Moving data between query results and arrow record batches.
//!
//! [`load_frame`] turns a [`QueryResult`] into a [`RecordBatch`];
//! [`write_frame`] writes a [`RecordBatch`] into a SQL Server table, creating
//! or replacing it as [`WriteOptions`] says.

use std::borrow::Cow;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::{
    DataType, Field, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, Schema,
    UInt16Type, UInt32Type, UInt8Type,
};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use tracing::{debug, info};

use crate::builders::{quote_ident, quote_table, Query};
use crate::error::{Result, SqlFrameError};
use crate::traits::{DatabaseDriver, Table};
use crate::transaction::run_in_transaction;
use crate::types::{QueryResult, SqlValue};

/// SQL Server accepts at most 2100 parameters per request; stay below it.
const MAX_PARAMS_PER_STATEMENT: usize = 2000;

/// SQL Server accepts at most 1000 rows in one `VALUES` list.
const MAX_ROWS_PER_STATEMENT: usize = 1000;

/// What to do when the target table already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IfExists {
    /// Fail with `TableExists`.
    #[default]
    Fail,
    /// Drop the table and create it again from the frame's schema.
    Replace,
    /// Insert into the existing table.
    Append,
}

/// Options for writing a frame to a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Schema used when the target is a plain table name.
    pub schema: Option<String>,
    pub if_exists: IfExists,
    /// Upper bound on rows per INSERT statement.
    pub chunk_size: Option<usize>,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn if_exists(mut self, if_exists: IfExists) -> Self {
        self.if_exists = if_exists;
        self
    }

    pub fn chunk_size(mut self, rows: usize) -> Self {
        self.chunk_size = Some(rows);
        self
    }
}

/// Where a frame is written: a plain table name, or a table-like value.
pub enum WriteTarget<'a> {
    Name(Cow<'a, str>),
    Table {
        table: &'a dyn Table,
        type_name: &'static str,
    },
}

impl<'a> WriteTarget<'a> {
    /// Resolves the target to `(schema, table)`.
    ///
    /// Plain names are taken verbatim with the schema from `options`.
    /// Table-like values give their own name and schema, or those of their
    /// underlying table handle.
    pub fn resolve(&self, options: &WriteOptions) -> Result<(Option<String>, String)> {
        match self {
            WriteTarget::Name(name) => Ok((options.schema.clone(), name.to_string())),
            WriteTarget::Table { table, type_name } => {
                if let Some(name) = table.table_name() {
                    return Ok((table.schema().map(str::to_string), name.to_string()));
                }
                match table.table_handle() {
                    Some(handle) => Ok((Some(handle.schema().to_string()), handle.name().to_string())),
                    None => Err(SqlFrameError::UnsupportedTarget(type_name.to_string())),
                }
            }
        }
    }
}

impl<'a> From<&'a str> for WriteTarget<'a> {
    fn from(name: &'a str) -> Self {
        WriteTarget::Name(Cow::Borrowed(name))
    }
}

impl From<String> for WriteTarget<'static> {
    fn from(name: String) -> Self {
        WriteTarget::Name(Cow::Owned(name))
    }
}

impl<'a, T: Table> From<&'a T> for WriteTarget<'a> {
    fn from(table: &'a T) -> Self {
        WriteTarget::Table {
            table,
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// Value kinds seen in one result column, used to pick its arrow type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Unknown,
    Bool,
    Int32,
    Int64,
    Float64,
    Text,
}

impl ColumnKind {
    fn of(value: &SqlValue) -> Self {
        match value {
            SqlValue::Null => ColumnKind::Unknown,
            SqlValue::Bool(_) => ColumnKind::Bool,
            SqlValue::Int32(_) => ColumnKind::Int32,
            SqlValue::Int64(_) => ColumnKind::Int64,
            SqlValue::Float64(_) => ColumnKind::Float64,
            SqlValue::Text(_) => ColumnKind::Text,
        }
    }

    fn merge(self, other: ColumnKind) -> Self {
        use ColumnKind::*;
        match (self, other) {
            (Unknown, k) | (k, Unknown) => k,
            (a, b) if a == b => a,
            (Int32, Int64) | (Int64, Int32) => Int64,
            (Int32 | Int64, Float64) | (Float64, Int32 | Int64) => Float64,
            _ => Text,
        }
    }

    fn data_type(self) -> DataType {
        match self {
            ColumnKind::Bool => DataType::Boolean,
            ColumnKind::Int32 => DataType::Int32,
            ColumnKind::Int64 => DataType::Int64,
            ColumnKind::Float64 => DataType::Float64,
            ColumnKind::Unknown | ColumnKind::Text => DataType::Utf8,
        }
    }
}

/// Loads a query result into a record batch, one nullable column per result column.
pub fn load_frame(result: &QueryResult) -> Result<RecordBatch> {
    let rows = result.values();
    let mut fields = Vec::with_capacity(result.columns().len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(result.columns().len());

    for (i, name) in result.columns().iter().enumerate() {
        let cells: Vec<&SqlValue> = rows
            .iter()
            .map(|row| row.get(i).unwrap_or(&SqlValue::Null))
            .collect();
        let kind = cells
            .iter()
            .fold(ColumnKind::Unknown, |kind, v| kind.merge(ColumnKind::of(v)));

        let array: ArrayRef = match kind {
            ColumnKind::Bool => Arc::new(BooleanArray::from(
                cells
                    .iter()
                    .map(|v| match v {
                        SqlValue::Bool(b) => Some(*b),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            )),
            ColumnKind::Int32 => Arc::new(Int32Array::from(
                cells
                    .iter()
                    .map(|v| match v {
                        SqlValue::Int32(i) => Some(*i),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            )),
            ColumnKind::Int64 => Arc::new(Int64Array::from(
                cells
                    .iter()
                    .map(|v| match v {
                        SqlValue::Int32(i) => Some(i64::from(*i)),
                        SqlValue::Int64(i) => Some(*i),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            )),
            ColumnKind::Float64 => Arc::new(Float64Array::from(
                cells
                    .iter()
                    .map(|v| match v {
                        SqlValue::Int32(i) => Some(f64::from(*i)),
                        SqlValue::Int64(i) => Some(*i as f64),
                        SqlValue::Float64(f) => Some(*f),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            )),
            ColumnKind::Unknown | ColumnKind::Text => Arc::new(StringArray::from(
                cells
                    .iter()
                    .map(|v| (!v.is_null()).then(|| v.to_string()))
                    .collect::<Vec<_>>(),
            )),
        };

        fields.push(Field::new(name, kind.data_type(), true));
        arrays.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
    let batch = RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;
    Ok(batch)
}

/// Reads a record batch back into rows of values, row-major.
pub fn frame_rows(batch: &RecordBatch) -> Result<Vec<Vec<SqlValue>>> {
    let schema = batch.schema();
    let mut rows = vec![Vec::with_capacity(batch.num_columns()); batch.num_rows()];

    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        let values = column_values(field.name(), column.as_ref())?;
        for (row, value) in rows.iter_mut().zip(values) {
            row.push(value);
        }
    }
    Ok(rows)
}

fn column_values(name: &str, array: &dyn Array) -> Result<Vec<SqlValue>> {
    fn collect<T>(
        array: &dyn Array,
        len: usize,
        get: impl Fn(usize) -> T,
    ) -> Vec<SqlValue>
    where
        T: Into<SqlValue>,
    {
        (0..len)
            .map(|i| {
                if array.is_null(i) {
                    SqlValue::Null
                } else {
                    get(i).into()
                }
            })
            .collect()
    }

    let len = array.len();
    let values = match array.data_type() {
        DataType::Null => vec![SqlValue::Null; len],
        DataType::Boolean => {
            let a = array.as_boolean();
            collect(array, len, |i| a.value(i))
        }
        DataType::Int8 => {
            let a = array.as_primitive::<Int8Type>();
            collect(array, len, |i| i32::from(a.value(i)))
        }
        DataType::Int16 => {
            let a = array.as_primitive::<Int16Type>();
            collect(array, len, |i| i32::from(a.value(i)))
        }
        DataType::Int32 => {
            let a = array.as_primitive::<Int32Type>();
            collect(array, len, |i| a.value(i))
        }
        DataType::Int64 => {
            let a = array.as_primitive::<Int64Type>();
            collect(array, len, |i| a.value(i))
        }
        DataType::UInt8 => {
            let a = array.as_primitive::<UInt8Type>();
            collect(array, len, |i| i32::from(a.value(i)))
        }
        DataType::UInt16 => {
            let a = array.as_primitive::<UInt16Type>();
            collect(array, len, |i| i32::from(a.value(i)))
        }
        DataType::UInt32 => {
            let a = array.as_primitive::<UInt32Type>();
            collect(array, len, |i| i64::from(a.value(i)))
        }
        DataType::Float32 => {
            let a = array.as_primitive::<Float32Type>();
            collect(array, len, |i| f64::from(a.value(i)))
        }
        DataType::Float64 => {
            let a = array.as_primitive::<Float64Type>();
            collect(array, len, |i| a.value(i))
        }
        DataType::Utf8 => {
            let a = array.as_string::<i32>();
            collect(array, len, |i| a.value(i).to_string())
        }
        DataType::LargeUtf8 => {
            let a = array.as_string::<i64>();
            collect(array, len, |i| a.value(i).to_string())
        }
        other => {
            return Err(SqlFrameError::UnsupportedColumnType {
                column: name.to_string(),
                data_type: other.to_string(),
            })
        }
    };
    Ok(values)
}

/// T-SQL column type for an arrow type.
fn sql_type(field: &Field) -> Result<&'static str> {
    let sql_type = match field.data_type() {
        DataType::Boolean => "BIT",
        DataType::Int8 | DataType::Int16 | DataType::UInt8 => "SMALLINT",
        DataType::Int32 | DataType::UInt16 => "INT",
        DataType::Int64 | DataType::UInt32 => "BIGINT",
        DataType::Float32 | DataType::Float64 => "FLOAT",
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Null => "NVARCHAR(MAX)",
        other => {
            return Err(SqlFrameError::UnsupportedColumnType {
                column: field.name().to_string(),
                data_type: other.to_string(),
            })
        }
    };
    Ok(sql_type)
}

/// `CREATE TABLE` statement matching the batch's schema.
pub fn create_table_sql(batch: &RecordBatch, target: &str) -> Result<String> {
    if batch.num_columns() == 0 {
        return Err(SqlFrameError::NoColumns(target.to_string()));
    }
    let columns = batch
        .schema()
        .fields()
        .iter()
        .map(|field| {
            let nullability = if field.is_nullable() { "NULL" } else { "NOT NULL" };
            Ok(format!(
                "{} {} {}",
                quote_ident(field.name()),
                sql_type(field)?,
                nullability
            ))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("CREATE TABLE {} ({})", target, columns.join(", ")))
}

/// Multi-row INSERT statements for `rows`, at most `rows_per_statement` rows each.
pub fn insert_statements(
    target: &str,
    columns: &[String],
    rows: Vec<Vec<SqlValue>>,
    rows_per_statement: usize,
) -> Vec<Query> {
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    rows.chunks(rows_per_statement.max(1))
        .map(|chunk| {
            let mut params = Vec::with_capacity(chunk.len() * columns.len());
            let tuples: Vec<String> = chunk
                .iter()
                .map(|row| {
                    let placeholders: Vec<String> = row
                        .iter()
                        .map(|value| {
                            params.push(value.clone());
                            format!("@P{}", params.len())
                        })
                        .collect();
                    format!("({})", placeholders.join(", "))
                })
                .collect();
            Query {
                sql: format!(
                    "INSERT INTO {} ({}) VALUES {}",
                    target,
                    column_list,
                    tuples.join(", ")
                ),
                params,
            }
        })
        .collect()
}

/// Rows per INSERT: bounded by the parameter and row limits, by the caller's
/// chunk size, and 1 when multi-row statements are disabled.
fn rows_per_statement(num_columns: usize, options: &WriteOptions, fast_executemany: bool) -> usize {
    if !fast_executemany {
        return 1;
    }
    let by_params = (MAX_PARAMS_PER_STATEMENT / num_columns.max(1)).max(1);
    let limit = by_params.min(MAX_ROWS_PER_STATEMENT);
    match options.chunk_size {
        Some(chunk) => chunk.clamp(1, limit),
        None => limit,
    }
}

async fn table_exists(driver: &dyn DatabaseDriver, target: &str) -> Result<bool> {
    let raw = driver
        .execute(
            "SELECT CASE WHEN OBJECT_ID(@P1, N'U') IS NULL THEN 0 ELSE 1 END AS table_exists",
            &[SqlValue::from(target)],
        )
        .await?;
    Ok(raw
        .rows
        .first()
        .and_then(|row| row.first())
        .is_some_and(SqlValue::as_flag))
}

/// Writes `batch` into `[schema].[table]`; returns the number of rows written.
///
/// Table creation and inserts run in one transaction.
pub async fn write_frame(
    driver: &dyn DatabaseDriver,
    batch: &RecordBatch,
    schema: Option<&str>,
    table: &str,
    options: &WriteOptions,
    fast_executemany: bool,
) -> Result<u64> {
    let target = quote_table(schema, table);
    if batch.num_columns() == 0 {
        return Err(SqlFrameError::NoColumns(target));
    }
    let exists = table_exists(driver, &target).await?;
    debug!(target = %target, exists, if_exists = ?options.if_exists, "Writing frame");

    let mut statements = Vec::new();
    match (exists, options.if_exists) {
        (true, IfExists::Fail) => return Err(SqlFrameError::TableExists(target)),
        (true, IfExists::Append) => {}
        (true, IfExists::Replace) => {
            statements.push(Query::raw(format!("DROP TABLE {}", target)));
            statements.push(Query::raw(create_table_sql(batch, &target)?));
        }
        (false, _) => statements.push(Query::raw(create_table_sql(batch, &target)?)),
    }

    let columns: Vec<String> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    let rows = frame_rows(batch)?;
    let written = rows.len() as u64;
    let per_statement = rows_per_statement(columns.len(), options, fast_executemany);
    if !rows.is_empty() {
        statements.extend(insert_statements(&target, &columns, rows, per_statement));
    }

    run_in_transaction(driver, &statements).await?;
    info!(target = %target, rows = written, "Wrote frame");
    Ok(written)
}
