use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use crate::builders::{quote_ident, quote_table, IntoQuery, Query};
use crate::drivers::MssqlDriver;
use crate::error::{Result, SqlFrameError};
use crate::frame::{self, WriteOptions, WriteTarget};
use crate::naming;
use crate::params::ConnectionParams;
use crate::reflect;
use crate::registry::SchemaCollection;
use crate::traits::DatabaseDriver;
use crate::transaction::{run_in_transaction, ROLLBACK_IF_OPEN};
use crate::types::{InsertRows, QueryResult, Record, TableHandle};

/// Main entry point for sqlframe.
///
/// Owns one driver session and the registry of reflected tables. Every method
/// blocks until the driver is done; the handle runs its own single-threaded
/// runtime and must not be used from inside another tokio runtime.
pub struct Database {
    // Must drop before `runtime`.
    driver: Arc<dyn DatabaseDriver>,
    runtime: Runtime,
    params: Option<ConnectionParams>,
    fast_executemany: bool,
    declared: Vec<TableHandle>,
    tables: SchemaCollection,
    pending: Vec<Record>,
}

impl Database {
    /// Connect to SQL Server with the given parameters.
    ///
    /// # Example
    /// ```ignore
    /// let params = ConnectionParams::new("db.example.com", "Sales", Credentials::new("alice", "secret"));
    /// let mut db = Database::connect(params)?;
    /// let users = db.reflect()?.table("dbo", "users")?.clone();
    /// ```
    pub fn connect(params: ConnectionParams) -> Result<Self> {
        let runtime = build_runtime()?;
        info!(server = %params.server, database = %params.database, "Connecting");
        let driver = runtime.block_on(MssqlDriver::connect(&params.connection_string()))?;
        let fast_executemany = params.fast_executemany;
        Ok(Self::from_parts(
            runtime,
            Arc::new(driver),
            Some(params),
            fast_executemany,
        ))
    }

    /// Create a handle over a custom driver.
    /// Useful for testing or using alternative database drivers.
    pub fn with_driver(driver: Arc<dyn DatabaseDriver>) -> Result<Self> {
        Ok(Self::from_parts(build_runtime()?, driver, None, true))
    }

    fn from_parts(
        runtime: Runtime,
        driver: Arc<dyn DatabaseDriver>,
        params: Option<ConnectionParams>,
        fast_executemany: bool,
    ) -> Self {
        Self {
            driver,
            runtime,
            params,
            fast_executemany,
            declared: Vec::new(),
            tables: SchemaCollection::new(),
            pending: Vec::new(),
        }
    }

    /// Parameters this handle was connected with, if any.
    pub fn params(&self) -> Option<&ConnectionParams> {
        self.params.as_ref()
    }

    /// Connection string this handle was connected with, if any.
    pub fn connection_string(&self) -> Option<String> {
        self.params.as_ref().map(ConnectionParams::connection_string)
    }

    /// Reflect every table of the database and replace the registry.
    ///
    /// Tables declared with [`Database::declare_table`] take the place of the
    /// catalog entry with the same schema and name.
    pub fn reflect(&mut self) -> Result<&SchemaCollection> {
        let defs = self
            .runtime
            .block_on(reflect::reflect_tables(self.driver.as_ref()))?;
        let mut handles: Vec<TableHandle> = defs.into_iter().map(TableHandle::new).collect();

        for declared in &self.declared {
            match handles
                .iter_mut()
                .find(|h| h.schema() == declared.schema() && h.name() == declared.name())
            {
                Some(slot) => *slot = declared.clone(),
                None => handles.push(declared.clone()),
            }
        }

        self.tables = SchemaCollection::from_handles(handles, naming::schema_qualified_name)?;
        info!(
            schemas = self.tables.len(),
            tables = self.tables.table_count(),
            "Reflected database"
        );
        Ok(&self.tables)
    }

    /// The registry built by the last [`Database::reflect`]; empty before that.
    pub fn tables(&self) -> &SchemaCollection {
        &self.tables
    }

    /// Short alias for [`Database::tables`].
    pub fn t(&self) -> &SchemaCollection {
        &self.tables
    }

    /// Reflect one table now, marking `primary_key_columns` as its primary key.
    ///
    /// The declaration is remembered and applied on every later reflect until
    /// [`Database::reset_metadata`].
    pub fn declare_table(
        &mut self,
        schema: &str,
        name: &str,
        primary_key_columns: &[&str],
    ) -> Result<TableHandle> {
        let mut def = self
            .runtime
            .block_on(reflect::reflect_table(self.driver.as_ref(), schema, name))?;

        for key in primary_key_columns {
            let column = def
                .columns
                .iter_mut()
                .find(|c| c.name == *key)
                .ok_or_else(|| {
                    SqlFrameError::ColumnNotFound(format!("{}.{}.{}", schema, name, key))
                })?;
            column.primary_key = true;
        }

        let handle = TableHandle::new(def);
        self.declared
            .retain(|h| !(h.schema() == schema && h.name() == name));
        self.declared.push(handle.clone());
        debug!(schema = %schema, table = %name, "Declared table");
        Ok(handle)
    }

    /// Forget every table declared with [`Database::declare_table`].
    pub fn reset_metadata(&mut self) {
        self.declared.clear();
    }

    /// Run a query through the session and return its rows.
    pub fn run_query<Q: IntoQuery>(&self, query: Q) -> Result<QueryResult> {
        let query = query.into_query()?;
        let raw = self
            .runtime
            .block_on(self.driver.execute(&query.sql, &query.params))?;
        Ok(QueryResult::from_raw(raw))
    }

    /// Load a query result into a record batch.
    pub fn load_as_table(&self, result: &QueryResult) -> Result<RecordBatch> {
        frame::load_frame(result)
    }

    /// Run a query and load its rows into a record batch.
    pub fn read_frame<Q: IntoQuery>(&self, query: Q) -> Result<RecordBatch> {
        let result = self.run_query(query)?;
        self.load_as_table(&result)
    }

    /// Write a record batch into a table; returns the number of rows written.
    ///
    /// `target` is a plain table name (schema taken from `options`) or a
    /// table-like value such as a [`TableHandle`].
    pub fn store_table<'a>(
        &self,
        frame: &RecordBatch,
        target: impl Into<WriteTarget<'a>>,
        options: &WriteOptions,
    ) -> Result<u64> {
        let (schema, table) = target.into().resolve(options)?;
        self.runtime.block_on(frame::write_frame(
            self.driver.as_ref(),
            frame,
            schema.as_deref(),
            &table,
            options,
            self.fast_executemany,
        ))
    }

    /// Stage one record or a batch of records for the next commit.
    pub fn insert_rows(&mut self, rows: impl Into<InsertRows>) {
        match rows.into() {
            InsertRows::One(record) => {
                debug!(table = %record.table(), "Staging row");
                self.pending.push(record);
            }
            InsertRows::Many(records) => {
                debug!(rows = records.len(), "Staging rows");
                self.pending.extend(records);
            }
        }
    }

    /// Number of staged records.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Insert every staged record in one transaction.
    ///
    /// Staged records are consumed whether or not the commit succeeds.
    pub fn commit(&mut self) -> Result<()> {
        let records = std::mem::take(&mut self.pending);
        let statements: Vec<Query> = records.iter().map(insert_statement).collect();
        self.runtime
            .block_on(run_in_transaction(self.driver.as_ref(), &statements))
    }

    /// Discard staged records and roll back any transaction left open on the
    /// connection, leaving a clean session.
    pub fn reset_session(&mut self) -> Result<()> {
        debug!(discarded = self.pending.len(), "Resetting session");
        self.pending.clear();
        self.runtime
            .block_on(self.driver.execute(ROLLBACK_IF_OPEN, &[]))?;
        Ok(())
    }
}

fn build_runtime() -> Result<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}

/// `INSERT INTO [schema].[table] ([a], [b]) VALUES (@P1, @P2)`
fn insert_statement(record: &Record) -> Query {
    let table = record.table();
    let target = quote_table(Some(table.schema()), table.name());
    if record.values().is_empty() {
        return Query::raw(format!("INSERT INTO {} DEFAULT VALUES", target));
    }

    let columns: Vec<String> = record.values().iter().map(|(c, _)| quote_ident(c)).collect();
    let placeholders: Vec<String> = (1..=record.values().len())
        .map(|i| format!("@P{}", i))
        .collect();
    Query {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            target,
            columns.join(", "),
            placeholders.join(", ")
        ),
        params: record.values().iter().map(|(_, v)| v.clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnDef, SqlValue, TableDef};

    fn users() -> TableHandle {
        TableHandle::new(
            TableDef::new("dbo", "users")
                .column(ColumnDef::new("id", "int").primary_key())
                .column(ColumnDef::new("name", "nvarchar")),
        )
    }

    #[test]
    fn test_insert_statement() {
        let record = Record::new(&users())
            .set("id", 1)
            .unwrap()
            .set("name", "Alice")
            .unwrap();
        let query = insert_statement(&record);
        assert_eq!(
            query.sql,
            "INSERT INTO [dbo].[users] ([id], [name]) VALUES (@P1, @P2)"
        );
        assert_eq!(
            query.params,
            vec![SqlValue::Int32(1), SqlValue::Text("Alice".to_string())]
        );
    }

    #[test]
    fn test_insert_statement_without_values() {
        let query = insert_statement(&Record::new(&users()));
        assert_eq!(query.sql, "INSERT INTO [dbo].[users] DEFAULT VALUES");
        assert!(query.params.is_empty());
    }
}
