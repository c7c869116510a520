//! sqlframe - a thin SQL Server handle with table reflection, frame
//! reads and writes, and staged inserts
//!
//! # Example
//! ```ignore
//! use sqlframe::{ConnectionParams, Credentials, Database, Record, Select, WhereClause, WriteOptions};
//!
//! // Connect and reflect the catalog
//! let params = ConnectionParams::new("db.example.com", "Sales", Credentials::new("alice", "secret"));
//! let mut db = Database::connect(params)?;
//! db.reflect()?;
//!
//! // Query a reflected table
//! let users = db.t()["dbo"]["users"].clone();
//! let row = db
//!     .run_query(Select::from(&users).where_(WhereClause::eq("name", "Alice")))?
//!     .single_row()?;
//! let id = row.get("id")?;
//!
//! // Load a result as a record batch and write it elsewhere
//! let frame = db.read_frame("SELECT * FROM dbo.users")?;
//! db.store_table(&frame, "users_copy", &WriteOptions::new().schema("staging"))?;
//!
//! // Stage rows and commit them in one transaction
//! db.insert_rows(Record::new(&users).set("name", "Bob")?);
//! db.commit()?;
//! ```

pub mod builders;
pub mod clauses;
pub mod database;
pub mod drivers;
pub mod error;
pub mod frame;
pub mod naming;
pub mod params;
pub mod reflect;
pub mod registry;
pub mod traits;
pub mod types;

mod transaction;

// Re-export main types for convenient access
pub use builders::{IntoQuery, Query, Select};
pub use clauses::WhereClause;
pub use database::Database;
pub use error::{Result, SqlFrameError};
pub use frame::{IfExists, WriteOptions, WriteTarget};
pub use params::{ConnectionParams, Credentials};
pub use registry::{SchemaCollection, TableCollection};
pub use traits::{DatabaseDriver, Table};
pub use types::{
    ColumnDef, InsertRows, QueryResult, RawQueryResult, Record, Row, SqlValue, TableDef,
    TableHandle,
};
