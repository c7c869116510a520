mod record;
mod row;
mod sql_value;
mod table;

pub use record::{InsertRows, Record};
pub use row::{QueryResult, RawQueryResult, Row};
pub use sql_value::SqlValue;
pub use table::{ColumnDef, TableDef, TableHandle};
