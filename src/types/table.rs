use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use crate::error::{Result, SqlFrameError};
use crate::traits::Table;

/// One column of a reflected table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    /// SQL Server type name as reported by the catalog (`int`, `nvarchar`, ...).
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

/// Structural description of one table, as read from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.primary_key)
    }
}

/// Shared handle to a reflected table.
///
/// Clones point at the same definition; `ptr_eq` tells whether two handles
/// came from the same registration.
#[derive(Debug, Clone)]
pub struct TableHandle {
    def: Arc<TableDef>,
}

impl TableHandle {
    pub fn new(def: TableDef) -> Self {
        Self { def: Arc::new(def) }
    }

    pub fn schema(&self) -> &str {
        &self.def.schema
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn def(&self) -> &TableDef {
        &self.def
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.def.columns
    }

    /// Looks up a column by its exact name.
    pub fn column(&self, name: &str) -> Result<&ColumnDef> {
        self.def
            .columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                SqlFrameError::ColumnNotFound(format!(
                    "{}.{}.{}",
                    self.def.schema, self.def.name, name
                ))
            })
    }

    pub fn ptr_eq(&self, other: &TableHandle) -> bool {
        Arc::ptr_eq(&self.def, &other.def)
    }
}

impl PartialEq for TableHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.def == other.def
    }
}

impl Index<&str> for TableHandle {
    type Output = ColumnDef;

    fn index(&self, name: &str) -> &ColumnDef {
        match self.column(name) {
            Ok(column) => column,
            Err(e) => panic!("{}", e),
        }
    }
}

impl fmt::Display for TableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.def.schema, self.def.name)
    }
}

impl Table for TableHandle {
    fn table_name(&self) -> Option<&str> {
        Some(self.name())
    }

    fn schema(&self) -> Option<&str> {
        Some(TableHandle::schema(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableHandle {
        TableHandle::new(
            TableDef::new("dbo", "users")
                .column(ColumnDef::new("id", "int").primary_key())
                .column(ColumnDef::new("name", "nvarchar")),
        )
    }

    #[test]
    fn test_column_lookup() {
        let handle = users();
        assert_eq!(handle.column("id").unwrap().data_type, "int");
        assert!(handle.column("id").unwrap().primary_key);
        assert_eq!(handle["name"].data_type, "nvarchar");

        match handle.column("missing").unwrap_err() {
            SqlFrameError::ColumnNotFound(name) => assert_eq!(name, "dbo.users.missing"),
            other => panic!("Expected ColumnNotFound, got {:?}", other),
        }
    }

    #[test]
    #[should_panic(expected = "Column not found: dbo.users.missing")]
    fn test_index_panics_on_missing_column() {
        let handle = users();
        let _ = &handle["missing"];
    }

    #[test]
    fn test_clones_share_definition() {
        let handle = users();
        let clone = handle.clone();
        let rebuilt = users();

        assert!(handle.ptr_eq(&clone));
        assert!(!handle.ptr_eq(&rebuilt));
        assert_eq!(handle, rebuilt);
        assert_eq!(handle.to_string(), "dbo.users");
    }
}
