use crate::error::Result;
use crate::types::{SqlValue, TableHandle};

/// A row staged for insertion into one reflected table.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    table: TableHandle,
    values: Vec<(String, SqlValue)>,
}

impl Record {
    pub fn new(table: &TableHandle) -> Self {
        Self {
            table: table.clone(),
            values: Vec::new(),
        }
    }

    /// Sets a column value. The column must exist on the table; setting the
    /// same column twice keeps the last value.
    pub fn set(mut self, column: &str, value: impl Into<SqlValue>) -> Result<Self> {
        let name = self.table.column(column)?.name.clone();
        let value = value.into();
        match self.values.iter_mut().find(|(c, _)| *c == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
        Ok(self)
    }

    pub fn table(&self) -> &TableHandle {
        &self.table
    }

    pub fn values(&self) -> &[(String, SqlValue)] {
        &self.values
    }
}

/// Rows handed to `Database::insert_rows`: one record or a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertRows {
    One(Record),
    Many(Vec<Record>),
}

impl From<Record> for InsertRows {
    fn from(record: Record) -> Self {
        InsertRows::One(record)
    }
}

impl From<Vec<Record>> for InsertRows {
    fn from(records: Vec<Record>) -> Self {
        InsertRows::Many(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SqlFrameError;
    use crate::types::{ColumnDef, TableDef};

    fn users() -> TableHandle {
        TableHandle::new(
            TableDef::new("dbo", "users")
                .column(ColumnDef::new("id", "int").primary_key())
                .column(ColumnDef::new("name", "nvarchar")),
        )
    }

    #[test]
    fn test_set_overwrites_same_column() {
        let record = Record::new(&users())
            .set("name", "Alice")
            .unwrap()
            .set("id", 1)
            .unwrap()
            .set("name", "Bob")
            .unwrap();

        assert_eq!(
            record.values(),
            &[
                ("name".to_string(), SqlValue::Text("Bob".to_string())),
                ("id".to_string(), SqlValue::Int32(1)),
            ]
        );
    }

    #[test]
    fn test_set_rejects_unknown_column() {
        let err = Record::new(&users()).set("email", "a@b.c").unwrap_err();
        assert!(matches!(err, SqlFrameError::ColumnNotFound(_)));
    }
}
