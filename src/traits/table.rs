use crate::types::TableHandle;

/// Anything that can name a database table.
///
/// Implemented by [`TableHandle`]; user types wrapping a reflected table can
/// implement it too, either by naming the table directly or by pointing at the
/// underlying handle.
pub trait Table {
    /// Returns the table name as it appears in the database, if known.
    fn table_name(&self) -> Option<&str>;

    /// Returns the schema name, if any.
    fn schema(&self) -> Option<&str> {
        None
    }

    /// Returns the reflected table this value stands for, if any.
    fn table_handle(&self) -> Option<&TableHandle> {
        None
    }
}
