mod query;
mod select;

pub use query::{IntoQuery, Query};
pub use select::Select;

/// SQL Server identifier quoting: `[name]`, with `]` doubled.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// `[schema].[table]`, or `[table]` when no schema is given.
pub(crate) fn quote_table(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(table)),
        None => quote_ident(table),
    }
}
