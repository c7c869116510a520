use crate::builders::{quote_ident, quote_table, IntoQuery, Query};
use crate::clauses::WhereClause;
use crate::error::Result;
use crate::types::{SqlValue, TableHandle};

/// SELECT builder over a reflected table.
/// Selects every column unless `.columns()` narrows it down.
#[derive(Debug, Clone)]
pub struct Select {
    table: TableHandle,
    columns: Vec<String>,
    where_clause: Option<WhereClause>,
    top: Option<u64>,
}

impl Select {
    /// Start a SELECT against the given table.
    pub fn from(table: &TableHandle) -> Self {
        Self {
            table: table.clone(),
            columns: Vec::new(),
            where_clause: None,
            top: None,
        }
    }

    /// Specify the columns to select.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Add a WHERE clause to the query.
    pub fn where_(mut self, clause: WhereClause) -> Self {
        self.where_clause = Some(clause);
        self
    }

    /// Return at most `n` rows (`SELECT TOP n`).
    pub fn top(mut self, n: u64) -> Self {
        self.top = Some(n);
        self
    }

    /// Build the SQL query string and parameters.
    fn build_sql(&self) -> (String, Vec<SqlValue>) {
        let mut sql = String::with_capacity(256);
        let mut params = Vec::new();

        // SELECT clause
        sql.push_str("SELECT ");
        if let Some(top) = self.top {
            sql.push_str("TOP ");
            sql.push_str(&top.to_string());
            sql.push(' ');
        }
        let columns: Vec<&str> = if self.columns.is_empty() {
            self.table.columns().iter().map(|c| c.name.as_str()).collect()
        } else {
            self.columns.iter().map(String::as_str).collect()
        };
        if columns.is_empty() {
            sql.push('*');
        }
        for (i, col) in columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&quote_ident(col));
        }

        // FROM clause
        sql.push_str(" FROM ");
        sql.push_str(&quote_table(Some(self.table.schema()), self.table.name()));

        // WHERE clause
        if let Some(ref where_clause) = self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause.build_sql(&mut params));
        }

        (sql, params)
    }

    /// Check every referenced column against the table and produce the query.
    pub fn build(self) -> Result<Query> {
        let referenced = self
            .columns
            .iter()
            .map(String::as_str)
            .chain(self.where_clause.iter().flat_map(WhereClause::columns));
        for column in referenced {
            self.table.column(column)?;
        }

        let (sql, params) = self.build_sql();
        Ok(Query { sql, params })
    }
}

impl IntoQuery for Select {
    fn into_query(self) -> Result<Query> {
        self.build()
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
    fn test_build_simple_select() {
        let query = Select::from(&users()).build().unwrap();
        assert_eq!(query.sql, "SELECT [id], [name] FROM [dbo].[users]");
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_build_select_with_where() {
        let query = Select::from(&users())
            .columns(&["id"])
            .where_(WhereClause::eq("name", "John"))
            .build()
            .unwrap();

        assert_eq!(query.sql, "SELECT [id] FROM [dbo].[users] WHERE [name] = @P1");
        assert_eq!(query.params, vec![SqlValue::Text("John".to_string())]);
    }

    #[test]
    fn test_build_select_with_top() {
        let query = Select::from(&users())
            .columns(&["id"])
            .top(10)
            .build()
            .unwrap();
        assert_eq!(query.sql, "SELECT TOP 10 [id] FROM [dbo].[users]");
    }

    #[test]
    fn test_build_select_with_where_and_top() {
        let query = Select::from(&users())
            .columns(&["id"])
            .where_(WhereClause::eq("name", "John").and(WhereClause::eq("id", 3)))
            .top(10)
            .build()
            .unwrap();

        assert_eq!(
            query.sql,
            "SELECT TOP 10 [id] FROM [dbo].[users] WHERE ([name] = @P1) AND ([id] = @P2)"
        );
        assert_eq!(query.params.len(), 2);
    }

    #[test]
    fn test_build_rejects_unknown_columns() {
        let err = Select::from(&users())
            .columns(&["email"])
            .build()
            .unwrap_err();
        assert!(matches!(err, SqlFrameError::ColumnNotFound(_)));

        let err = Select::from(&users())
            .where_(WhereClause::eq("email", "x"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SqlFrameError::ColumnNotFound(_)));
    }

    #[test]
    fn test_table_without_columns_selects_star() {
        let bare = TableHandle::new(TableDef::new("dbo", "audit"));
        let query = Select::from(&bare).build().unwrap();
        assert_eq!(query.sql, "SELECT * FROM [dbo].[audit]");
    }
}
