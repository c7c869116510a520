//! Catalog reflection: reads table and column definitions from
//! `INFORMATION_SCHEMA` and folds them into [`TableDef`]s.

use tracing::debug;

use crate::error::{Result, SqlFrameError};
use crate::traits::DatabaseDriver;
use crate::types::{ColumnDef, RawQueryResult, SqlValue, TableDef};

const CATALOG_SQL: &str = "SELECT c.TABLE_SCHEMA, c.TABLE_NAME, c.COLUMN_NAME, c.DATA_TYPE, c.IS_NULLABLE, \
     CASE WHEN pk.COLUMN_NAME IS NULL THEN 0 ELSE 1 END AS IS_PRIMARY_KEY \
     FROM INFORMATION_SCHEMA.COLUMNS c \
     JOIN INFORMATION_SCHEMA.TABLES t \
         ON t.TABLE_SCHEMA = c.TABLE_SCHEMA AND t.TABLE_NAME = c.TABLE_NAME \
     LEFT JOIN (\
         SELECT kcu.TABLE_SCHEMA, kcu.TABLE_NAME, kcu.COLUMN_NAME \
         FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
         JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu \
             ON tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME AND tc.TABLE_SCHEMA = kcu.TABLE_SCHEMA \
         WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY'\
     ) pk \
         ON pk.TABLE_SCHEMA = c.TABLE_SCHEMA AND pk.TABLE_NAME = c.TABLE_NAME AND pk.COLUMN_NAME = c.COLUMN_NAME \
     WHERE t.TABLE_TYPE = 'BASE TABLE'";

const CATALOG_ORDER: &str = " ORDER BY c.TABLE_SCHEMA, c.TABLE_NAME, c.ORDINAL_POSITION";

/// SQL listing the columns of every base table.
pub fn catalog_sql() -> String {
    format!("{}{}", CATALOG_SQL, CATALOG_ORDER)
}

/// SQL listing the columns of one base table (`@P1` schema, `@P2` table).
pub fn table_catalog_sql() -> String {
    format!(
        "{} AND c.TABLE_SCHEMA = @P1 AND c.TABLE_NAME = @P2{}",
        CATALOG_SQL, CATALOG_ORDER
    )
}

/// Reflects every base table of the connected database.
pub async fn reflect_tables(driver: &dyn DatabaseDriver) -> Result<Vec<TableDef>> {
    let raw = driver.execute(&catalog_sql(), &[]).await?;
    let tables = tables_from_catalog(raw)?;
    debug!(tables = tables.len(), "Reflected catalog");
    Ok(tables)
}

/// Reflects a single table. Fails with `UnknownTable` if the catalog has no
/// such base table.
pub async fn reflect_table(
    driver: &dyn DatabaseDriver,
    schema: &str,
    table: &str,
) -> Result<TableDef> {
    let params = [SqlValue::from(schema), SqlValue::from(table)];
    let raw = driver.execute(&table_catalog_sql(), &params).await?;
    tables_from_catalog(raw)?
        .into_iter()
        .find(|t| t.schema == schema && t.name == table)
        .ok_or_else(|| SqlFrameError::UnknownTable {
            schema: schema.to_string(),
            table: table.to_string(),
        })
}

/// Folds catalog rows (one per column, grouped by table) into table definitions.
pub fn tables_from_catalog(raw: RawQueryResult) -> Result<Vec<TableDef>> {
    if raw.columns.len() < 6 && !raw.rows.is_empty() {
        return Err(SqlFrameError::QueryFailed(format!(
            "catalog query returned {} columns, expected 6",
            raw.columns.len()
        )));
    }

    let mut tables: Vec<TableDef> = Vec::new();
    for row in raw.rows {
        let text = |i: usize| -> Result<String> {
            row.get(i)
                .and_then(SqlValue::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    SqlFrameError::QueryFailed(format!(
                        "catalog column {} is not text",
                        raw.columns.get(i).map(String::as_str).unwrap_or("?")
                    ))
                })
        };
        let schema = text(0)?;
        let name = text(1)?;
        let column = ColumnDef {
            name: text(2)?,
            data_type: text(3)?,
            nullable: row.get(4).is_some_and(SqlValue::as_flag),
            primary_key: row.get(5).is_some_and(SqlValue::as_flag),
        };

        match tables.last_mut() {
            Some(last) if last.schema == schema && last.name == name => last.columns.push(column),
            _ => tables.push(TableDef::new(schema, name).column(column)),
        }
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_row(
        schema: &str,
        table: &str,
        column: &str,
        data_type: &str,
        nullable: &str,
        pk: i32,
    ) -> Vec<SqlValue> {
        vec![
            schema.into(),
            table.into(),
            column.into(),
            data_type.into(),
            nullable.into(),
            pk.into(),
        ]
    }

    fn catalog(rows: Vec<Vec<SqlValue>>) -> RawQueryResult {
        RawQueryResult::new(
            [
                "TABLE_SCHEMA",
                "TABLE_NAME",
                "COLUMN_NAME",
                "DATA_TYPE",
                "IS_NULLABLE",
                "IS_PRIMARY_KEY",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            rows,
        )
    }

    #[test]
    fn test_rows_fold_into_tables() {
        let raw = catalog(vec![
            catalog_row("dbo", "users", "id", "int", "NO", 1),
            catalog_row("dbo", "users", "name", "nvarchar", "YES", 0),
            catalog_row("sales", "invoices", "number", "bigint", "NO", 0),
        ]);

        let tables = tables_from_catalog(raw).unwrap();
        assert_eq!(tables.len(), 2);

        assert_eq!(tables[0].schema, "dbo");
        assert_eq!(tables[0].name, "users");
        assert_eq!(
            tables[0].columns,
            vec![
                ColumnDef::new("id", "int").primary_key(),
                ColumnDef::new("name", "nvarchar"),
            ]
        );

        assert_eq!(tables[1].name, "invoices");
        assert_eq!(tables[1].primary_key_columns().count(), 0);
        assert!(!tables[1].columns[0].nullable);
    }

    #[test]
    fn test_empty_catalog() {
        let tables = tables_from_catalog(RawQueryResult::empty()).unwrap();
        assert!(tables.is_empty());
    }

    #[test]
    fn test_non_text_name_is_an_error() {
        let raw = catalog(vec![vec![
            SqlValue::Null,
            "users".into(),
            "id".into(),
            "int".into(),
            "NO".into(),
            1.into(),
        ]]);
        assert!(matches!(
            tables_from_catalog(raw).unwrap_err(),
            SqlFrameError::QueryFailed(_)
        ));
    }

    #[test]
    fn test_single_table_sql_filters_by_parameters() {
        let sql = table_catalog_sql();
        assert!(sql.contains("c.TABLE_SCHEMA = @P1 AND c.TABLE_NAME = @P2"));
        assert!(sql.ends_with("ORDER BY c.TABLE_SCHEMA, c.TABLE_NAME, c.ORDINAL_POSITION"));
    }
}
