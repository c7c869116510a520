use crate::builders::quote_ident;
use crate::types::SqlValue;

/// Represents a WHERE clause condition.
/// Supports basic comparison operations and logical combinations.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereClause {
    /// column = value
    Eq(String, SqlValue),
    /// column IS NULL
    IsNull(String),
    /// clause AND clause
    And(Box<WhereClause>, Box<WhereClause>),
    /// clause OR clause
    Or(Box<WhereClause>, Box<WhereClause>),
}

impl WhereClause {
    /// Creates an equality condition: column = value
    pub fn eq<V: Into<SqlValue>>(column: &str, value: V) -> Self {
        WhereClause::Eq(column.to_string(), value.into())
    }

    /// Creates a null check: column IS NULL
    pub fn is_null(column: &str) -> Self {
        WhereClause::IsNull(column.to_string())
    }

    /// Combines this clause with another using AND
    pub fn and(self, other: WhereClause) -> Self {
        WhereClause::And(Box::new(self), Box::new(other))
    }

    /// Combines this clause with another using OR
    pub fn or(self, other: WhereClause) -> Self {
        WhereClause::Or(Box::new(self), Box::new(other))
    }

    /// Every column name referenced by this clause.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            WhereClause::Eq(col, _) | WhereClause::IsNull(col) => vec![col.as_str()],
            WhereClause::And(left, right) | WhereClause::Or(left, right) => {
                let mut cols = left.columns();
                cols.extend(right.columns());
                cols
            }
        }
    }

    /// Renders the condition, appending its values to `params`.
    ///
    /// Placeholders continue the numbering of whatever `params` already holds,
    /// so a clause can follow other bound values in the same statement.
    pub fn build_sql(&self, params: &mut Vec<SqlValue>) -> String {
        match self {
            WhereClause::Eq(col, value) => {
                params.push(value.clone());
                format!("{} = @P{}", quote_ident(col), params.len())
            }
            WhereClause::IsNull(col) => format!("{} IS NULL", quote_ident(col)),
            WhereClause::And(left, right) => {
                format!("({}) AND ({})", left.build_sql(params), right.build_sql(params))
            }
            WhereClause::Or(left, right) => {
                format!("({}) OR ({})", left.build_sql(params), right.build_sql(params))
            }
        }
    }
}
