//! Two-level registry of reflected tables: schema -> table -> handle.

use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

use crate::error::{Result, SqlFrameError};
use crate::naming;
use crate::types::TableHandle;

/// The tables of one schema.
#[derive(Debug, Clone, Default)]
pub struct TableCollection {
    schema: String,
    tables: HashMap<String, TableHandle>,
}

impl TableCollection {
    fn new(schema: &str) -> Self {
        Self {
            schema: schema.to_string(),
            tables: HashMap::new(),
        }
    }

    /// Inserts or replaces a table.
    pub fn add_table(&mut self, name: impl Into<String>, table: TableHandle) {
        self.tables.insert(name.into(), table);
    }

    pub fn table(&self, name: &str) -> Result<&TableHandle> {
        self.tables
            .get(name)
            .ok_or_else(|| SqlFrameError::UnknownTable {
                schema: self.schema.clone(),
                table: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names, sorted.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableHandle)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Index<&str> for TableCollection {
    type Output = TableHandle;

    fn index(&self, name: &str) -> &TableHandle {
        match self.table(name) {
            Ok(table) => table,
            Err(e) => panic!("{}", e),
        }
    }
}

impl fmt::Display for TableCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.table_names().join(", "))
    }
}

/// All reflected schemas.
///
/// Built by `Database::reflect` and replaced wholesale on every call.
#[derive(Debug, Clone, Default)]
pub struct SchemaCollection {
    schemas: HashMap<String, TableCollection>,
}

impl SchemaCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from reflected tables named by `namer`.
    pub fn from_handles<I, F>(handles: I, namer: F) -> Result<Self>
    where
        I: IntoIterator<Item = TableHandle>,
        F: Fn(&TableHandle) -> String,
    {
        let mut collection = Self::new();
        collection.populate_from_handles(handles, namer)?;
        Ok(collection)
    }

    /// Registers a table, creating the schema bucket on first use.
    /// An existing entry for the same pair is replaced.
    pub fn register(&mut self, schema: &str, table_name: impl Into<String>, table: TableHandle) {
        self.schemas
            .entry(schema.to_string())
            .or_insert_with(|| TableCollection::new(schema))
            .add_table(table_name, table);
    }

    /// Names every handle with `namer`, decodes the name into (schema, table)
    /// and registers the handle under it.
    pub fn populate_from_handles<I, F>(&mut self, handles: I, namer: F) -> Result<()>
    where
        I: IntoIterator<Item = TableHandle>,
        F: Fn(&TableHandle) -> String,
    {
        for handle in handles {
            let (schema, table_name) = naming::decode(&namer(&handle))?;
            self.register(&schema, table_name, handle);
        }
        Ok(())
    }

    pub fn schema(&self, name: &str) -> Result<&TableCollection> {
        self.schemas
            .get(name)
            .ok_or_else(|| SqlFrameError::UnknownSchema(name.to_string()))
    }

    pub fn table(&self, schema: &str, name: &str) -> Result<&TableHandle> {
        self.schema(schema)?.table(name)
    }

    /// Schema names, sorted.
    pub fn schema_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableCollection)> {
        self.schemas
            .iter()
            .map(|(name, tables)| (name.as_str(), tables))
    }

    /// Number of schemas.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Number of tables across all schemas.
    pub fn table_count(&self) -> usize {
        self.schemas.values().map(TableCollection::len).sum()
    }
}

impl Index<&str> for SchemaCollection {
    type Output = TableCollection;

    fn index(&self, name: &str) -> &TableCollection {
        match self.schema(name) {
            Ok(tables) => tables,
            Err(e) => panic!("{}", e),
        }
    }
}

impl fmt::Display for SchemaCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .schema_names()
            .into_iter()
            .map(|name| format!("{}: {}", name, self.schemas[name]))
            .collect();
        write!(f, "{{{}}}", entries.join(", "))
    }
}
