//! Table allowlist.
//!
//! The registry maps every table a client may reference to the ordered list of
//! columns it may read, filter on or write. It is loaded once at startup and is
//! read-only afterwards, so it is shared between requests behind an `Arc`.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::SchemaConfig;

const BUILTIN_TABLES: &str = include_str!("default_tables.yaml");

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse schema definition: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Schema definition contains no tables")]
    NoTables,

    #[error("Table '{0}' has an empty column list")]
    EmptyTable(String),

    #[error("Table '{0}' declares an empty column name")]
    EmptyColumnName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRegistry {
    tables: BTreeMap<String, Vec<String>>,
}

impl SchemaRegistry {
    /// Build a registry from `(table, columns)` pairs. Column order is kept and
    /// duplicates are dropped; every table needs at least one column.
    pub fn from_tables<I, C>(tables: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (String, C)>,
        C: IntoIterator<Item = String>,
    {
        let mut map = BTreeMap::new();
        for (table, columns) in tables {
            let mut allowed: Vec<String> = Vec::new();
            for column in columns {
                if column.trim().is_empty() {
                    return Err(SchemaError::EmptyColumnName(table));
                }
                if !allowed.contains(&column) {
                    allowed.push(column);
                }
            }
            if allowed.is_empty() {
                return Err(SchemaError::EmptyTable(table));
            }
            map.insert(table, allowed);
        }

        if map.is_empty() {
            return Err(SchemaError::NoTables);
        }

        Ok(Self { tables: map })
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, SchemaError> {
        let parsed: BTreeMap<String, Vec<String>> = serde_yaml::from_str(source)?;
        Self::from_tables(parsed)
    }

    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        let source = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&source)
    }

    /// The allowlist shipped with the service.
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::from_yaml_str(BUILTIN_TABLES)
    }

    pub fn load(config: &SchemaConfig) -> Result<Self, SchemaError> {
        match &config.tables_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading table allowlist from file");
                Self::from_path(path)
            }
            None => Self::builtin(),
        }
    }

    pub fn table_exists(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// False for unknown tables.
    pub fn column_allowed(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .map(|columns| columns.iter().any(|c| c == column))
            .unwrap_or(false)
    }

    /// True when the table exists and every key of `data` is an allowed column.
    /// Any subset is accepted, including the empty mapping.
    pub fn shape_valid(&self, table: &str, data: &Map<String, Value>) -> bool {
        match self.tables.get(table) {
            Some(columns) => data.keys().all(|key| columns.iter().any(|c| c == key)),
            None => false,
        }
    }

    /// Keys of `data` that are outside the table's allowlist, in mapping order.
    pub fn disallowed_columns<'a>(&self, table: &str, data: &'a Map<String, Value>) -> Vec<&'a str> {
        data.keys()
            .filter(|key| !self.column_allowed(table, key))
            .map(String::as_str)
            .collect()
    }

    #[cfg(test)]
    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}
