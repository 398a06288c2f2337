use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::backend::{Operation, Row, RowQuery, RowStore, StoreResponse};
use crate::schema::SchemaRegistry;
use crate::validation::{RequestValidator, ValidationError};

#[derive(Debug, Error)]
pub enum DataError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend answered without data, or could not be reached.
    #[error("Error executing the query.")]
    Query { details: Option<Value> },
}

impl DataError {
    pub fn details(&self) -> Option<&Value> {
        match self {
            DataError::Query { details } => details.as_ref(),
            DataError::Validation(_) => None,
        }
    }
}

/// Generic table access gated by the allowlist.
#[derive(Clone)]
pub struct DataService {
    registry: Arc<SchemaRegistry>,
    store: Arc<dyn RowStore>,
}

impl DataService {
    pub fn new(registry: Arc<SchemaRegistry>, store: Arc<dyn RowStore>) -> Self {
        Self { registry, store }
    }

    fn validator(&self) -> RequestValidator<'_> {
        RequestValidator::new(&self.registry)
    }

    pub async fn select(&self, table: &str, column: &str, value: &str) -> Result<Vec<Row>, DataError> {
        self.validator().column(table, column)?;
        self.run(RowQuery::select_all(table).eq(column, value)).await
    }

    pub async fn insert(&self, table: &str, data: Row) -> Result<Vec<Row>, DataError> {
        self.validator().data(table, &data)?;
        self.run(RowQuery::insert(table, data)).await
    }

    pub async fn update(&self, table: &str, data: Row, column: &str, value: &str) -> Result<Vec<Row>, DataError> {
        let validator = self.validator();
        validator.column(table, column)?;
        validator.data(table, &data)?;
        self.run(RowQuery::update(table, data).eq(column, value)).await
    }

    pub async fn delete(&self, table: &str, column: &str, value: &str) -> Result<Vec<Row>, DataError> {
        self.validator().column(table, column)?;
        self.run(RowQuery::delete(table).eq(column, value)).await
    }

    /// Runs an arbitrary statement after checking its table and every column it names.
    pub async fn fetch(&self, query: RowQuery) -> Result<Vec<Row>, DataError> {
        let validator = self.validator();
        validator.table(&query.table)?;
        for column in query.referenced_columns() {
            validator.column(&query.table, column)?;
        }
        self.run(query).await
    }

    async fn run(&self, query: RowQuery) -> Result<Vec<Row>, DataError> {
        tracing::debug!(table = %query.table, operation = operation_name(&query), "Forwarding to row store");
        match self.store.execute(&query).await {
            Ok(response) => normalize(&query.table, response),
            Err(e) => {
                tracing::error!(table = %query.table, error = %e, "Row store call failed");
                Err(DataError::Query {
                    details: Some(Value::String(e.to_string())),
                })
            }
        }
    }
}

fn operation_name(query: &RowQuery) -> &'static str {
    match query.operation {
        Operation::Select(_) => "select",
        Operation::Insert(_) => "insert",
        Operation::Update(_) => "update",
        Operation::Delete => "delete",
    }
}

fn normalize(table: &str, response: StoreResponse) -> Result<Vec<Row>, DataError> {
    match response.data {
        Some(rows) => Ok(rows),
        None => {
            tracing::error!(table = %table, details = ?response.error, "Row store returned no data");
            Err(DataError::Query {
                details: response.error,
            })
        }
    }
}
