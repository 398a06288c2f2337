use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::SchemaRegistry;

/// Passwords must be exactly this many characters. Fixed policy, not configurable.
pub const PASSWORD_LENGTH: usize = 6;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

/// Client errors detected before any backend call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid table.")]
    UnknownTable(String),

    #[error("Invalid column.")]
    UnknownColumn { table: String, column: String },

    #[error("Data contains columns that are not allowed: {}", columns.join(", "))]
    InvalidShape { table: String, columns: Vec<String> },

    #[error("The email format is invalid.")]
    InvalidEmail,

    #[error("The password must be exactly 6 characters long.")]
    InvalidPasswordLength,
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

/// Counts characters, not bytes.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() == PASSWORD_LENGTH {
        Ok(())
    } else {
        Err(ValidationError::InvalidPasswordLength)
    }
}

/// Checks table, column and data references against the allowlist.
#[derive(Debug, Clone, Copy)]
pub struct RequestValidator<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> RequestValidator<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn table(&self, table: &str) -> Result<(), ValidationError> {
        if self.registry.table_exists(table) {
            Ok(())
        } else {
            Err(ValidationError::UnknownTable(table.to_string()))
        }
    }

    pub fn column(&self, table: &str, column: &str) -> Result<(), ValidationError> {
        self.table(table)?;
        if self.registry.column_allowed(table, column) {
            Ok(())
        } else {
            Err(ValidationError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            })
        }
    }

    pub fn data(&self, table: &str, data: &Map<String, Value>) -> Result<(), ValidationError> {
        self.table(table)?;
        if self.registry.shape_valid(table, data) {
            return Ok(());
        }
        Err(ValidationError::InvalidShape {
            table: table.to_string(),
            columns: self
                .registry
                .disallowed_columns(table, data)
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
    }
}
