/// Request bodies and query strings accepted by the HTTP surface

use serde::Deserialize;
use serde_json::Value;

use crate::backend::Row;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub user_name: String,
}

/// Extra fields (clients often resend `user_name`) are ignored.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `?table=..&column=..&value=..` for select and delete.
#[derive(Debug, Deserialize)]
pub struct RowFilterQuery {
    pub table: String,
    pub column: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct InsertRequest {
    pub table: String,
    pub data: Row,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub table: String,
    pub data: Row,
    pub column: String,
    /// Accepted as a JSON string or scalar; compared by its text form.
    pub value: Value,
}

#[derive(Debug, Deserialize)]
pub struct TopScoresQuery {
    pub game_name: String,
    pub limit: Option<usize>,
}
