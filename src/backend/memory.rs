use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::query::{scalar_text, FilterOp, FilterWhereInfo, SortDirection};
use super::{
    AuthError, AuthResponse, AuthSession, AuthUser, Credentials, IdentityProvider, Operation, Row, RowQuery,
    RowStore, StoreError, StoreResponse,
};

/// Claims carried by access tokens the in-memory provider issues.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone)]
struct MemoryAccount {
    id: Uuid,
    password_digest: String,
}

/// Identity provider and row store kept in process memory.
///
/// Counts every call it receives and can be told to fail statements against
/// particular tables.
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    accounts: RwLock<HashMap<String, MemoryAccount>>,
    failing_tables: RwLock<HashSet<String>>,
    store_calls: AtomicUsize,
    identity_calls: AtomicUsize,
    token_secret: String,
    token_expiry_hours: u64,
}

impl MemoryBackend {
    pub fn new(token_secret: impl Into<String>, token_expiry_hours: u64) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            accounts: RwLock::new(HashMap::new()),
            failing_tables: RwLock::new(HashSet::new()),
            store_calls: AtomicUsize::new(0),
            identity_calls: AtomicUsize::new(0),
            token_secret: token_secret.into(),
            token_expiry_hours,
        }
    }

    /// Append rows directly, bypassing the call counter.
    pub async fn seed(&self, table: &str, rows: Vec<Row>) {
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().extend(rows);
    }

    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.tables.read().await.get(table).cloned().unwrap_or_default()
    }

    /// Every later statement against `table` answers with `data: None`.
    pub async fn fail_table(&self, table: &str) {
        self.failing_tables.write().await.insert(table.to_string());
    }

    pub fn store_calls(&self) -> usize {
        self.store_calls.load(AtomicOrdering::SeqCst)
    }

    pub fn identity_calls(&self) -> usize {
        self.identity_calls.load(AtomicOrdering::SeqCst)
    }

    fn digest(password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn issue_session(&self, id: &Uuid, email: &str) -> Result<AuthSession, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: id.to_string(),
            email: email.to_string(),
            exp: (now + Duration::hours(self.token_expiry_hours as i64)).timestamp(),
            iat: now.timestamp(),
        };
        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.token_secret.as_bytes()),
        )
        .map_err(|e| AuthError::Unexpected(format!("token generation failed: {}", e)))?;

        Ok(AuthSession {
            access_token,
            refresh_token: Uuid::new_v4().simple().to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthResponse, AuthError> {
        self.identity_calls.fetch_add(1, AtomicOrdering::SeqCst);

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&credentials.email) {
            return Err(AuthError::Api {
                status: 422,
                message: "User already registered".to_string(),
            });
        }

        let account = MemoryAccount {
            id: Uuid::new_v4(),
            password_digest: Self::digest(&credentials.password),
        };
        let session = self.issue_session(&account.id, &credentials.email)?;
        let user = AuthUser {
            id: account.id.to_string(),
            email: Some(credentials.email.clone()),
        };
        accounts.insert(credentials.email.clone(), account);

        Ok(AuthResponse {
            user: Some(user),
            session: Some(session),
        })
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<AuthResponse, AuthError> {
        self.identity_calls.fetch_add(1, AtomicOrdering::SeqCst);

        let accounts = self.accounts.read().await;
        let account = accounts
            .get(&credentials.email)
            .filter(|a| a.password_digest == Self::digest(&credentials.password))
            .ok_or_else(|| AuthError::Api {
                status: 400,
                message: "Invalid login credentials".to_string(),
            })?;

        let session = self.issue_session(&account.id, &credentials.email)?;
        Ok(AuthResponse {
            user: Some(AuthUser {
                id: account.id.to_string(),
                email: Some(credentials.email.clone()),
            }),
            session: Some(session),
        })
    }
}

#[async_trait]
impl RowStore for MemoryBackend {
    async fn execute(&self, query: &RowQuery) -> Result<StoreResponse, StoreError> {
        self.store_calls.fetch_add(1, AtomicOrdering::SeqCst);

        if self.failing_tables.read().await.contains(&query.table) {
            return Ok(StoreResponse::failed(json!({
                "message": format!("relation \"{}\" is unavailable", query.table)
            })));
        }

        let mut tables = self.tables.write().await;
        let rows = tables.entry(query.table.clone()).or_default();

        let result = match &query.operation {
            Operation::Select(columns) => {
                let mut selected: Vec<Row> = rows
                    .iter()
                    .filter(|row| matches_all(row, &query.filters))
                    .cloned()
                    .collect();

                if let Some(order) = &query.order {
                    // sort_by is stable, so ties keep insertion order
                    selected.sort_by(|a, b| {
                        let ord = compare_values(
                            a.get(&order.column).unwrap_or(&Value::Null),
                            b.get(&order.column).unwrap_or(&Value::Null),
                        );
                        match order.sort {
                            SortDirection::Asc => ord,
                            SortDirection::Desc => ord.reverse(),
                        }
                    });
                }
                if let Some(limit) = query.limit {
                    selected.truncate(limit);
                }
                if let Some(columns) = columns {
                    for row in selected.iter_mut() {
                        row.retain(|key, _| columns.iter().any(|c| c == key));
                    }
                }
                selected
            }
            Operation::Insert(row) => {
                let mut inserted = row.clone();
                inserted
                    .entry("created_at".to_string())
                    .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
                rows.push(inserted.clone());
                vec![inserted]
            }
            Operation::Update(changes) => {
                let mut updated = Vec::new();
                for row in rows.iter_mut().filter(|row| matches_all(row, &query.filters)) {
                    for (key, value) in changes {
                        row.insert(key.clone(), value.clone());
                    }
                    updated.push(row.clone());
                }
                updated
            }
            Operation::Delete => {
                let (removed, kept): (Vec<Row>, Vec<Row>) =
                    rows.drain(..).partition(|row| matches_all(row, &query.filters));
                *rows = kept;
                removed
            }
        };

        Ok(StoreResponse::rows(result))
    }
}

fn matches_all(row: &Row, filters: &[FilterWhereInfo]) -> bool {
    filters.iter().all(|filter| {
        let cell = row.get(&filter.column).unwrap_or(&Value::Null);
        match (filter.operator, &filter.data) {
            (FilterOp::In, Value::Array(values)) => values.iter().any(|v| values_equal(cell, v)),
            (_, wanted) => values_equal(cell, wanted),
        }
    })
}

/// Query-string values arrive as text, so `7` and `"7"` compare equal.
fn values_equal(cell: &Value, wanted: &Value) -> bool {
    if cell.is_null() {
        return wanted.is_null();
    }
    cell == wanted || scalar_text(cell) == scalar_text(wanted)
}

/// Postgres ordering: NULL sorts above every value, so `desc` puts nulls first.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        _ => scalar_text(a).cmp(&scalar_text(b)),
    }
}
