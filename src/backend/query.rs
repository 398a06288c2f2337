use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    In,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterWhereInfo {
    pub column: String,
    pub operator: FilterOp,
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// `None` selects every column.
    Select(Option<Vec<String>>),
    Insert(Row),
    Update(Row),
    Delete,
}

/// A single row-store statement: one table, one operation, optional filters.
#[derive(Debug, Clone, PartialEq)]
pub struct RowQuery {
    pub table: String,
    pub operation: Operation,
    pub filters: Vec<FilterWhereInfo>,
    pub order: Option<FilterOrderInfo>,
    pub limit: Option<usize>,
}

impl RowQuery {
    fn new(table: impl Into<String>, operation: Operation) -> Self {
        Self {
            table: table.into(),
            operation,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn select_all(table: impl Into<String>) -> Self {
        Self::new(table, Operation::Select(None))
    }

    pub fn select<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        Self::new(table, Operation::Select(Some(columns)))
    }

    pub fn insert(table: impl Into<String>, row: Row) -> Self {
        Self::new(table, Operation::Insert(row))
    }

    pub fn update(table: impl Into<String>, row: Row) -> Self {
        Self::new(table, Operation::Update(row))
    }

    pub fn delete(table: impl Into<String>) -> Self {
        Self::new(table, Operation::Delete)
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FilterWhereInfo {
            column: column.into(),
            operator: FilterOp::Eq,
            data: value.into(),
        });
        self
    }

    pub fn in_(mut self, column: impl Into<String>, values: Vec<Value>) -> Self {
        self.filters.push(FilterWhereInfo {
            column: column.into(),
            operator: FilterOp::In,
            data: Value::Array(values),
        });
        self
    }

    pub fn order(mut self, column: impl Into<String>, sort: SortDirection) -> Self {
        self.order = Some(FilterOrderInfo {
            column: column.into(),
            sort,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Every column name the statement references, for allowlist checks.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        match &self.operation {
            Operation::Select(Some(selected)) => columns.extend(selected.iter().map(String::as_str)),
            Operation::Insert(row) | Operation::Update(row) => columns.extend(row.keys().map(String::as_str)),
            Operation::Select(None) | Operation::Delete => {}
        }
        columns.extend(self.filters.iter().map(|f| f.column.as_str()));
        if let Some(order) = &self.order {
            columns.push(order.column.as_str());
        }
        columns
    }

    /// PostgREST query-string pairs for this statement.
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        if let Operation::Select(columns) = &self.operation {
            let select = match columns {
                Some(cols) if !cols.is_empty() => cols.join(","),
                _ => "*".to_string(),
            };
            params.push(("select".to_string(), select));
        }

        for filter in &self.filters {
            let rendered = match filter.operator {
                FilterOp::Eq => format!("eq.{}", scalar_text(&filter.data)),
                FilterOp::In => {
                    let items: Vec<String> = match &filter.data {
                        Value::Array(values) => values.iter().map(quoted_list_item).collect(),
                        other => vec![quoted_list_item(other)],
                    };
                    format!("in.({})", items.join(","))
                }
            };
            params.push((filter.column.clone(), rendered));
        }

        if let Some(order) = &self.order {
            params.push(("order".to_string(), format!("{}.{}", order.column, order.sort.as_str())));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }
}

/// Text form of a filter value: strings unquoted, everything else as JSON.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn quoted_list_item(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => scalar_text(other),
    }
}
