//! Data backend abstraction: filtered table CRUD plus object storage.
//!
//! Rows travel as [`serde_json::Value`]; decoding into typed records is the
//! job of the resource layer.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::error::BackendError;
use crate::query::RowRange;

/// A raw table row.
pub type Row = Value;

/// Row predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: Value },
    Neq { column: String, value: Value },
    /// Case-insensitive substring match on a text column.
    Contains { column: String, text: String },
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq { column, .. } | Filter::Neq { column, .. } | Filter::Contains { column, .. } => {
                column
            }
        }
    }

    /// Evaluate the predicate against a JSON row. Missing columns never match.
    pub fn matches(&self, row: &Row) -> bool {
        let Some(field) = row.get(self.column()) else {
            return false;
        };
        match self {
            Filter::Eq { value, .. } => field == value,
            Filter::Neq { value, .. } => field != value,
            Filter::Contains { text, .. } => field
                .as_str()
                .map(|s| s.to_lowercase().contains(&text.to_lowercase()))
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A `select` against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub range: Option<RowRange>,
}

impl Select {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            range: None,
        }
    }

    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn neq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Neq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn contains(mut self, column: impl Into<String>, text: impl Into<String>) -> Self {
        self.filters.push(Filter::Contains {
            column: column.into(),
            text: text.into(),
        });
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn range(mut self, range: RowRange) -> Self {
        self.range = Some(range);
        self
    }
}

/// The remote data service.
///
/// `update` and `delete` apply to every row matching all `filters`. An
/// empty filter list is rejected by implementations rather than touching
/// the whole table.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn select(&self, query: &Select) -> Result<Vec<Row>, BackendError>;

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, BackendError>;

    async fn update(
        &self,
        table: &str,
        patch: Row,
        filters: &[Filter],
    ) -> Result<Vec<Row>, BackendError>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError>;

    /// Store an object and return its path within the bucket.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, BackendError>;

    async fn download(&self, bucket: &str, path: &str) -> Result<Bytes, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_collects_filters_in_order() {
        let select = Select::from("products")
            .eq("published", true)
            .neq("user_id", "u1")
            .order("created_at", false)
            .range(RowRange { from: 0, to: 7 });

        assert_eq!(select.columns, "*");
        assert_eq!(select.filters.len(), 2);
        assert_eq!(select.filters[0].column(), "published");
        assert_eq!(select.filters[1].column(), "user_id");
        assert_eq!(
            select.order,
            Some(Order {
                column: "created_at".to_string(),
                ascending: false
            })
        );
    }

    #[test]
    fn test_filter_matching() {
        let row = json!({ "id": 5, "user_id": "u1", "title": "Red Bicycle", "published": true });

        assert!(Filter::Eq { column: "id".into(), value: json!(5) }.matches(&row));
        assert!(!Filter::Neq { column: "user_id".into(), value: json!("u1") }.matches(&row));
        assert!(Filter::Contains { column: "title".into(), text: "bicy".into() }.matches(&row));
        assert!(!Filter::Eq { column: "missing".into(), value: json!(1) }.matches(&row));
    }
}
