//! In-memory [`Backend`] for testing.
//!
//! Tables are vectors of JSON rows evaluated with the same [`Filter`]
//! semantics the REST layer sends. Every call is recorded, failures can be
//! queued per operation, and a call can be held open until released.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

use crate::error::BackendError;
use crate::query::RowRange;
use crate::traits::{Backend, Filter, Row, Select};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    Select,
    Insert,
    Update,
    Delete,
    Upload,
    Download,
}

/// A call seen by [`MockBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct BackendCall {
    pub op: BackendOp,
    /// Table name, or bucket for storage calls.
    pub target: String,
    pub filters: Vec<Filter>,
    pub range: Option<RowRange>,
}

#[derive(Debug, Default)]
struct Hold {
    started: Notify,
    release: Notify,
}

/// Handle on a call parked by [`MockBackend::hold_next`].
#[derive(Debug, Clone)]
pub struct HeldCall {
    hold: Arc<Hold>,
}

impl HeldCall {
    /// Resolves once the held call has reached the backend.
    pub async fn started(&self) {
        self.hold.started.notified().await;
    }

    /// Let the held call proceed.
    pub fn release(&self) {
        self.hold.release.notify_one();
    }
}

#[derive(Debug, Clone)]
pub struct MockBackend {
    tables: Arc<Mutex<HashMap<String, Vec<Row>>>>,
    objects: Arc<Mutex<HashMap<(String, String), Bytes>>>,
    calls: Arc<Mutex<Vec<BackendCall>>>,
    failures: Arc<Mutex<HashMap<BackendOp, VecDeque<BackendError>>>>,
    holds: Arc<Mutex<HashMap<BackendOp, Arc<Hold>>>>,
    next_id: Arc<AtomicI64>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            tables: Arc::default(),
            objects: Arc::default(),
            calls: Arc::default(),
            failures: Arc::default(),
            holds: Arc::default(),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Replace the contents of `table`. Inserted ids continue after the
    /// largest numeric `id` seen.
    pub fn seed(&self, table: &str, rows: Vec<Row>) {
        let max_id = rows
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0);
        self.next_id.fetch_max(max_id + 1, AtomicOrdering::SeqCst);
        lock(&self.tables).insert(table.to_string(), rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        lock(&self.tables).get(table).cloned().unwrap_or_default()
    }

    pub fn put_object(&self, bucket: &str, path: &str, bytes: Bytes) {
        lock(&self.objects).insert((bucket.to_string(), path.to_string()), bytes);
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<Bytes> {
        lock(&self.objects)
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.calls).clone()
    }

    pub fn calls_of(&self, op: BackendOp) -> Vec<BackendCall> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.op == op)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Fail the next `op` with `error`. Queued failures are consumed in order.
    pub fn fail_next(&self, op: BackendOp, error: BackendError) {
        lock(&self.failures).entry(op).or_default().push_back(error);
    }

    /// Park the next `op` after it has been recorded, until released.
    pub fn hold_next(&self, op: BackendOp) -> HeldCall {
        let hold = Arc::new(Hold::default());
        lock(&self.holds).insert(op, hold.clone());
        HeldCall { hold }
    }

    async fn enter(
        &self,
        op: BackendOp,
        target: &str,
        filters: &[Filter],
        range: Option<RowRange>,
    ) -> Result<(), BackendError> {
        lock(&self.calls).push(BackendCall {
            op,
            target: target.to_string(),
            filters: filters.to_vec(),
            range,
        });

        let hold = lock(&self.holds).remove(&op);
        if let Some(hold) = hold {
            hold.started.notify_one();
            hold.release.notified().await;
        }

        let failure = lock(&self.failures).get_mut(&op).and_then(VecDeque::pop_front);
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn matches_all(filters: &[Filter], row: &Row) -> bool {
    filters.iter().all(|filter| filter.matches(row))
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        // Nulls sort last, as in Postgres.
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn merge(row: &mut Row, patch: &Row) {
    if let (Some(row), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
        for (column, value) in patch {
            row.insert(column.clone(), value.clone());
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn select(&self, query: &Select) -> Result<Vec<Row>, BackendError> {
        self.enter(BackendOp::Select, &query.table, &query.filters, query.range)
            .await?;

        let mut rows: Vec<Row> = self
            .rows(&query.table)
            .into_iter()
            .filter(|row| matches_all(&query.filters, row))
            .collect();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        if let Some(range) = query.range {
            let (offset, limit) = range.offset_limit();
            rows = rows.into_iter().skip(offset).take(limit).collect();
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, BackendError> {
        self.enter(BackendOp::Insert, table, &[], None).await?;

        let now = Utc::now().to_rfc3339();
        let inserted: Vec<Row> = rows
            .into_iter()
            .map(|mut row| {
                if let Some(object) = row.as_object_mut() {
                    if !object.contains_key("id") {
                        let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
                        object.insert("id".to_string(), Value::from(id));
                    }
                    object
                        .entry("created_at")
                        .or_insert_with(|| Value::from(now.clone()));
                }
                row
            })
            .collect();

        lock(&self.tables)
            .entry(table.to_string())
            .or_default()
            .extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn update(
        &self,
        table: &str,
        patch: Row,
        filters: &[Filter],
    ) -> Result<Vec<Row>, BackendError> {
        self.enter(BackendOp::Update, table, filters, None).await?;
        if filters.is_empty() {
            return Err(BackendError::InvalidRequest {
                message: "refusing to update without filters".to_string(),
            });
        }

        let mut tables = lock(&self.tables);
        let mut updated = Vec::new();
        for row in tables.entry(table.to_string()).or_default().iter_mut() {
            if matches_all(filters, row) {
                merge(row, &patch);
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        self.enter(BackendOp::Delete, table, filters, None).await?;
        if filters.is_empty() {
            return Err(BackendError::InvalidRequest {
                message: "refusing to delete without filters".to_string(),
            });
        }

        if let Some(rows) = lock(&self.tables).get_mut(table) {
            rows.retain(|row| !matches_all(filters, row));
        }
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        _content_type: &str,
    ) -> Result<String, BackendError> {
        self.enter(BackendOp::Upload, bucket, &[], None).await?;
        self.put_object(bucket, path, bytes);
        Ok(path.to_string())
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Bytes, BackendError> {
        self.enter(BackendOp::Download, bucket, &[], None).await?;
        self.object(bucket, path).ok_or_else(|| BackendError::Storage {
            bucket: bucket.to_string(),
            message: format!("object not found: {}", path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::range_for;
    use serde_json::json;

    fn seeded() -> MockBackend {
        let backend = MockBackend::new();
        backend.seed(
            "products",
            (1..=5)
                .map(|id| {
                    let owner = if id % 2 == 0 { "u2" } else { "u1" };
                    json!({ "id": id, "user_id": owner, "published": true })
                })
                .collect(),
        );
        backend
    }

    #[tokio::test]
    async fn test_select_filters_orders_and_ranges() {
        let backend = seeded();
        let rows = backend
            .select(
                &Select::from("products")
                    .eq("user_id", "u1")
                    .order("id", false)
                    .range(range_for(0, 2)),
            )
            .await
            .unwrap();
        let ids: Vec<i64> = rows.iter().filter_map(|r| r["id"].as_i64()).collect();
        assert_eq!(ids, vec![5, 3]);
        assert_eq!(backend.calls_of(BackendOp::Select)[0].range, Some(range_for(0, 2)));
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_after_seed() {
        let backend = seeded();
        let rows = backend
            .insert("products", vec![json!({ "user_id": "u1" })])
            .await
            .unwrap();
        assert_eq!(rows[0]["id"], json!(6));
        assert!(rows[0].get("created_at").is_some());
        assert_eq!(backend.rows("products").len(), 6);
    }

    #[tokio::test]
    async fn test_update_and_delete_by_filter() {
        let backend = seeded();
        let id = [Filter::Eq { column: "id".into(), value: json!(2) }];

        let updated = backend
            .update("products", json!({ "published": false }), &id)
            .await
            .unwrap();
        assert_eq!(updated[0]["published"], json!(false));

        backend.delete("products", &id).await.unwrap();
        assert_eq!(backend.rows("products").len(), 4);
        assert!(backend.delete("products", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_queued_failure_is_consumed_once() {
        let backend = seeded();
        backend.fail_next(BackendOp::Select, BackendError::Decode { message: "x".into() });

        assert!(backend.select(&Select::from("products")).await.is_err());
        assert!(backend.select(&Select::from("products")).await.is_ok());
    }

    #[tokio::test]
    async fn test_held_call_waits_for_release() {
        let backend = seeded();
        let held = backend.hold_next(BackendOp::Select);

        let task = {
            let backend = backend.clone();
            tokio::spawn(async move { backend.select(&Select::from("products")).await })
        };
        held.started().await;
        assert!(!task.is_finished());

        held.release();
        assert_eq!(task.await.unwrap().unwrap().len(), 5);
    }
}
