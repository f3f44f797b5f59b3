//! [`Backend`] over the hosted REST (PostgREST) and storage APIs.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::config::BackendConfig;
use crate::error::{classify_http_error, BackendError};
use crate::session::Session;
use crate::traits::{Backend, Filter, Headers, HttpClient, HttpMethod, Response, Row, Select};

/// Error body returned by the REST layer.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Speaks the REST protocol through an [`HttpClient`].
///
/// Requests carry the anonymous key plus, when a session is present, the
/// user's access token so that row-level policies apply.
pub struct RestBackend {
    config: BackendConfig,
    http: Arc<dyn HttpClient>,
    session: Option<watch::Receiver<Option<Session>>>,
}

impl RestBackend {
    pub fn new(config: BackendConfig, http: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http,
            session: None,
        }
    }

    /// Authenticate requests as whoever is signed in on `session`.
    pub fn with_session(mut self, session: watch::Receiver<Option<Session>>) -> Self {
        self.session = Some(session);
        self
    }

    fn headers(&self) -> Headers {
        let token = self
            .session
            .as_ref()
            .and_then(|rx| rx.borrow().as_ref().map(|s| s.access_token.clone()))
            .unwrap_or_else(|| self.config.anon_key.clone());

        let mut headers = Headers::new();
        headers.insert("apikey".to_string(), self.config.anon_key.clone());
        headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        headers
    }

    fn json_headers(&self) -> Headers {
        let mut headers = self.headers();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Prefer".to_string(), "return=representation".to_string());
        headers
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.config.rest_url(), urlencoding::encode(table))
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        let path = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/object/{}/{}",
            self.config.storage_url(),
            urlencoding::encode(bucket),
            path
        )
    }

    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<Bytes>,
        headers: &Headers,
    ) -> Result<Response, BackendError> {
        debug!(%method, url, "backend request");
        self.http
            .request(method, url, body, headers)
            .await
            .map_err(|err| BackendError::Network(classify_http_error(err, url)))
    }

    fn rows(response: Response) -> Result<Vec<Row>, BackendError> {
        if !response.is_success() {
            return Err(api_error(&response));
        }
        if response.body.is_empty() {
            return Ok(Vec::new());
        }
        Ok(response.json::<Vec<Row>>()?)
    }
}

/// Render a select as a query string, e.g.
/// `select=*&published=eq.true&order=created_at.desc&offset=0&limit=8`.
pub fn select_query_string(select: &Select) -> String {
    let mut params = vec![format!("select={}", urlencoding::encode(&select.columns))];
    params.extend(select.filters.iter().map(filter_param));
    if let Some(order) = &select.order {
        params.push(format!(
            "order={}.{}",
            urlencoding::encode(&order.column),
            if order.ascending { "asc" } else { "desc" }
        ));
    }
    if let Some(range) = &select.range {
        let (offset, limit) = range.offset_limit();
        params.push(format!("offset={}&limit={}", offset, limit));
    }
    params.join("&")
}

fn filter_param(filter: &Filter) -> String {
    let (column, op, value) = match filter {
        Filter::Eq { column, value: Value::Null } => (column, "is", "null".to_string()),
        Filter::Neq { column, value: Value::Null } => (column, "not.is", "null".to_string()),
        Filter::Eq { column, value } => (column, "eq", scalar(value)),
        Filter::Neq { column, value } => (column, "neq", scalar(value)),
        Filter::Contains { column, text } => (column, "ilike", contains_pattern(text)),
    };
    format!(
        "{}={}.{}",
        urlencoding::encode(column),
        op,
        urlencoding::encode(&value)
    )
}

/// `ilike` operand matching `text` anywhere, with the user's text taken
/// literally.
///
/// `%`, `_` and `\` are escaped for LIKE. The server turns every `*` into
/// `%`, so a typed asterisk becomes the single-character wildcard. Operands
/// containing filter delimiters are double-quoted.
fn contains_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        match c {
            '%' | '_' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '*' => escaped.push('_'),
            _ => escaped.push(c),
        }
    }
    let pattern = format!("*{}*", escaped);
    if pattern.contains(|c: char| matches!(c, ',' | '(' | ')' | ':' | '"')) {
        format!("\"{}\"", pattern.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        pattern
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn api_error(response: &Response) -> BackendError {
    let body: ApiErrorBody = response.json().unwrap_or_default();
    let message = body
        .message
        .or(body.error)
        .or(body.details)
        .or_else(|| response.text().ok().filter(|t| !t.is_empty()))
        .unwrap_or_else(|| format!("HTTP {}", response.status));
    BackendError::Api {
        status: response.status,
        code: body.code,
        message,
    }
}

fn require_filters(operation: &str, filters: &[Filter]) -> Result<(), BackendError> {
    if filters.is_empty() {
        return Err(BackendError::InvalidRequest {
            message: format!("refusing to {} without filters", operation),
        });
    }
    Ok(())
}

#[async_trait]
impl Backend for RestBackend {
    async fn select(&self, query: &Select) -> Result<Vec<Row>, BackendError> {
        let url = format!("{}?{}", self.table_url(&query.table), select_query_string(query));
        let response = self.send(HttpMethod::Get, &url, None, &self.headers()).await?;
        Self::rows(response)
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, BackendError> {
        let body = serde_json::to_vec(&rows)?;
        let response = self
            .send(
                HttpMethod::Post,
                &self.table_url(table),
                Some(Bytes::from(body)),
                &self.json_headers(),
            )
            .await?;
        Self::rows(response)
    }

    async fn update(
        &self,
        table: &str,
        patch: Row,
        filters: &[Filter],
    ) -> Result<Vec<Row>, BackendError> {
        require_filters("update", filters)?;
        let query: Vec<String> = filters.iter().map(filter_param).collect();
        let url = format!("{}?{}", self.table_url(table), query.join("&"));
        let body = serde_json::to_vec(&patch)?;
        let response = self
            .send(HttpMethod::Patch, &url, Some(Bytes::from(body)), &self.json_headers())
            .await?;
        Self::rows(response)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        require_filters("delete", filters)?;
        let query: Vec<String> = filters.iter().map(filter_param).collect();
        let url = format!("{}?{}", self.table_url(table), query.join("&"));
        let response = self.send(HttpMethod::Delete, &url, None, &self.headers()).await?;
        if !response.is_success() {
            return Err(api_error(&response));
        }
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, BackendError> {
        let mut headers = self.headers();
        headers.insert("Content-Type".to_string(), content_type.to_string());
        headers.insert("x-upsert".to_string(), "false".to_string());

        let url = self.object_url(bucket, path);
        let response = self.send(HttpMethod::Post, &url, Some(bytes), &headers).await?;
        if !response.is_success() {
            return Err(storage_error(bucket, &response));
        }
        Ok(path.to_string())
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Bytes, BackendError> {
        let url = self.object_url(bucket, path);
        let response = self.send(HttpMethod::Get, &url, None, &self.headers()).await?;
        if !response.is_success() {
            return Err(storage_error(bucket, &response));
        }
        Ok(response.body)
    }
}

fn storage_error(bucket: &str, response: &Response) -> BackendError {
    let message = match api_error(response) {
        BackendError::Api { message, .. } => message,
        other => other.to_string(),
    };
    BackendError::Storage {
        bucket: bucket.to_string(),
        message: format!("{} (HTTP {})", message, response.status),
    }
}
