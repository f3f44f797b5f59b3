use serde::{Deserialize, Serialize};

/// Product category (a `categories` row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
}
