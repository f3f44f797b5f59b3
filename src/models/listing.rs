use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Primary key of a row in the `products` table.
pub type ListingId = i64;

/// A listing (a `products` row).
///
/// New listings start life as empty drafts; every descriptive column is
/// therefore nullable until the seller fills the form in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub user_id: UserId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub published: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Listing {
    pub fn status(&self) -> ListingStatus {
        if self.published {
            ListingStatus::Published
        } else {
            ListingStatus::Draft
        }
    }

    /// Apply a patch in place. Only fields present in the patch change.
    pub fn apply(&mut self, patch: &ListingPatch) {
        if let Some(title) = &patch.title {
            self.title = Some(title.clone());
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(price) = patch.price {
            self.price = Some(price);
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = Some(category_id);
        }
        if let Some(images) = &patch.images {
            self.images = images.clone();
        }
        if let Some(published) = patch.published {
            self.published = published;
        }
    }
}

/// Body of an insert into `products`. A fresh listing only carries its
/// owner and starts unpublished; everything else is filled in later
/// through a [`ListingPatch`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingDraft {
    pub user_id: UserId,
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ListingDraft {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            published: false,
            title: None,
        }
    }
}

/// Publication state of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingStatus {
    Draft,
    Published,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Draft => "draft",
            ListingStatus::Published => "published",
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, ListingStatus::Published)
    }
}

/// Partial update for a listing. `None` fields are left untouched and are
/// omitted from the request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

impl ListingPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_price(mut self, price: i64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn with_published(mut self, published: bool) -> Self {
        self.published = Some(published);
        self
    }

    /// Whether applying this patch can move the listing between the draft
    /// and published collections.
    pub fn changes_status(&self) -> bool {
        self.published.is_some()
    }
}
