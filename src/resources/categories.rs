//! The category list.

use async_trait::async_trait;

use super::{decode_rows, Marketplace};
use crate::error::QueryError;
use crate::models::{tables, Category};
use crate::query::{EntityQuery, QueryGate, QueryKey, SingleQuery};
use crate::traits::{Backend, Select};

/// All categories, in backend order. Needs no session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CategoriesQuery;

#[async_trait]
impl SingleQuery for CategoriesQuery {
    type Output = Vec<Category>;

    fn key(&self) -> QueryKey {
        QueryKey::new("categories")
    }

    async fn fetch(&self, backend: &dyn Backend) -> Result<Vec<Category>, QueryError> {
        let rows = backend.select(&Select::from(tables::CATEGORIES)).await?;
        decode_rows("category", rows)
    }
}

impl Marketplace {
    pub fn categories(&self) -> EntityQuery<CategoriesQuery> {
        EntityQuery::new(
            self.client().clone(),
            self.backend(),
            QueryGate::always(CategoriesQuery),
        )
    }
}
