//! User profiles.

use async_trait::async_trait;
use tracing::info;

use super::{expect_single, Marketplace};
use crate::error::QueryError;
use crate::models::{tables, Profile, ProfilePatch, UserId};
use crate::query::{EntityQuery, Mutation, QueryGate, QueryKey, SingleQuery};
use crate::traits::{Backend, Filter, Select};

const RESOURCE: &str = "profile";

pub mod keys {
    use super::*;

    pub fn all() -> QueryKey {
        QueryKey::new(RESOURCE)
    }

    pub fn detail(id: &UserId) -> QueryKey {
        all().with(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProfileQuery {
    pub id: UserId,
}

#[async_trait]
impl SingleQuery for ProfileQuery {
    type Output = Profile;

    fn key(&self) -> QueryKey {
        keys::detail(&self.id)
    }

    async fn fetch(&self, backend: &dyn Backend) -> Result<Profile, QueryError> {
        let rows = backend
            .select(&Select::from(tables::PROFILES).eq("id", self.id.as_str()))
            .await?;
        expect_single(RESOURCE, rows)
    }
}

/// Arguments of [`Marketplace::update_profile`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateProfile {
    pub id: UserId,
    pub updates: ProfilePatch,
}

impl Marketplace {
    /// A profile that goes stale on the configured schedule. Inert while
    /// `id` is `None`.
    pub fn profile(&self, id: Option<UserId>) -> EntityQuery<ProfileQuery> {
        let gate = QueryGate::new(self.session(), move |_: Option<&UserId>| {
            id.clone().map(|id| ProfileQuery { id })
        });
        EntityQuery::new(self.client().clone(), self.backend(), gate)
    }

    /// A profile that is only refreshed on demand or by invalidation.
    pub fn non_stale_profile(&self, id: Option<UserId>) -> EntityQuery<ProfileQuery> {
        self.profile(id).non_stale()
    }

    /// The signed-in user's own profile, following sign-in and sign-out.
    pub fn own_profile(&self) -> EntityQuery<ProfileQuery> {
        let gate = QueryGate::new(self.session(), |user: Option<&UserId>| {
            user.map(|id| ProfileQuery { id: id.clone() })
        });
        EntityQuery::new(self.client().clone(), self.backend(), gate).non_stale()
    }

    /// Write profile columns and invalidate every cached profile.
    pub fn update_profile(&self) -> Mutation<UpdateProfile, Profile> {
        let client = self.client().clone();
        let backend = self.backend();
        Mutation::new(move |args: UpdateProfile| {
            let client = client.clone();
            let backend = backend.clone();
            async move {
                let body = serde_json::to_value(&args.updates)
                    .map_err(|err| QueryError::decode(RESOURCE, err))?;
                let filters = [Filter::Eq {
                    column: "id".to_string(),
                    value: args.id.as_str().into(),
                }];

                let rows = client
                    .with_timeout(async {
                        backend
                            .update(tables::PROFILES, body, &filters)
                            .await
                            .map_err(QueryError::from)
                    })
                    .await?;
                let profile: Profile = expect_single(RESOURCE, rows)?;

                info!(user = %profile.id, "updated profile");
                client.invalidate_queries(&keys::all());
                client.invalidate_queries(&keys::detail(&profile.id));
                Ok(profile)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_key() {
        let query = ProfileQuery {
            id: UserId::from("u1"),
        };
        assert_eq!(query.key().to_string(), r#"["profile",user:u1]"#);
        assert!(query.key().starts_with(&keys::all()));
    }
}
