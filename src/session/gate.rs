//! Keeps the query cache in step with who is signed in.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::Session;
use crate::models::UserId;
use crate::query::QueryClient;
use crate::resources::{listings, profiles};

/// Watches the session and evicts cache entries that belonged to a user
/// who is no longer signed in.
///
/// On every change of user:
/// - entries whose key names the previous user are removed, along with the
///   drafts, which are implicitly the previous user's;
/// - the new user's profile is invalidated so a non-stale profile query
///   fetches it again.
pub struct AuthGate {
    client: QueryClient,
    session: watch::Receiver<Option<Session>>,
}

fn user_of(session: &watch::Receiver<Option<Session>>) -> Option<UserId> {
    session.borrow().as_ref().map(|s| s.user_id().clone())
}

impl AuthGate {
    pub fn new(client: QueryClient, session: watch::Receiver<Option<Session>>) -> Self {
        Self { client, session }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until the session store is dropped.
    pub async fn run(mut self) {
        let mut last = user_of(&self.session);
        while self.session.changed().await.is_ok() {
            let current = user_of(&self.session);
            if current != last {
                user_changed(&self.client, last.as_ref(), current.as_ref());
                last = current;
            }
        }
        debug!("session source closed, auth gate stopping");
    }
}

/// Apply the eviction rules for a switch from `previous` to `current`.
pub fn user_changed(client: &QueryClient, previous: Option<&UserId>, current: Option<&UserId>) {
    if let Some(previous) = previous {
        let drafts = listings::keys::drafts();
        let removed =
            client.remove_where(|key| key.mentions_user(previous) || key.starts_with(&drafts));
        info!(user = %previous, removed, "evicted previous user's cache entries");
    }
    if let Some(current) = current {
        client.invalidate_queries(&profiles::keys::detail(current));
    }
}
