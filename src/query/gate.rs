//! Enablement of queries that depend on who is signed in.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::models::UserId;
use crate::session::Session;

type Resolve<Q> = Arc<dyn Fn(Option<&UserId>) -> Option<Q> + Send + Sync>;

/// Turns the current session into the query to run, or `None` while a
/// required input is missing.
///
/// The gate reads the session on every call, so a query built before
/// sign-in becomes enabled as soon as a session arrives, and disabled again
/// on sign-out, without being rebuilt.
pub struct QueryGate<Q> {
    session: watch::Receiver<Option<Session>>,
    resolve: Resolve<Q>,
}

impl<Q> Clone for QueryGate<Q> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            resolve: Arc::clone(&self.resolve),
        }
    }
}

impl<Q> QueryGate<Q> {
    pub fn new<F>(session: watch::Receiver<Option<Session>>, resolve: F) -> Self
    where
        F: Fn(Option<&UserId>) -> Option<Q> + Send + Sync + 'static,
    {
        Self {
            session,
            resolve: Arc::new(resolve),
        }
    }

    /// A gate that is always open, for queries that need no session.
    pub fn always(query: Q) -> Self
    where
        Q: Clone + Send + Sync + 'static,
    {
        let (_tx, session) = watch::channel(None);
        Self::new(session, move |_| Some(query.clone()))
    }

    pub fn current(&self) -> Option<Q> {
        let user = self
            .session
            .borrow()
            .as_ref()
            .map(|session| session.user_id().clone());
        (self.resolve)(user.as_ref())
    }

    pub fn is_enabled(&self) -> bool {
        self.current().is_some()
    }

    /// Wait until the gate opens. Returns `None` if the session source goes
    /// away first.
    pub async fn wait_enabled(&self) -> Option<Q> {
        let mut session = self.session.clone();
        loop {
            if let Some(query) = self.current() {
                return Some(query);
            }
            if session.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Call `on_enabled` with the resolved query now and after every session
    /// change that yields a different enabled query. Returns when the
    /// session source is dropped.
    pub async fn for_each_enabled<F, Fut>(&self, mut on_enabled: F)
    where
        Q: Clone + PartialEq,
        F: FnMut(Q) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut session = self.session.clone();
        let mut last: Option<Q> = None;
        loop {
            let current = self.current();
            if let Some(query) = &current {
                if last.as_ref() != Some(query) {
                    on_enabled(query.clone()).await;
                }
            }
            last = current;
            if session.changed().await.is_err() {
                return;
            }
        }
    }
}
