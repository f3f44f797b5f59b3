//! Single owner of the current session.

use tokio::sync::watch;
use tracing::info;

use super::Session;
use crate::models::UserId;

/// Holds the current session and publishes every change.
///
/// The application root owns one store. Everything that depends on who is
/// signed in takes a receiver from [`subscribe`](SessionStore::subscribe);
/// dropping that receiver unsubscribes.
#[derive(Debug)]
pub struct SessionStore {
    tx: watch::Sender<Option<Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn with_session(session: Session) -> Self {
        let (tx, _rx) = watch::channel(Some(session));
        Self { tx }
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.tx.borrow().as_ref().map(|s| s.user_id().clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Replace the session. Subscribers are woken only when the session
    /// actually changed.
    pub fn set(&self, session: Session) {
        let user = session.user_id().clone();
        let changed = self.tx.send_if_modified(|current| {
            if current.as_ref() == Some(&session) {
                return false;
            }
            *current = Some(session);
            true
        });
        if changed {
            info!(user = %user, "session updated");
        }
    }

    pub fn clear(&self) {
        let changed = self.tx.send_if_modified(|current| current.take().is_some());
        if changed {
            info!("session cleared");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionUser;

    fn session(user: &str, token: &str) -> Session {
        Session {
            access_token: token.to_string(),
            refresh_token: "r".to_string(),
            expires_at: i64::MAX,
            user: SessionUser {
                id: user.into(),
                email: None,
            },
        }
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();
        assert!(rx.borrow().is_none());

        store.set(session("u1", "a"));
        rx.changed().await.unwrap();
        assert_eq!(store.user_id(), Some(UserId::from("u1")));
        assert_eq!(rx.borrow_and_update().as_ref().map(|s| s.access_token.clone()), Some("a".to_string()));

        store.clear();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
        assert!(!store.is_signed_in());
    }

    #[test]
    fn test_setting_same_session_is_silent() {
        let store = SessionStore::with_session(session("u1", "a"));
        let rx = store.subscribe();
        store.set(session("u1", "a"));
        assert!(!rx.has_changed().unwrap());

        store.set(session("u1", "b"));
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn test_clear_when_signed_out_is_silent() {
        let store = SessionStore::new();
        let rx = store.subscribe();
        store.clear();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_dropping_receiver_unsubscribes() {
        let store = SessionStore::new();
        let rx = store.subscribe();
        assert_eq!(store.subscriber_count(), 1);
        drop(rx);
        assert_eq!(store.subscriber_count(), 0);
    }
}
