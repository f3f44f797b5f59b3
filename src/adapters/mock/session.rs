//! In-memory session storage for testing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::session::Session;
use crate::traits::{SessionStorage, SessionStorageError};

/// Session storage that never touches the file system.
///
/// ```ignore
/// let storage = InMemorySessionStorage::new();
/// assert!(storage.load().await?.is_none());
/// storage.save(&session).await?;
/// assert_eq!(storage.load().await?, Some(session));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStorage {
    session: Arc<Mutex<Option<Session>>>,
    save_should_fail: Arc<Mutex<bool>>,
    load_should_fail: Arc<Mutex<bool>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        let storage = Self::default();
        *lock(&storage.session) = Some(session);
        storage
    }

    pub fn set_save_should_fail(&self, should_fail: bool) {
        *lock(&self.save_should_fail) = should_fail;
    }

    pub fn set_load_should_fail(&self, should_fail: bool) {
        *lock(&self.load_should_fail) = should_fail;
    }

    /// What is stored right now, without going through the trait.
    pub fn stored(&self) -> Option<Session> {
        lock(&self.session).clone()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn load(&self) -> Result<Option<Session>, SessionStorageError> {
        if *lock(&self.load_should_fail) {
            return Err(SessionStorageError::Io("simulated load failure".to_string()));
        }
        Ok(self.stored())
    }

    async fn save(&self, session: &Session) -> Result<(), SessionStorageError> {
        if *lock(&self.save_should_fail) {
            return Err(SessionStorageError::Io("simulated save failure".to_string()));
        }
        *lock(&self.session) = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStorageError> {
        *lock(&self.session) = None;
        Ok(())
    }
}
