//! File-based session storage adapter.
//!
//! The session is kept as pretty-printed JSON in `~/.bazaar/session.json`.
//!
//! ```ignore
//! use bazaar::adapters::FileSessionStorage;
//! use bazaar::traits::SessionStorage;
//!
//! let storage = FileSessionStorage::new()?;
//! if let Some(session) = storage.load().await? {
//!     println!("signed in as {}", session.user_id());
//! }
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::session::Session;
use crate::traits::{SessionStorage, SessionStorageError};

const SESSION_DIR: &str = ".bazaar";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    /// Storage under the user's home directory.
    pub fn new() -> Result<Self, SessionStorageError> {
        let home = dirs::home_dir().ok_or(SessionStorageError::NoHomeDirectory)?;
        Ok(Self::with_path(home.join(SESSION_DIR).join(SESSION_FILE)))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<Session>, SessionStorageError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(SessionStorageError::Io(err.to_string())),
        };
        serde_json::from_reader(BufReader::new(file))
            .map(Some)
            .map_err(|err| SessionStorageError::Serialization(err.to_string()))
    }

    fn write(&self, session: &Session) -> Result<(), SessionStorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| SessionStorageError::Io(err.to_string()))?;
        }
        let file = File::create(&self.path).map_err(|err| SessionStorageError::Io(err.to_string()))?;
        restrict_permissions(&file);

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, session)
            .map_err(|err| SessionStorageError::Serialization(err.to_string()))?;
        writer
            .flush()
            .map_err(|err| SessionStorageError::Io(err.to_string()))
    }

    fn remove(&self) -> Result<(), SessionStorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SessionStorageError::Io(err.to_string())),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &File) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(err) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
        warn!("could not restrict session file permissions: {}", err);
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &File) {}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn load(&self) -> Result<Option<Session>, SessionStorageError> {
        let session = self.read();
        if let Err(err) = &session {
            warn!(path = %self.path.display(), "unreadable session file: {}", err);
        }
        session
    }

    async fn save(&self, session: &Session) -> Result<(), SessionStorageError> {
        self.write(session)?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStorageError> {
        self.remove()?;
        debug!(path = %self.path.display(), "session cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionUser;
    use tempfile::TempDir;

    fn session() -> Session {
        Session {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: 1_900_000_000,
            user: SessionUser {
                id: "u1".into(),
                email: Some("ada@example.com".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = FileSessionStorage::with_path(dir.path().join("session.json"));
        assert_eq!(storage.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_creates_parent_and_loads_back() {
        let dir = TempDir::new().unwrap();
        let storage = FileSessionStorage::with_path(dir.path().join("nested").join("session.json"));

        storage.save(&session()).await.unwrap();
        assert_eq!(storage.load().await.unwrap(), Some(session()));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = FileSessionStorage::with_path(dir.path().join("session.json"));

        storage.save(&session()).await.unwrap();
        storage.clear().await.unwrap();
        storage.clear().await.unwrap();
        assert_eq!(storage.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{ not json").unwrap();

        let err = FileSessionStorage::with_path(path).load().await.unwrap_err();
        assert!(matches!(err, SessionStorageError::Serialization(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let storage = FileSessionStorage::with_path(dir.path().join("session.json"));
        storage.save(&session()).await.unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
