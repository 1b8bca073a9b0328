//! Remote store gateway
//!
//! The two external collaborators are modelled as traits:
//!
//! - `DocumentStore`: create/read/update/delete/query over the `pastes` collection
//! - `IdentityProvider`: register/login/logout plus session change notifications
//!
//! ## Backends
//!
//! - `memory`: in-process, for tests
//! - `local`: JSON files under the data directory (legacy local-first mode)
//! - `firebase`: Firebase Auth and Firestore over REST
//!
//! Access rules (only the owner may update or delete) are enforced by the
//! store backend, never by the client.

pub mod firebase;
pub mod local;
pub mod memory;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;

use crate::error::{AuthError, GatewayError};
use crate::models::{OwnedPaste, PasteField, PastePatch, PasteRecord, Session};

pub use firebase::{FirebaseAuth, FirestoreStore};
pub use local::{LocalIdentity, LocalStore};
pub use memory::{MemoryIdentity, MemoryStore};

/// Name of the paste collection
pub const COLLECTION: &str = "pastes";

/// Result type for store operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Document store holding the paste collection
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a new document; the store assigns and returns its id
    async fn add(&self, actor: &Session, record: &PasteRecord) -> GatewayResult<String>;

    /// Every document in the collection, in store order
    async fn list_all(&self, actor: Option<&Session>) -> GatewayResult<Vec<OwnedPaste>>;

    /// Documents whose `field` equals `value`
    async fn list_where(
        &self,
        actor: Option<&Session>,
        field: PasteField,
        value: &str,
    ) -> GatewayResult<Vec<OwnedPaste>>;

    /// A single document by id
    async fn get(&self, actor: Option<&Session>, id: &str) -> GatewayResult<Option<OwnedPaste>>;

    /// Overwrite title/content/createdAt of an existing document
    async fn update(&self, actor: &Session, id: &str, patch: &PastePatch) -> GatewayResult<()>;

    /// Delete a document; deleting a missing id succeeds
    async fn delete(&self, actor: &Session, id: &str) -> GatewayResult<()>;
}

/// Identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and sign it in
    async fn register(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Sign in to an existing account
    async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Sign out
    async fn logout(&self) -> Result<(), AuthError>;

    /// The currently signed-in session, if any
    fn current(&self) -> Option<Session>;

    /// Session change notifications
    ///
    /// The receiver's initial value is the present session.
    fn subscribe(&self) -> watch::Receiver<Option<Session>>;
}

/// Owner-only access rule shared by the local backends
pub(crate) fn check_owner(owner_id: &str, actor: &Session, id: &str) -> GatewayResult<()> {
    if !owner_id.is_empty() && owner_id == actor.uid {
        Ok(())
    } else {
        Err(GatewayError::PermissionDenied { id: id.to_string() })
    }
}

/// Persisted session, so later processes observe the same sign-in
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("session.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session
    ///
    /// A missing or unreadable file means no session.
    pub async fn load(&self) -> Option<Session> {
        let content = fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file {:?}: {}", self.path, e);
                None
            }
        }
    }

    pub async fn save(&self, session: &Session) -> GatewayResult<()> {
        let json = serde_json::to_vec_pretty(session)?;
        atomic_write(&self.path, &json).await
    }

    pub async fn clear(&self) -> GatewayResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GatewayError::io(e, &self.path)),
        }
    }
}

/// Write a file atomically: temp file in the same directory, then rename
pub(crate) async fn atomic_write(path: &Path, data: &[u8]) -> GatewayResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| GatewayError::io(e, parent))?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file = fs::File::create(&temp_path)
        .await
        .map_err(|e| GatewayError::io(e, &temp_path))?;
    file.write_all(data)
        .await
        .map_err(|e| GatewayError::io(e, &temp_path))?;
    file.sync_all()
        .await
        .map_err(|e| GatewayError::io(e, &temp_path))?;

    fs::rename(&temp_path, path)
        .await
        .map_err(|e| GatewayError::io(e, path))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_owner() {
        let actor = Session::new("u1", "a@example.com");
        assert!(check_owner("u1", &actor, "p").is_ok());
        assert!(matches!(
            check_owner("u2", &actor, "p"),
            Err(GatewayError::PermissionDenied { .. })
        ));
        // Legacy records have no owner and cannot be modified
        assert!(check_owner("", &actor, "p").is_err());
    }

    #[tokio::test]
    async fn test_session_file_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let file = SessionFile::new(temp_dir.path());

        assert!(file.load().await.is_none());

        let session = Session::new("u1", "a@example.com");
        file.save(&session).await.unwrap();
        assert_eq!(file.load().await, Some(session));

        file.clear().await.unwrap();
        assert!(file.load().await.is_none());
        // Clearing twice is fine
        file.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_session_file_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let file = SessionFile::new(temp_dir.path());
        tokio::fs::write(file.path(), b"not json").await.unwrap();
        assert!(file.load().await.is_none());
    }

    #[tokio::test]
    async fn test_atomic_write_creates_parent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("data.json");
        atomic_write(&path, b"[]").await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"[]");
        assert!(!path.with_extension("tmp").exists());
    }
}
