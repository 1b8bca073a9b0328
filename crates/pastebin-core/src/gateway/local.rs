//! Local-first backends
//!
//! Storage location: the configured data directory.
//!
//! Files:
//! - `pastes.json` - JSON array of paste documents (the legacy `"pastes"` slot)
//! - `accounts.json` - local accounts with salted SHA-256 password digests
//! - `session.json` - the signed-in session
//!
//! Records use the legacy `_id` key. Records written before ownership existed
//! have no `ownerId`; they load as unowned and cannot be modified.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::{watch, Mutex};
use tracing::debug;
use uuid::Uuid;

use super::{atomic_write, check_owner, DocumentStore, GatewayResult, IdentityProvider, SessionFile};
use crate::error::{AuthError, GatewayError};
use crate::models::{OwnedPaste, PasteField, PastePatch, PasteRecord, Session};

/// Minimum password length accepted by the local provider
const MIN_PASSWORD_LEN: usize = 6;

/// A paste document as stored in `pastes.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPaste {
    #[serde(rename = "_id")]
    id: String,
    #[serde(flatten)]
    record: PasteRecord,
}

/// JSON-file document store
pub struct LocalStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl LocalStore {
    /// Open the store in `data_dir`; the file is created on first write
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("pastes.json"),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> GatewayResult<Vec<StoredPaste>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(GatewayError::io(e, &self.path)),
        }
    }

    async fn save(&self, docs: &[StoredPaste]) -> GatewayResult<()> {
        let json = serde_json::to_vec_pretty(docs)?;
        atomic_write(&self.path, &json).await
    }
}

fn to_owned_paste(doc: StoredPaste) -> OwnedPaste {
    OwnedPaste::from_record(doc.id, doc.record)
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn add(&self, _actor: &Session, record: &PasteRecord) -> GatewayResult<String> {
        let _guard = self.lock.lock().await;
        let mut docs = self.load().await?;
        let id = Uuid::new_v4().simple().to_string();
        docs.push(StoredPaste {
            id: id.clone(),
            record: record.clone(),
        });
        self.save(&docs).await?;
        debug!("Stored paste {} in {:?}", id, self.path);
        Ok(id)
    }

    async fn list_all(&self, _actor: Option<&Session>) -> GatewayResult<Vec<OwnedPaste>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_iter().map(to_owned_paste).collect())
    }

    async fn list_where(
        &self,
        _actor: Option<&Session>,
        field: PasteField,
        value: &str,
    ) -> GatewayResult<Vec<OwnedPaste>> {
        let _guard = self.lock.lock().await;
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|doc| doc.record.field(field) == value)
            .map(to_owned_paste)
            .collect())
    }

    async fn get(&self, _actor: Option<&Session>, id: &str) -> GatewayResult<Option<OwnedPaste>> {
        let _guard = self.lock.lock().await;
        Ok(self
            .load()
            .await?
            .into_iter()
            .find(|doc| doc.id == id)
            .map(to_owned_paste))
    }

    async fn update(&self, actor: &Session, id: &str, patch: &PastePatch) -> GatewayResult<()> {
        let _guard = self.lock.lock().await;
        let mut docs = self.load().await?;
        let doc = docs
            .iter_mut()
            .find(|doc| doc.id == id)
            .ok_or_else(|| GatewayError::NotFound { id: id.to_string() })?;
        check_owner(&doc.record.owner_id, actor, id)?;

        doc.record.title = patch.title.clone();
        doc.record.content = patch.content.clone();
        doc.record.created_at = patch.created_at;
        self.save(&docs).await
    }

    async fn delete(&self, actor: &Session, id: &str) -> GatewayResult<()> {
        let _guard = self.lock.lock().await;
        let mut docs = self.load().await?;
        let Some(pos) = docs.iter().position(|doc| doc.id == id) else {
            return Ok(());
        };
        check_owner(&docs[pos].record.owner_id, actor, id)?;
        docs.remove(pos);
        self.save(&docs).await
    }
}

/// A local account
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    uid: String,
    email: String,
    /// hex(sha256(uid ":" password))
    password_hash: String,
}

/// Identity provider backed by `accounts.json`
///
/// Error codes follow the hosted provider's vocabulary so the same
/// notification mapping applies.
pub struct LocalIdentity {
    accounts_path: PathBuf,
    session_file: SessionFile,
    session: watch::Sender<Option<Session>>,
    lock: Mutex<()>,
}

impl LocalIdentity {
    /// Open the provider, restoring the persisted session
    pub async fn open(data_dir: &Path) -> Self {
        let session_file = SessionFile::new(data_dir);
        let restored = session_file.load().await;
        let (session, _) = watch::channel(restored);
        Self {
            accounts_path: data_dir.join("accounts.json"),
            session_file,
            session,
            lock: Mutex::new(()),
        }
    }

    async fn load_accounts(&self) -> Result<Vec<Account>, AuthError> {
        match tokio::fs::read_to_string(&self.accounts_path).await {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| AuthError::Transport(format!("corrupt accounts file: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(AuthError::Transport(e.to_string())),
        }
    }

    async fn sign_in(&self, session: Session) -> Result<Session, AuthError> {
        self.session_file
            .save(&session)
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }
}

fn password_hash(uid: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(uid.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn register(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AuthError::from_code("auth/invalid-email"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::from_code("auth/weak-password"));
        }

        let account = {
            let _guard = self.lock.lock().await;
            let mut accounts = self.load_accounts().await?;
            if accounts.iter().any(|a| a.email.eq_ignore_ascii_case(email)) {
                return Err(AuthError::from_code("auth/email-already-in-use"));
            }

            let uid = Uuid::new_v4().simple().to_string();
            let account = Account {
                password_hash: password_hash(&uid, password),
                uid,
                email: email.to_string(),
            };
            accounts.push(account.clone());

            let json = serde_json::to_vec_pretty(&accounts)
                .map_err(|e| AuthError::Transport(e.to_string()))?;
            atomic_write(&self.accounts_path, &json)
                .await
                .map_err(|e| AuthError::Transport(e.to_string()))?;
            account
        };

        debug!("Registered local account {}", account.uid);
        self.sign_in(Session::new(account.uid, account.email)).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AuthError::from_code("auth/invalid-email"));
        }

        let account = {
            let _guard = self.lock.lock().await;
            self.load_accounts()
                .await?
                .into_iter()
                .find(|a| a.email.eq_ignore_ascii_case(email))
                .ok_or_else(|| AuthError::from_code("auth/user-not-found"))?
        };

        if account.password_hash != password_hash(&account.uid, password) {
            return Err(AuthError::from_code("auth/wrong-password"));
        }

        self.sign_in(Session::new(account.uid, account.email)).await
    }

    async fn logout(&self) -> Result<(), AuthError> {
        self.session_file
            .clear()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        self.session.send_replace(None);
        Ok(())
    }

    fn current(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(title: &str, owner: &str) -> PasteRecord {
        PasteRecord {
            title: title.to_string(),
            content: "body".to_string(),
            created_at: Utc::now(),
            owner_id: owner.to_string(),
        }
    }

    #[tokio::test]
    async fn test_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let actor = Session::new("u1", "a@example.com");

        let id = {
            let store = LocalStore::new(temp_dir.path());
            store.add(&actor, &record("First", "u1")).await.unwrap()
        };

        let store = LocalStore::new(temp_dir.path());
        let all = store.list_all(None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].paste.id, id);
        assert_eq!(all[0].owner_id, "u1");
    }

    #[tokio::test]
    async fn test_store_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());
        assert!(store.list_all(None).await.unwrap().is_empty());
        assert!(store.get(None, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_reads_legacy_array() {
        let temp_dir = TempDir::new().unwrap();
        let legacy = r#"[
            {"_id":"abc123","title":"Old","content":"from localStorage","createdAt":"2024-01-02T03:04:05.000Z"}
        ]"#;
        tokio::fs::write(temp_dir.path().join("pastes.json"), legacy)
            .await
            .unwrap();

        let store = LocalStore::new(temp_dir.path());
        let all = store.list_all(None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].paste.id, "abc123");
        assert!(all[0].owner_id.is_empty());

        // Unowned legacy records cannot be deleted
        let actor = Session::new("u1", "a@example.com");
        assert!(matches!(
            store.delete(&actor, "abc123").await,
            Err(GatewayError::PermissionDenied { .. })
        ));
    }

    #[tokio::test]
    async fn test_store_update_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path());
        let owner = Session::new("u1", "a@example.com");
        let id = store.add(&owner, &record("Title", "u1")).await.unwrap();

        let patch = PastePatch {
            title: "New".to_string(),
            content: "changed".to_string(),
            created_at: Utc::now(),
        };
        store.update(&owner, &id, &patch).await.unwrap();
        let updated = store.get(None, &id).await.unwrap().unwrap();
        assert_eq!(updated.paste.title, "New");
        assert_eq!(updated.owner_id, "u1");

        let by_owner = store
            .list_where(None, PasteField::OwnerId, "u1")
            .await
            .unwrap();
        assert_eq!(by_owner.len(), 1);

        store.delete(&owner, &id).await.unwrap();
        assert!(store.list_all(None).await.unwrap().is_empty());
        store.delete(&owner, &id).await.unwrap();
    }

    #[tokio::test]
    async fn test_identity_register_and_login() {
        let temp_dir = TempDir::new().unwrap();
        let identity = LocalIdentity::open(temp_dir.path()).await;
        assert!(identity.current().is_none());

        let session = identity
            .register("someone@example.com", "secret-pw")
            .await
            .unwrap();
        assert_eq!(identity.current(), Some(session.clone()));

        assert_eq!(
            identity.register("SOMEONE@example.com", "secret-pw").await,
            Err(AuthError::EmailInUse)
        );

        identity.logout().await.unwrap();
        assert!(identity.current().is_none());

        assert_eq!(
            identity.login("someone@example.com", "bad-password").await,
            Err(AuthError::InvalidCredentials)
        );
        let again = identity
            .login("someone@example.com", "secret-pw")
            .await
            .unwrap();
        assert_eq!(again.uid, session.uid);
    }

    #[tokio::test]
    async fn test_identity_session_survives_restart() {
        let temp_dir = TempDir::new().unwrap();
        let uid = {
            let identity = LocalIdentity::open(temp_dir.path()).await;
            identity
                .register("a@example.com", "secret-pw")
                .await
                .unwrap()
                .uid
        };

        let identity = LocalIdentity::open(temp_dir.path()).await;
        assert_eq!(identity.current().map(|s| s.uid), Some(uid));
    }

    #[tokio::test]
    async fn test_identity_validation_codes() {
        let temp_dir = TempDir::new().unwrap();
        let identity = LocalIdentity::open(temp_dir.path()).await;

        assert_eq!(
            identity.register("nope", "secret-pw").await,
            Err(AuthError::InvalidEmail)
        );
        assert!(matches!(
            identity.register("a@example.com", "123").await,
            Err(AuthError::Provider { .. })
        ));
        assert_eq!(
            identity.login("ghost@example.com", "secret-pw").await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn test_password_hash_is_salted() {
        assert_ne!(password_hash("u1", "pw"), password_hash("u2", "pw"));
        assert_eq!(password_hash("u1", "pw").len(), 64);
    }
}
