//! In-process gateway backends
//!
//! Behave like the hosted services (store-assigned ids, owner-only access
//! rules, provider error codes) without any I/O. Both count calls and can be
//! switched offline to exercise failure paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use super::{check_owner, DocumentStore, GatewayResult, IdentityProvider};
use crate::error::{AuthError, GatewayError};
use crate::models::{OwnedPaste, PasteField, PastePatch, PasteRecord, Session};

/// In-memory document store
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<Vec<(String, PasteRecord)>>,
    next_id: AtomicU64,
    calls: AtomicUsize,
    offline: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail with `GatewayError::Unavailable`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay every subsequent call
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(|e| e.into_inner()) = latency;
    }

    /// Insert a document directly, bypassing access rules
    pub fn seed(&self, record: PasteRecord) -> String {
        let id = self.allocate_id();
        self.lock().push((id.clone(), record));
        id
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, PasteRecord)>> {
        self.docs.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn allocate_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("mem-{:06}", n)
    }

    async fn begin_call(&self) -> GatewayResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add(&self, _actor: &Session, record: &PasteRecord) -> GatewayResult<String> {
        self.begin_call().await?;
        Ok(self.seed(record.clone()))
    }

    async fn list_all(&self, _actor: Option<&Session>) -> GatewayResult<Vec<OwnedPaste>> {
        self.begin_call().await?;
        Ok(self
            .lock()
            .iter()
            .map(|(id, record)| OwnedPaste::from_record(id.clone(), record.clone()))
            .collect())
    }

    async fn list_where(
        &self,
        _actor: Option<&Session>,
        field: PasteField,
        value: &str,
    ) -> GatewayResult<Vec<OwnedPaste>> {
        self.begin_call().await?;
        Ok(self
            .lock()
            .iter()
            .filter(|(_, record)| record.field(field) == value)
            .map(|(id, record)| OwnedPaste::from_record(id.clone(), record.clone()))
            .collect())
    }

    async fn get(&self, _actor: Option<&Session>, id: &str) -> GatewayResult<Option<OwnedPaste>> {
        self.begin_call().await?;
        Ok(self
            .lock()
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(id, record)| OwnedPaste::from_record(id.clone(), record.clone())))
    }

    async fn update(&self, actor: &Session, id: &str, patch: &PastePatch) -> GatewayResult<()> {
        self.begin_call().await?;
        let mut docs = self.lock();
        let (_, record) = docs
            .iter_mut()
            .find(|(doc_id, _)| doc_id == id)
            .ok_or_else(|| GatewayError::NotFound { id: id.to_string() })?;
        check_owner(&record.owner_id, actor, id)?;
        record.title = patch.title.clone();
        record.content = patch.content.clone();
        record.created_at = patch.created_at;
        Ok(())
    }

    async fn delete(&self, actor: &Session, id: &str) -> GatewayResult<()> {
        self.begin_call().await?;
        let mut docs = self.lock();
        if let Some(pos) = docs.iter().position(|(doc_id, _)| doc_id == id) {
            check_owner(&docs[pos].1.owner_id, actor, id)?;
            docs.remove(pos);
        }
        Ok(())
    }
}

/// In-memory identity provider
#[derive(Debug)]
pub struct MemoryIdentity {
    /// email -> (uid, password)
    accounts: Mutex<HashMap<String, (String, String)>>,
    next_uid: AtomicU64,
    offline: AtomicBool,
    session: watch::Sender<Option<Session>>,
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::new()),
            next_uid: AtomicU64::new(0),
            offline: AtomicBool::new(false),
            session,
        }
    }
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a transport error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Push a session change as if the provider reported it
    pub fn set_session(&self, session: Option<Session>) {
        self.session.send_replace(session);
    }

    fn check_online(&self) -> Result<(), AuthError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(AuthError::Transport("identity provider offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn register(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.check_online()?;
        if !email.contains('@') {
            return Err(AuthError::from_code("auth/invalid-email"));
        }

        let uid = {
            let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
            if accounts.contains_key(email) {
                return Err(AuthError::from_code("auth/email-already-in-use"));
            }
            let n = self.next_uid.fetch_add(1, Ordering::SeqCst) + 1;
            let uid = format!("uid-{}", n);
            accounts.insert(email.to_string(), (uid.clone(), password.to_string()));
            uid
        };

        let session = Session::new(uid, email);
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.check_online()?;
        let uid = {
            let accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
            match accounts.get(email) {
                None => return Err(AuthError::from_code("auth/user-not-found")),
                Some((_, stored)) if stored != password => {
                    return Err(AuthError::from_code("auth/wrong-password"))
                }
                Some((uid, _)) => uid.clone(),
            }
        };

        let session = Session::new(uid, email);
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn logout(&self) -> Result<(), AuthError> {
        self.check_online()?;
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

    fn record(title: &str, owner: &str) -> PasteRecord {
        PasteRecord {
            title: title.to_string(),
            content: "content".to_string(),
            created_at: Utc::now(),
            owner_id: owner.to_string(),
        }
    }

    #[tokio::test]
    async fn test_store_assigns_ids() {
        let store = MemoryStore::new();
        let actor = Session::new("u1", "a@example.com");
        let a = store.add(&actor, &record("A", "u1")).await.unwrap();
        let b = store.add(&actor, &record("B", "u1")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
        assert_eq!(store.call_count(), 2);
    }

    #[tokio::test]
    async fn test_list_where_filters() {
        let store = MemoryStore::new();
        store.seed(record("A", "u1"));
        store.seed(record("B", "u2"));
        store.seed(record("C", "u1"));

        let mine = store
            .list_where(None, PasteField::OwnerId, "u1")
            .await
            .unwrap();
        let titles: Vec<_> = mine.iter().map(|p| p.paste.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_access_rules() {
        let store = MemoryStore::new();
        let id = store.seed(record("A", "u1"));
        let intruder = Session::new("u2", "b@example.com");
        let patch = PastePatch {
            title: "hacked".to_string(),
            content: "x".to_string(),
            created_at: Utc::now(),
        };

        assert!(matches!(
            store.update(&intruder, &id, &patch).await,
            Err(GatewayError::PermissionDenied { .. })
        ));
        assert!(matches!(
            store.delete(&intruder, &id).await,
            Err(GatewayError::PermissionDenied { .. })
        ));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_and_delete_missing() {
        let store = MemoryStore::new();
        let actor = Session::new("u1", "a@example.com");
        let patch = PastePatch {
            title: "t".to_string(),
            content: "c".to_string(),
            created_at: Utc::now(),
        };
        assert!(matches!(
            store.update(&actor, "nope", &patch).await,
            Err(GatewayError::NotFound { .. })
        ));
        assert!(store.delete(&actor, "nope").await.is_ok());
    }

    #[tokio::test]
    async fn test_offline() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(matches!(
            store.list_all(None).await,
            Err(GatewayError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_identity_register_login_logout() {
        let identity = MemoryIdentity::new();
        let mut rx = identity.subscribe();

        let session = identity.register("a@example.com", "hunter22").await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().clone(), Some(session.clone()));

        assert_eq!(
            identity.register("a@example.com", "other").await,
            Err(AuthError::EmailInUse)
        );
        assert_eq!(
            identity.login("a@example.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            identity.login("b@example.com", "hunter22").await,
            Err(AuthError::InvalidCredentials)
        );

        let again = identity.login("a@example.com", "hunter22").await.unwrap();
        assert_eq!(again.uid, session.uid);

        identity.logout().await.unwrap();
        assert!(identity.current().is_none());
    }

    #[tokio::test]
    async fn test_identity_invalid_email() {
        let identity = MemoryIdentity::new();
        assert_eq!(
            identity.register("not-an-email", "pw").await,
            Err(AuthError::InvalidEmail)
        );
    }
}
