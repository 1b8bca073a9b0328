//! Paste client
//!
//! The `PasteClient` owns the session state, the paste collection state and
//! the gateway handles, and exposes one entry point per operation. Each
//! operation is a single request/response cycle against the store; nothing
//! is retried.
//!
//! ## Usage
//!
//! ```ignore
//! let mut client = PasteClient::new(store, identity);
//! client.start();
//! client.fetch_all().await?;
//! client.create(CreatePasteRequest::new("Notes", "...")).await?;
//! client.shutdown();
//! ```
//!
//! ## Notifications
//!
//! Every user action emits exactly one notice. Validation failures
//! (`Unauthenticated`, `InvalidInput`, `DuplicateTitle`) emit their own
//! notice and never reach the store; only a failed store call emits the
//! generic failure notice. Successful fetches are silent.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::collection::PasteCollection;
use crate::error::{AuthAction, AuthError, GatewayError, PasteError};
use crate::gateway::{DocumentStore, IdentityProvider};
use crate::legacy::LegacyPaste;
use crate::models::{
    CreatePasteRequest, OwnedPaste, Paste, PasteDetail, PasteField, PastePatch, PasteRecord,
    Session, UpdatePasteRequest,
};
use crate::notice::{Notice, Notifier};
use crate::session::{SessionState, SessionWatcher};

/// Outcome of importing a legacy export
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Pastes created in the store
    pub imported: Vec<Paste>,
    /// Entries that were rejected, by title
    pub rejected: Vec<(String, PasteError)>,
}

/// Client-side synchronization between the store and local view state
pub struct PasteClient {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    session: SessionState,
    pastes: PasteCollection,
    notifier: Notifier,
    notices: Option<mpsc::UnboundedReceiver<Notice>>,
    watcher: Option<SessionWatcher>,
}

impl PasteClient {
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        let (notifier, notices) = Notifier::channel();
        Self {
            store,
            identity,
            session: SessionState::new(),
            pastes: PasteCollection::new(),
            notifier,
            notices: Some(notices),
            watcher: None,
        }
    }

    /// Install the session subscription
    ///
    /// Call once at startup, within a tokio runtime. Calling again while
    /// running does nothing.
    pub fn start(&mut self) {
        if self.watcher.as_ref().is_some_and(SessionWatcher::is_running) {
            return;
        }
        self.watcher = Some(SessionWatcher::start(
            self.identity.as_ref(),
            self.session.clone(),
        ));
        debug!("Paste client started");
    }

    /// Release the session subscription
    pub fn shutdown(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
            debug!("Paste client stopped");
        }
    }

    /// Take the notice receiver (can only be called once)
    pub fn take_notices(&mut self) -> Option<mpsc::UnboundedReceiver<Notice>> {
        self.notices.take()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn pastes(&self) -> &PasteCollection {
        &self.pastes
    }

    // ==================== Session ====================

    /// Create an account; the new session replaces the current one
    pub async fn register(&mut self, email: &str, password: &str) -> Result<Session, AuthError> {
        let result = self.identity.register(email, password).await;
        self.finish_auth(AuthAction::Register, result)
    }

    /// Sign in; the new session replaces the current one
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Session, AuthError> {
        let result = self.identity.login(email, password).await;
        self.finish_auth(AuthAction::Login, result)
    }

    /// Sign out; the session becomes none
    pub async fn logout(&mut self) -> Result<(), AuthError> {
        match self.identity.logout().await {
            Ok(()) => {
                self.session.set(None);
                self.pastes.clear_mine();
                info!("Logged out");
                self.notifier.success(AuthAction::Logout.success_message());
                Ok(())
            }
            Err(e) => {
                warn!("Logout failed: {}", e);
                self.notifier.error(AuthAction::Logout.failure_message(&e));
                Err(e)
            }
        }
    }

    fn finish_auth(
        &mut self,
        action: AuthAction,
        result: Result<Session, AuthError>,
    ) -> Result<Session, AuthError> {
        match result {
            Ok(session) => {
                info!("{:?} succeeded for {}", action, session.uid);
                self.session.set(Some(session.clone()));
                self.pastes.clear_mine();
                self.notifier.success(action.success_message());
                Ok(session)
            }
            Err(e) => {
                warn!("{:?} failed: {}", action, e);
                self.notifier.error(action.failure_message(&e));
                Err(e)
            }
        }
    }

    // ==================== Fetch ====================

    /// Load every paste into the public view, without owners
    ///
    /// On failure the previous public view is left untouched.
    pub async fn fetch_all(&mut self) -> Result<(), PasteError> {
        debug!("Fetching all pastes");
        self.pastes.set_loading(true);
        let actor = self.session.current();
        let result = self.store.list_all(actor.as_ref()).await;
        self.pastes.set_loading(false);

        match result {
            Ok(docs) => {
                let pastes: Vec<Paste> = docs.into_iter().map(OwnedPaste::into_public).collect();
                debug!("Fetched {} pastes", pastes.len());
                self.pastes.replace_all(pastes);
                Ok(())
            }
            Err(e) => Err(self.remote_failure("Failed to load pastes.", e)),
        }
    }

    /// Load the session's own pastes (store-side filter on `ownerId`)
    ///
    /// A result that arrives after the session changed is discarded.
    pub async fn fetch_mine(&mut self) -> Result<(), PasteError> {
        let session = self.require_session()?;
        debug!("Fetching pastes owned by {}", session.uid);

        self.pastes.set_loading(true);
        let result = self
            .store
            .list_where(Some(&session), PasteField::OwnerId, &session.uid)
            .await;
        self.pastes.set_loading(false);

        let docs = match result {
            Ok(docs) => docs,
            Err(e) => return Err(self.remote_failure("Failed to load your pastes.", e)),
        };

        if self.session.uid().as_deref() != Some(session.uid.as_str()) {
            debug!("Session changed during fetch; discarding {} pastes", docs.len());
            return Ok(());
        }

        self.pastes.replace_mine(docs);
        Ok(())
    }

    // ==================== Mutations ====================

    /// Create a paste owned by the current session
    pub async fn create(&mut self, request: CreatePasteRequest) -> Result<Paste, PasteError> {
        self.create_at(request, Utc::now()).await
    }

    async fn create_at(
        &mut self,
        request: CreatePasteRequest,
        created_at: DateTime<Utc>,
    ) -> Result<Paste, PasteError> {
        let session = self.require_session()?;
        let fields = request.validate().map_err(|e| self.reject(e))?;
        if self.pastes.has_title(&fields.title) {
            return Err(self.reject(PasteError::DuplicateTitle));
        }

        let record = PasteRecord {
            title: fields.title,
            content: fields.content,
            created_at,
            owner_id: session.uid.clone(),
        };

        match self.store.add(&session, &record).await {
            Ok(id) => {
                info!("Created paste {}", id);
                let created = OwnedPaste::from_record(id, record);
                let paste = created.paste.clone();
                self.pastes.append_created(created);
                self.notifier.success("Paste created successfully!");
                Ok(paste)
            }
            Err(e) => Err(self.remote_failure("Failed to create paste.", e)),
        }
    }

    /// Overwrite title and content of a paste
    ///
    /// Titles are not re-checked for duplicates, and ownership is left to
    /// the store's access rules. `createdAt` is reset to now.
    pub async fn update(&mut self, request: UpdatePasteRequest) -> Result<Paste, PasteError> {
        let session = self.require_session()?;
        let fields = request.validate().map_err(|e| self.reject(e))?;

        let patch = PastePatch {
            title: fields.title,
            content: fields.content,
            created_at: Utc::now(),
        };

        match self.store.update(&session, &request.id, &patch).await {
            Ok(()) => {
                info!("Updated paste {}", request.id);
                let paste = Paste {
                    id: request.id,
                    title: patch.title,
                    content: patch.content,
                    created_at: patch.created_at,
                };
                self.pastes.apply_update(&paste);
                self.notifier.success("Paste updated!");
                Ok(paste)
            }
            Err(e) => Err(self.remote_failure("Failed to update paste.", e)),
        }
    }

    /// Delete a paste
    ///
    /// Removing an id that does not exist succeeds and changes nothing.
    pub async fn remove(&mut self, id: &str) -> Result<(), PasteError> {
        let session = self.require_session()?;

        match self.store.delete(&session, id).await {
            Ok(()) => {
                let touched = self.pastes.apply_removal(id);
                info!("Deleted paste {} ({} views updated)", id, touched);
                self.notifier.success("Paste deleted!");
                Ok(())
            }
            Err(e) => Err(self.remote_failure("Failed to delete paste.", e)),
        }
    }

    /// Re-create the entries of a legacy export under the current session
    ///
    /// Each entry goes through the same checks as `create`, so empty and
    /// duplicate titles are rejected individually. An entry's `createdAt` is
    /// kept; entries without one are stamped with the import time.
    pub async fn import_legacy(
        &mut self,
        entries: &[LegacyPaste],
    ) -> Result<ImportReport, PasteError> {
        self.require_session()?;

        let mut report = ImportReport::default();
        for entry in entries {
            let created_at = entry.created_at.unwrap_or_else(Utc::now);
            match self.create_at(entry.to_request(), created_at).await {
                Ok(paste) => report.imported.push(paste),
                Err(e) => report.rejected.push((entry.title.clone(), e)),
            }
        }

        info!(
            "Imported {} legacy pastes, {} rejected",
            report.imported.len(),
            report.rejected.len()
        );
        Ok(report)
    }

    // ==================== Views ====================

    /// Whether the current session owns the paste
    ///
    /// Judged from the owner view only, so it is false for every paste
    /// until `fetch_mine` has run for this session.
    pub fn can_modify(&self, id: &str) -> bool {
        match self.session.uid() {
            Some(uid) => self.pastes.is_owned_by(id, &uid),
            None => false,
        }
    }

    /// Detail of a cached paste
    ///
    /// Affordances come from `can_modify`, so they stay off until
    /// `fetch_mine` has loaded the owner view. `load_detail` compares
    /// owners directly.
    pub fn detail(&self, id: &str) -> Option<PasteDetail> {
        let paste = self.pastes.find(id)?.clone();
        Some(PasteDetail::new(paste, self.can_modify(id)))
    }

    /// Detail of any paste, asking the store for the owner when needed
    ///
    /// Used for direct links. A cached detail is returned as is when it
    /// already grants edit or there is no session; otherwise the document
    /// is read so ownership does not depend on `fetch_mine`. The owner is
    /// only compared against the session, never returned.
    pub async fn load_detail(&mut self, id: &str) -> Result<Option<PasteDetail>, PasteError> {
        let actor = self.session.current();
        let cached = self.detail(id);
        if let Some(detail) = &cached {
            if actor.is_none() || detail.affordances.edit {
                return Ok(cached);
            }
        }

        match self.store.get(actor.as_ref(), id).await {
            Ok(Some(doc)) => {
                let is_owner = actor.as_ref().is_some_and(|s| doc.is_owned_by(&s.uid));
                Ok(Some(PasteDetail::new(doc.into_public(), is_owner)))
            }
            Ok(None) => Ok(None),
            Err(e) if cached.is_some() => {
                warn!("Could not confirm owner of paste {}: {}", id, e);
                Ok(cached)
            }
            Err(e) => Err(self.remote_failure("Failed to load paste.", e)),
        }
    }

    /// Public pastes matching a title search
    pub fn search_all(&self, query: &str) -> Vec<&Paste> {
        self.pastes.search_all(query)
    }

    /// Own pastes matching a title search
    pub fn search_mine(&self, query: &str) -> Vec<&Paste> {
        self.pastes
            .search_mine(query)
            .into_iter()
            .map(|p| &p.paste)
            .collect()
    }

    // ==================== Helpers ====================

    fn require_session(&self) -> Result<Session, PasteError> {
        self.session
            .current()
            .ok_or_else(|| self.reject(PasteError::Unauthenticated))
    }

    /// Notify a locally detected rejection
    fn reject(&self, error: PasteError) -> PasteError {
        debug!("Rejected locally: {}", error.reason());
        self.notifier.error(error.to_string());
        error
    }

    /// Notify a failed store call
    fn remote_failure(&self, message: &str, error: GatewayError) -> PasteError {
        warn!("{} {}", message, error);
        self.notifier.error(message);
        PasteError::Remote(error)
    }
}

impl Drop for PasteClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}
