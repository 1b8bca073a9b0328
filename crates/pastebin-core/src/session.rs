//! Session state
//!
//! Holds the current identity (or none) and a readiness flag. The identity
//! provider's change notifications flow into it through a `SessionWatcher`,
//! which is started once when the client starts and stopped on shutdown.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::gateway::IdentityProvider;
use crate::models::Session;

/// Point-in-time view of the session state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// The signed-in identity, or `None` for anonymous browsing
    pub session: Option<Session>,
    /// Whether the provider has reported at least once
    pub ready: bool,
}

/// Process-wide session state
///
/// Cheap to clone; all clones share one value.
#[derive(Debug, Clone)]
pub struct SessionState {
    tx: Arc<watch::Sender<SessionSnapshot>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    /// Current session, if signed in
    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().session.clone()
    }

    /// Uid of the current session
    pub fn uid(&self) -> Option<String> {
        self.tx.borrow().session.as_ref().map(|s| s.uid.clone())
    }

    pub fn is_ready(&self) -> bool {
        self.tx.borrow().ready
    }

    /// Replace the session and mark the state ready
    pub fn set(&self, session: Option<Session>) {
        self.tx.send_replace(SessionSnapshot {
            session,
            ready: true,
        });
    }

    /// Observe session changes
    pub fn observe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }
}

/// Forwards identity-provider notifications into a `SessionState`
///
/// The forwarding task is aborted by `stop()` or when the watcher is dropped.
#[derive(Debug)]
pub struct SessionWatcher {
    handle: Option<JoinHandle<()>>,
}

impl SessionWatcher {
    /// Install the subscription
    ///
    /// The provider's present session is applied immediately; the state is
    /// ready once this returns. Must be called within a tokio runtime.
    pub fn start(provider: &dyn IdentityProvider, state: SessionState) -> Self {
        let mut rx = provider.subscribe();
        state.set(rx.borrow_and_update().clone());

        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let session = rx.borrow_and_update().clone();
                debug!(
                    "Session changed: {}",
                    session.as_ref().map(|s| s.uid.as_str()).unwrap_or("<none>")
                );
                state.set(session);
            }
            debug!("Identity provider closed its session channel");
        });

        Self {
            handle: Some(handle),
        }
    }

    /// Whether the forwarding task is still installed
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Release the subscription
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SessionWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
