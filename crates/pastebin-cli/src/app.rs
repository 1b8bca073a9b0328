//! Client wiring for CLI commands
//!
//! Builds the gateway backends selected by the configuration, starts the
//! paste client and relays its notices to the terminal.

use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use pastebin_core::gateway::{FirebaseAuth, FirestoreStore, LocalIdentity, LocalStore};
use pastebin_core::{
    AuthError, Backend, Config, DocumentStore, IdentityProvider, Notice, PasteClient, PasteError,
};

use crate::output::Output;

/// A started paste client plus the configuration it was built from
pub struct App {
    pub client: PasteClient,
    pub config: Config,
    notices: UnboundedReceiver<Notice>,
}

impl App {
    /// Open the configured backend and start the client
    pub async fn open(config: Config) -> Result<Self> {
        let (store, identity): (Arc<dyn DocumentStore>, Arc<dyn IdentityProvider>) =
            match config.backend {
                Backend::Local => (
                    Arc::new(LocalStore::new(&config.data_dir)),
                    Arc::new(LocalIdentity::open(&config.data_dir).await),
                ),
                Backend::Firebase => {
                    let (api_key, project_id) = config.firebase_settings()?;
                    (
                        Arc::new(FirestoreStore::new(&project_id)),
                        Arc::new(FirebaseAuth::open(api_key, &config.data_dir).await),
                    )
                }
            };
        debug!("Opened {} backend", config.backend);

        let mut client = PasteClient::new(store, identity);
        client.start();
        let Some(notices) = client.take_notices() else {
            bail!("Notice channel already taken");
        };

        Ok(Self {
            client,
            config,
            notices,
        })
    }

    /// Load the public paste list
    pub async fn refresh(&mut self, output: &Output) -> Result<()> {
        let result = self.client.fetch_all().await;
        self.flush(output);
        Ok(result?)
    }

    /// Load the signed-in user's pastes
    pub async fn refresh_mine(&mut self, output: &Output) -> Result<()> {
        let result = self.client.fetch_mine().await;
        self.flush(output);
        Ok(result?)
    }

    /// Print every pending notice
    pub fn flush(&mut self, output: &Output) {
        while let Ok(notice) = self.notices.try_recv() {
            output.notice(&notice);
        }
    }

    pub fn shutdown(&mut self, output: &Output) {
        self.flush(output);
        self.client.shutdown();
    }
}

/// Whether the error was already shown to the user as a notice
pub fn already_reported(error: &anyhow::Error) -> bool {
    error.is::<PasteError>() || error.is::<AuthError>()
}

/// Resolve a full id or unique prefix against the public list
///
/// Unknown ids are passed through unchanged so direct links still resolve
/// against the store.
pub fn resolve_id(app: &App, id: &str) -> Result<String> {
    let pastes = app.client.pastes().all();
    if pastes.iter().any(|p| p.id == id) {
        return Ok(id.to_string());
    }

    let matches: Vec<_> = pastes.iter().filter(|p| p.id.starts_with(id)).collect();
    match matches.len() {
        0 => Ok(id.to_string()),
        1 => Ok(matches[0].id.clone()),
        _ => {
            eprintln!("Multiple pastes match '{}':", id);
            for paste in &matches {
                eprintln!("  {} - {}", paste.id, paste.title);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pastebin_core::CreatePasteRequest;
    use tempfile::TempDir;

    fn local_config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.data_dir = dir.path().to_path_buf();
        config
    }

    #[tokio::test]
    async fn test_open_local_and_resolve_prefix() {
        let dir = TempDir::new().unwrap();
        let mut app = App::open(local_config(&dir)).await.unwrap();
        let output = Output::new(crate::output::OutputFormat::Quiet);

        app.client
            .register("me@example.com", "secret-pw")
            .await
            .unwrap();
        let paste = app
            .client
            .create(CreatePasteRequest::new("Hello", "world"))
            .await
            .unwrap();
        app.refresh(&output).await.unwrap();

        assert_eq!(resolve_id(&app, &paste.id[..6]).unwrap(), paste.id);
        assert_eq!(resolve_id(&app, "zzz-unknown").unwrap(), "zzz-unknown");
        app.shutdown(&output);
    }

    #[tokio::test]
    async fn test_firebase_backend_requires_settings() {
        let dir = TempDir::new().unwrap();
        let mut config = local_config(&dir);
        config.backend = Backend::Firebase;
        config.firebase_api_key = None;
        assert!(App::open(config).await.is_err());
    }

    #[test]
    fn test_already_reported() {
        assert!(already_reported(&anyhow::Error::new(
            PasteError::Unauthenticated
        )));
        assert!(!already_reported(&anyhow::anyhow!("editor failed")));
    }
}
