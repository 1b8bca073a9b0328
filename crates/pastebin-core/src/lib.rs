//! Pastebin Core Library
//!
//! This crate provides the client-side state and synchronization layer of a
//! small pastebin: signed-in users create, edit and delete text pastes that
//! everyone can read.
//!
//! # Architecture
//!
//! - **Document store**: the source of truth, reached through `DocumentStore`
//! - **Identity provider**: email/password accounts, reached through
//!   `IdentityProvider`, which also pushes session changes
//!
//! The client keeps two read caches (all pastes, and the session's own
//! pastes) and reconciles every successful mutation into both.
//!
//! # Quick Start
//!
//! ```text
//! let store = Arc::new(LocalStore::new(&config.data_dir));
//! let identity = Arc::new(LocalIdentity::open(&config.data_dir).await);
//! let mut client = PasteClient::new(store, identity);
//! client.start();
//!
//! client.fetch_all().await?;
//! client.create(CreatePasteRequest::new("Notes", "hello")).await?;
//! ```
//!
//! # Modules
//!
//! - `client`: Synchronization operations (main entry point)
//! - `models`: Paste, session and request types
//! - `gateway`: Store and identity provider traits plus backends
//! - `session`: Session state and provider subscription
//! - `collection`: Local paste caches and reconciliation
//! - `notice`: User-facing notifications
//! - `legacy`: Import of old local-storage exports
//! - `config`: Application configuration

pub mod client;
pub mod collection;
pub mod config;
pub mod error;
pub mod gateway;
pub mod legacy;
pub mod models;
pub mod notice;
pub mod session;

pub use client::{ImportReport, PasteClient};
pub use collection::PasteCollection;
pub use config::{Backend, Config};
pub use error::{AuthAction, AuthError, GatewayError, PasteError};
pub use gateway::{DocumentStore, IdentityProvider};
pub use legacy::{parse_export, LegacyPaste};
pub use models::{
    Affordances, CreatePasteRequest, OwnedPaste, Paste, PasteDetail, Session,
    UpdatePasteRequest,
};
pub use notice::{Notice, NoticeLevel};
pub use session::{SessionSnapshot, SessionState};
