//! Error types
//!
//! - `PasteError`: outcome of a synchronization operation
//! - `GatewayError`: the document store rejected or could not serve a request
//! - `AuthError`: the identity provider rejected a register/login/logout
//!
//! Each carries the user-facing notification text for its outcome.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by paste synchronization operations
///
/// The first three variants are detected locally before any store call.
#[derive(Error, Debug)]
pub enum PasteError {
    /// Mutating operation without a session
    #[error("Please login to continue.")]
    Unauthenticated,

    /// Empty title or content after trimming
    #[error("Title and content cannot be empty!")]
    InvalidInput,

    /// Case-insensitive title collision at create time
    #[error("A paste with this title already exists!")]
    DuplicateTitle,

    /// The store call itself failed
    #[error("Remote store request failed: {0}")]
    Remote(#[from] GatewayError),
}

impl PasteError {
    /// Short reason tag carried by a rejected outcome
    pub fn reason(&self) -> &'static str {
        match self {
            PasteError::Unauthenticated => "unauthenticated",
            PasteError::InvalidInput => "invalid-input",
            PasteError::DuplicateTitle => "duplicate-title",
            PasteError::Remote(_) => "remote-failure",
        }
    }

    /// Whether the error was detected locally, before any store call
    pub fn is_validation(&self) -> bool {
        !matches!(self, PasteError::Remote(_))
    }
}

/// Errors from a document store backend
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Transport-level HTTP failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error status
    #[error("Store returned {status}: {message}")]
    Status { status: u16, message: String },

    /// No document with this id
    #[error("Paste not found: '{id}'")]
    NotFound { id: String },

    /// Access rules refused the request
    #[error("Permission denied for paste '{id}'")]
    PermissionDenied { id: String },

    /// Request needs a signed-in session with valid credentials
    #[error("Not signed in, or the session has expired. Please login again.")]
    Unauthorized,

    /// Failed to read or write local storage
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Stored or received JSON could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A response did not have the expected shape
    #[error("Malformed store response: {0}")]
    Malformed(String),

    /// Failure injected by the in-memory backend
    #[error("Store unavailable")]
    Unavailable,
}

impl GatewayError {
    pub fn io(source: io::Error, path: impl Into<PathBuf>) -> Self {
        GatewayError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether retrying later might succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GatewayError::Http(_) | GatewayError::Unavailable | GatewayError::Unauthorized
        ) || matches!(self, GatewayError::Status { status, .. } if *status >= 500)
    }
}

/// Errors from the identity provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Email already registered.")]
    EmailInUse,

    #[error("Invalid email.")]
    InvalidEmail,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    /// Unrecognized provider code
    #[error("Identity provider error: {code}")]
    Provider { code: String },

    /// The provider could not be reached
    #[error("Identity provider unreachable: {0}")]
    Transport(String),
}

impl AuthError {
    /// Classify a provider error code by its known substrings
    pub fn from_code(code: &str) -> Self {
        if code.contains("email-already-in-use") {
            AuthError::EmailInUse
        } else if code.contains("invalid-email") {
            AuthError::InvalidEmail
        } else if code.contains("user-not-found")
            || code.contains("wrong-password")
            || code.contains("invalid-credential")
        {
            AuthError::InvalidCredentials
        } else {
            AuthError::Provider {
                code: code.to_string(),
            }
        }
    }
}

/// Identity operations, for choosing notification text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    Register,
    Login,
    Logout,
}

impl AuthAction {
    /// Success notification
    pub fn success_message(&self) -> &'static str {
        match self {
            AuthAction::Register => "Account created! Welcome 👋",
            AuthAction::Login => "Logged in!",
            AuthAction::Logout => "Logged out.",
        }
    }

    /// Failure notification
    ///
    /// Registration only recognizes email errors and login only recognizes
    /// credential errors; anything else gets the generic text.
    pub fn failure_message(&self, error: &AuthError) -> String {
        match (self, error) {
            (AuthAction::Register, AuthError::EmailInUse)
            | (AuthAction::Register, AuthError::InvalidEmail)
            | (AuthAction::Login, AuthError::InvalidCredentials) => error.to_string(),
            (AuthAction::Register, _) => "Registration failed. Try again.".to_string(),
            (AuthAction::Login, _) => "Login failed. Try again.".to_string(),
            (AuthAction::Logout, _) => "Logout failed. Try again.".to_string(),
        }
    }
}
