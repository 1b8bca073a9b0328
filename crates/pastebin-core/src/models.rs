//! Data models for Pasteboard
//!
//! Defines the paste records in their three shapes:
//! - `Paste`: the public view record, which has no owner field at all
//! - `OwnedPaste`: a paste together with the uid that created it
//! - `PasteRecord`: the document body persisted in the store
//!
//! plus the typed request payloads for create/update and the `Session`.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PasteError;

/// A paste as seen by public views
///
/// Carries no owner information.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Paste {
    /// Store-assigned identifier
    pub id: String,
    /// Title (trimmed, non-empty)
    pub title: String,
    /// Paste body
    pub content: String,
    /// When this paste was created (or last updated, see `PastePatch`)
    pub created_at: DateTime<Utc>,
}

impl Paste {
    /// Number of lines in the content (an empty paste has one line)
    pub fn line_count(&self) -> usize {
        self.content.split('\n').count()
    }

    /// Number of characters in the content
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// Case-insensitive substring match on the title
    ///
    /// An empty query matches every paste.
    pub fn matches_search(&self, query: &str) -> bool {
        self.title
            .to_lowercase()
            .contains(&query.trim().to_lowercase())
    }
}

/// A paste together with its owner
///
/// Only produced by owner-scoped reads and by `create`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OwnedPaste {
    #[serde(flatten)]
    pub paste: Paste,
    /// Uid of the session that created the paste; empty for legacy records
    #[serde(default)]
    pub owner_id: String,
}

impl OwnedPaste {
    /// Assemble from a store id and a persisted record
    pub fn from_record(id: impl Into<String>, record: PasteRecord) -> Self {
        Self {
            paste: Paste {
                id: id.into(),
                title: record.title,
                content: record.content,
                created_at: record.created_at,
            },
            owner_id: record.owner_id,
        }
    }

    /// Drop the owner, producing the public view record
    pub fn into_public(self) -> Paste {
        self.paste
    }

    /// Whether `uid` owns this paste
    pub fn is_owned_by(&self, uid: &str) -> bool {
        !self.owner_id.is_empty() && self.owner_id == uid
    }
}

/// The persisted document body of a paste
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PasteRecord {
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub owner_id: String,
}

impl PasteRecord {
    /// String value of a queryable field
    pub fn field(&self, field: PasteField) -> String {
        match field {
            PasteField::Title => self.title.clone(),
            PasteField::Content => self.content.clone(),
            PasteField::CreatedAt => format_timestamp(&self.created_at),
            PasteField::OwnerId => self.owner_id.clone(),
        }
    }
}

/// Fields written by an update
///
/// `created_at` is overwritten with the update time, matching the hosted app.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PastePatch {
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Queryable document fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteField {
    Title,
    Content,
    CreatedAt,
    OwnerId,
}

impl PasteField {
    /// Field name as stored in the document
    pub fn as_str(&self) -> &'static str {
        match self {
            PasteField::Title => "title",
            PasteField::Content => "content",
            PasteField::CreatedAt => "createdAt",
            PasteField::OwnerId => "ownerId",
        }
    }
}

impl fmt::Display for PasteField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated title/content pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteFields {
    /// Trimmed title
    pub title: String,
    /// Content, stored verbatim
    pub content: String,
}

fn validate_fields(title: &str, content: &str) -> Result<PasteFields, PasteError> {
    let title = title.trim();
    if title.is_empty() || content.trim().is_empty() {
        return Err(PasteError::InvalidInput);
    }
    Ok(PasteFields {
        title: title.to_string(),
        content: content.to_string(),
    })
}

/// Payload for creating a paste
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePasteRequest {
    pub title: String,
    pub content: String,
}

impl CreatePasteRequest {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Reject empty (after trimming) title or content
    pub fn validate(&self) -> Result<PasteFields, PasteError> {
        validate_fields(&self.title, &self.content)
    }
}

/// Payload for updating a paste
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePasteRequest {
    pub id: String,
    pub title: String,
    pub content: String,
}

impl UpdatePasteRequest {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    /// Reject empty (after trimming) title or content
    pub fn validate(&self) -> Result<PasteFields, PasteError> {
        validate_fields(&self.title, &self.content)
    }
}

/// Key used for duplicate-title detection
pub fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

/// ISO-8601 timestamp with millisecond precision, as stored in documents
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The current authenticated identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Opaque identity-provider uid
    pub uid: String,
    /// Display only; never shown next to pastes
    pub email: String,
    /// Provider tokens, when the provider issues any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

impl Session {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            credentials: None,
        }
    }

    /// Bearer token for authenticated store requests
    pub fn id_token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.id_token.as_str())
    }
}

/// Tokens issued by a hosted identity provider
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub id_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Actions a view may offer for a paste
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Affordances {
    pub edit: bool,
    pub delete: bool,
}

impl Affordances {
    /// Edit and delete are offered to the owner only
    pub fn for_owner(is_owner: bool) -> Self {
        Self {
            edit: is_owner,
            delete: is_owner,
        }
    }
}

/// Everything the detail view renders for one paste
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasteDetail {
    pub paste: Paste,
    pub line_count: usize,
    pub char_count: usize,
    pub affordances: Affordances,
}

impl PasteDetail {
    pub fn new(paste: Paste, is_owner: bool) -> Self {
        Self {
            line_count: paste.line_count(),
            char_count: paste.char_count(),
            affordances: Affordances::for_owner(is_owner),
            paste,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_paste(title: &str, content: &str) -> Paste {
        Paste {
            id: "p1".to_string(),
            title: title.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_trims_title() {
        let req = CreatePasteRequest::new("  Notes  ", "body\n");
        let fields = req.validate().unwrap();
        assert_eq!(fields.title, "Notes");
        assert_eq!(fields.content, "body\n");
    }

    #[test]
    fn test_validate_rejects_blank() {
        let req = CreatePasteRequest::new("  ", "content");
        assert!(matches!(req.validate(), Err(PasteError::InvalidInput)));

        let req = UpdatePasteRequest::new("id", "title", " \n\t");
        assert!(matches!(req.validate(), Err(PasteError::InvalidInput)));
    }

    #[test]
    fn test_title_key() {
        assert_eq!(title_key("Notes"), title_key("notes "));
        assert_ne!(title_key("Notes"), title_key("Notes 2"));
    }

    #[test]
    fn test_matches_search() {
        let paste = sample_paste("Rust Snippets", "fn main() {}");
        assert!(paste.matches_search("rust"));
        assert!(paste.matches_search("SNIP"));
        assert!(paste.matches_search(""));
        assert!(!paste.matches_search("python"));
    }

    #[test]
    fn test_line_and_char_count() {
        assert_eq!(sample_paste("t", "").line_count(), 1);
        let paste = sample_paste("t", "one\ntwo\nthree");
        assert_eq!(paste.line_count(), 3);
        assert_eq!(paste.char_count(), 13);
        assert_eq!(sample_paste("t", "héllo").char_count(), 5);
    }

    #[test]
    fn test_public_serialization_has_no_owner() {
        let owned = OwnedPaste {
            paste: sample_paste("Title", "Body"),
            owner_id: "u1".to_string(),
        };
        let json = serde_json::to_value(owned.clone().into_public()).unwrap();
        assert!(json.get("ownerId").is_none());
        assert_eq!(json["title"], "Title");

        let json = serde_json::to_value(&owned).unwrap();
        assert_eq!(json["ownerId"], "u1");
        assert_eq!(json["id"], "p1");
    }

    #[test]
    fn test_record_field_names() {
        let json = r#"{"title":"A","content":"B","createdAt":"2024-05-01T10:00:00.000Z","ownerId":"u1"}"#;
        let record: PasteRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.field(PasteField::OwnerId), "u1");
        assert_eq!(
            record.field(PasteField::CreatedAt),
            "2024-05-01T10:00:00.000Z"
        );
    }

    #[test]
    fn test_legacy_record_without_owner() {
        let json = r#"{"title":"A","content":"B","createdAt":"2024-05-01T10:00:00.000Z"}"#;
        let record: PasteRecord = serde_json::from_str(json).unwrap();
        let owned = OwnedPaste::from_record("x", record);
        assert!(!owned.is_owned_by(""));
        assert!(!owned.is_owned_by("u1"));
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let creds = Credentials {
            id_token: "secret-id".to_string(),
            refresh_token: "secret-refresh".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_detail_affordances() {
        let detail = PasteDetail::new(sample_paste("t", "a\nb"), false);
        assert_eq!(detail.affordances, Affordances::default());
        assert_eq!(detail.line_count, 2);

        let detail = PasteDetail::new(sample_paste("t", "a"), true);
        assert!(detail.affordances.edit && detail.affordances.delete);
    }
}
