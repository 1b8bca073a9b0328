//! Legacy local paste exports
//!
//! Before pastes lived in a document store they were kept as a JSON array
//! under the `"pastes"` key of browser local storage, without owners. This
//! module reads such an export so its entries can be re-created under a
//! signed-in session.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::CreatePasteRequest;

/// One entry of a legacy export
///
/// The old client-generated `_id` is ignored; the store assigns new ids.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyPaste {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Kept on import; missing timestamps become the import time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl LegacyPaste {
    pub fn to_request(&self) -> CreatePasteRequest {
        CreatePasteRequest::new(self.title.clone(), self.content.clone())
    }
}

/// Parse a legacy export
///
/// Accepts either the bare array or an object holding it under `"pastes"`.
pub fn parse_export(json: &str) -> Result<Vec<LegacyPaste>, serde_json::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Export {
        Array(Vec<LegacyPaste>),
        Slot { pastes: Vec<LegacyPaste> },
    }

    Ok(match serde_json::from_str::<Export>(json)? {
        Export::Array(pastes) => pastes,
        Export::Slot { pastes } => pastes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_array() {
        let json = r#"[
            {"_id":"lx1","title":"Hello","content":"World","createdAt":"2024-03-01T12:00:00.000Z"},
            {"title":"No id","content":"still fine"}
        ]"#;
        let pastes = parse_export(json).unwrap();
        assert_eq!(pastes.len(), 2);
        assert_eq!(
            pastes[0].created_at.map(|t| t.to_rfc3339()).as_deref(),
            Some("2024-03-01T12:00:00+00:00")
        );
        assert!(pastes[1].created_at.is_none());
        assert_eq!(pastes[1].to_request().title, "No id");
    }

    #[test]
    fn test_parse_slot_object() {
        let json = r#"{"pastes":[{"_id":"a","title":"T","content":"C"}]}"#;
        let pastes = parse_export(json).unwrap();
        assert_eq!(pastes.len(), 1);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_export("{\"nope\": 1}").is_err());
        assert!(parse_export("not json").is_err());
    }
}
