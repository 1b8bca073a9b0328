//! Firebase backends over REST
//!
//! - `FirebaseAuth`: Identity Toolkit (`accounts:signUp`,
//!   `accounts:signInWithPassword`) and Secure Token (refresh)
//! - `FirestoreStore`: Firestore documents API for the `pastes` collection
//!
//! Documents use string fields `title`, `content`, `createdAt` (ISO-8601)
//! and `ownerId`. Access rules live in the Firestore security rules; a
//! refused request surfaces as `GatewayError::PermissionDenied`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{DocumentStore, GatewayResult, IdentityProvider, SessionFile, COLLECTION};
use crate::error::{AuthError, GatewayError};
use crate::models::{
    format_timestamp, Credentials, OwnedPaste, PasteField, PastePatch, PasteRecord, Session,
};

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";
const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

/// Request timeout
const REQUEST_TIMEOUT: u64 = 15;

/// Documents per page when listing the collection
const PAGE_SIZE: u32 = 300;

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT))
        .user_agent(concat!("pasteboard/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// Error body shared by the Google REST APIs
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

async fn error_message(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error.message)
        .unwrap_or(text)
}

/// Map an Identity Toolkit error message onto the SDK's `auth/...` codes
///
/// Messages look like `EMAIL_EXISTS` or `WEAK_PASSWORD : Password should be ...`.
fn auth_code(message: &str) -> String {
    let head = message.split_whitespace().next().unwrap_or_default();
    let code = match head {
        "EMAIL_EXISTS" => "email-already-in-use",
        "INVALID_EMAIL" => "invalid-email",
        "EMAIL_NOT_FOUND" => "user-not-found",
        "INVALID_PASSWORD" => "wrong-password",
        "INVALID_LOGIN_CREDENTIALS" => "invalid-credential",
        "USER_DISABLED" => "user-disabled",
        other => return format!("auth/{}", other.to_lowercase().replace('_', "-")),
    };
    format!("auth/{}", code)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    user_id: String,
}

/// Firebase Auth identity provider
pub struct FirebaseAuth {
    http: reqwest::Client,
    api_key: String,
    session_file: SessionFile,
    session: watch::Sender<Option<Session>>,
}

impl FirebaseAuth {
    /// Open the provider, restoring and refreshing the persisted session
    ///
    /// A session whose refresh is rejected is discarded; one that cannot be
    /// refreshed because the service is unreachable is kept as is.
    pub async fn open(api_key: impl Into<String>, data_dir: &Path) -> Self {
        let auth = Self {
            http: http_client(),
            api_key: api_key.into(),
            session_file: SessionFile::new(data_dir),
            session: watch::channel(None).0,
        };

        if let Some(stored) = auth.session_file.load().await {
            let restored = match auth.refresh(&stored).await {
                Ok(session) => {
                    if let Err(e) = auth.session_file.save(&session).await {
                        warn!("Failed to persist refreshed session: {}", e);
                    }
                    Some(session)
                }
                Err(AuthError::Transport(e)) => {
                    warn!("Could not refresh session, keeping stored tokens: {}", e);
                    Some(stored)
                }
                Err(e) => {
                    warn!("Stored session rejected: {}", e);
                    if let Err(e) = auth.session_file.clear().await {
                        warn!("Failed to remove rejected session: {}", e);
                    }
                    None
                }
            };
            auth.session.send_replace(restored);
        }

        auth
    }

    async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        let Some(credentials) = &session.credentials else {
            return Err(AuthError::from_code("auth/missing-refresh-token"));
        };

        let response = self
            .http
            .post(SECURE_TOKEN_URL)
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", credentials.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::from_code(&auth_code(&error_message(response).await)));
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        debug!("Refreshed session for {}", body.user_id);
        Ok(Session {
            uid: body.user_id,
            email: session.email.clone(),
            credentials: Some(Credentials {
                id_token: body.id_token,
                refresh_token: body.refresh_token,
            }),
        })
    }

    async fn password_call(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let url = format!("{}/accounts:{}", IDENTITY_TOOLKIT_URL, endpoint);
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let message = error_message(response).await;
            debug!("Identity provider rejected {}: {}", endpoint, message);
            return Err(AuthError::from_code(&auth_code(&message)));
        }

        let body: SignInResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let session = Session {
            uid: body.local_id,
            email: if body.email.is_empty() {
                email.to_string()
            } else {
                body.email
            },
            credentials: Some(Credentials {
                id_token: body.id_token,
                refresh_token: body.refresh_token,
            }),
        };

        self.session_file
            .save(&session)
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn register(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.password_call("signUp", email, password).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.password_call("signInWithPassword", email, password)
            .await
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

/// A Firestore document as returned by the REST API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    name: String,
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
    /// Server-side creation time, used when `createdAt` is unusable
    #[serde(default)]
    create_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    document: Option<Document>,
}

fn string_value(s: &str) -> Value {
    json!({ "stringValue": s })
}

fn record_fields(record: &PasteRecord) -> Value {
    json!({
        "title": string_value(&record.title),
        "content": string_value(&record.content),
        "createdAt": string_value(&format_timestamp(&record.created_at)),
        "ownerId": string_value(&record.owner_id),
    })
}

fn patch_fields(patch: &PastePatch) -> Value {
    json!({
        "title": string_value(&patch.title),
        "content": string_value(&patch.content),
        "createdAt": string_value(&format_timestamp(&patch.created_at)),
    })
}

impl Document {
    /// Last path segment of the resource name
    fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// A string field, also accepting timestamp values
    fn string_field(&self, name: &str) -> Option<&str> {
        let value = self.fields.get(name)?;
        value
            .get("stringValue")
            .or_else(|| value.get("timestampValue"))
            .and_then(Value::as_str)
    }

    /// `createdAt`, falling back to the server's `createTime`
    fn created_at(&self) -> GatewayResult<DateTime<Utc>> {
        let created_raw = self.string_field("createdAt").unwrap_or_default();
        let parsed = DateTime::parse_from_rfc3339(created_raw).or_else(|e| {
            match self.create_time.as_deref() {
                Some(create_time) => {
                    debug!(
                        "Document {} has invalid createdAt '{}', using createTime",
                        self.id(),
                        created_raw
                    );
                    DateTime::parse_from_rfc3339(create_time)
                }
                None => Err(e),
            }
        });

        parsed.map(|ts| ts.with_timezone(&Utc)).map_err(|e| {
            GatewayError::Malformed(format!(
                "document {} has invalid createdAt '{}': {}",
                self.id(),
                created_raw,
                e
            ))
        })
    }

    fn into_owned_paste(self) -> GatewayResult<OwnedPaste> {
        let created_at = self.created_at()?;

        let record = PasteRecord {
            title: self.string_field("title").unwrap_or_default().to_string(),
            content: self.string_field("content").unwrap_or_default().to_string(),
            created_at,
            owner_id: self.string_field("ownerId").unwrap_or_default().to_string(),
        };
        Ok(OwnedPaste::from_record(self.id(), record))
    }
}

/// Convert listed documents, skipping any that cannot be read
///
/// One malformed document must not hide the rest of the collection.
fn readable_pastes(documents: impl IntoIterator<Item = Document>) -> Vec<OwnedPaste> {
    documents
        .into_iter()
        .filter_map(|document| match document.into_owned_paste() {
            Ok(paste) => Some(paste),
            Err(e) => {
                warn!("Skipping unreadable paste: {}", e);
                None
            }
        })
        .collect()
}

/// Firestore document store
pub struct FirestoreStore {
    http: reqwest::Client,
    /// `.../projects/{project}/databases/(default)/documents`
    documents_url: String,
}

impl FirestoreStore {
    pub fn new(project_id: &str) -> Self {
        Self {
            http: http_client(),
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                FIRESTORE_URL, project_id
            ),
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.documents_url, COLLECTION)
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/{}/{}", self.documents_url, COLLECTION, id)
    }

    fn request(&self, method: Method, url: String, actor: Option<&Session>) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match actor.and_then(Session::id_token) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request, turning error statuses into typed errors
    async fn send(&self, builder: RequestBuilder, id: &str) -> GatewayResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = error_message(response).await;
        debug!("Firestore returned {} for '{}': {}", status, id, message);
        Err(match status {
            StatusCode::NOT_FOUND => GatewayError::NotFound { id: id.to_string() },
            StatusCode::FORBIDDEN => GatewayError::PermissionDenied { id: id.to_string() },
            StatusCode::UNAUTHORIZED => GatewayError::Unauthorized,
            _ => GatewayError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn add(&self, actor: &Session, record: &PasteRecord) -> GatewayResult<String> {
        let builder = self
            .request(Method::POST, self.collection_url(), Some(actor))
            .json(&json!({ "fields": record_fields(record) }));
        let document: Document = self.send(builder, COLLECTION).await?.json().await?;
        Ok(document.id().to_string())
    }

    async fn list_all(&self, actor: Option<&Session>) -> GatewayResult<Vec<OwnedPaste>> {
        let mut pastes = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut builder = self
                .request(Method::GET, self.collection_url(), actor)
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                builder = builder.query(&[("pageToken", token)]);
            }

            let page: ListResponse = self.send(builder, COLLECTION).await?.json().await?;
            pastes.extend(readable_pastes(page.documents));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(pastes)
    }

    async fn list_where(
        &self,
        actor: Option<&Session>,
        field: PasteField,
        value: &str,
    ) -> GatewayResult<Vec<OwnedPaste>> {
        let url = format!("{}:runQuery", self.documents_url);
        let builder = self.request(Method::POST, url, actor).json(&json!({
            "structuredQuery": {
                "from": [{ "collectionId": COLLECTION }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field.as_str() },
                        "op": "EQUAL",
                        "value": string_value(value),
                    }
                }
            }
        }));

        let results: Vec<QueryResult> = self.send(builder, COLLECTION).await?.json().await?;
        Ok(readable_pastes(
            results.into_iter().filter_map(|result| result.document),
        ))
    }

    async fn get(&self, actor: Option<&Session>, id: &str) -> GatewayResult<Option<OwnedPaste>> {
        let builder = self.request(Method::GET, self.document_url(id), actor);
        match self.send(builder, id).await {
            Ok(response) => {
                let document: Document = response.json().await?;
                Ok(Some(document.into_owned_paste()?))
            }
            Err(GatewayError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update(&self, actor: &Session, id: &str, patch: &PastePatch) -> GatewayResult<()> {
        let builder = self
            .request(Method::PATCH, self.document_url(id), Some(actor))
            .query(&[
                ("updateMask.fieldPaths", "title"),
                ("updateMask.fieldPaths", "content"),
                ("updateMask.fieldPaths", "createdAt"),
                ("currentDocument.exists", "true"),
            ])
            .json(&json!({ "fields": patch_fields(patch) }));
        self.send(builder, id).await?;
        Ok(())
    }

    async fn delete(&self, actor: &Session, id: &str) -> GatewayResult<()> {
        let builder = self.request(Method::DELETE, self.document_url(id), Some(actor));
        self.send(builder, id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_code_mapping() {
        assert_eq!(auth_code("EMAIL_EXISTS"), "auth/email-already-in-use");
        assert_eq!(auth_code("INVALID_LOGIN_CREDENTIALS"), "auth/invalid-credential");
        assert_eq!(
            auth_code("WEAK_PASSWORD : Password should be at least 6 characters"),
            "auth/weak-password"
        );
        assert_eq!(
            AuthError::from_code(&auth_code("EMAIL_NOT_FOUND")),
            AuthError::InvalidCredentials
        );
    }

    #[test]
    fn test_document_parsing() {
        let json = r#"{
            "name": "projects/p/databases/(default)/documents/pastes/AbC123",
            "fields": {
                "title": {"stringValue": "Hello"},
                "content": {"stringValue": "World"},
                "createdAt": {"stringValue": "2024-05-01T10:00:00.000Z"},
                "ownerId": {"stringValue": "u1"}
            },
            "createTime": "2024-05-01T10:00:00.123456Z"
        }"#;
        let document: Document = serde_json::from_str(json).unwrap();
        assert_eq!(document.id(), "AbC123");

        let paste = document.into_owned_paste().unwrap();
        assert_eq!(paste.paste.id, "AbC123");
        assert_eq!(paste.paste.title, "Hello");
        assert_eq!(paste.owner_id, "u1");
    }

    #[test]
    fn test_document_with_bad_timestamp() {
        let json = r#"{
            "name": "projects/p/databases/(default)/documents/pastes/x",
            "fields": {"title": {"stringValue": "t"}, "createdAt": {"stringValue": "yesterday"}}
        }"#;
        let document: Document = serde_json::from_str(json).unwrap();
        assert!(matches!(
            document.into_owned_paste(),
            Err(GatewayError::Malformed(_))
        ));
    }

    #[test]
    fn test_list_page_skips_unreadable_document() {
        let json = r#"{
            "documents": [
                {
                    "name": "projects/p/databases/(default)/documents/pastes/good",
                    "fields": {
                        "title": {"stringValue": "Good"},
                        "content": {"stringValue": "ok"},
                        "createdAt": {"stringValue": "2024-05-01T10:00:00.000Z"},
                        "ownerId": {"stringValue": "u1"}
                    }
                },
                {
                    "name": "projects/p/databases/(default)/documents/pastes/bad",
                    "fields": {"title": {"stringValue": "No date"}}
                }
            ]
        }"#;
        let page: ListResponse = serde_json::from_str(json).unwrap();
        let pastes = readable_pastes(page.documents);
        assert_eq!(pastes.len(), 1);
        assert_eq!(pastes[0].paste.id, "good");
    }

    #[test]
    fn test_missing_created_at_uses_create_time() {
        let json = r#"{
            "name": "projects/p/databases/(default)/documents/pastes/old",
            "fields": {"title": {"stringValue": "Old"}, "content": {"stringValue": "c"}},
            "createTime": "2023-02-03T04:05:06.789012Z"
        }"#;
        let document: Document = serde_json::from_str(json).unwrap();
        let paste = document.into_owned_paste().unwrap();
        assert_eq!(format_timestamp(&paste.paste.created_at), "2023-02-03T04:05:06.789Z");
        assert!(paste.owner_id.is_empty());
    }

    #[test]
    fn test_query_results_without_document() {
        let json = r#"[{"readTime": "2024-05-01T10:00:00Z"}]"#;
        let results: Vec<QueryResult> = serde_json::from_str(json).unwrap();
        assert!(results[0].document.is_none());
    }

    #[test]
    fn test_record_fields_encoding() {
        let record = PasteRecord {
            title: "T".to_string(),
            content: "C".to_string(),
            created_at: DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            owner_id: "u1".to_string(),
        };
        let fields = record_fields(&record);
        assert_eq!(fields["ownerId"]["stringValue"], "u1");
        assert_eq!(
            fields["createdAt"]["stringValue"],
            "2024-05-01T10:00:00.000Z"
        );
        assert!(patch_fields(&PastePatch {
            title: "T".to_string(),
            content: "C".to_string(),
            created_at: record.created_at,
        })
        .get("ownerId")
        .is_none());
    }

    #[test]
    fn test_store_urls() {
        let store = FirestoreStore::new("demo");
        assert_eq!(
            store.document_url("abc"),
            "https://firestore.googleapis.com/v1/projects/demo/databases/(default)/documents/pastes/abc"
        );
    }

    #[tokio::test]
    async fn test_rejected_stored_session_is_discarded() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = SessionFile::new(dir.path());
        // No refresh token, so the refresh is refused without a request
        file.save(&Session::new("u1", "u1@example.com")).await.unwrap();

        let auth = FirebaseAuth::open("key", dir.path()).await;
        assert!(auth.current().is_none());
        assert!(!file.path().exists());
    }
}
