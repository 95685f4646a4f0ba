//! Mock Drive server for integration tests
//!
//! Serves the subset of the Drive v3 and OAuth token endpoints that updrive
//! talks to, backed by an in-memory file list.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Form, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use updrive::google_drive::{
    Authenticator, CredentialStore, Credentials, Endpoints, GoogleDrive, FOLDER,
};

pub const ACCESS_TOKEN: &str = "test-token";

#[derive(Debug, Clone)]
pub struct MockFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub parents: Vec<String>,
    // None makes media downloads fail
    pub content: Option<Vec<u8>>,
}

impl MockFile {
    pub fn new(id: &str, name: &str, content: &[u8]) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: "text/plain".into(),
            parents: vec![],
            content: Some(content.to_vec()),
        }
    }

    pub fn folder(id: &str, name: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: FOLDER.into(),
            parents: vec![],
            content: None,
        }
    }

    pub fn in_folder(mut self, parent: &str) -> Self {
        self.parents.push(parent.into());
        self
    }

    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "mimeType": self.mime_type,
            "parents": self.parents,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockState {
    pub base_url: Arc<Mutex<String>>,
    pub files: Arc<Mutex<Vec<MockFile>>>,
    /// Ids handed out to created files, in order
    pub new_ids: Arc<Mutex<VecDeque<String>>>,
    /// Metadata of resumable sessions, by session number
    pub sessions: Arc<Mutex<Vec<Value>>>,
    pub list_requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
    pub token_requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
    pub auth_headers: Arc<Mutex<Vec<String>>>,
}

impl MockState {
    pub fn add(&self, file: MockFile) {
        self.files.lock().unwrap().push(file);
    }

    pub fn push_id(&self, id: &str) {
        self.new_ids.lock().unwrap().push_back(id.into());
    }

    pub fn file(&self, id: &str) -> Option<MockFile> {
        self.files.lock().unwrap().iter().find(|f| f.id == id).cloned()
    }

    pub fn list_requests(&self) -> Vec<HashMap<String, String>> {
        self.list_requests.lock().unwrap().clone()
    }

    pub fn token_requests(&self) -> Vec<HashMap<String, String>> {
        self.token_requests.lock().unwrap().clone()
    }

    fn next_id(&self) -> String {
        self.new_ids
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| format!("id-{}", self.files.lock().unwrap().len()))
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let ok = value.starts_with("Bearer ");
        self.auth_headers.lock().unwrap().push(value);
        ok
    }
}

pub struct MockServer {
    pub state: MockState,
    pub base_url: String,
}

impl MockServer {
    pub async fn start() -> Result<Self> {
        let state = MockState::default();

        let app = Router::new()
            .route("/drive/v3/files", get(list_handler).post(create_handler))
            .route("/drive/v3/files/:id", get(media_handler))
            .route("/upload/drive/v3/files", post(start_upload_handler))
            .route("/upload/session/:session", put(upload_handler))
            .route("/token", post(token_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        *state.base_url.lock().unwrap() = base_url.clone();

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Mock server error: {}", e);
            }
        });

        Ok(Self { state, base_url })
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            files: format!("{}/drive/v3/files", self.base_url),
            upload: format!("{}/upload/drive/v3/files", self.base_url),
        }
    }

    pub fn token_uri(&self) -> String {
        format!("{}/token", self.base_url)
    }

    pub fn credentials(&self, access_token: &str, expires_in: i64) -> Credentials {
        let now = std::time::UNIX_EPOCH.elapsed().unwrap().as_secs() as i64;

        Credentials {
            access_token: access_token.into(),
            refresh_token: Some("refresh-1".into()),
            expires_at: (now + expires_in) as u64,
            client_id: "client".into(),
            client_secret: "secret".into(),
            token_uri: self.token_uri(),
            scopes: vec![updrive::google_drive::DRIVE_SCOPE.into()],
        }
    }

    /// A client holding a token that stays valid for the whole test.
    pub fn drive(&self) -> GoogleDrive {
        let auth = Authenticator::new(
            reqwest::Client::new(),
            Box::new(MemoryStore::default()),
            self.credentials(ACCESS_TOKEN, 3600),
        );

        GoogleDrive::new(reqwest::Client::new(), auth).with_endpoints(self.endpoints())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore(pub Arc<Mutex<Option<Credentials>>>);

impl MemoryStore {
    pub fn with(credentials: Credentials) -> Self {
        Self(Arc::new(Mutex::new(Some(credentials))))
    }

    pub fn get(&self) -> Option<Credentials> {
        self.0.lock().unwrap().clone()
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<Credentials>> {
        Ok(self.get())
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        *self.0.lock().unwrap() = Some(credentials.clone());
        Ok(())
    }
}

fn api_error(status: StatusCode, message: &str) -> Response {
    let body = json!({
        "error": { "code": status.as_u16(), "message": message }
    });
    (status, Json(body)).into_response()
}

// Understands the clauses updrive builds, joined by ` and `.
fn matches(file: &MockFile, query: &str) -> Result<bool, String> {
    for clause in query.split(" and ") {
        let ok = if let Some(rest) = clause.strip_prefix("name='") {
            let name = rest
                .strip_suffix('\'')
                .ok_or_else(|| format!("Invalid Value: {clause}"))?;
            // the real API chokes on a stray quote too
            if name.contains('\'') {
                return Err(format!("Invalid Value: {query}"));
            }
            file.name == name
        } else if let Some(rest) = clause.strip_prefix("mimeType = '") {
            file.mime_type == rest.trim_end_matches('\'')
        } else if let Some(parent) = clause
            .strip_prefix('\'')
            .and_then(|c| c.strip_suffix("' in parents"))
        {
            file.parents.iter().any(|p| p == parent)
        } else {
            return Err(format!("Invalid Value: {clause}"));
        };

        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

async fn list_handler(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !state.authorized(&headers) {
        return api_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }
    state.list_requests.lock().unwrap().push(params.clone());

    let page_size = params
        .get("pageSize")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(100);

    let files = state.files.lock().unwrap().clone();
    let mut found = vec![];
    for f in files.iter() {
        let ok = match params.get("q") {
            None => true,
            Some(q) => match matches(f, q) {
                Ok(ok) => ok,
                Err(e) => return api_error(StatusCode::BAD_REQUEST, &e),
            },
        };
        if ok {
            found.push(f.to_json());
        }
    }

    let mut body = json!({});
    if found.len() > page_size {
        found.truncate(page_size);
        body["nextPageToken"] = json!("page-2");
    }
    body["files"] = Value::Array(found);

    Json(body).into_response()
}

async fn create_handler(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(meta): Json<Value>,
) -> Response {
    if !state.authorized(&headers) {
        return api_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }

    let file = MockFile {
        id: state.next_id(),
        name: meta["name"].as_str().unwrap_or_default().into(),
        mime_type: meta["mimeType"].as_str().unwrap_or_default().into(),
        parents: parents(&meta),
        content: None,
    };
    let body = file.to_json();
    state.add(file);

    Json(body).into_response()
}

async fn media_handler(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !state.authorized(&headers) {
        return api_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }

    let file = state.file(&id);
    match (file, params.get("alt").map(String::as_str)) {
        (Some(f), Some("media")) => match f.content {
            Some(content) => content.into_response(),
            None => api_error(StatusCode::FORBIDDEN, "Only files with binary content can be downloaded."),
        },
        (Some(f), _) => Json(f.to_json()).into_response(),
        (None, _) => api_error(StatusCode::NOT_FOUND, &format!("File not found: {id}.")),
    }
}

async fn start_upload_handler(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    Json(meta): Json<Value>,
) -> Response {
    if !state.authorized(&headers) {
        return api_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }
    if params.get("uploadType").map(String::as_str) != Some("resumable") {
        return api_error(StatusCode::BAD_REQUEST, "expected a resumable upload");
    }

    let session = {
        let mut sessions = state.sessions.lock().unwrap();
        sessions.push(meta);
        sessions.len() - 1
    };
    let location = format!("{}/upload/session/{session}", state.base_url.lock().unwrap());

    (StatusCode::OK, [(header::LOCATION, location)]).into_response()
}

async fn upload_handler(
    State(state): State<MockState>,
    Path(session): Path<usize>,
    body: Bytes,
) -> Response {
    let meta = match state.sessions.lock().unwrap().get(session) {
        Some(m) => m.clone(),
        None => return api_error(StatusCode::NOT_FOUND, "no such upload session"),
    };

    let file = MockFile {
        id: state.next_id(),
        name: meta["name"].as_str().unwrap_or_default().into(),
        mime_type: meta["mimeType"].as_str().unwrap_or_default().into(),
        parents: parents(&meta),
        content: Some(body.to_vec()),
    };
    let res = json!({ "id": file.id, "name": file.name });
    state.add(file);

    Json(res).into_response()
}

async fn token_handler(
    State(state): State<MockState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.token_requests.lock().unwrap().push(form.clone());

    let grant = form.get("grant_type").map(String::as_str);
    let refresh = form.get("refresh_token").map(String::as_str);

    match (grant, refresh) {
        (Some("refresh_token"), Some("revoked")) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Token has been expired or revoked."
            })),
        )
            .into_response(),
        (Some("refresh_token"), Some(_)) => Json(json!({
            "access_token": "refreshed-token",
            "expires_in": 3599,
            "token_type": "Bearer"
        }))
        .into_response(),
        (Some("authorization_code"), _) => Json(json!({
            "access_token": "consented-token",
            "refresh_token": "refresh-new",
            "expires_in": 3599,
            "token_type": "Bearer"
        }))
        .into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "unsupported_grant_type" })),
        )
            .into_response(),
    }
}

fn parents(meta: &Value) -> Vec<String> {
    meta["parents"]
        .as_array()
        .map(|p| {
            p.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
