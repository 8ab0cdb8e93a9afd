#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use reqwest::Client;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use codecraft::backend::Backend;
use codecraft::config::{Config, OAuthCredentials};
use codecraft::state::SharedState;

pub const ANON_KEY: &str = "test-anon-key";
pub const SERVICE_KEY: &str = "test-service-role-key";
pub const SESSION_SECRET: &str = "test-session-secret-that-is-long-enough";

/// Tables whose rows carry `updated_at`.
const STAMPED_TABLES: &[&str] = &["users", "projects", "project_files"];

// ── Mock backend ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Caller {
    Anon,
    Service,
    User(Uuid),
}

struct Account {
    id: Uuid,
    email: String,
    password: Option<String>,
    metadata: Value,
}

#[derive(Default)]
pub struct MockStore {
    tables: HashMap<String, Vec<Value>>,
    objects: HashMap<(String, String), (Vec<u8>, String)>,
    accounts: Vec<Account>,
    refresh_tokens: HashMap<String, Uuid>,
    failing_tables: Vec<String>,
    /// (method, table, caller) for every record request.
    record_log: Vec<(String, String, Caller)>,
    require_confirmation: bool,
    /// Timestamp stamped on every new row instead of the current time.
    frozen_now: Option<String>,
}

type Store = Arc<Mutex<MockStore>>;

/// In-process stand-in for the hosted backend: record, storage and identity
/// APIs over in-memory maps.
pub struct MockBackend {
    pub addr: SocketAddr,
    pub store: Store,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> Backend {
        Backend::new(&self.url(), ANON_KEY, Duration::from_secs(5))
            .expect("mock backend client")
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.store
            .lock()
            .unwrap()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.store
            .lock()
            .unwrap()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|(data, _)| data.clone())
    }

    pub fn object_count(&self) -> usize {
        self.store.lock().unwrap().objects.len()
    }

    /// Make every insert into `table` fail with a 500.
    pub fn fail_inserts(&self, table: &str) {
        self.store.lock().unwrap().failing_tables.push(table.to_string());
    }

    /// Stamp every row inserted from now on with the same timestamp.
    pub fn freeze_clock(&self) {
        self.store.lock().unwrap().frozen_now = Some(now());
    }

    pub fn require_confirmation(&self) {
        self.store.lock().unwrap().require_confirmation = true;
    }

    pub fn record_log(&self) -> Vec<(String, String, Caller)> {
        self.store.lock().unwrap().record_log.clone()
    }

    /// Register an account as an OAuth provider would and return its access token.
    pub fn oauth_user(&self, email: &str, full_name: &str, avatar_url: &str) -> (Uuid, String) {
        let id = Uuid::now_v7();
        self.store.lock().unwrap().accounts.push(Account {
            id,
            email: email.to_string(),
            password: None,
            metadata: json!({ "full_name": full_name, "avatar_url": avatar_url }),
        });
        (id, issue_token(id, email))
    }
}

pub fn issue_token(user_id: Uuid, email: &str) -> String {
    issue_token_with_exp(user_id, email, (Utc::now() + chrono::Duration::hours(1)).timestamp())
}

pub fn issue_token_with_exp(user_id: Uuid, email: &str, exp: i64) -> String {
    let claims = json!({
        "sub": user_id,
        "email": email,
        "role": "authenticated",
        "aud": "authenticated",
        "exp": exp,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SESSION_SECRET.as_bytes()),
    )
    .expect("encode test token")
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn authorize(headers: &HeaderMap) -> Result<Caller, Response> {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    if apikey != Some(ANON_KEY) {
        return Err(error(StatusCode::UNAUTHORIZED, "Invalid API key"));
    }

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Missing bearer"))?;

    match bearer {
        ANON_KEY => Ok(Caller::Anon),
        SERVICE_KEY => Ok(Caller::Service),
        token => codecraft::auth::jwt::decode_token(token, SESSION_SECRET)
            .map(|claims| Caller::User(claims.sub))
            .map_err(|_| error(StatusCode::UNAUTHORIZED, "JWT invalid")),
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare(a: &Value, b: &Value) -> std::cmp::Ordering {
    let (a, b) = (cell(a), cell(b));
    match (
        DateTime::parse_from_rfc3339(&a),
        DateTime::parse_from_rfc3339(&b),
    ) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(&b),
    }
}

struct RecordQuery {
    filters: Vec<(String, String)>,
    order: Option<(String, bool)>,
    limit: Option<usize>,
    on_conflict: Option<Vec<String>>,
}

fn parse_query(params: Vec<(String, String)>) -> RecordQuery {
    let mut query = RecordQuery {
        filters: Vec::new(),
        order: None,
        limit: None,
        on_conflict: None,
    };
    for (key, value) in params {
        match key.as_str() {
            "select" => {}
            "order" => {
                let (column, dir) = value.rsplit_once('.').unwrap_or((value.as_str(), "asc"));
                query.order = Some((column.to_string(), dir == "desc"));
            }
            "limit" => query.limit = value.parse().ok(),
            "on_conflict" => {
                query.on_conflict = Some(value.split(',').map(str::to_string).collect())
            }
            _ => {
                let expected = value.strip_prefix("eq.").unwrap_or(&value).to_string();
                query.filters.push((key, expected));
            }
        }
    }
    query
}

fn matches(row: &Value, filters: &[(String, String)]) -> bool {
    filters
        .iter()
        .all(|(column, expected)| row.get(column).map(cell).as_deref() == Some(expected.as_str()))
}

fn log(store: &mut MockStore, method: &str, table: &str, caller: &Caller) {
    store
        .record_log
        .push((method.to_string(), table.to_string(), caller.clone()));
}

async fn rest_select(
    State(store): State<Store>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let caller = match authorize(&headers) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let query = parse_query(params);
    let mut store = store.lock().unwrap();
    log(&mut store, "GET", &table, &caller);

    let mut rows: Vec<Value> = store
        .tables
        .get(&table)
        .map(|rows| {
            rows.iter()
                .filter(|r| matches(r, &query.filters))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    if let Some((column, desc)) = &query.order {
        rows.sort_by(|a, b| {
            let ord = compare(&a[column.as_str()], &b[column.as_str()]);
            if *desc { ord.reverse() } else { ord }
        });
    }
    if let Some(limit) = query.limit {
        rows.truncate(limit);
    }

    Json(Value::Array(rows)).into_response()
}

async fn rest_insert(
    State(store): State<Store>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let caller = match authorize(&headers) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let query = parse_query(params);
    let mut store = store.lock().unwrap();
    log(&mut store, "POST", &table, &caller);

    if store.failing_tables.contains(&table) {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "insert rejected");
    }

    let incoming = match body {
        Value::Array(rows) => rows,
        row => vec![row],
    };
    let stamped = STAMPED_TABLES.contains(&table.as_str());
    let stamp = store.frozen_now.clone().unwrap_or_else(now);
    let rows = store.tables.entry(table.clone()).or_default();
    let mut returned = Vec::new();

    for row in incoming {
        let Value::Object(fields) = row else {
            return error(StatusCode::BAD_REQUEST, "row must be an object");
        };

        let existing = query.on_conflict.as_ref().and_then(|columns| {
            rows.iter_mut().find(|r| {
                columns
                    .iter()
                    .all(|c| r.get(c).is_some() && r.get(c) == fields.get(c))
            })
        });

        if let Some(existing) = existing {
            if let Value::Object(target) = &mut *existing {
                for (k, v) in fields {
                    target.insert(k, v);
                }
            }
            returned.push(existing.clone());
            continue;
        }

        if let Some(id) = fields.get("id") {
            if rows.iter().any(|r| r.get("id") == Some(id)) {
                return error(StatusCode::CONFLICT, "duplicate key value violates unique constraint");
            }
        }

        let mut row: Map<String, Value> = fields;
        row.entry("id").or_insert_with(|| json!(Uuid::now_v7()));
        row.entry("created_at").or_insert_with(|| json!(stamp));
        if stamped {
            row.entry("updated_at").or_insert_with(|| json!(stamp));
        }
        let row = Value::Object(row);
        rows.push(row.clone());
        returned.push(row);
    }

    (StatusCode::CREATED, Json(Value::Array(returned))).into_response()
}

async fn rest_update(
    State(store): State<Store>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let caller = match authorize(&headers) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let query = parse_query(params);
    let mut store = store.lock().unwrap();
    log(&mut store, "PATCH", &table, &caller);

    let Value::Object(fields) = body else {
        return error(StatusCode::BAD_REQUEST, "body must be an object");
    };

    let mut returned = Vec::new();
    if let Some(rows) = store.tables.get_mut(&table) {
        for row in rows.iter_mut().filter(|r| matches(r, &query.filters)) {
            if let Value::Object(target) = &mut *row {
                for (k, v) in &fields {
                    target.insert(k.clone(), v.clone());
                }
            }
            returned.push(row.clone());
        }
    }

    Json(Value::Array(returned)).into_response()
}

async fn rest_delete(
    State(store): State<Store>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let caller = match authorize(&headers) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let query = parse_query(params);
    let mut store = store.lock().unwrap();
    log(&mut store, "DELETE", &table, &caller);

    if let Some(rows) = store.tables.get_mut(&table) {
        rows.retain(|r| !matches(r, &query.filters));
    }

    StatusCode::NO_CONTENT.into_response()
}

async fn object_upload(
    State(store): State<Store>,
    Path((bucket, path)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(resp) = authorize(&headers) {
        return resp;
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let mut store = store.lock().unwrap();
    let key = (bucket.clone(), path.clone());
    if store.objects.contains_key(&key) {
        return error(StatusCode::CONFLICT, "The resource already exists");
    }
    store.objects.insert(key, (body.to_vec(), content_type));

    Json(json!({ "Key": format!("{bucket}/{path}") })).into_response()
}

async fn object_download(
    State(store): State<Store>,
    Path((bucket, path)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = authorize(&headers) {
        return resp;
    }
    let store = store.lock().unwrap();
    match store.objects.get(&(bucket, path)) {
        Some((data, content_type)) => (
            [(header::CONTENT_TYPE, content_type.clone())],
            data.clone(),
        )
            .into_response(),
        None => error(StatusCode::NOT_FOUND, "Object not found"),
    }
}

async fn object_remove(
    State(store): State<Store>,
    Path(bucket): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = authorize(&headers) {
        return resp;
    }
    let mut store = store.lock().unwrap();
    let mut removed = Vec::new();
    for prefix in body["prefixes"].as_array().cloned().unwrap_or_default() {
        if let Some(path) = prefix.as_str() {
            if store
                .objects
                .remove(&(bucket.clone(), path.to_string()))
                .is_some()
            {
                removed.push(json!({ "name": path }));
            }
        }
    }
    Json(Value::Array(removed)).into_response()
}

fn user_json(account: &Account) -> Value {
    json!({
        "id": account.id,
        "email": account.email,
        "user_metadata": account.metadata,
    })
}

fn session_json(store: &mut MockStore, account_id: Uuid) -> Value {
    let account = store
        .accounts
        .iter()
        .find(|a| a.id == account_id)
        .expect("account exists");
    let user = user_json(account);
    let access_token = issue_token(account.id, &account.email);
    let refresh_token = Uuid::now_v7().simple().to_string();
    store.refresh_tokens.insert(refresh_token.clone(), account_id);

    json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "token_type": "bearer",
        "expires_in": 3600,
        "user": user,
    })
}

async fn auth_signup(
    State(store): State<Store>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = authorize(&headers) {
        return resp;
    }
    let email = body["email"].as_str().unwrap_or_default().to_lowercase();
    let password = body["password"].as_str().unwrap_or_default().to_string();

    let mut store = store.lock().unwrap();
    if store.accounts.iter().any(|a| a.email == email) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "msg": "User already registered" })),
        )
            .into_response();
    }

    let id = Uuid::now_v7();
    store.accounts.push(Account {
        id,
        email,
        password: Some(password),
        metadata: body.get("data").cloned().unwrap_or(json!({})),
    });

    if store.require_confirmation {
        let account = store.accounts.last().expect("just pushed");
        return Json(user_json(account)).into_response();
    }

    Json(session_json(&mut store, id)).into_response()
}

async fn auth_token(
    State(store): State<Store>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = authorize(&headers) {
        return resp;
    }
    let invalid = |description: &str| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": description })),
        )
            .into_response()
    };

    let mut store = store.lock().unwrap();
    match params.get("grant_type").map(String::as_str) {
        Some("password") => {
            let email = body["email"].as_str().unwrap_or_default().to_lowercase();
            let password = body["password"].as_str().unwrap_or_default();
            let id = store
                .accounts
                .iter()
                .find(|a| a.email == email && a.password.as_deref() == Some(password))
                .map(|a| a.id);
            match id {
                Some(id) => Json(session_json(&mut store, id)).into_response(),
                None => invalid("Invalid login credentials"),
            }
        }
        Some("refresh_token") => {
            let token = body["refresh_token"].as_str().unwrap_or_default();
            match store.refresh_tokens.remove(token) {
                Some(id) => Json(session_json(&mut store, id)).into_response(),
                None => invalid("Invalid Refresh Token"),
            }
        }
        _ => invalid("unsupported grant_type"),
    }
}

async fn auth_logout(headers: HeaderMap) -> Response {
    match authorize(&headers) {
        Ok(Caller::User(_)) => StatusCode::NO_CONTENT.into_response(),
        Ok(_) => error(StatusCode::UNAUTHORIZED, "This endpoint requires a user token"),
        Err(resp) => resp,
    }
}

async fn auth_user(State(store): State<Store>, headers: HeaderMap) -> Response {
    let id = match authorize(&headers) {
        Ok(Caller::User(id)) => id,
        Ok(_) => return error(StatusCode::UNAUTHORIZED, "This endpoint requires a user token"),
        Err(resp) => return resp,
    };
    let store = store.lock().unwrap();
    match store.accounts.iter().find(|a| a.id == id) {
        Some(account) => Json(user_json(account)).into_response(),
        None => error(StatusCode::UNAUTHORIZED, "User not found"),
    }
}

pub async fn spawn_backend() -> MockBackend {
    let store: Store = Arc::new(Mutex::new(MockStore::default()));

    let app = Router::new()
        .route(
            "/rest/v1/{table}",
            get(rest_select)
                .post(rest_insert)
                .patch(rest_update)
                .delete(rest_delete),
        )
        .route("/storage/v1/object/{bucket}", axum::routing::delete(object_remove))
        .route(
            "/storage/v1/object/{bucket}/{*path}",
            post(object_upload).get(object_download),
        )
        .route("/auth/v1/signup", post(auth_signup))
        .route("/auth/v1/token", post(auth_token))
        .route("/auth/v1/logout", post(auth_logout))
        .route("/auth/v1/user", get(auth_user))
        .with_state(store.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock backend");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock backend failed");
    });

    MockBackend { addr, store }
}

// ── App under test ──────────────────────────────────────────────

/// A running app wired to its own mock backend.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub backend: MockBackend,
    pub state: SharedState,
}

pub fn test_config(backend_url: &str) -> Config {
    Config {
        backend_url: backend_url.to_string(),
        backend_anon_key: ANON_KEY.to_string(),
        backend_service_role_key: None,
        backend_timeout: Duration::from_secs(5),
        session_secret: SESSION_SECRET.to_string(),
        github: Some(OAuthCredentials {
            client_id: "gh-client".to_string(),
            client_secret: "gh-secret".to_string(),
        }),
        google: None,
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        base_url: "http://localhost:3000".to_string(),
        max_body_size: 1_048_576,
        log_level: "warn".to_string(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn sign_up(&self, name: &str, email: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/signup"))
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await
            .expect("sign-up request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/signin"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("sign-in request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Sign up and sign in, return the access token.
    pub async fn user(&self, email: &str) -> String {
        let (body, status) = self.sign_up("Tester", email, "password123").await;
        assert_eq!(status, StatusCode::CREATED, "sign-up failed: {body}");
        let (body, status) = self.sign_in(email, "password123").await;
        assert_eq!(status, StatusCode::OK, "sign-in failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Create a project, return the project JSON.
    pub async fn create_project(&self, token: &str, name: &str, project_type: &str) -> Value {
        let (body, status) = self
            .post_auth(
                "/api/v1/projects",
                token,
                &json!({ "name": name, "description": "A test project", "type": project_type }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {body}");
        body
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated POST request with JSON body.
    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated PUT request with JSON body.
    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated DELETE request.
    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Spawn the app against a fresh mock backend, letting the test tweak config.
pub async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let backend = spawn_backend().await;

    let mut config = test_config(&backend.url());
    configure(&mut config);

    let client_backend =
        codecraft::connect_backend(&config).expect("Failed to build backend client");
    let (app, state) = codecraft::build_app(client_backend, config);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    // Spawn server in background
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        client,
        backend,
        state,
    }
}
