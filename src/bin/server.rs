//! Brewlog document store server
//!
//! A small HTTP document store the brewlog CLI can use as its remote
//! backend. Documents are JSON objects grouped into tables and addressed
//! by id.
//!
//! # Configuration
//!
//! Environment variables:
//! - `BREWLOG_SERVER_PORT`: Port to listen on (default: 8080)
//! - `BREWLOG_SERVER_DATA_DIR`: Directory to store tables (default: ~/.local/share/brewlog-server)
//! - `BREWLOG_SERVER_CONFIG`: Path to config file (default: ~/.config/brewlog-server/config.yaml)
//!
//! # Config File Format
//!
//! ```yaml
//! credentials:
//!   - access_key_id: "brewer"
//!     secret_access_key: "your-secret-here"
//! ```
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint (no auth required)
//! - `GET /tables/{table}/items`: Scan a table
//! - `GET|PUT|PATCH|DELETE /tables/{table}/items/{id}`: Single document access
//!
//! Table routes require HTTP Basic auth with a configured key pair.

#[path = "server/storage.rs"]
mod storage;

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use storage::{TableStorage, TableStorageError};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Header clients use to name the region they were configured for.
const REGION_HEADER: &str = "x-brewlog-region";

// ============================================================================
// Configuration
// ============================================================================

/// Credential entry in config
#[derive(Debug, Clone, Deserialize)]
struct CredentialEntry {
    access_key_id: String,
    secret_access_key: String,
}

/// Config file structure
#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    credentials: Vec<CredentialEntry>,
}

/// Server configuration
#[derive(Debug, Clone)]
struct Config {
    /// Port to listen on
    port: u16,
    /// Directory to store table files
    data_dir: PathBuf,
    /// Path to config file
    config_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let port = std::env::var("BREWLOG_SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let data_dir = std::env::var("BREWLOG_SERVER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("brewlog-server")
            });

        let config_path = std::env::var("BREWLOG_SERVER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("brewlog-server")
                    .join("config.yaml")
            });

        Self {
            port,
            data_dir,
            config_path,
        }
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Credential store - maps access key id -> secret
#[derive(Debug, Clone, Default)]
struct CredentialStore {
    secrets: HashMap<String, String>,
}

impl CredentialStore {
    /// Load credentials from config file
    fn load(config_path: &FsPath) -> Self {
        match std::fs::read_to_string(config_path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(store) => {
                    tracing::info!("Loaded {} credential(s)", store.secrets.len());
                    store
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}",
                    config_path.display(),
                    e
                );
                tracing::warn!("No credentials loaded - all table requests will fail");
                Self::default()
            }
        }
    }

    fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
        let config: ConfigFile = serde_yaml::from_str(contents)?;
        let secrets = config
            .credentials
            .into_iter()
            .map(|entry| (entry.access_key_id, entry.secret_access_key))
            .collect();
        Ok(Self { secrets })
    }

    /// Check a key pair
    fn validate(&self, access_key_id: &str, secret: &str) -> bool {
        self.secrets
            .get(access_key_id)
            .is_some_and(|expected| expected == secret)
    }
}

/// Splits a `Basic` authorization header into key id and secret.
fn parse_basic_auth(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (key, secret) = decoded.split_once(':')?;
    Some((key.to_string(), secret.to_string()))
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    credentials: Arc<CredentialStore>,
    storage: Arc<TableStorage>,
}

/// Error response body
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn error_response(status: StatusCode, error: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error,
            message: message.into(),
        }),
    )
        .into_response()
}

/// Authentication middleware
async fn auth_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(auth_header) = auth_header else {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "missing_auth",
            "Authorization header required",
        );
    };

    let Some((access_key_id, secret)) = parse_basic_auth(auth_header) else {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "invalid_auth",
            "Authorization header must use Basic scheme",
        );
    };

    if !state.credentials.validate(&access_key_id, &secret) {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "Invalid access key or secret",
        );
    }

    next.run(request).await
}

// ============================================================================
// Handlers
// ============================================================================

impl IntoResponse for TableStorageError {
    fn into_response(self) -> Response {
        match &self {
            TableStorageError::InvalidTableName(_) => {
                error_response(StatusCode::BAD_REQUEST, "invalid_table", self.to_string())
            }
            TableStorageError::InvalidItem(_) => {
                error_response(StatusCode::BAD_REQUEST, "invalid_item", self.to_string())
            }
            TableStorageError::IoError(_, _) | TableStorageError::CorruptTable(_, _) => {
                tracing::error!("Storage error: {}", self);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_error",
                    "Failed to access table storage",
                )
            }
        }
    }
}

fn not_found(table: &str, id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "not_found",
        format!("No item {} in table {}", id, table),
    )
}

fn log_request(op: &str, table: &str, headers: &HeaderMap) {
    let region = headers
        .get(REGION_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-");
    tracing::debug!(region, table, "{}", op);
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Scan response
#[derive(Serialize)]
struct ScanResponse {
    items: Vec<Value>,
}

async fn scan_items(
    State(state): State<AppState>,
    Path(table): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ScanResponse>, TableStorageError> {
    log_request("scan", &table, &headers);
    let items = state.storage.scan(&table).await?;
    Ok(Json(ScanResponse { items }))
}

async fn get_item(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, TableStorageError> {
    log_request("get", &table, &headers);
    match state.storage.get(&table, &id).await? {
        Some(item) => Ok(Json(item).into_response()),
        None => Ok(not_found(&table, &id)),
    }
}

async fn put_item(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(item): Json<Value>,
) -> Result<Json<Value>, TableStorageError> {
    log_request("put", &table, &headers);
    let stored = state.storage.put(&table, &id, item).await?;
    Ok(Json(stored))
}

/// Attribute-level update request
#[derive(Deserialize)]
struct UpdateRequest {
    attributes: Map<String, Value>,
}

async fn update_item(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(request): Json<UpdateRequest>,
) -> Result<Response, TableStorageError> {
    log_request("update", &table, &headers);
    match state.storage.update(&table, &id, request.attributes).await? {
        Some(item) => Ok(Json(item).into_response()),
        None => Ok(not_found(&table, &id)),
    }
}

async fn delete_item(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, TableStorageError> {
    log_request("delete", &table, &headers);
    if state.storage.delete(&table, &id).await? {
        tracing::info!("Deleted {} from {}", id, table);
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ============================================================================
// Router
// ============================================================================

fn app(state: AppState) -> Router {
    // Public routes (no auth)
    let public_routes = Router::new().route("/health", get(health));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/tables/{table}/items", get(scan_items))
        .route(
            "/tables/{table}/items/{id}",
            get(get_item)
                .put(put_item)
                .patch(update_item)
                .delete(delete_item),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brewlog_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();

    // Ensure data directory exists
    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        tracing::error!("Failed to create data directory: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Config file: {}", config.config_path.display());

    let state = AppState {
        credentials: Arc::new(CredentialStore::load(&config.config_path)),
        storage: Arc::new(TableStorage::new(&config.data_dir)),
    };

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app(state)).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Method;
    use serde_json::json;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const CREDENTIALS: &str = r#"
credentials:
  - access_key_id: "brewer"
    secret_access_key: "s3cret"
"#;

    fn setup() -> (Router, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let state = AppState {
            credentials: Arc::new(CredentialStore::parse(CREDENTIALS).unwrap()),
            storage: Arc::new(TableStorage::new(temp_dir.path())),
        };
        (app(state), temp_dir)
    }

    fn basic(key: &str, secret: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", key, secret)))
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, basic("brewer", "s3cret"))
            .header(REGION_HEADER, "us-east-1");

        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[test]
    fn test_parse_basic_auth() {
        assert_eq!(
            parse_basic_auth(&basic("brewer", "s3:cret")),
            Some(("brewer".to_string(), "s3:cret".to_string()))
        );
        assert_eq!(parse_basic_auth("Bearer token"), None);
        assert_eq!(parse_basic_auth("Basic !!!"), None);
    }

    #[test]
    fn test_credential_store() {
        let store = CredentialStore::parse(CREDENTIALS).unwrap();
        assert!(store.validate("brewer", "s3cret"));
        assert!(!store.validate("brewer", "wrong"));
        assert!(!store.validate("stranger", "s3cret"));

        let empty = CredentialStore::parse("{}").unwrap();
        assert!(!empty.validate("brewer", "s3cret"));
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let (app, _temp) = setup();
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_tables_require_auth() {
        let (app, _temp) = setup();

        let missing = Request::builder()
            .uri("/tables/coffee-brews/items")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, missing).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "missing_auth");

        let wrong = Request::builder()
            .uri("/tables/coffee-brews/items")
            .header(header::AUTHORIZATION, basic("brewer", "nope"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, wrong).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_credentials");
    }

    #[tokio::test]
    async fn test_document_lifecycle() {
        let (app, _temp) = setup();
        let uri = "/tables/coffee-brews/items/b1";

        let (status, _) = send(
            &app,
            request(
                Method::PUT,
                uri,
                Some(json!({
                    "coffee_type": "Ethiopian Yirgacheffe",
                    "rating": 3,
                    "notes": "bright",
                    "created_at": "2025-03-01T08:00:00Z"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, request(Method::GET, uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "b1");
        assert_eq!(body["rating"], 3);

        let (status, body) = send(
            &app,
            request(
                Method::PATCH,
                uri,
                Some(json!({ "attributes": { "rating": 5, "notes": null, "created_at": "x" } })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rating"], 5);
        assert!(body["notes"].is_null());
        assert_eq!(body["created_at"], "2025-03-01T08:00:00Z");

        let (status, body) = send(
            &app,
            request(Method::GET, "/tables/coffee-brews/items", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);

        let (status, _) = send(&app, request(Method::DELETE, uri, None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, request(Method::GET, uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let (app, _temp) = setup();
        let (status, _) = send(
            &app,
            request(
                Method::PATCH,
                "/tables/coffee-brews/items/ghost",
                Some(json!({ "attributes": { "rating": 4 } })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_missing_succeeds() {
        let (app, _temp) = setup();
        let (status, _) = send(
            &app,
            request(Method::DELETE, "/tables/coffee-brews/items/ghost", None),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_put_rejects_non_object() {
        let (app, _temp) = setup();
        let (status, body) = send(
            &app,
            request(
                Method::PUT,
                "/tables/coffee-brews/items/b1",
                Some(json!("just a string")),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_item");
    }

    #[tokio::test]
    async fn test_hidden_table_names_are_rejected() {
        let (app, _temp) = setup();
        let (status, body) = send(
            &app,
            request(Method::GET, "/tables/.secrets/items", None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_table");
    }
}
