//! notewell-api - HTTP API server for notewell
//!
//! Exposes the notes CRUD surface under `/api/v1/notes`, the trash bin
//! surface under `/api/v1/bin`, and serves the static web client for
//! everything else.

use std::net::SocketAddr;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use notewell_core::{
    CreateNoteRequest, Error, ListNotesRequest, NoteRepository, NoteStatus, UpdateNoteRequest,
    DEFAULT_LIMIT, DEFAULT_PAGE,
};
use notewell_db::Database;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically — useful
/// for log correlation and debugging.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    db: Database,
}

// =============================================================================
// CORS CONFIGURATION HELPER
// =============================================================================

/// Parse allowed origins from the comma-separated `ALLOWED_ORIGINS`
/// environment variable. Origins are strictly whitelisted; the layer is
/// never configured with `Any`.
fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins_str = std::env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:5000,http://localhost:3000".to_string());

    if origins_str.trim().is_empty() {
        return vec![
            HeaderValue::from_static("http://localhost:5000"),
            HeaderValue::from_static("http://localhost:3000"),
        ];
    }

    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse().ok()
            }
        })
        .collect()
}

// =============================================================================
// LIST QUERY
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    search: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
}

/// Resolve query parameters against defaults for a status scope.
///
/// `page` values below 1 fall back to the first page; a non-positive
/// `limit` is rejected before it reaches the database.
fn resolve_list_request(status: NoteStatus, query: ListQuery) -> Result<ListNotesRequest, ApiError> {
    if let Some(limit) = query.limit {
        if limit <= 0 {
            return Err(ApiError::BadRequest("limit must be >= 1".to_string()));
        }
    }

    Ok(ListNotesRequest {
        status,
        search: query.search,
        page: query.page.unwrap_or(DEFAULT_PAGE).max(1),
        limit: query.limit.unwrap_or(DEFAULT_LIMIT),
    })
}

// =============================================================================
// SHARED HANDLER LOGIC (notes and bin differ only in status scope)
// =============================================================================

async fn list_scoped(
    state: &AppState,
    status: NoteStatus,
    query: ListQuery,
) -> Result<Response, ApiError> {
    let req = resolve_list_request(status, query)?;
    let response = state.db.notes.list(req).await?;
    Ok(Json(response).into_response())
}

async fn create_scoped(
    state: &AppState,
    status: NoteStatus,
    body: CreateNoteRequest,
) -> Result<Response, ApiError> {
    let note = state.db.notes.insert(status, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "note": note })),
    )
        .into_response())
}

/// Get-by-id is the one operation that converts store failures locally:
/// absent rows become a 404 and anything unexpected becomes a generic
/// 500, instead of flowing through `ApiError`.
async fn get_scoped(state: &AppState, status: NoteStatus, id: Uuid) -> Response {
    match state.db.notes.fetch(id, status).await {
        Ok(note) => (
            StatusCode::OK,
            Json(serde_json::json!({ "note": note })),
        )
            .into_response(),
        Err(Error::NoteNotFound(_)) | Err(Error::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "message": "Note not found" })),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(
                subsystem = "api",
                component = "notes",
                op = "get",
                note_id = %id,
                error = %err,
                "note fetch failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "message": "Server Error" })),
            )
                .into_response()
        }
    }
}

/// Delete responds with the success envelope whether or not the row
/// existed; the store's delete-count only decides whether to log. One
/// response per request, always.
async fn delete_scoped(
    state: &AppState,
    status: NoteStatus,
    id: Uuid,
) -> Result<Response, ApiError> {
    let removed = state.db.notes.delete(id, status).await?;
    if !removed {
        warn!(
            subsystem = "api",
            component = "notes",
            op = "delete",
            note_id = %id,
            status = status.as_str(),
            "delete requested for nonexistent note"
        );
    }
    Ok(Json(serde_json::json!({ "msg": "Success! Note removed" })).into_response())
}

// =============================================================================
// NOTES ROUTES
// =============================================================================

async fn list_notes(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    list_scoped(&state, NoteStatus::Active, query).await
}

async fn create_note(
    State(state): State<AppState>,
    Json(body): Json<CreateNoteRequest>,
) -> Result<Response, ApiError> {
    create_scoped(&state, NoteStatus::Active, body).await
}

async fn get_note(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    get_scoped(&state, NoteStatus::Active, id).await
}

async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateNoteRequest>,
) -> Result<Response, ApiError> {
    // Returns the pre-update snapshot; see the repository contract.
    let note = state.db.notes.update(id, body).await?;
    Ok(Json(serde_json::json!({ "note": note })).into_response())
}

async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    delete_scoped(&state, NoteStatus::Active, id).await
}

/// Move an active note into the bin.
async fn trash_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.notes.trash(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// BIN ROUTES
// =============================================================================

async fn list_bin(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    list_scoped(&state, NoteStatus::Trashed, query).await
}

async fn create_bin_note(
    State(state): State<AppState>,
    Json(body): Json<CreateNoteRequest>,
) -> Result<Response, ApiError> {
    create_scoped(&state, NoteStatus::Trashed, body).await
}

async fn get_bin_note(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    get_scoped(&state, NoteStatus::Trashed, id).await
}

async fn delete_bin_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    delete_scoped(&state, NoteStatus::Trashed, id).await
}

/// Move a trashed note back to the active list.
async fn restore_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.notes.restore(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// SYSTEM ROUTES
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
enum ApiError {
    Database(notewell_core::Error),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
}

impl From<notewell_core::Error> for ApiError {
    fn from(err: notewell_core::Error) -> Self {
        match &err {
            Error::NotFound(msg) => ApiError::NotFound(msg.clone()),
            Error::NoteNotFound(_) => ApiError::NotFound(err.to_string()),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            Error::Database(sqlx_err) => {
                let msg = sqlx_err.to_string();
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    let friendly_msg = if msg.contains("idx_unique_trashed_title") {
                        "A note with this title already exists in the bin".to_string()
                    } else {
                        msg
                    };
                    return ApiError::Conflict(friendly_msg);
                }
                if msg.contains("check constraint") || msg.contains("value too long") {
                    return ApiError::BadRequest(msg);
                }
                ApiError::Database(err)
            }
            _ => ApiError::Database(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(serde_json::json!({
            "message": message,
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// STARTUP
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "notewell_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "notewell_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("notewell-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            } else {
                layer = layer.with_ansi(false); // no ANSI in files
            }
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/notewell".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "5000".to_string())
        .parse()
        .unwrap_or(5000);
    let static_dir = std::env::var("STATIC_DIR")
        .unwrap_or_else(|_| "crates/notewell-api/static".to_string());

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    let state = AppState { db };

    // CORS: strict origin whitelist
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(parse_allowed_origins()))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Notes CRUD
        .route("/api/v1/notes", get(list_notes).post(create_note))
        .route(
            "/api/v1/notes/:id",
            get(get_note).patch(update_note).delete(delete_note),
        )
        .route("/api/v1/notes/:id/trash", post(trash_note))
        // Bin
        .route("/api/v1/bin", get(list_bin).post(create_bin_note))
        .route(
            "/api/v1/bin/:id",
            get(get_bin_note).delete(delete_bin_note),
        )
        .route("/api/v1/bin/:id/restore", post(restore_note))
        // Web client
        .fallback_service(ServeDir::new(&static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors)
        .layer(CatchPanicLayer::new())
        .layer(RequestBodyLimitLayer::new(1024 * 1024)) // 1 MB
        .with_state(state);

    info!("Serving static assets from {}", static_dir);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
