//! HTTP server.
//!
//! Wires the auth, ingestion, document and chat services into an axum
//! router. Stores, token keys and the chat backend are built once in
//! [`run_server`] and injected through [`AppState`].
//!
//! # Endpoints
//!
//! | Method | Path | Auth | Description |
//! |--------|------|------|-------------|
//! | `POST` | `/api/register` | none | Create an account |
//! | `POST` | `/api/login` | none | Exchange credentials for a token |
//! | `POST` | `/upload` | bearer | Multipart upload (field `file`) |
//! | `POST` | `/chat-with-pdf` | bearer | Ask a question over the caller's documents |
//! | `GET`  | `/search` | bearer | `?query=&sort=uploaded\|filename` |
//! | `DELETE` | `/delete/{id}` | bearer | Remove an owned document |
//! | `PUT`  | `/rename/{id}` | bearer | Change an owned document's filename |
//! | `PUT`  | `/update/{id}` | see below | Replace a document's content |
//! | `GET`  | `/health` | none | Health check (returns version) |
//!
//! `PUT /update/{id}` is public unless `server.protect_content_update` is
//! set, in which case it sits behind the token gate and checks ownership.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "forbidden", "message": "Unauthorized to delete this PDF." } }
//! ```
//!
//! Codes: `bad_request` (400), `unauthorized` (401), `token_expired` /
//! `invalid_token` / `forbidden` (403), `not_found` (404), `conflict` (409),
//! `payload_too_large` (413), `unsupported_media_type` (415),
//! `upstream_error` (502), `internal` (500).
//!
//! Extractor rejections (malformed JSON, bad query strings, non-multipart
//! uploads, oversized bodies) use the same envelope.

use anyhow::Context;
use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{DefaultBodyLimit, Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use docvault_core::models::{Document, DocumentQuery, SortOrder};
use docvault_core::store::{DocumentStore, UserStore};
use docvault_core::VaultError;

use crate::auth::{self, Caller, TokenKeys};
use crate::chat::{self, ChatModel};
use crate::config::Config;
use crate::documents;
use crate::ingest::{Ingestor, Upload};
use crate::sqlite_store::SqliteStore;
use crate::{db, migrate};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub keys: Arc<TokenKeys>,
    pub chat: Arc<dyn ChatModel>,
    pub ingestor: Arc<Ingestor>,
    pub max_upload_bytes: usize,
    pub protect_content_update: bool,
}

/// Opens the database, builds the services and serves until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    let store = Arc::new(SqliteStore::new(pool));

    let keys = TokenKeys::from_config(&config.auth)?;
    let chat = chat::create_chat_model(&config.chat)?;

    let state = AppState {
        users: store.clone(),
        documents: store,
        keys: Arc::new(keys),
        chat,
        ingestor: Arc::new(Ingestor::from_config(&config.ingest)),
        max_upload_bytes: config.server.max_upload_bytes,
        protect_content_update: config.server.protect_content_update,
    };

    if !state.protect_content_update {
        warn!("PUT /update/{{id}} accepts unauthenticated requests; set server.protect_content_update = true to require a token");
    }

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    info!(bind = %config.server.bind, chat_model = state.chat.model_name(), "docvault listening");
    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Builds the full route table.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut public = Router::new()
        .route("/api/register", post(handle_register))
        .route("/api/login", post(handle_login))
        .route("/health", get(handle_health));

    let mut protected = Router::new()
        .route(
            "/upload",
            post(handle_upload).layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        )
        .route("/chat-with-pdf", post(handle_chat))
        .route("/search", get(handle_search))
        .route("/delete/{id}", delete(handle_delete))
        .route("/rename/{id}", put(handle_rename));

    let update_limit = DefaultBodyLimit::max(state.max_upload_bytes);
    if state.protect_content_update {
        protected = protected.route(
            "/update/{id}",
            put(handle_update_owned).layer(update_limit),
        );
    } else {
        public = public.route("/update/{id}", put(handle_update).layer(update_limit));
    }

    let protected =
        protected.route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Token gate shared by every protected route. Rejections never reach the
/// handler; success injects the [`Caller`].
async fn require_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let caller =
        auth::resolve_caller(state.users.as_ref(), &state.keys, authorization, Utc::now()).await?;
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, code = %self.code, "{}", self.message);
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<VaultError> for AppError {
    fn from(err: VaultError) -> Self {
        let status = match &err {
            VaultError::Validation(_) => StatusCode::BAD_REQUEST,
            VaultError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            VaultError::TokenExpired | VaultError::InvalidToken | VaultError::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }
            VaultError::NotFound(_) => StatusCode::NOT_FOUND,
            VaultError::Conflict(_) => StatusCode::CONFLICT,
            VaultError::Upstream(_) => StatusCode::BAD_GATEWAY,
            VaultError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    VaultError::Validation(message.into()).into()
}

/// Maps an extractor rejection onto the error envelope. Size and media-type
/// rejections keep their status; everything else is a 400.
fn rejection(status: StatusCode, body_text: String) -> AppError {
    let code = match status {
        StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "unsupported_media_type",
        _ => return bad_request(body_text),
    };
    AppError {
        status,
        code: code.to_string(),
        message: body_text,
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        rejection(err.status(), err.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(err: QueryRejection) -> Self {
        rejection(err.status(), err.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(err: MultipartRejection) -> Self {
        rejection(err.status(), err.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        rejection(err.status(), format!("Multipart error: {}", err.body_text()))
    }
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ /api/register, /api/login ============

#[derive(Deserialize)]
struct CredentialsRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn handle_register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let Json(req) = payload?;
    auth::register(state.users.as_ref(), &req.username, &req.password).await?;
    Ok((StatusCode::CREATED, message("User registered successfully")))
}

#[derive(Serialize)]
struct UserSummary {
    id: String,
    username: String,
}

#[derive(Serialize)]
struct LoginResponse {
    message: String,
    token: String,
    user: UserSummary,
}

async fn handle_login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(req) = payload?;
    let outcome = auth::login(
        state.users.as_ref(),
        &state.keys,
        &req.username,
        &req.password,
    )
    .await?;
    Ok(Json(LoginResponse {
        message: "Authentication successful".to_string(),
        token: outcome.token,
        user: UserSummary {
            id: outcome.user.id,
            username: outcome.user.username,
        },
    }))
}

// ============ POST /upload ============

#[derive(Serialize)]
struct UploadResponse {
    message: String,
    id: String,
}

async fn handle_upload(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart?;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(|c| c.to_string());
        let bytes = field.bytes().await?.to_vec();
        upload = Some(Upload {
            filename,
            content_type,
            bytes,
        });
    }

    let doc = state
        .ingestor
        .ingest(state.documents.as_ref(), &caller.user_id, upload)
        .await?;
    Ok(Json(UploadResponse {
        message: "PDF uploaded and indexed!".to_string(),
        id: doc.id,
    }))
}

// ============ POST /chat-with-pdf ============

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    question: String,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(req) = payload?;
    let reply = chat::chat_with_documents(
        state.documents.as_ref(),
        state.chat.as_ref(),
        &caller.user_id,
        &req.question,
    )
    .await?;
    Ok(Json(ChatResponse { reply }))
}

// ============ GET /search ============

#[derive(Deserialize)]
struct SearchParams {
    query: Option<String>,
    sort: Option<String>,
}

async fn handle_search(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<Document>>, AppError> {
    let Query(params) = params?;
    let sort: SortOrder = params.sort.as_deref().unwrap_or_default().parse()?;
    let query = DocumentQuery::matching(params.query.as_deref()).sorted(sort);
    let docs = documents::search(state.documents.as_ref(), &caller.user_id, &query).await?;
    Ok(Json(docs))
}

// ============ DELETE /delete/{id} ============

async fn handle_delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    documents::delete(state.documents.as_ref(), &caller.user_id, &id).await?;
    Ok(message("PDF deleted successfully!"))
}

// ============ PUT /rename/{id} ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameRequest {
    #[serde(default)]
    new_filename: String,
}

#[derive(Serialize)]
struct RenameResponse {
    message: String,
    document: Document,
}

async fn handle_rename(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    payload: Result<Json<RenameRequest>, JsonRejection>,
) -> Result<Json<RenameResponse>, AppError> {
    let Json(req) = payload?;
    let document = documents::rename(
        state.documents.as_ref(),
        &caller.user_id,
        &id,
        &req.new_filename,
    )
    .await?;
    Ok(Json(RenameResponse {
        message: "PDF renamed successfully!".to_string(),
        document,
    }))
}

// ============ PUT /update/{id} ============

#[derive(Deserialize)]
struct UpdateRequest {
    content: Option<String>,
}

async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<Document>, AppError> {
    let Json(req) = payload?;
    update_content(&state, None, &id, req).await
}

async fn handle_update_owned(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<Document>, AppError> {
    let Json(req) = payload?;
    update_content(&state, Some(&caller.user_id), &id, req).await
}

async fn update_content(
    state: &AppState,
    caller_id: Option<&str>,
    id: &str,
    req: UpdateRequest,
) -> Result<Json<Document>, AppError> {
    let content = req.content.ok_or_else(|| bad_request("content is required"))?;
    let doc = documents::update_content(state.documents.as_ref(), caller_id, id, &content).await?;
    Ok(Json(doc))
}
