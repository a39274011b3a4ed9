//! HTTP server mode for REST API access to directory search sessions

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{Error, ErrorKind, Result};
use crate::export::ExportOutput;
use crate::pagination::PageResult;
use crate::service::{
    AllResults, AttributeList, DirectoryService, ExportRequest, Health, QueryRequest,
    SessionSummary,
};
use crate::session::spawn_sweeper;

/// App state shared across handlers
#[derive(Clone)]
struct AppState {
    service: DirectoryService,
}

/// Query string for page requests
#[derive(Debug, Deserialize)]
struct PageParams {
    #[serde(default = "first_page")]
    page_number: u32,
}

fn first_page() -> u32 {
    1
}

/// Query string for "get all" requests
#[derive(Debug, Deserialize)]
struct AllParams {
    /// Record ceiling (0 = unlimited, absent = configured default)
    #[serde(default)]
    max_results: Option<usize>,
}

/// Acknowledgement of a session invalidation
#[derive(Debug, Serialize)]
struct Invalidated {
    session_id: String,
    /// Whether a live session was removed
    invalidated: bool,
}

/// Response wrapper
#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }

    fn error(msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// HTTP status for a service error
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::ProviderTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => match error.kind() {
            ErrorKind::Validation | ErrorKind::OutOfRange => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Provider => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

/// Service error rendered as an error envelope
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "Request rejected");
        }
        (status, Json(ApiResponse::<()>::error(self.0.to_string()))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

/// Build the API router for a service
pub fn router(service: DirectoryService) -> Router {
    // Build CORS layer - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/attributes/:object_type", get(attributes))
        .route("/api/query", post(start_query))
        .route("/api/query/page/:session_id", get(get_page))
        .route("/api/query/all/:session_id", get(get_all))
        .route("/api/query/export/:session_id", post(export))
        .route("/api/query/session/:session_id", get(session_summary))
        .route("/api/query/:session_id", delete(invalidate_session))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

/// Start the HTTP server and the session sweeper
pub async fn serve(service: DirectoryService, port: u16) -> Result<()> {
    let sweeper = spawn_sweeper(
        service.store().clone(),
        service.config().sweep_interval(),
    );
    let app = router(service);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind to port {port}: {e}")))?;

    let served = axum::serve(listener, app)
        .await
        .map_err(|e| Error::config(format!("Server error: {e}")));
    sweeper.abort();
    served
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<ApiResponse<Health>> {
    ApiResponse::success(state.service.health().await)
}

/// Default attributes of an object type
async fn attributes(
    State(state): State<AppState>,
    Path(object_type): Path<String>,
) -> ApiResult<AttributeList> {
    Ok(ApiResponse::success(state.service.attributes(&object_type)?))
}

/// Start a query and return its first page
async fn start_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<PageResult> {
    Ok(ApiResponse::success(state.service.start_query(&request).await?))
}

/// Fetch one page of a session
async fn get_page(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<PageResult> {
    let page = state
        .service
        .get_page(&session_id, params.page_number)
        .await?;
    Ok(ApiResponse::success(page))
}

/// Drain a session and return every record up to the ceiling
async fn get_all(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(params): Query<AllParams>,
) -> ApiResult<AllResults> {
    let all = state
        .service
        .get_all(&session_id, params.max_results)
        .await?;
    Ok(ApiResponse::success(all))
}

/// Export a session as a file download
async fn export(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ExportRequest>,
) -> std::result::Result<Response, ApiError> {
    let ExportOutput {
        bytes,
        filename,
        content_type,
        ..
    } = state.service.export(&session_id, &request).await?;

    let headers = [
        (header::CONTENT_TYPE, content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

/// Progress of a session
async fn session_summary(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionSummary> {
    Ok(ApiResponse::success(
        state.service.session_summary(&session_id).await?,
    ))
}

/// Destroy a session
async fn invalidate_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<ApiResponse<Invalidated>> {
    let invalidated = state.service.invalidate_session(&session_id).await;
    ApiResponse::success(Invalidated {
        session_id,
        invalidated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&Error::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&Error::out_of_range(4, 3)), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&Error::session_not_found("x")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&Error::provider("p", "search", "down")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&Error::provider_timeout("p", "search", 10)),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&Error::export("x")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
