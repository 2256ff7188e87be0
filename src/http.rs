// src/http.rs
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use log;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::error::{AppError, AppResult};
use crate::generator::CriteriaOverrides;
use crate::models::{ContainerSummary, Credential, CredentialFilter, CredentialPatch, NewCredential};
use crate::service::{
    ContainerDeleteResponse, CredentialService, DeleteResponse, GeneratedPassword, ImportRequest,
    ImportResponse,
};

type AppState = Arc<CredentialService>;

/// Error body sent to the UI: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        let status = match &e {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_) | AppError::Crypto(_) | AppError::Cli(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            log::error!("Request failed: {}", e);
        }
        ApiError { status, message: e.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Runs a synchronous service call off the async runtime.
async fn blocking<T, F>(service: AppState, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&CredentialService) -> AppResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || f(&service)).await {
        Ok(result) => result.map(Json).map_err(ApiError::from),
        Err(e) => {
            log::error!("Blocking task failed: {}", e);
            Err(ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "internal error".to_string(),
            })
        }
    }
}

pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/credentials", get(list_credentials).post(create_credential))
        .route(
            "/credentials/:id",
            get(get_credential).put(update_credential).delete(delete_credential),
        )
        .route("/import-credentials", post(import_credentials))
        .route("/containers", get(list_containers))
        .route("/containers/:name", delete(delete_container))
        .route("/generate-password", post(generate_password))
        .with_state(service)
        .layer(CorsLayer::permissive())
}

async fn list_credentials(
    State(service): State<AppState>,
    Query(filter): Query<CredentialFilter>,
) -> ApiResult<Vec<Credential>> {
    blocking(service, move |s| s.list(&filter)).await
}

async fn get_credential(State(service): State<AppState>, Path(id): Path<String>) -> ApiResult<Credential> {
    blocking(service, move |s| s.get(&id)).await
}

async fn create_credential(
    State(service): State<AppState>,
    Json(body): Json<NewCredential>,
) -> ApiResult<Credential> {
    blocking(service, move |s| s.create(body)).await
}

async fn update_credential(
    State(service): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<CredentialPatch>,
) -> ApiResult<Credential> {
    blocking(service, move |s| s.update(&id, patch)).await
}

async fn delete_credential(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeleteResponse> {
    blocking(service, move |s| s.delete(&id)).await
}

async fn import_credentials(
    State(service): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<ImportResponse> {
    blocking(service, move |s| s.import(request)).await
}

async fn list_containers(State(service): State<AppState>) -> ApiResult<Vec<ContainerSummary>> {
    blocking(service, |s| s.containers()).await
}

async fn delete_container(
    State(service): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<ContainerDeleteResponse> {
    blocking(service, move |s| s.delete_container(&name)).await
}

async fn generate_password(
    State(service): State<AppState>,
    overrides: Option<Json<CriteriaOverrides>>,
) -> ApiResult<GeneratedPassword> {
    let overrides = overrides.map(|Json(o)| o).unwrap_or_default();
    blocking(service, move |s| s.generate_password(&overrides)).await
}

pub async fn serve(service: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(service);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
