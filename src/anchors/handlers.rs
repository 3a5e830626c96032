use super::cache::AnchorKeyCache;
use super::error::AnchorError;
use super::protocol::*;
use super::types::AnchorNumber;
use crate::table::TableStore;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;

type ErrorResponse = (StatusCode, String);

/// Builds the public anchor API around a shared cache.
pub fn router<S: TableStore + 'static>(cache: Arc<AnchorKeyCache<S>>) -> Router {
    Router::new()
        .route(ENDPOINT_ANCHORS, post(handle_allocate_body::<S>))
        .route(ENDPOINT_KEY, post(handle_allocate_query::<S>))
        .route(ENDPOINT_REGISTERED_KEY, post(handle_allocate_registered::<S>))
        .route(ENDPOINT_LAST, get(handle_get_last::<S>))
        .route(ENDPOINT_ALL, get(handle_get_all::<S>))
        .route(ENDPOINT_ALL_AS_STRING, get(handle_get_all_as_string::<S>))
        .route(ENDPOINT_DELETE_ALL, get(handle_delete_all::<S>))
        .route(ENDPOINT_DELETE, get(handle_delete_by_key::<S>))
        .route(ENDPOINT_ANCHOR_BY_NUMBER, get(handle_get_by_number::<S>))
        .route(ENDPOINT_HEALTH, get(handle_health))
        .layer(Extension(cache))
}

fn status_for(error: &AnchorError) -> StatusCode {
    match error {
        AnchorError::NotFound(_) => StatusCode::NOT_FOUND,
        AnchorError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AnchorError::AllocationConflict(_) => StatusCode::CONFLICT,
        AnchorError::Exhausted(_) => StatusCode::INSUFFICIENT_STORAGE,
        AnchorError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AnchorError::CorruptRowKey(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: AnchorError) -> ErrorResponse {
    let status = status_for(&error);
    if status.is_server_error() || status == StatusCode::CONFLICT {
        tracing::error!("Anchor request failed: {}", error);
    } else {
        tracing::debug!("Anchor request rejected: {}", error);
    }
    (status, error.to_string())
}

fn blank_key() -> ErrorResponse {
    (
        StatusCode::BAD_REQUEST,
        "anchor key must not be blank".to_string(),
    )
}

async fn allocate<S: TableStore>(
    cache: &Arc<AnchorKeyCache<S>>,
    anchor_key: &str,
    object_name: Option<&str>,
) -> Result<Json<AnchorNumber>, ErrorResponse> {
    if anchor_key.trim().is_empty() {
        return Err(blank_key());
    }

    match cache.allocate(anchor_key, object_name).await {
        Ok(number) => {
            tracing::info!("Registered anchor {}", number);
            Ok(Json(number))
        }
        Err(e) => Err(error_response(e)),
    }
}

pub async fn handle_allocate_body<S: TableStore + 'static>(
    Extension(cache): Extension<Arc<AnchorKeyCache<S>>>,
    body: String,
) -> Result<Json<AnchorNumber>, ErrorResponse> {
    allocate(&cache, &body, None).await
}

pub async fn handle_allocate_query<S: TableStore + 'static>(
    Extension(cache): Extension<Arc<AnchorKeyCache<S>>>,
    Query(params): Query<AnchorKeyParams>,
) -> Result<Json<AnchorNumber>, ErrorResponse> {
    allocate(&cache, &params.anchor_key, None).await
}

pub async fn handle_allocate_registered<S: TableStore + 'static>(
    Extension(cache): Extension<Arc<AnchorKeyCache<S>>>,
    Query(params): Query<RegisteredKeyParams>,
) -> Result<Json<AnchorNumber>, ErrorResponse> {
    let object_name = params
        .object_name
        .as_deref()
        .filter(|name| !name.trim().is_empty());
    allocate(&cache, &params.anchor_key, object_name).await
}

pub async fn handle_get_by_number<S: TableStore + 'static>(
    Extension(cache): Extension<Arc<AnchorKeyCache<S>>>,
    Path(anchor_number): Path<u64>,
) -> Result<String, ErrorResponse> {
    cache
        .get_by_number(AnchorNumber(anchor_number))
        .await
        .map_err(error_response)
}

pub async fn handle_get_last<S: TableStore + 'static>(
    Extension(cache): Extension<Arc<AnchorKeyCache<S>>>,
) -> Result<String, ErrorResponse> {
    cache
        .get_last_key()
        .await
        .map(Option::unwrap_or_default)
        .map_err(error_response)
}

pub async fn handle_get_all<S: TableStore + 'static>(
    Extension(cache): Extension<Arc<AnchorKeyCache<S>>>,
) -> Result<Json<Vec<String>>, ErrorResponse> {
    cache.get_all_keys().await.map(Json).map_err(error_response)
}

pub async fn handle_get_all_as_string<S: TableStore + 'static>(
    Extension(cache): Extension<Arc<AnchorKeyCache<S>>>,
) -> Result<String, ErrorResponse> {
    cache
        .get_all_keys_delimited()
        .await
        .map_err(error_response)
}

pub async fn handle_delete_all<S: TableStore + 'static>(
    Extension(cache): Extension<Arc<AnchorKeyCache<S>>>,
) -> Result<Json<bool>, ErrorResponse> {
    cache.delete_all().await.map(Json).map_err(error_response)
}

pub async fn handle_delete_by_key<S: TableStore + 'static>(
    Extension(cache): Extension<Arc<AnchorKeyCache<S>>>,
    Query(params): Query<AnchorKeyParams>,
) -> Result<Json<bool>, ErrorResponse> {
    cache
        .delete_by_key(&params.anchor_key)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn handle_health() -> &'static str {
    "ok"
}
