//! Handlers for the service root and bucket-level endpoints.

use crate::{
    errors::AppError,
    models::listing::{BucketListResponse, MAX_OBJECT_LIST, ObjectListResponse},
    negotiation::ResponseFormat,
    services::storage::StorageError,
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, error, warn};

/// Query params accepted by the listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub prefix: Option<String>,
}

/// `GET /`: list buckets.
pub async fn list_buckets(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let format = ResponseFormat::from_headers(&headers);
    let prefix = q.prefix.unwrap_or_default();

    let buckets = state.storage.list_buckets(&prefix).await.map_err(|err| {
        error!(prefix = %prefix, error = %err, "failed to list buckets");
        AppError::internal()
    })?;
    debug!(count = buckets.len(), "listed buckets");

    format.respond(&BucketListResponse::new(state.owner.clone(), &buckets))
}

/// `GET /{bucket}` and `GET /{bucket}/`: list up to 1000 objects.
///
/// Unknown bucket: 404. Malformed bucket name: 400. Anything else: 500.
pub async fn list_objects(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    Query(q): Query<ListQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let format = ResponseFormat::from_headers(&headers);
    let prefix = q.prefix.unwrap_or_default();

    let objects = state
        .storage
        .list_objects(&bucket, &prefix, MAX_OBJECT_LIST)
        .await
        .map_err(|err| match err {
            err if err.is_not_found() => {
                warn!(bucket = %bucket, error = %err, "bucket not found");
                AppError::not_found()
            }
            StorageError::InvalidBucketName { .. } => {
                warn!(bucket = %bucket, error = %err, "invalid bucket name");
                AppError::status(StatusCode::BAD_REQUEST)
            }
            err => {
                error!(bucket = %bucket, prefix = %prefix, error = %err, "failed to list objects");
                AppError::internal()
            }
        })?;
    debug!(bucket = %bucket, count = objects.len(), "listed objects");

    format.respond(&ObjectListResponse::new(bucket, &state.owner, &objects))
}

/// `PUT /{bucket}`: create bucket.
pub async fn create_bucket(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.storage.store_bucket(&bucket).await.map_err(|err| {
        error!(bucket = %bucket, error = %err, "failed to create bucket");
        AppError::bad_request(err.to_string())
    })?;
    debug!(bucket = %bucket, "created bucket");
    Ok(StatusCode::OK)
}
