//! HTTP handlers for object operations.
//!
//! GET streams the body out of the storage backend through an in-memory
//! pipe instead of buffering it. Headers are committed before the copy
//! starts, so a copy failure can only be logged, not reported.

use crate::{
    errors::AppError,
    models::object::ObjectMetadata,
    state::AppState,
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::io;
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};

/// Capacity of the pipe between the storage copy task and the response body.
const COPY_BUFFER_SIZE: usize = 64 * 1024;

const TEXT_PLAIN: &str = "text/plain";

/// `GET /{bucket}/{*object}`: stream an object.
///
/// Missing object: 404. Any other lookup failure: 500.
pub async fn get_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let meta = match state.storage.get_object_metadata(&bucket, &key).await {
        Ok(meta) => meta,
        Err(err) if err.is_not_found() => {
            warn!(bucket = %bucket, key = %key, error = %err, "object not found");
            return Err(AppError::not_found());
        }
        Err(err) => {
            error!(bucket = %bucket, key = %key, error = %err, "object lookup failed");
            return Err(AppError::internal());
        }
    };
    info!(bucket = %bucket, key = %key, "found object");

    let (mut writer, reader) = tokio::io::duplex(COPY_BUFFER_SIZE);
    let storage = state.storage.clone();
    tokio::spawn(async move {
        if let Err(err) = storage
            .copy_object_to_writer(&mut writer, &bucket, &key)
            .await
        {
            error!(bucket = %bucket, key = %key, error = %err, "object copy failed");
        }
    });

    let mut response = Response::new(Body::from_stream(ReaderStream::new(reader)));
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &meta);
    Ok(response)
}

/// `HEAD /{bucket}/{*object}`: same headers as GET but no body.
///
/// Missing object: 404. Any other lookup failure: 400, unlike GET.
pub async fn head_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let meta = match state.storage.get_object_metadata(&bucket, &key).await {
        Ok(meta) => meta,
        Err(err) if err.is_not_found() => {
            warn!(bucket = %bucket, key = %key, error = %err, "object not found");
            return Err(AppError::not_found());
        }
        Err(err) => {
            error!(bucket = %bucket, key = %key, error = %err, "object lookup failed");
            return Err(AppError::status(StatusCode::BAD_REQUEST));
        }
    };
    info!(bucket = %bucket, key = %key, "found object");

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &meta);
    Ok(response)
}

/// `PUT /{bucket}/{*object}`: upload an object.
pub async fn put_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let stream = body
        .into_data_stream()
        .map(|chunk| chunk.map_err(io::Error::other))
        .boxed();

    state
        .storage
        .store_object(&bucket, &key, stream)
        .await
        .map_err(|err| {
            error!(bucket = %bucket, key = %key, error = %err, "failed to store object");
            AppError::bad_request(err.to_string())
        })?;
    info!(bucket = %bucket, key = %key, "stored object");
    Ok(StatusCode::OK)
}

/// HTTP-date form used by `Last-Modified`, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(ts: &DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn set_object_headers(headers: &mut HeaderMap, meta: &ObjectMetadata) {
    if let Ok(value) = HeaderValue::from_str(&meta.etag) {
        headers.insert(header::ETAG, value);
    }
    if let Ok(value) = HeaderValue::from_str(&http_date(&meta.created_at)) {
        headers.insert(header::LAST_MODIFIED, value);
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(meta.size.max(0)));
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
}
