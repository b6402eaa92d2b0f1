//! Defines routes for the S3-compatible bucket and object operations.
//!
//! ## Structure
//! - `GET  /`                     list buckets
//! - `GET  /{bucket}`             list objects
//! - `GET  /{bucket}/`            list objects
//! - `PUT  /{bucket}`             create bucket
//! - `GET  /{bucket}/{*object}`   download object
//! - `HEAD /{bucket}/{*object}`   object headers only
//! - `PUT  /{bucket}/{*object}`   upload object
//!
//! The wildcard `*object` allows nested keys like `photos/2025/img.jpg`.
//! Anything else gets axum's default 404 / 405.

use crate::{
    handlers::{
        bucket_handlers::{create_bucket, list_buckets, list_objects},
        object_handlers::{get_object, head_object, put_object},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, put},
};

/// Build the router for all S3-compatible routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_buckets))
        // Object-level routes
        .route(
            "/{bucket}/{*object}",
            put(put_object).get(get_object).head(head_object),
        )
        // Bucket-level routes
        .route("/{bucket}", get(list_objects).put(create_bucket))
        .route("/{bucket}/", get(list_objects))
}
