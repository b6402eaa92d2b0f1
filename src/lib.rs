//! An S3-compatible HTTP front end over a pluggable storage backend.
//!
//! Clients list buckets, list objects, create buckets, and get/head/put
//! objects. Listings are rendered as XML or JSON depending on `Accept`.
//! Persistence lives behind [`services::storage::Storage`].

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod negotiation;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// The complete application: routes, request tracing, and state.
pub fn app(state: AppState) -> Router {
    routes::routes::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
