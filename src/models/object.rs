//! Represents an object (file) stored in a bucket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Metadata for a single object (blob) within a bucket.
///
/// This describes the stored content, not the content bytes themselves.
/// The `etag` is opaque to the HTTP layer and is passed through untouched.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Object key (path-like identifier within the bucket).
    pub key: String,

    /// Content fingerprint.
    pub etag: String,

    /// Size in bytes.
    #[sqlx(rename = "size_bytes")]
    pub size: i64,

    /// Timestamp when the object was written.
    pub created_at: DateTime<Utc>,
}
