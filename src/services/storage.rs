//! The storage contract consumed by the HTTP layer.
//!
//! Handlers only ever talk to an `Arc<dyn Storage>`. Any backend that
//! implements this trait (the SQLite/disk service, an in-memory fake in
//! tests) is interchangeable. Implementations must be safe to call from
//! many requests at once; their internal synchronization is their own
//! business.

use crate::models::{bucket::BucketMetadata, object::ObjectMetadata};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::io;
use thiserror::Error;
use tokio::io::AsyncWrite;

/// Request body handed to [`Storage::store_object`].
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("bucket `{0}` already exists")]
    BucketAlreadyExists(String),
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StorageError {
    /// True when the requested object (or the bucket holding it) does not
    /// exist. Every other variant is treated as a generic failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::ObjectNotFound { .. } | StorageError::BucketNotFound(_)
        )
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Buckets whose name starts with `prefix` (empty means all), in the
    /// backend's order.
    async fn list_buckets(&self, prefix: &str) -> StorageResult<Vec<BucketMetadata>>;

    /// At most `max_keys` objects of `bucket` whose key starts with `prefix`.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: usize,
    ) -> StorageResult<Vec<ObjectMetadata>>;

    async fn get_object_metadata(&self, bucket: &str, key: &str) -> StorageResult<ObjectMetadata>;

    /// Copy the object payload into `dest`, returning the number of bytes
    /// written.
    async fn copy_object_to_writer(
        &self,
        dest: &mut (dyn AsyncWrite + Send + Unpin),
        bucket: &str,
        key: &str,
    ) -> StorageResult<u64>;

    /// Create or overwrite an object from a stream of body chunks.
    async fn store_object(&self, bucket: &str, key: &str, body: ByteStream) -> StorageResult<()>;

    async fn store_bucket(&self, bucket: &str) -> StorageResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_covers_missing_object_and_bucket() {
        assert!(
            StorageError::ObjectNotFound {
                bucket: "b".into(),
                key: "k".into()
            }
            .is_not_found()
        );
        assert!(StorageError::BucketNotFound("b".into()).is_not_found());
        assert!(!StorageError::InvalidObjectKey.is_not_found());
        assert!(!StorageError::Io(io::Error::other("disk")).is_not_found());
    }

    #[test]
    fn display_text_is_the_client_facing_message() {
        let err = StorageError::InvalidBucketName {
            name: "AB".into(),
            reason: "must be between 3 and 63 characters".into(),
        };
        assert_eq!(
            err.to_string(),
            "bucket `AB` invalid: must be between 3 and 63 characters"
        );
    }
}
