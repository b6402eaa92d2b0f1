//! Shared helpers for the HTTP integration tests.
//!
//! `MemoryStorage` is an in-memory `Storage` that keeps insertion order and
//! can be told to fail specific operations.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
};
use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use http_body_util::BodyExt;
use object_api::{
    AppState, app,
    models::{bucket::BucketMetadata, listing::Owner, object::ObjectMetadata},
    services::storage::{ByteStream, Storage, StorageError, StorageResult},
};
use std::{
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::io::{AsyncWrite, AsyncWriteExt};

struct StoredBucket {
    meta: BucketMetadata,
    objects: Vec<(ObjectMetadata, Bytes)>,
}

#[derive(Default)]
pub struct MemoryStorage {
    buckets: Mutex<Vec<StoredBucket>>,
    pub fail_listing: AtomicBool,
    pub fail_lookup: AtomicBool,
    pub fail_copy: AtomicBool,
    pub fail_store: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }

    fn failing(flag: &AtomicBool, what: &str) -> StorageResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::other(format!("{what} unavailable"))));
        }
        Ok(())
    }

    fn object(&self, bucket: &str, key: &str) -> StorageResult<(ObjectMetadata, Bytes)> {
        let buckets = self.buckets.lock().unwrap();
        let stored = buckets
            .iter()
            .find(|b| b.meta.name == bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        stored
            .objects
            .iter()
            .find(|(meta, _)| meta.key == key)
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn list_buckets(&self, prefix: &str) -> StorageResult<Vec<BucketMetadata>> {
        Self::failing(&self.fail_listing, "bucket listing")?;
        Ok(self
            .buckets
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.meta.name.starts_with(prefix))
            .map(|b| b.meta.clone())
            .collect())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: usize,
    ) -> StorageResult<Vec<ObjectMetadata>> {
        Self::failing(&self.fail_listing, "object listing")?;
        let buckets = self.buckets.lock().unwrap();
        let stored = buckets
            .iter()
            .find(|b| b.meta.name == bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        Ok(stored
            .objects
            .iter()
            .filter(|(meta, _)| meta.key.starts_with(prefix))
            .take(max_keys)
            .map(|(meta, _)| meta.clone())
            .collect())
    }

    async fn get_object_metadata(&self, bucket: &str, key: &str) -> StorageResult<ObjectMetadata> {
        Self::failing(&self.fail_lookup, "metadata")?;
        Ok(self.object(bucket, key)?.0)
    }

    async fn copy_object_to_writer(
        &self,
        dest: &mut (dyn AsyncWrite + Send + Unpin),
        bucket: &str,
        key: &str,
    ) -> StorageResult<u64> {
        Self::failing(&self.fail_copy, "payload")?;
        let (_, data) = self.object(bucket, key)?;
        dest.write_all(&data).await?;
        dest.flush().await?;
        Ok(data.len() as u64)
    }

    async fn store_object(
        &self,
        bucket: &str,
        key: &str,
        mut body: ByteStream,
    ) -> StorageResult<()> {
        Self::failing(&self.fail_store, "object store")?;
        let mut data = Vec::new();
        while let Some(chunk) = body.next().await {
            data.extend_from_slice(&chunk?);
        }

        let meta = ObjectMetadata {
            key: key.to_string(),
            etag: format!("{:x}", md5::compute(&data)),
            size: data.len() as i64,
            created_at: Utc::now(),
        };

        let mut buckets = self.buckets.lock().unwrap();
        let stored = buckets
            .iter_mut()
            .find(|b| b.meta.name == bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        stored.objects.retain(|(m, _)| m.key != key);
        stored.objects.push((meta, Bytes::from(data)));
        Ok(())
    }

    async fn store_bucket(&self, bucket: &str) -> StorageResult<()> {
        if bucket.len() < 3 || !bucket.chars().all(|c| c.is_ascii_lowercase() || c == '-') {
            return Err(StorageError::InvalidBucketName {
                name: bucket.to_string(),
                reason: "must be 3+ lowercase letters or hyphens".into(),
            });
        }
        let mut buckets = self.buckets.lock().unwrap();
        if buckets.iter().any(|b| b.meta.name == bucket) {
            return Err(StorageError::BucketAlreadyExists(bucket.to_string()));
        }
        buckets.push(StoredBucket {
            meta: BucketMetadata {
                name: bucket.to_string(),
                created_at: Utc::now(),
            },
            objects: Vec::new(),
        });
        Ok(())
    }
}

pub fn test_app(storage: Arc<dyn Storage>) -> Router {
    app(AppState::new(storage, Owner::new("minio", "minio")))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }

    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .unwrap_or_else(|| panic!("missing header {name}"))
            .to_str()
            .unwrap()
    }
}

/// Send one request through the router in-process.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    headers: &[(&str, &str)],
    body: impl Into<Body>,
) -> TestResponse {
    use tower::ServiceExt;

    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let response = app
        .clone()
        .oneshot(builder.body(body.into()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    TestResponse {
        status,
        headers,
        body,
    }
}
