//! StorageService: a [`Storage`] backend with SQLite for metadata and
//! local disk for object payloads.
//!
//! Every stored version gets its own immutable payload file at
//! `base_path/{bucket}/{shard}/{shard}/{payload_id}`. The `objects` row
//! names the current payload, so swapping versions is a single row update
//! and the row's ETag and size always describe the file it points at.
//! There is no cache layer; every call goes to SQLite and the filesystem.

use crate::{
    models::{bucket::BucketMetadata, object::ObjectMetadata},
    services::storage::{ByteStream, Storage, StorageError, StorageResult},
};
use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use md5::Context;
use sqlx::{FromRow, QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::{AsyncWrite, AsyncWriteExt},
};
use tracing::{debug, warn};
use uuid::Uuid;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const MAX_OBJECT_KEY_LEN: usize = 1024;
const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;

/// How often a read chases a payload that an overwrite removed under it.
const MAX_OPEN_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct StorageService {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,
}

#[derive(FromRow)]
struct BucketRecord {
    id: Uuid,
    name: String,
}

impl StorageService {
    /// Create a new StorageService backed by the provided SQLite pool and
    /// using `base_path` as the root directory for object payloads.
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Apply the bundled schema. Every statement is idempotent, so this is
    /// safe to run on every start.
    pub async fn migrate(&self) -> StorageResult<()> {
        let statements = SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        debug!("applying {} schema statements", statements.len());
        for stmt in statements {
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    fn bucket_root(&self, bucket_name: &str) -> PathBuf {
        self.base_path.join(bucket_name)
    }

    /// `base_path/bucket/{shard}/{shard}/{payload_id}`, sharded on the first
    /// two bytes of the id. Parent directories may not exist yet.
    fn payload_path(&self, bucket_name: &str, payload_id: Uuid) -> PathBuf {
        let id = payload_id.as_bytes();
        let mut path = self.bucket_root(bucket_name);
        path.push(format!("{:02x}", id[0]));
        path.push(format!("{:02x}", id[1]));
        path.push(payload_id.simple().to_string());
        path
    }

    async fn fetch_bucket(&self, bucket: &str) -> StorageResult<BucketRecord> {
        validate_bucket_name(bucket)?;
        sqlx::query_as::<Sqlite, BucketRecord>("SELECT id, name FROM buckets WHERE name = ?")
            .bind(bucket)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => StorageError::BucketNotFound(bucket.to_string()),
                other => StorageError::Sqlx(other),
            })
    }

    async fn fetch_object(&self, bucket: &BucketRecord, key: &str) -> StorageResult<ObjectMetadata> {
        sqlx::query_as::<Sqlite, ObjectMetadata>(
            "SELECT key, etag, size_bytes, created_at
             FROM objects
             WHERE key = ? AND bucket_id = ?",
        )
        .bind(key)
        .bind(bucket.id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StorageError::ObjectNotFound {
                bucket: bucket.name.clone(),
                key: key.to_string(),
            },
            other => StorageError::Sqlx(other),
        })
    }

    async fn fetch_payload_id(&self, bucket: &BucketRecord, key: &str) -> StorageResult<Uuid> {
        sqlx::query_scalar::<Sqlite, Uuid>(
            "SELECT payload_id FROM objects WHERE key = ? AND bucket_id = ?",
        )
        .bind(key)
        .bind(bucket.id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StorageError::ObjectNotFound {
                bucket: bucket.name.clone(),
                key: key.to_string(),
            },
            other => StorageError::Sqlx(other),
        })
    }

    /// Point the `(bucket, key)` row at `payload_id`, returning the payload
    /// it replaced. `BEGIN IMMEDIATE` takes the write lock up front, so the
    /// read of the old id and the upsert see the same row.
    async fn commit_object(
        &self,
        bucket: &BucketRecord,
        key: &str,
        payload_id: Uuid,
        etag: &str,
        size_bytes: i64,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        let mut tx = self.db.begin_with("BEGIN IMMEDIATE").await?;

        let previous = sqlx::query_scalar::<Sqlite, Uuid>(
            "SELECT payload_id FROM objects WHERE key = ? AND bucket_id = ?",
        )
        .bind(key)
        .bind(bucket.id)
        .fetch_optional(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO objects (id, bucket_id, key, payload_id, etag, size_bytes, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(bucket_id, key) DO UPDATE SET
                 payload_id = excluded.payload_id,
                 etag = excluded.etag,
                 size_bytes = excluded.size_bytes,
                 created_at = excluded.created_at",
        )
        .bind(Uuid::new_v4())
        .bind(bucket.id)
        .bind(key)
        .bind(payload_id)
        .bind(etag)
        .bind(size_bytes)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(previous)
    }
}

#[async_trait]
impl Storage for StorageService {
    async fn list_buckets(&self, prefix: &str) -> StorageResult<Vec<BucketMetadata>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT name, created_at FROM buckets");
        if !prefix.is_empty() {
            builder.push(" WHERE substr(name, 1, ");
            builder.push_bind(prefix.chars().count() as i64);
            builder.push(") = ");
            builder.push_bind(prefix);
        }
        builder.push(" ORDER BY name ASC");

        let buckets: Vec<BucketMetadata> = builder.build_query_as().fetch_all(&*self.db).await?;
        Ok(buckets)
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: usize,
    ) -> StorageResult<Vec<ObjectMetadata>> {
        let bucket_rec = self.fetch_bucket(bucket).await?;

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT key, etag, size_bytes, created_at FROM objects WHERE bucket_id = ",
        );
        builder.push_bind(bucket_rec.id);
        if !prefix.is_empty() {
            builder.push(" AND substr(key, 1, ");
            builder.push_bind(prefix.chars().count() as i64);
            builder.push(") = ");
            builder.push_bind(prefix);
        }
        builder.push(" ORDER BY key ASC LIMIT ");
        builder.push_bind(max_keys as i64);

        let objects: Vec<ObjectMetadata> = builder.build_query_as().fetch_all(&*self.db).await?;
        Ok(objects)
    }

    async fn get_object_metadata(&self, bucket: &str, key: &str) -> StorageResult<ObjectMetadata> {
        validate_key(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        self.fetch_object(&bucket_rec, key).await
    }

    async fn copy_object_to_writer(
        &self,
        dest: &mut (dyn AsyncWrite + Send + Unpin),
        bucket: &str,
        key: &str,
    ) -> StorageResult<u64> {
        validate_key(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;

        let mut attempts = 1;
        let mut file = loop {
            let payload_id = self.fetch_payload_id(&bucket_rec, key).await?;
            match File::open(self.payload_path(&bucket_rec.name, payload_id)).await {
                Ok(file) => break file,
                Err(err) if err.kind() == ErrorKind::NotFound && attempts < MAX_OPEN_ATTEMPTS => {
                    attempts += 1;
                    debug!(bucket, key, "payload superseded before open, re-reading row");
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    return Err(StorageError::ObjectNotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    });
                }
                Err(err) => return Err(StorageError::Io(err)),
            }
        };

        let copied = tokio::io::copy(&mut file, dest).await?;
        dest.flush().await?;
        Ok(copied)
    }

    /// Stream an object into a new payload file, then switch the metadata
    /// row over to it.
    ///
    /// The payload is spooled into a temp file while the MD5 (the ETag) and
    /// size are computed, fsynced, and renamed to its final name. The
    /// superseded payload is removed only after the row update commits; on
    /// any failure only the new file is removed, leaving the previous
    /// version readable.
    async fn store_object(&self, bucket: &str, key: &str, body: ByteStream) -> StorageResult<()> {
        validate_key(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;

        let payload_id = Uuid::new_v4();
        let file_path = self.payload_path(&bucket_rec.name, payload_id);
        let parent = file_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| io::Error::other("payload path missing parent directory"))?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", payload_id.simple()));
        let (size_bytes, etag) = match spool(&tmp_path, body).await {
            Ok(written) => written,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
        };

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }

        let previous = match self
            .commit_object(&bucket_rec, key, payload_id, &etag, size_bytes)
            .await
        {
            Ok(previous) => previous,
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                return Err(StorageError::Sqlx(err));
            }
        };

        if let Some(previous) = previous {
            let old_path = self.payload_path(&bucket_rec.name, previous);
            if let Err(err) = fs::remove_file(&old_path).await {
                warn!(bucket, key, error = %err, "failed to remove superseded payload");
            }
        }

        debug!(bucket, key, size_bytes, "stored object");
        Ok(())
    }

    /// Validates the name, creates the bucket directory and inserts the
    /// metadata row. A name conflict is `BucketAlreadyExists`.
    async fn store_bucket(&self, bucket: &str) -> StorageResult<()> {
        validate_bucket_name(bucket)?;
        fs::create_dir_all(self.bucket_root(bucket)).await?;

        match sqlx::query("INSERT INTO buckets (id, name, created_at) VALUES (?, ?, ?)")
            .bind(Uuid::new_v4())
            .bind(bucket)
            .bind(Utc::now())
            .execute(&*self.db)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::BucketAlreadyExists(bucket.to_string()))
            }
            Err(err) => Err(StorageError::Sqlx(err)),
        }
    }
}

/// Write every chunk of `body` to a fresh file at `path`, returning the
/// byte count and the lowercase hex MD5 of the content.
async fn spool(path: &Path, mut body: ByteStream) -> io::Result<(i64, String)> {
    let mut file = File::create(path).await?;
    let mut size_bytes: i64 = 0;
    let mut digest = Context::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        size_bytes += chunk.len() as i64;
        digest.consume(&chunk);
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    file.sync_all().await?;

    Ok((size_bytes, format!("{:x}", digest.compute())))
}

/// Reject keys that are empty, too long, absolute, contain `..`, or carry
/// control bytes or backslashes. Keys never become file names, so trailing
/// slashes and `.` segments are fine.
fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
        return Err(StorageError::InvalidObjectKey);
    }
    if key.starts_with('/') || key.contains("..") {
        return Err(StorageError::InvalidObjectKey);
    }
    if key.bytes().any(|b| b.is_ascii_control() || b == b'\\') {
        return Err(StorageError::InvalidObjectKey);
    }
    Ok(())
}

/// Validate bucket name format.
///
/// Enforces S3-like naming rules:
/// - 3–63 characters
/// - lowercase letters, digits, dots, hyphens only
/// - cannot start/end with dot or hyphen
/// - cannot contain consecutive dots or dot-hyphen patterns
/// - cannot look like an IPv4 address
fn validate_bucket_name(name: &str) -> StorageResult<()> {
    let invalid = |reason: &str| StorageError::InvalidBucketName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim() != name {
        return Err(invalid("cannot begin or end with whitespace"));
    }

    let len = name.len();
    if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
        return Err(invalid("must be between 3 and 63 characters"));
    }

    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
    {
        return Err(invalid(
            "allowed characters are lowercase letters, digits, dots, and hyphens",
        ));
    }

    if name.starts_with(['.', '-']) || name.ends_with(['.', '-']) {
        return Err(invalid("must start and end with a lowercase letter or digit"));
    }

    if name.contains("..") || name.contains("-.") || name.contains(".-") {
        return Err(invalid(
            "cannot contain consecutive dots or dot-hyphen combinations",
        ));
    }

    if is_ipv4_like(name) {
        return Err(invalid("must not be formatted like an IP address"));
    }

    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

/// Check if a string matches IPv4-like dotted decimal form, e.g. `1.2.3.4`.
fn is_ipv4_like(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() == 4
        && parts.iter().all(|segment| {
            !segment.is_empty()
                && segment.len() <= 3
                && segment.chars().all(|c| c.is_ascii_digit())
                && segment.parse::<u8>().is_ok()
        })
}
