//! Wire shapes for bucket and object listings.
//!
//! Field names are the S3 element names, so the JSON rendering (via
//! `serde`) and the XML rendering (via [`ToXml`]) agree on naming.

use crate::models::{
    bucket::BucketMetadata,
    object::ObjectMetadata,
    xml::{ToXml, write_bool_element, write_text_element},
};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Writer;
use serde::Serialize;
use std::io::{self, Write};

/// Upper bound on the number of keys returned by one object listing.
pub const MAX_OBJECT_LIST: usize = 1000;

/// Storage class reported for every listed object.
pub const STORAGE_CLASS_STANDARD: &str = "STANDARD";

/// Render a timestamp the way listing payloads expect it,
/// e.g. `2014-11-05T09:30:00.000Z`.
pub fn listing_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Identity reported as the owner of buckets and objects.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Owner {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "DisplayName")]
    pub display_name: String,
}

impl Owner {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("Owner").write_inner_content(|w| {
            write_text_element(w, "ID", &self.id)?;
            write_text_element(w, "DisplayName", &self.display_name)?;
            Ok(())
        })?;
        Ok(())
    }
}

/// Body of `GET /`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct BucketListResponse {
    pub owner: Owner,
    pub buckets: Buckets,
}

/// The `<Buckets>` wrapper around individual bucket entries.
#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Buckets {
    pub bucket: Vec<BucketEntry>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct BucketEntry {
    pub name: String,
    pub creation_date: String,
}

impl BucketListResponse {
    /// Build the response, keeping the backend's bucket order.
    pub fn new(owner: Owner, buckets: &[BucketMetadata]) -> Self {
        let bucket = buckets
            .iter()
            .map(|b| BucketEntry {
                name: b.name.clone(),
                creation_date: listing_timestamp(&b.created_at),
            })
            .collect();

        Self {
            owner,
            buckets: Buckets { bucket },
        }
    }
}

impl ToXml for BucketListResponse {
    const ROOT: &'static str = "ListAllMyBucketsResult";

    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        self.owner.write_xml(writer)?;
        writer.create_element("Buckets").write_inner_content(|w| {
            for entry in &self.buckets.bucket {
                w.create_element("Bucket").write_inner_content(|w| {
                    write_text_element(w, "Name", &entry.name)?;
                    write_text_element(w, "CreationDate", &entry.creation_date)?;
                    Ok(())
                })?;
            }
            Ok(())
        })?;
        Ok(())
    }
}

/// Body of `GET /{bucket}`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectListResponse {
    pub name: String,
    pub contents: Vec<ObjectEntry>,
    pub max_keys: usize,
    pub is_truncated: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectEntry {
    pub key: String,
    pub last_modified: String,
    #[serde(rename = "ETag")]
    pub etag: String,
    pub size: i64,
    pub storage_class: String,
    pub owner: Owner,
}

impl ObjectListResponse {
    /// Build the response, keeping the backend's key order.
    ///
    /// `IsTruncated` is always false: truncation is not detected, even when
    /// the backend returns exactly [`MAX_OBJECT_LIST`] keys.
    pub fn new(bucket: impl Into<String>, owner: &Owner, objects: &[ObjectMetadata]) -> Self {
        let contents = objects
            .iter()
            .map(|o| ObjectEntry {
                key: o.key.clone(),
                last_modified: listing_timestamp(&o.created_at),
                etag: o.etag.clone(),
                size: o.size,
                storage_class: STORAGE_CLASS_STANDARD.to_string(),
                owner: owner.clone(),
            })
            .collect();

        Self {
            name: bucket.into(),
            contents,
            max_keys: MAX_OBJECT_LIST,
            is_truncated: false,
        }
    }
}

impl ToXml for ObjectListResponse {
    const ROOT: &'static str = "ListBucketResult";

    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Name", &self.name)?;
        write_text_element(writer, "MaxKeys", &self.max_keys.to_string())?;
        write_bool_element(writer, "IsTruncated", self.is_truncated)?;
        for entry in &self.contents {
            writer.create_element("Contents").write_inner_content(|w| {
                write_text_element(w, "Key", &entry.key)?;
                write_text_element(w, "LastModified", &entry.last_modified)?;
                write_text_element(w, "ETag", &entry.etag)?;
                write_text_element(w, "Size", &entry.size.to_string())?;
                write_text_element(w, "StorageClass", &entry.storage_class)?;
                entry.owner.write_xml(w)?;
                Ok(())
            })?;
        }
        Ok(())
    }
}
