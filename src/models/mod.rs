//! Core data models for the S3-compatible object API.
//!
//! `bucket` and `object` are the records handed out by storage backends.
//! `listing` holds the per-request wire shapes for bucket and object
//! listings, which serialize as JSON through `serde` and as XML through
//! the `xml` helpers.

pub mod bucket;
pub mod listing;
pub mod object;
pub mod xml;
