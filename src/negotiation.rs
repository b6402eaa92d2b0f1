//! Content negotiation for listing responses.
//!
//! Only the first `Accept` value is examined, and only for an exact match
//! on `application/json`. No quality factors, no wildcard matching.
//! Everything else gets XML.

use crate::{
    errors::AppError,
    models::xml::{ToXml, XmlError, to_xml},
};
use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_XML: &str = "application/xml";

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Serialization chosen for a listing response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Xml,
    Json,
}

impl ResponseFormat {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match headers.get(header::ACCEPT).map(HeaderValue::as_bytes) {
            Some(accept) if accept == APPLICATION_JSON.as_bytes() => ResponseFormat::Json,
            _ => ResponseFormat::Xml,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ResponseFormat::Xml => APPLICATION_XML,
            ResponseFormat::Json => APPLICATION_JSON,
        }
    }

    /// Serialize the whole body into one buffer.
    pub fn encode<T: Serialize + ToXml>(self, body: &T) -> Result<Vec<u8>, EncodeError> {
        match self {
            ResponseFormat::Xml => Ok(to_xml(body)?),
            ResponseFormat::Json => Ok(serde_json::to_vec(body)?),
        }
    }

    /// A 200 response with the encoded body and matching `Content-Type`.
    pub fn respond<T: Serialize + ToXml>(self, body: &T) -> Result<Response, AppError> {
        let bytes = self.encode(body).map_err(|err| {
            error!(format = ?self, error = %err, "failed to encode listing response");
            AppError::internal()
        })?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = StatusCode::OK;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(self.content_type()),
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::listing::{BucketListResponse, Owner};

    fn headers(accepts: &[&'static str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for value in accepts {
            map.append(header::ACCEPT, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn json_only_on_exact_first_value() {
        assert_eq!(
            ResponseFormat::from_headers(&headers(&["application/json"])),
            ResponseFormat::Json
        );
        assert_eq!(
            ResponseFormat::from_headers(&headers(&["application/json", "text/html"])),
            ResponseFormat::Json
        );
    }

    #[test]
    fn everything_else_is_xml() {
        assert_eq!(ResponseFormat::from_headers(&headers(&[])), ResponseFormat::Xml);
        assert_eq!(
            ResponseFormat::from_headers(&headers(&["text/html", "application/json"])),
            ResponseFormat::Xml
        );
        assert_eq!(
            ResponseFormat::from_headers(&headers(&["application/json;q=0.9"])),
            ResponseFormat::Xml
        );
        assert_eq!(
            ResponseFormat::from_headers(&headers(&["*/*"])),
            ResponseFormat::Xml
        );
    }

    #[test]
    fn respond_sets_content_type() {
        let body = BucketListResponse::new(Owner::new("minio", "minio"), &[]);
        let response = ResponseFormat::Json.respond(&body).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            APPLICATION_JSON
        );

        let response = ResponseFormat::Xml.respond(&body).unwrap();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            APPLICATION_XML
        );
    }
}
