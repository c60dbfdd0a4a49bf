use std::borrow::Cow;

use bytes::Bytes;

use crate::content_type::ContentType;
use crate::request::Headers;

/// Status, headers and buffered body of a received response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseParts {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl ResponseParts {
    pub fn new(status: u16, headers: Headers, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// The content type declared by the `Content-Type` header, or
    /// [`ContentType::Binary`] when it is absent or unrecognised
    pub fn detected_content_type(&self) -> ContentType {
        self.headers
            .get("content-type")
            .map(ContentType::from_mime)
            .unwrap_or(ContentType::Binary)
    }
}

/// A classified HTTP response.
///
/// Statuses below 400 produce the variant matching the response content
/// type. Everything else produces [`Response::Error`], which keeps the
/// detected content type so a failure payload can still be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Json(ResponseParts),
    PlainText(ResponseParts),
    JpegImage(ResponseParts),
    PngImage(ResponseParts),
    Binary(ResponseParts),
    Error {
        parts: ResponseParts,
        content_type: ContentType,
    },
}

/// Whether `status` falls in the success range.
///
/// The check is `(status - 200) < 200` in signed arithmetic, so informational
/// (1xx) statuses count as success along with 2xx and 3xx.
pub fn is_success_status(status: u16) -> bool {
    i32::from(status) - 200 < 200
}

impl Response {
    /// Classify a response from its `Content-Type` header and status
    pub fn classify(parts: ResponseParts) -> Self {
        let content_type = parts.detected_content_type();
        Self::with_content_type(content_type, parts)
    }

    /// Classify a response whose content type is already known
    pub fn with_content_type(content_type: ContentType, parts: ResponseParts) -> Self {
        if !is_success_status(parts.status) {
            return Response::Error {
                parts,
                content_type,
            };
        }

        match content_type {
            ContentType::Json => Response::Json(parts),
            ContentType::PlainText => Response::PlainText(parts),
            ContentType::Jpeg => Response::JpegImage(parts),
            ContentType::Png => Response::PngImage(parts),
            ContentType::Binary => Response::Binary(parts),
        }
    }

    /// Get the status, headers and body
    pub fn parts(&self) -> &ResponseParts {
        match self {
            Response::Json(parts)
            | Response::PlainText(parts)
            | Response::JpegImage(parts)
            | Response::PngImage(parts)
            | Response::Binary(parts)
            | Response::Error { parts, .. } => parts,
        }
    }

    pub fn into_parts(self) -> ResponseParts {
        match self {
            Response::Json(parts)
            | Response::PlainText(parts)
            | Response::JpegImage(parts)
            | Response::PngImage(parts)
            | Response::Binary(parts)
            | Response::Error { parts, .. } => parts,
        }
    }

    /// Get the HTTP status code
    pub fn status(&self) -> u16 {
        self.parts().status
    }

    /// Get the response headers
    pub fn headers(&self) -> &Headers {
        &self.parts().headers
    }

    /// Get the buffered body
    pub fn body(&self) -> &Bytes {
        &self.parts().body
    }

    /// The content type this response was classified with
    pub fn content_type(&self) -> ContentType {
        match self {
            Response::Json(_) => ContentType::Json,
            Response::PlainText(_) => ContentType::PlainText,
            Response::JpegImage(_) => ContentType::Jpeg,
            Response::PngImage(_) => ContentType::Png,
            Response::Binary(_) => ContentType::Binary,
            Response::Error { content_type, .. } => *content_type,
        }
    }

    /// Check if the status indicated failure
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }

    /// Short name of the variant, for display
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Json(_) => "json",
            Response::PlainText(_) => "plain-text",
            Response::JpegImage(_) => "jpeg-image",
            Response::PngImage(_) => "png-image",
            Response::Binary(_) => "binary",
            Response::Error { .. } => "error",
        }
    }

    /// Get the body as text, replacing invalid UTF-8
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.body())
    }

    /// Deserialize the body as JSON, whatever the variant
    pub fn json<T>(&self) -> serde_json::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self.body())
    }
}
