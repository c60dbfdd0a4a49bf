use std::fmt;
use std::str::FromStr;

/// Media types the client distinguishes when building requests and
/// classifying responses.
///
/// Anything the client does not recognise is treated as [`ContentType::Binary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentType {
    /// `application/json`
    #[default]
    Json,
    /// `text/plain`
    PlainText,
    /// `image/jpeg`
    Jpeg,
    /// `image/png`
    Png,
    /// `application/octet-stream`, and the fallback for unknown types
    Binary,
}

impl ContentType {
    /// All variants, in declaration order
    pub const ALL: [ContentType; 5] = [
        ContentType::Json,
        ContentType::PlainText,
        ContentType::Jpeg,
        ContentType::Png,
        ContentType::Binary,
    ];

    /// The MIME string sent in a `Content-Type` header
    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::PlainText => "text/plain",
            ContentType::Jpeg => "image/jpeg",
            ContentType::Png => "image/png",
            ContentType::Binary => "application/octet-stream",
        }
    }

    /// Map a `Content-Type` header value to a content type.
    ///
    /// Parameters such as `charset` are ignored, as are case and surrounding
    /// whitespace. Unrecognised values map to [`ContentType::Binary`].
    pub fn from_mime(value: &str) -> Self {
        let essence = value.split(';').next().unwrap_or("").trim();

        Self::ALL
            .into_iter()
            .find(|content_type| essence.eq_ignore_ascii_case(content_type.mime()))
            .unwrap_or(ContentType::Binary)
    }

    /// Check if this type carries textual data
    pub fn is_text(&self) -> bool {
        matches!(self, ContentType::Json | ContentType::PlainText)
    }

    /// Check if this type is an image
    pub fn is_image(&self) -> bool {
        matches!(self, ContentType::Jpeg | ContentType::Png)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

impl FromStr for ContentType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_mime(s))
    }
}
