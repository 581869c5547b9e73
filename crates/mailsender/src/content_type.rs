//! MIME content type handling.

use std::fmt;
use std::path::Path;

use lettre::message::header;
use mime_guess::{Mime, mime};

use crate::error::MailError;

/// MIME content type of a body part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType(Mime);

impl ContentType {
    /// Creates a text/plain content type with a UTF-8 charset.
    #[must_use]
    pub fn text_plain() -> Self {
        Self(mime::TEXT_PLAIN_UTF_8)
    }

    /// Creates a text/html content type with a UTF-8 charset.
    #[must_use]
    pub fn text_html() -> Self {
        Self(mime::TEXT_HTML_UTF_8)
    }

    /// Creates an application/octet-stream content type.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self(mime::APPLICATION_OCTET_STREAM)
    }

    /// Guesses the content type of a file from its extension.
    ///
    /// Unknown or missing extensions yield `application/octet-stream`.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        Self(mime_guess::from_path(path).first_or_octet_stream())
    }

    /// Parses a content type string such as `image/png` or
    /// `text/plain; charset=utf-8`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid MIME type.
    pub fn parse(s: &str) -> Result<Self, MailError> {
        s.trim()
            .parse::<Mime>()
            .map(Self)
            .map_err(|e| MailError::InvalidContentType(format!("{s}: {e}")))
    }

    /// The underlying MIME type.
    #[must_use]
    pub const fn mime(&self) -> &Mime {
        &self.0
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.0.get_param(mime::CHARSET).map(|name| name.as_str())
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> &str {
        self.0.essence_str()
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.0.type_() == mime::TEXT
    }

    /// Checks if this is an image content type.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.0.type_() == mime::IMAGE
    }

    /// Converts into the header type used by the transport.
    #[must_use]
    pub fn to_header(&self) -> header::ContentType {
        header::ContentType::from(self.0.clone())
    }
}

impl From<Mime> for ContentType {
    fn from(mime: Mime) -> Self {
        Self(mime)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
