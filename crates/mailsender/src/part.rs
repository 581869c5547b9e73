//! Body parts and the factory that materializes them.

use std::fmt;
use std::fs;
use std::path::Path;

use lettre::message::{Attachment, SinglePart};

use crate::content_type::ContentType;
use crate::error::MailError;

/// How the accumulated body text is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyMode {
    /// `text/plain`.
    #[default]
    Text,
    /// `text/html`.
    Html,
}

impl fmt::Display for BodyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Html => write!(f, "html"),
        }
    }
}

/// Raw content supplied together with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeTypedContent {
    /// The bytes.
    pub content: Vec<u8>,
    /// MIME type of the bytes, e.g. `image/png`.
    pub mime_type: String,
}

impl MimeTypedContent {
    /// Copies `content` into a new record.
    #[must_use]
    pub fn new(content: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            content: content.to_vec(),
            mime_type: mime_type.into(),
        }
    }
}

/// Where the data of an attachment or image comes from.
#[derive(Debug, Clone, Copy)]
pub enum DataSource<'a> {
    /// A file, read when the part is built.
    File(&'a Path),
    /// Content held in memory.
    Content(&'a MimeTypedContent),
}

/// Presentation of a non-body part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Downloadable attachment.
    Attachment {
        /// File name shown to the recipient.
        filename: String,
    },
    /// Inline part referenced by content-id from the HTML body.
    Inline {
        /// Content-id.
        content_id: String,
    },
}

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPart {
    content_type: ContentType,
    disposition: Option<Disposition>,
    data: Vec<u8>,
}

impl BodyPart {
    /// Content type of the part.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Disposition, `None` for the text body.
    #[must_use]
    pub const fn disposition(&self) -> Option<&Disposition> {
        self.disposition.as_ref()
    }

    /// Raw part data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Attachment file name, if this is an attachment.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        match &self.disposition {
            Some(Disposition::Attachment { filename }) => Some(filename),
            _ => None,
        }
    }

    /// Content-id, if this is an inline image.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        match &self.disposition {
            Some(Disposition::Inline { content_id }) => Some(content_id),
            _ => None,
        }
    }

    /// Converts into a transport part.
    #[must_use]
    pub fn to_single_part(&self) -> SinglePart {
        let content_type = self.content_type.to_header();
        match &self.disposition {
            None => SinglePart::builder()
                .header(content_type)
                .body(String::from_utf8_lossy(&self.data).into_owned()),
            Some(Disposition::Attachment { filename }) => {
                Attachment::new(filename.clone()).body(self.data.clone(), content_type)
            }
            Some(Disposition::Inline { content_id }) => {
                Attachment::new_inline(content_id.clone()).body(self.data.clone(), content_type)
            }
        }
    }
}

/// Builds [`BodyPart`]s from names and data sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyPartFactory;

impl BodyPartFactory {
    /// Creates the text body part for `mode`.
    #[must_use]
    pub fn text_part(self, text: &str, mode: BodyMode) -> BodyPart {
        let content_type = match mode {
            BodyMode::Text => ContentType::text_plain(),
            BodyMode::Html => ContentType::text_html(),
        };
        BodyPart {
            content_type,
            disposition: None,
            data: text.as_bytes().to_vec(),
        }
    }

    /// Creates an attachment named `filename`.
    ///
    /// # Errors
    ///
    /// Returns an error if a file source cannot be read or a MIME type is invalid.
    pub fn file_part(self, filename: &str, source: DataSource<'_>) -> Result<BodyPart, MailError> {
        let (content_type, data) = Self::load(source)?;
        Ok(BodyPart {
            content_type,
            disposition: Some(Disposition::Attachment {
                filename: filename.to_string(),
            }),
            data,
        })
    }

    /// Creates an inline image identified by `content_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if a file source cannot be read or a MIME type is invalid.
    pub fn image_part(self, content_id: &str, source: DataSource<'_>) -> Result<BodyPart, MailError> {
        let (content_type, data) = Self::load(source)?;
        Ok(BodyPart {
            content_type,
            disposition: Some(Disposition::Inline {
                content_id: content_id.to_string(),
            }),
            data,
        })
    }

    fn load(source: DataSource<'_>) -> Result<(ContentType, Vec<u8>), MailError> {
        match source {
            DataSource::File(path) => Ok((ContentType::from_path(path), fs::read(path)?)),
            DataSource::Content(content) => Ok((
                ContentType::parse(&content.mime_type)?,
                content.content.clone(),
            )),
        }
    }
}

/// File name component of `path`, if any.
pub(crate) fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_text_part_modes() {
        let factory = BodyPartFactory;
        let plain = factory.text_part("hello", BodyMode::Text);
        let html = factory.text_part("<b>hello</b>", BodyMode::Html);

        assert_eq!(plain.content_type().essence(), "text/plain");
        assert_eq!(html.content_type().essence(), "text/html");
        assert!(plain.disposition().is_none());
        assert_eq!(html.data(), b"<b>hello</b>");
    }

    #[test]
    fn test_file_part_reads_file() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"hello world!").unwrap();

        let part = BodyPartFactory
            .file_part("hi.txt", DataSource::File(file.path()))
            .unwrap();

        assert_eq!(part.filename(), Some("hi.txt"));
        assert_eq!(part.content_type().essence(), "text/plain");
        assert_eq!(part.data(), b"hello world!");
    }

    #[test]
    fn test_file_part_missing_file() {
        let result = BodyPartFactory.file_part("gone", DataSource::File(Path::new("/nonexistent/gone.bin")));
        assert!(matches!(result, Err(MailError::Io(_))));
    }

    #[test]
    fn test_image_part_from_content() {
        let content = MimeTypedContent::new(&[0x89, b'P', b'N', b'G'], "image/png");
        let part = BodyPartFactory
            .image_part("logo", DataSource::Content(&content))
            .unwrap();

        assert_eq!(part.content_id(), Some("logo"));
        assert!(part.filename().is_none());
        assert!(part.content_type().is_image());

        let rendered = String::from_utf8(part.to_single_part().formatted()).unwrap();
        assert!(rendered.contains("Content-Type: image/png"));
        assert!(rendered.contains("Content-ID: <logo>"));
    }

    #[test]
    fn test_file_part_guesses_office_type() {
        let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        file.write_all(b"PK\x03\x04").unwrap();

        let part = BodyPartFactory
            .file_part("figures.xlsx", DataSource::File(file.path()))
            .unwrap();

        assert_eq!(
            part.content_type().essence(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
    }

    #[test]
    fn test_invalid_mime_type() {
        let content = MimeTypedContent::new(b"data", "not-a-type");
        let result = BodyPartFactory.file_part("data.bin", DataSource::Content(&content));
        assert!(matches!(result, Err(MailError::InvalidContentType(_))));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Path::new("/tmp/report.pdf")).as_deref(), Some("report.pdf"));
        assert_eq!(file_name(Path::new("")), None);
        assert_eq!(file_name(Path::new("/tmp/..")), None);
    }
}
