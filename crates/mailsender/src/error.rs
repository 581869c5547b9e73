//! Error types for mail assembly and delivery.

use std::io;

use lettre::Address;

/// Boxed error used for causes raised outside this crate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for sending operations.
pub type Result<T> = std::result::Result<T, CannotSendMail>;

/// Message used when a send attempt is aborted.
pub(crate) const CANNOT_SEND: &str = "cannot send the message";

/// The single failure raised by [`MailSender::send`](crate::MailSender::send).
///
/// The underlying [`MailError`] (or any other cause) is reachable through
/// [`std::error::Error::source`].
#[derive(Debug, thiserror::Error)]
#[error("{}", .message.as_deref().unwrap_or("cannot send mail"))]
pub struct CannotSendMail {
    message: Option<String>,
    #[source]
    source: Option<BoxError>,
}

impl CannotSendMail {
    /// Creates an error with neither message nor cause.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            message: None,
            source: None,
        }
    }

    /// Creates an error with a message.
    #[must_use]
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            source: None,
        }
    }

    /// Creates an error wrapping an underlying cause.
    #[must_use]
    pub fn from_cause(cause: impl Into<BoxError>) -> Self {
        Self {
            message: None,
            source: Some(cause.into()),
        }
    }

    /// Creates an error with a message and an underlying cause.
    #[must_use]
    pub fn with_cause(message: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self {
            message: Some(message.into()),
            source: Some(cause.into()),
        }
    }

    /// Returns the message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the wrapped [`MailError`] when the cause is one.
    #[must_use]
    pub fn mail_error(&self) -> Option<&MailError> {
        self.source.as_deref()?.downcast_ref()
    }
}

impl Default for CannotSendMail {
    fn default() -> Self {
        Self::new()
    }
}

/// Failures raised while assembling or transmitting a message.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// I/O error (e.g. reading an attached file).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),

    /// Unparsable MIME type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Message or envelope could not be built.
    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// The message has no body part.
    #[error("Message has no body part")]
    EmptyBody,

    /// No sender address was set.
    #[error("No sender address")]
    MissingSender,

    /// The server permanently refused these recipients.
    #[error("Recipients refused: {}", join_addresses(.0))]
    RecipientsRefused(Vec<Address>),

    /// Operation requires an open connection.
    #[error("Transport is not connected")]
    NotConnected,

    /// Connection already open.
    #[error("Transport is already connected")]
    AlreadyConnected,

    /// Error raised by a custom transport.
    #[error("Transport error: {0}")]
    Transport(BoxError),
}

impl MailError {
    /// Wraps an arbitrary transport failure.
    #[must_use]
    pub fn transport(error: impl Into<BoxError>) -> Self {
        Self::Transport(error.into())
    }

    /// Returns true if this is a permanent SMTP error (5xx).
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Smtp(e) => e.is_permanent(),
            Self::RecipientsRefused(_) => true,
            _ => false,
        }
    }

    /// Returns true if this is a transient SMTP error (4xx).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Smtp(e) if e.is_transient())
    }
}

fn join_addresses(addresses: &[Address]) -> String {
    addresses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
