//! Session and transport abstractions.
//!
//! A [`Session`] hands out a fresh [`Transport`] for every send, configured
//! from a [`SessionConfig`]. The default session, [`SmtpSession`], talks
//! SMTP through `lettre`; tests and alternative backends provide their own.

mod smtp;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use lettre::Address;

use crate::config::{Security, SmtpConfig};
use crate::error::MailError;
use crate::event::{ConnectionEvent, ConnectionListener, TransportEvent, TransportListener};
use crate::message::OutgoingMessage;

pub use smtp::{SmtpSession, SmtpTransport};

/// Protocol name recorded in every session configuration.
pub const SMTP_PROTOCOL: &str = "smtp";

/// Property overriding the name announced in EHLO.
pub const HELLO_NAME_PROPERTY: &str = "smtp.hello_name";

/// Resolved configuration for a single send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Transport protocol name.
    pub protocol: String,
    /// Sender address, if set.
    pub from: Option<String>,
    /// Connection and command timeout.
    pub timeout: Duration,
    /// Additional properties for custom transports.
    pub properties: BTreeMap<String, String>,
}

impl SessionConfig {
    /// Builds the configuration for a send from `config` and the sender address.
    #[must_use]
    pub fn new(config: &SmtpConfig, from: Option<&str>) -> Self {
        Self {
            host: config.host.clone(),
            port: config.effective_port(),
            security: config.security,
            protocol: SMTP_PROTOCOL.to_string(),
            from: from.map(str::to_string),
            timeout: config.timeout(),
            properties: BTreeMap::new(),
        }
    }

    /// Returns a property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Sets a property, returning the previous value.
    pub fn set_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.properties.insert(key.into(), value.into())
    }
}

/// User name and password for SMTP authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl From<&Credentials> for lettre::transport::smtp::authentication::Credentials {
    fn from(credentials: &Credentials) -> Self {
        Self::new(credentials.username.clone(), credentials.password.clone())
    }
}

/// Supplies credentials when a transport connects.
pub trait CredentialProvider {
    /// Credentials to authenticate with, or `None` to skip authentication.
    fn credentials(&self) -> Option<Credentials>;
}

impl CredentialProvider for Credentials {
    fn credentials(&self) -> Option<Credentials> {
        Some(self.clone())
    }
}

/// Creates transports.
pub trait Session {
    /// Returns a new, unconnected transport for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if no transport can be created for the configuration.
    fn transport(&self, config: &SessionConfig) -> Result<Box<dyn Transport>, MailError>;
}

/// A connection able to deliver one or more messages.
///
/// Implementations notify registered listeners through
/// [`ListenerSet`]: connection events on connect and close, one transport
/// event per [`send_message`](Transport::send_message).
pub trait Transport {
    /// Registers a delivery listener.
    fn add_transport_listener(&mut self, listener: Arc<dyn TransportListener>);

    /// Registers a connection listener.
    fn add_connection_listener(&mut self, listener: Arc<dyn ConnectionListener>);

    /// Opens the connection, authenticating when credentials are given.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached or rejects the login.
    fn connect(&mut self, credentials: Option<&Credentials>) -> Result<(), MailError>;

    /// Returns true while the connection is open.
    fn is_connected(&self) -> bool;

    /// Sends `message` to `recipients`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport is not connected or delivery fails.
    fn send_message(
        &mut self,
        message: &OutgoingMessage,
        recipients: &[Address],
    ) -> Result<(), MailError>;

    /// Closes the connection. Closing an unconnected transport is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not acknowledge the close.
    fn close(&mut self) -> Result<(), MailError>;
}

/// Listeners registered on a transport.
#[derive(Default, Clone)]
pub struct ListenerSet {
    transport: Vec<Arc<dyn TransportListener>>,
    connection: Vec<Arc<dyn ConnectionListener>>,
}

impl ListenerSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a delivery listener.
    pub fn add_transport_listener(&mut self, listener: Arc<dyn TransportListener>) {
        self.transport.push(listener);
    }

    /// Adds a connection listener.
    pub fn add_connection_listener(&mut self, listener: Arc<dyn ConnectionListener>) {
        self.connection.push(listener);
    }

    /// Number of delivery listeners.
    #[must_use]
    pub fn transport_listener_count(&self) -> usize {
        self.transport.len()
    }

    /// Number of connection listeners.
    #[must_use]
    pub fn connection_listener_count(&self) -> usize {
        self.connection.len()
    }

    /// Notifies every delivery listener, in registration order.
    pub fn notify_transport(&self, event: &TransportEvent) {
        for listener in &self.transport {
            listener.on_event(event);
        }
    }

    /// Notifies every connection listener, in registration order.
    pub fn notify_connection(&self, event: ConnectionEvent) {
        for listener in &self.connection {
            listener.on_event(event);
        }
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("transport", &self.transport.len())
            .field("connection", &self.connection.len())
            .finish()
    }
}
