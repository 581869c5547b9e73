//! SMTP transport backed by `lettre`.

use std::fmt;
use std::sync::Arc;

use lettre::Address;
use lettre::transport::smtp::authentication::Mechanism;
use lettre::transport::smtp::client::{SmtpConnection, TlsParameters};
use lettre::transport::smtp::commands::{Data, Mail, Rcpt, Rset};
use lettre::transport::smtp::extension::ClientId;
use tracing::debug;

use super::{
    Credentials, HELLO_NAME_PROPERTY, ListenerSet, Session, SessionConfig, Transport,
};
use crate::config::Security;
use crate::error::MailError;
use crate::event::{ConnectionEvent, ConnectionListener, TransportEvent, TransportListener};
use crate::message::OutgoingMessage;

/// Mechanisms tried, in order, when credentials are supplied.
const AUTH_MECHANISMS: &[Mechanism] = &[Mechanism::Plain, Mechanism::Login];

/// Session producing [`SmtpTransport`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmtpSession;

impl Session for SmtpSession {
    fn transport(&self, config: &SessionConfig) -> Result<Box<dyn Transport>, MailError> {
        Ok(Box::new(SmtpTransport::new(config.clone())))
    }
}

/// Blocking SMTP connection to a single server.
pub struct SmtpTransport {
    config: SessionConfig,
    connection: Option<SmtpConnection>,
    listeners: ListenerSet,
}

impl SmtpTransport {
    /// Creates an unconnected transport.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            connection: None,
            listeners: ListenerSet::new(),
        }
    }

    /// The configuration this transport connects with.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn open(&self) -> Result<SmtpConnection, MailError> {
        let hello = self
            .config
            .property(HELLO_NAME_PROPERTY)
            .map_or_else(ClientId::default, |name| ClientId::Domain(name.to_string()));
        let server = (self.config.host.as_str(), self.config.port);
        let timeout = Some(self.config.timeout);

        debug!(
            host = %self.config.host,
            port = self.config.port,
            security = self.config.security.display_name(),
            "connecting"
        );

        let connection = match self.config.security {
            Security::None => SmtpConnection::connect(server, timeout, &hello, None, None)?,
            Security::Tls => {
                let tls = TlsParameters::new(self.config.host.clone())?;
                SmtpConnection::connect(server, timeout, &hello, Some(&tls), None)?
            }
            Security::StartTls => {
                let tls = TlsParameters::new(self.config.host.clone())?;
                let mut connection = SmtpConnection::connect(server, timeout, &hello, None, None)?;
                if let Err(e) = connection.starttls(&tls, &hello) {
                    connection.abort();
                    return Err(e.into());
                }
                connection
            }
        };

        Ok(connection)
    }
}

impl fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpTransport")
            .field("config", &self.config)
            .field("connected", &self.connection.is_some())
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl Transport for SmtpTransport {
    fn add_transport_listener(&mut self, listener: Arc<dyn TransportListener>) {
        self.listeners.add_transport_listener(listener);
    }

    fn add_connection_listener(&mut self, listener: Arc<dyn ConnectionListener>) {
        self.listeners.add_connection_listener(listener);
    }

    fn connect(&mut self, credentials: Option<&Credentials>) -> Result<(), MailError> {
        if self.connection.is_some() {
            return Err(MailError::AlreadyConnected);
        }

        let mut connection = self.open()?;

        if let Some(credentials) = credentials {
            debug!(username = credentials.username(), "authenticating");
            if let Err(e) = connection.auth(AUTH_MECHANISMS, &credentials.into()) {
                connection.abort();
                return Err(e.into());
            }
        }

        self.connection = Some(connection);
        self.listeners.notify_connection(ConnectionEvent::Opened);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| !c.has_broken())
    }

    /// Runs one MAIL/RCPT/DATA transaction.
    ///
    /// Recipients refused with a permanent reply are reported as invalid
    /// and the send fails with [`MailError::RecipientsRefused`] even when
    /// the message reached the others.
    fn send_message(
        &mut self,
        message: &OutgoingMessage,
        recipients: &[Address],
    ) -> Result<(), MailError> {
        let connection = self.connection.as_mut().ok_or(MailError::NotConnected)?;
        let email = message.to_lettre()?.formatted();

        let result = transact(connection, &message.from.email, recipients, &email);
        let broken = connection.has_broken();

        let (event, result) = match result {
            Ok(outcome) => outcome.into_event(),
            Err(e) => {
                debug!(error = %e, "transaction failed");
                (TransportEvent::not_delivered(recipients.to_vec(), Vec::new()), Err(e))
            }
        };
        self.listeners.notify_transport(&event);
        if broken {
            self.listeners
                .notify_connection(ConnectionEvent::Disconnected);
        }
        result
    }

    fn close(&mut self) -> Result<(), MailError> {
        let Some(mut connection) = self.connection.take() else {
            return Ok(());
        };

        let result = connection.quit();
        if result.is_err() {
            connection.abort();
        }
        self.listeners.notify_connection(ConnectionEvent::Closed);

        result.map(drop).map_err(Into::into)
    }
}

/// Recipient dispositions after the RCPT phase and, when reached, DATA.
struct Outcome {
    accepted: Vec<Address>,
    unsent: Vec<Address>,
    refused: Vec<Address>,
    data: Option<Result<(), lettre::transport::smtp::Error>>,
}

impl Outcome {
    fn into_event(self) -> (TransportEvent, Result<(), MailError>) {
        let Self {
            accepted,
            mut unsent,
            refused,
            data,
        } = self;

        match data {
            Some(Ok(())) if unsent.is_empty() && refused.is_empty() => {
                debug!(recipients = accepted.len(), "message accepted");
                (TransportEvent::delivered(accepted), Ok(()))
            }
            Some(Ok(())) => {
                debug!(
                    sent = accepted.len(),
                    unsent = unsent.len(),
                    refused = refused.len(),
                    "message partially accepted"
                );
                let result = refusal(&refused);
                (
                    TransportEvent::partially_delivered(accepted, unsent, refused),
                    result,
                )
            }
            Some(Err(e)) => {
                debug!(error = %e, "message rejected");
                let mut all_unsent = accepted;
                all_unsent.append(&mut unsent);
                (
                    TransportEvent::not_delivered(all_unsent, refused),
                    Err(e.into()),
                )
            }
            None => {
                debug!(refused = refused.len(), "no recipient accepted");
                let result = refusal(&refused);
                (TransportEvent::not_delivered(unsent, refused), result)
            }
        }
    }
}

fn refusal(refused: &[Address]) -> Result<(), MailError> {
    if refused.is_empty() {
        Ok(())
    } else {
        Err(MailError::RecipientsRefused(refused.to_vec()))
    }
}

/// Sends MAIL, one RCPT per recipient, then DATA if any recipient was
/// accepted. Fails without an outcome when MAIL is rejected or every
/// recipient was refused transiently.
fn transact(
    connection: &mut SmtpConnection,
    from: &Address,
    recipients: &[Address],
    email: &[u8],
) -> Result<Outcome, MailError> {
    if recipients.is_empty() {
        return Err(lettre::error::Error::MissingTo.into());
    }
    connection.command(Mail::new(Some(from.clone()), Vec::new()))?;

    let mut outcome = Outcome {
        accepted: Vec::new(),
        unsent: Vec::new(),
        refused: Vec::new(),
        data: None,
    };
    let mut last_error = None;

    for recipient in recipients {
        match connection.command(Rcpt::new(recipient.clone(), Vec::new())) {
            Ok(_) => outcome.accepted.push(recipient.clone()),
            Err(e) => {
                debug!(recipient = %recipient, error = %e, "recipient refused");
                if e.is_permanent() {
                    outcome.refused.push(recipient.clone());
                } else {
                    outcome.unsent.push(recipient.clone());
                }
                last_error = Some(e);
            }
        }
    }

    if outcome.accepted.is_empty() {
        if let Err(e) = connection.command(Rset) {
            debug!(error = %e, "failed to reset transaction");
        }
        return match last_error {
            Some(e) if outcome.refused.is_empty() => Err(e.into()),
            _ => Ok(outcome),
        };
    }

    let data = connection
        .command(Data)
        .and_then(|_| connection.message(email))
        .map(drop);
    outcome.data = Some(data);
    Ok(outcome)
}
