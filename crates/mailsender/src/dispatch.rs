//! Sending: turns the builder state into a message and delivers it.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use lettre::message::Mailbox;
use tracing::{debug, trace};

use crate::error::{CANNOT_SEND, CannotSendMail, MailError};
use crate::message::OutgoingMessage;
use crate::part::{BodyPart, DataSource};
use crate::sender::MailSender;
use crate::store::OrderedSet;
use crate::transport::{SessionConfig, Transport};

impl MailSender {
    /// Sends the message built so far.
    ///
    /// The builder state is left as is, so the same message can be sent
    /// again or adjusted first. The message is built and its addresses
    /// validated before a transport is created. Listeners are notified by
    /// the transport before this returns. Once created, the transport is
    /// closed whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`CannotSendMail`] wrapping the underlying [`MailError`] if the
    /// message cannot be assembled, an address is invalid, or the transport
    /// fails to connect or deliver.
    pub fn send(&self) -> crate::Result<()> {
        self.try_send()
            .map_err(|e| CannotSendMail::with_cause(CANNOT_SEND, e))
    }

    fn try_send(&self) -> Result<(), MailError> {
        let mut config = SessionConfig::new(&self.config, self.from.as_deref());
        self.hooks.before_create_session(&mut config);

        let parts = self.assemble_parts()?;
        let mut message = self.build_message(parts)?;

        let mut transport = TransportGuard(self.session.transport(&config)?);

        for listener in &self.transport_listeners {
            transport.add_transport_listener(Arc::clone(listener));
        }
        for listener in &self.connection_listeners {
            transport.add_connection_listener(Arc::clone(listener));
        }

        let credentials = self
            .credentials
            .as_ref()
            .and_then(|provider| provider.credentials());
        transport.connect(credentials.as_ref())?;

        self.hooks.before_send_message(&mut *transport, &mut message);

        trace!("{self}");
        let recipients = message.all_recipients();
        transport.send_message(&message, &recipients)
    }

    /// Body parts in send order: text, file attachments, byte attachments,
    /// image files, image bytes.
    fn assemble_parts(&self) -> Result<Vec<BodyPart>, MailError> {
        let factory = self.factory;
        let mut parts = Vec::with_capacity(
            1 + self.files.value_count()
                + self.file_contents.value_count()
                + self.images.value_count()
                + self.image_contents.value_count(),
        );

        parts.push(factory.text_part(&self.text, self.mode));
        for (name, path) in self.files.values() {
            parts.push(factory.file_part(name, DataSource::File(path))?);
        }
        for (name, content) in self.file_contents.values() {
            parts.push(factory.file_part(name, DataSource::Content(content))?);
        }
        for (content_id, path) in self.images.values() {
            parts.push(factory.image_part(content_id, DataSource::File(path))?);
        }
        for (content_id, content) in self.image_contents.values() {
            parts.push(factory.image_part(content_id, DataSource::Content(content))?);
        }

        Ok(parts)
    }

    fn build_message(&self, parts: Vec<BodyPart>) -> Result<OutgoingMessage, MailError> {
        let from: Mailbox = self
            .from
            .as_deref()
            .ok_or(MailError::MissingSender)?
            .parse()?;

        let mut message = OutgoingMessage::new(from, self.subject.clone());
        message.to = mailboxes(&self.recipients)?;
        message.cc = mailboxes(&self.recipients_cc)?;
        message.bcc = mailboxes(&self.recipients_bcc)?;
        message.parts = parts;
        Ok(message)
    }
}

fn mailboxes(addresses: &OrderedSet<String>) -> Result<Vec<Mailbox>, MailError> {
    addresses
        .iter()
        .map(|address| address.parse::<Mailbox>().map_err(MailError::from))
        .collect()
}

/// Closes the transport when dropped.
struct TransportGuard(Box<dyn Transport>);

impl Deref for TransportGuard {
    type Target = dyn Transport;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl DerefMut for TransportGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.0
    }
}

impl Drop for TransportGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.close() {
            debug!(error = %e, "failed to close transport");
        }
    }
}
