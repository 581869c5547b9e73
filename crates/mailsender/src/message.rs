//! The finalized message handed to a transport.

use std::time::SystemTime;

use chrono::{DateTime, Utc};
use lettre::message::{Mailbox, MultiPart};
use lettre::{Address, Message};

use crate::error::MailError;
use crate::part::BodyPart;

/// A fully assembled message.
///
/// Built by [`MailSender::send`](crate::MailSender::send) from the builder
/// state and passed to the transport; the `before_send_message` hook may
/// still modify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Sender.
    pub from: Mailbox,
    /// Primary recipients.
    pub to: Vec<Mailbox>,
    /// Carbon copy recipients.
    pub cc: Vec<Mailbox>,
    /// Blind carbon copy recipients.
    pub bcc: Vec<Mailbox>,
    /// Subject line.
    pub subject: String,
    /// Sent date.
    pub sent_at: DateTime<Utc>,
    /// Body parts in order: text, attachments, inline images.
    pub parts: Vec<BodyPart>,
}

impl OutgoingMessage {
    /// Creates a message without recipients or parts, dated now.
    #[must_use]
    pub fn new(from: Mailbox, subject: impl Into<String>) -> Self {
        Self {
            from,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: subject.into(),
            sent_at: Utc::now(),
            parts: Vec::new(),
        }
    }

    /// Returns all recipient addresses (to, cc, bcc).
    #[must_use]
    pub fn all_recipients(&self) -> Vec<Address> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(|mailbox| mailbox.email.clone())
            .collect()
    }

    /// Returns the parts whose content type is `essence` (e.g. `text/html`).
    pub fn parts_of_type<'a>(&'a self, essence: &'a str) -> impl Iterator<Item = &'a BodyPart> + 'a {
        self.parts
            .iter()
            .filter(move |part| part.content_type().essence() == essence)
    }

    /// Returns the attachments named `filename`, in order.
    pub fn attachments_named<'a>(
        &'a self,
        filename: &'a str,
    ) -> impl Iterator<Item = &'a BodyPart> + 'a {
        self.parts
            .iter()
            .filter(move |part| part.filename() == Some(filename))
    }

    /// Builds the `multipart/mixed` message.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no parts or no recipient.
    pub fn to_lettre(&self) -> Result<Message, MailError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(self.subject.clone())
            .date(SystemTime::from(self.sent_at));

        for mailbox in &self.to {
            builder = builder.to(mailbox.clone());
        }
        for mailbox in &self.cc {
            builder = builder.cc(mailbox.clone());
        }
        for mailbox in &self.bcc {
            builder = builder.bcc(mailbox.clone());
        }

        let mut parts = self.parts.iter().map(BodyPart::to_single_part);
        let first = parts.next().ok_or(MailError::EmptyBody)?;
        let body = parts.fold(MultiPart::mixed().singlepart(first), MultiPart::singlepart);

        Ok(builder.multipart(body)?)
    }

    /// Renders the message as RFC 5322 bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be built.
    pub fn formatted(&self) -> Result<Vec<u8>, MailError> {
        Ok(self.to_lettre()?.formatted())
    }
}
