//! Transport and connection listeners.
//!
//! Listeners are registered on a [`MailSender`](crate::MailSender) and handed
//! to the transport for the duration of a send. The transport notifies them
//! synchronously, before [`send`](crate::MailSender::send) returns.
//!
//! # Example
//!
//! ```ignore
//! use mailsender::event::{TransportEvent, TransportListener};
//!
//! struct Audit;
//!
//! impl TransportListener for Audit {
//!     fn message_not_delivered(&self, event: &TransportEvent) {
//!         eprintln!("undelivered: {:?}", event.valid_unsent);
//!     }
//! }
//! ```

use std::sync::{Mutex, PoisonError};

use lettre::Address;

/// Outcome reported by a transport after a send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Every recipient accepted the message.
    Delivered,
    /// No recipient accepted the message.
    NotDelivered,
    /// Some recipients accepted the message.
    PartiallyDelivered,
}

/// Delivery outcome with the addresses it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    /// Overall status.
    pub status: DeliveryStatus,
    /// Addresses the message was sent to.
    pub valid_sent: Vec<Address>,
    /// Valid addresses the message was not sent to.
    pub valid_unsent: Vec<Address>,
    /// Addresses rejected as invalid.
    pub invalid: Vec<Address>,
}

impl TransportEvent {
    /// All recipients accepted the message.
    #[must_use]
    pub fn delivered(valid_sent: Vec<Address>) -> Self {
        Self {
            status: DeliveryStatus::Delivered,
            valid_sent,
            valid_unsent: Vec::new(),
            invalid: Vec::new(),
        }
    }

    /// The message did not reach any recipient.
    #[must_use]
    pub fn not_delivered(valid_unsent: Vec<Address>, invalid: Vec<Address>) -> Self {
        Self {
            status: DeliveryStatus::NotDelivered,
            valid_sent: Vec::new(),
            valid_unsent,
            invalid,
        }
    }

    /// The message reached some recipients but not others.
    #[must_use]
    pub fn partially_delivered(
        valid_sent: Vec<Address>,
        valid_unsent: Vec<Address>,
        invalid: Vec<Address>,
    ) -> Self {
        Self {
            status: DeliveryStatus::PartiallyDelivered,
            valid_sent,
            valid_unsent,
            invalid,
        }
    }
}

/// Connection lifecycle notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The connection was opened.
    Opened,
    /// The connection was lost.
    Disconnected,
    /// The connection was closed.
    Closed,
}

/// Receives delivery outcomes.
pub trait TransportListener: Send + Sync {
    /// Called when every recipient accepted the message.
    fn message_delivered(&self, event: &TransportEvent) {
        let _ = event;
    }

    /// Called when no recipient accepted the message.
    fn message_not_delivered(&self, event: &TransportEvent) {
        let _ = event;
    }

    /// Called when only some recipients accepted the message.
    fn message_partially_delivered(&self, event: &TransportEvent) {
        let _ = event;
    }

    /// Dispatches `event` to the method matching its status.
    fn on_event(&self, event: &TransportEvent) {
        match event.status {
            DeliveryStatus::Delivered => self.message_delivered(event),
            DeliveryStatus::NotDelivered => self.message_not_delivered(event),
            DeliveryStatus::PartiallyDelivered => self.message_partially_delivered(event),
        }
    }
}

/// Receives connection lifecycle events.
pub trait ConnectionListener: Send + Sync {
    /// Called after the connection is opened.
    fn opened(&self) {}

    /// Called when the connection is lost.
    fn disconnected(&self) {}

    /// Called after the connection is closed.
    fn closed(&self) {}

    /// Dispatches `event` to the matching method.
    fn on_event(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened => self.opened(),
            ConnectionEvent::Disconnected => self.disconnected(),
            ConnectionEvent::Closed => self.closed(),
        }
    }
}

/// A listener that logs events using tracing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl TransportListener for LoggingListener {
    fn message_delivered(&self, event: &TransportEvent) {
        tracing::info!(sent = ?event.valid_sent, "message delivered");
    }

    fn message_not_delivered(&self, event: &TransportEvent) {
        tracing::warn!(
            unsent = ?event.valid_unsent,
            invalid = ?event.invalid,
            "message not delivered"
        );
    }

    fn message_partially_delivered(&self, event: &TransportEvent) {
        tracing::warn!(
            sent = ?event.valid_sent,
            unsent = ?event.valid_unsent,
            invalid = ?event.invalid,
            "message partially delivered"
        );
    }
}

impl ConnectionListener for LoggingListener {
    fn opened(&self) {
        tracing::debug!("connection opened");
    }

    fn disconnected(&self) {
        tracing::debug!("connection lost");
    }

    fn closed(&self) {
        tracing::debug!("connection closed");
    }
}

/// Any event a [`CollectingListener`] has seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailEvent {
    /// A delivery outcome.
    Transport(TransportEvent),
    /// A connection lifecycle change.
    Connection(ConnectionEvent),
}

/// A listener that collects events for later inspection.
///
/// Useful for testing or batch processing of events.
#[derive(Debug, Default)]
pub struct CollectingListener {
    events: Mutex<Vec<MailEvent>>,
}

impl CollectingListener {
    /// Creates a new collecting listener.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the collected events.
    #[must_use]
    pub fn events(&self) -> Vec<MailEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Takes all collected events, leaving the listener empty.
    pub fn take(&self) -> Vec<MailEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn push(&self, event: MailEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl TransportListener for CollectingListener {
    fn on_event(&self, event: &TransportEvent) {
        self.push(MailEvent::Transport(event.clone()));
    }
}

impl ConnectionListener for CollectingListener {
    fn on_event(&self, event: ConnectionEvent) {
        self.push(MailEvent::Connection(event));
    }
}
