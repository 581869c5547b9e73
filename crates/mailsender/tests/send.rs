//! Integration tests for sending.
//!
//! These tests use a recording session in place of a real SMTP server.

#![allow(clippy::unwrap_used)]

use std::error::Error as _;
use std::fs;
use std::io;
use std::sync::{Arc, Mutex};

use lettre::Address;

use mailsender::event::{
    CollectingListener, ConnectionEvent, DeliveryStatus, MailEvent, TransportEvent,
};
use mailsender::transport::{HELLO_NAME_PROPERTY, ListenerSet, SessionConfig};
use mailsender::{
    BodyMode, ConnectionListener, CredentialProvider, Credentials, FnHooks, MailError, MailSender,
    OutgoingMessage, Session, Transport, TransportListener,
};

/// Everything the recording transport saw.
#[derive(Default)]
struct Log {
    calls: Vec<&'static str>,
    config: Option<SessionConfig>,
    credentials: Option<Credentials>,
    listeners_at_connect: (usize, usize),
    sent: Vec<(OutgoingMessage, Vec<Address>)>,
    closes: usize,
}

impl Log {
    fn connects(&self) -> usize {
        self.calls.iter().filter(|c| **c == "connect").count()
    }
}

#[derive(Clone, Copy, Default)]
struct Failures {
    connect: bool,
    send: bool,
    close: bool,
}

struct RecordingSession {
    log: Arc<Mutex<Log>>,
    failures: Failures,
}

impl RecordingSession {
    fn new(failures: Failures) -> (Self, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        let session = Self {
            log: Arc::clone(&log),
            failures,
        };
        (session, log)
    }
}

impl Session for RecordingSession {
    fn transport(&self, config: &SessionConfig) -> Result<Box<dyn Transport>, MailError> {
        let mut log = self.log.lock().unwrap();
        log.calls.push("transport");
        log.config = Some(config.clone());
        Ok(Box::new(RecordingTransport {
            log: Arc::clone(&self.log),
            failures: self.failures,
            listeners: ListenerSet::new(),
            connected: false,
        }))
    }
}

struct RecordingTransport {
    log: Arc<Mutex<Log>>,
    failures: Failures,
    listeners: ListenerSet,
    connected: bool,
}

impl Transport for RecordingTransport {
    fn add_transport_listener(&mut self, listener: Arc<dyn TransportListener>) {
        self.listeners.add_transport_listener(listener);
    }

    fn add_connection_listener(&mut self, listener: Arc<dyn ConnectionListener>) {
        self.listeners.add_connection_listener(listener);
    }

    fn connect(&mut self, credentials: Option<&Credentials>) -> Result<(), MailError> {
        {
            let mut log = self.log.lock().unwrap();
            log.calls.push("connect");
            log.credentials = credentials.cloned();
            log.listeners_at_connect = (
                self.listeners.transport_listener_count(),
                self.listeners.connection_listener_count(),
            );
        }
        if self.failures.connect {
            return Err(MailError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        self.connected = true;
        self.listeners.notify_connection(ConnectionEvent::Opened);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn send_message(
        &mut self,
        message: &OutgoingMessage,
        recipients: &[Address],
    ) -> Result<(), MailError> {
        self.log.lock().unwrap().calls.push("send");
        if self.failures.send {
            self.listeners
                .notify_transport(&TransportEvent::not_delivered(recipients.to_vec(), Vec::new()));
            return Err(MailError::transport("mailbox unavailable"));
        }
        self.log
            .lock()
            .unwrap()
            .sent
            .push((message.clone(), recipients.to_vec()));
        self.listeners
            .notify_transport(&TransportEvent::delivered(recipients.to_vec()));
        Ok(())
    }

    fn close(&mut self) -> Result<(), MailError> {
        {
            let mut log = self.log.lock().unwrap();
            log.calls.push("close");
            log.closes += 1;
        }
        if self.connected {
            self.connected = false;
            self.listeners.notify_connection(ConnectionEvent::Closed);
        }
        if self.failures.close {
            return Err(MailError::transport("close failed"));
        }
        Ok(())
    }
}

fn sender(failures: Failures) -> (MailSender, Arc<Mutex<Log>>) {
    let (session, log) = RecordingSession::new(failures);
    let mut sender = MailSender::with_login("smtp.example.com", "me", "secret").with_session(session);
    sender
        .set_from("me@example.com")
        .set_subject("Report")
        .add_recipient("you@example.com")
        .add_text("hello");
    (sender, log)
}

#[test]
fn test_send_html_with_attachments() {
    let dir = tempfile::tempdir().unwrap();
    let hello = dir.path().join("hello.txt");
    let first = dir.path().join("first.txt");
    let second = dir.path().join("second.txt");
    fs::write(&hello, "hello world!").unwrap();
    fs::write(&first, "first").unwrap();
    fs::write(&second, "second").unwrap();

    let (session, log) = RecordingSession::new(Failures::default());
    let mut sender = MailSender::new("smtp.example.com").with_session(session);
    sender
        .set_from("me@example.com")
        .set_html_mode()
        .add_text("<p>Hello</p>")
        .add_recipient("a@example.com")
        .add_recipient("b@example.com")
        .add_recipient("a@example.com")
        .add_recipient_cc("c@example.com")
        .add_file(&hello)
        .add_named_file("hi.txt", &first)
        .add_named_file("hi.txt", &second)
        .add_file_content("one.bin", b"\x00\x01", "application/octet-stream")
        .add_file_content("two.csv", b"a,b", "text/csv");

    sender.send().unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.sent.len(), 1);
    let (message, recipients) = &log.sent[0];

    assert_eq!(message.parts.len(), 6);
    assert_eq!(message.parts_of_type("text/html").count(), 1);
    assert_eq!(message.to.len(), 2);
    assert_eq!(message.cc.len(), 1);
    assert_eq!(recipients.len(), 3);

    let named: Vec<&[u8]> = message.attachments_named("hi.txt").map(|p| p.data()).collect();
    assert_eq!(named, vec![&b"first"[..], &b"second"[..]]);
    assert_eq!(message.attachments_named("hello.txt").count(), 1);

    assert!(log.credentials.is_none());
    assert_eq!(log.closes, 1);
}

#[test]
fn test_send_uses_session_config_and_credentials() {
    let (sender, log) = sender(Failures::default());
    sender.send().unwrap();

    let log = log.lock().unwrap();
    let config = log.config.as_ref().unwrap();
    assert_eq!(config.host, "smtp.example.com");
    assert_eq!(config.port, 25);
    assert_eq!(config.protocol, "smtp");
    assert_eq!(config.from.as_deref(), Some("me@example.com"));

    assert_eq!(log.credentials.as_ref().unwrap().username(), "me");
    assert_eq!(log.calls, vec!["transport", "connect", "send", "close"]);
}

#[test]
fn test_send_leaves_builder_state() {
    let (mut sender, log) = sender(Failures::default());
    sender.send().unwrap();
    sender.send().unwrap();

    assert_eq!(sender.recipients().len(), 1);
    assert_eq!(sender.subject(), "Report");
    assert_eq!(log.lock().unwrap().sent.len(), 2);

    sender.reset();
    sender.set_from("me@example.com").add_recipient("other@example.com");
    sender.send().unwrap();

    let log = log.lock().unwrap();
    let (message, _) = log.sent.last().unwrap();
    assert_eq!(message.subject, mailsender::NO_SUBJECT);
    assert_eq!(message.parts.len(), 1);
    assert_eq!(log.closes, 3);
}

#[test]
fn test_connect_failure_wraps_cause_and_closes() {
    let (sender, log) = sender(Failures {
        connect: true,
        ..Failures::default()
    });

    let err = sender.send().unwrap_err();

    assert_eq!(err.to_string(), "cannot send the message");
    assert!(matches!(err.mail_error(), Some(MailError::Io(_))));
    assert!(err.source().unwrap().to_string().contains("connection refused"));

    let log = log.lock().unwrap();
    assert_eq!(log.closes, 1);
    assert!(log.sent.is_empty());
}

#[test]
fn test_send_failure_notifies_and_closes() {
    let (mut sender, log) = sender(Failures {
        send: true,
        ..Failures::default()
    });
    let listener = Arc::new(CollectingListener::new());
    sender.add_transport_listener(listener.clone());

    let err = sender.send().unwrap_err();

    assert!(matches!(err.mail_error(), Some(MailError::Transport(_))));
    assert!(matches!(
        listener.events().as_slice(),
        [MailEvent::Transport(event)] if event.status == DeliveryStatus::NotDelivered
    ));
    assert_eq!(log.lock().unwrap().closes, 1);
}

#[test]
fn test_close_failure_is_swallowed() {
    let (sender, log) = sender(Failures {
        close: true,
        ..Failures::default()
    });

    assert!(sender.send().is_ok());
    let log = log.lock().unwrap();
    assert_eq!(log.sent.len(), 1);
    assert_eq!(log.closes, 1);
}

#[test]
fn test_invalid_address_does_not_connect() {
    let (mut sender, log) = sender(Failures::default());
    sender.add_recipient_bcc("not an address");

    let err = sender.send().unwrap_err();

    assert!(matches!(err.mail_error(), Some(MailError::InvalidAddress(_))));
    let log = log.lock().unwrap();
    assert!(log.calls.is_empty(), "no transport expected, got {:?}", log.calls);
    assert_eq!(log.closes, 0);
}

#[test]
fn test_missing_sender_does_not_connect() {
    let (session, log) = RecordingSession::new(Failures::default());
    let mut sender = MailSender::new("smtp.example.com").with_session(session);
    sender.add_recipient("you@example.com");

    let err = sender.send().unwrap_err();

    assert!(matches!(err.mail_error(), Some(MailError::MissingSender)));
    let log = log.lock().unwrap();
    assert_eq!(log.connects(), 0);
    assert!(!log.calls.contains(&"transport"));
}

#[test]
fn test_listeners_registered_before_connect() {
    let (mut sender, log) = sender(Failures::default());
    let listener = Arc::new(CollectingListener::new());
    sender
        .add_transport_listener(listener.clone())
        .add_connection_listener(listener.clone());

    sender.send().unwrap();

    assert_eq!(log.lock().unwrap().listeners_at_connect, (1, 1));
    let events = listener.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], MailEvent::Connection(ConnectionEvent::Opened));
    assert!(matches!(&events[1], MailEvent::Transport(e) if e.status == DeliveryStatus::Delivered));
    assert_eq!(events[2], MailEvent::Connection(ConnectionEvent::Closed));
}

#[test]
fn test_hooks_run_in_order_and_modify() {
    let (session, log) = RecordingSession::new(Failures::default());
    let session_log = Arc::clone(&log);
    let message_log = Arc::clone(&log);
    let hooks = FnHooks::new()
        .on_create_session(move |config| {
            session_log.lock().unwrap().calls.push("before_create_session");
            config.set_property(HELLO_NAME_PROPERTY, "client.example.com");
        })
        .on_send_message(move |transport, message| {
            message_log.lock().unwrap().calls.push("before_send_message");
            assert!(transport.is_connected());
            message.subject = "[hooked] Report".to_string();
        });

    let mut sender = MailSender::new("smtp.example.com")
        .with_session(session)
        .with_hooks(hooks);
    sender
        .set_from("me@example.com")
        .set_subject("Report")
        .add_recipient("you@example.com");

    sender.send().unwrap();

    let log = log.lock().unwrap();
    assert_eq!(
        log.calls,
        vec![
            "before_create_session",
            "transport",
            "connect",
            "before_send_message",
            "send",
            "close"
        ]
    );
    let config = log.config.as_ref().unwrap();
    assert_eq!(config.property(HELLO_NAME_PROPERTY), Some("client.example.com"));
    assert_eq!(log.sent[0].0.subject, "[hooked] Report");
    assert_eq!(sender.subject(), "Report");
}

#[test]
fn test_inline_images() {
    let (session, log) = RecordingSession::new(Failures::default());
    let mut sender = MailSender::new("smtp.example.com").with_session(session);
    sender
        .set_from("me@example.com")
        .add_recipient("you@example.com")
        .add_text("<img src=\"cid:logo\">")
        .add_image_content("logo", b"\x89PNG", "image/png");
    assert_eq!(sender.mode(), BodyMode::Html);

    sender.send().unwrap();

    let log = log.lock().unwrap();
    let message = &log.sent[0].0;
    assert_eq!(message.parts.len(), 2);
    assert_eq!(message.parts[1].content_id(), Some("logo"));
    assert!(message.parts[1].content_type().is_image());
    assert_eq!(message.parts_of_type("text/html").count(), 1);
}

struct Anonymous;

impl CredentialProvider for Anonymous {
    fn credentials(&self) -> Option<Credentials> {
        None
    }
}

#[test]
fn test_credential_provider_without_credentials() {
    let (session, log) = RecordingSession::new(Failures::default());
    let mut sender =
        MailSender::with_credential_provider("smtp.example.com", Anonymous).with_session(session);
    sender.set_from("me@example.com").add_recipient("you@example.com");

    sender.send().unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.connects(), 1);
    assert!(log.credentials.is_none());
}
