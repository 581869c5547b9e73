//! # mailsender
//!
//! A fluent builder for composing and sending multipart email over SMTP.
//!
//! ## Features
//!
//! - **Fluent builder**: recipients, CC and BCC as ordered unique sets, plain
//!   text or HTML body, file and in-memory attachments, inline images
//! - **One send call**: assembles a `multipart/mixed` message, connects,
//!   delivers and always closes the connection
//! - **Listeners**: delivery and connection events from the transport
//! - **Hooks**: adjust the session configuration or the outgoing message
//!   right before it is used
//! - **Pluggable transport**: SMTP through `lettre` by default, any
//!   [`Session`](transport::Session) otherwise
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailsender::MailSender;
//!
//! fn main() -> mailsender::Result<()> {
//!     let mut sender = MailSender::with_login("smtp.example.com", "me", "secret");
//!     sender
//!         .set_from("me@example.com")
//!         .set_subject("Quarterly figures")
//!         .add_recipients(["alice@example.com", "bob@example.com"])
//!         .add_recipient_cc("boss@example.com")
//!         .add_text("<p>Figures attached.</p><img src=\"cid:logo\">")
//!         .add_image("logo", "logo.png")
//!         .add_file("figures.xlsx");
//!
//!     sender.send()
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: SMTP server configuration
//! - [`content_type`]: MIME content types
//! - [`event`]: Transport and connection listeners
//! - [`hooks`]: Send hooks
//! - [`message`]: The assembled outgoing message
//! - [`part`]: Body parts and their factory
//! - [`store`]: Ordered collections backing the builder
//! - [`transport`]: Session and transport abstractions, SMTP transport

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod content_type;
mod dispatch;
mod error;
pub mod event;
pub mod hooks;
pub mod message;
pub mod part;
mod sender;
pub mod store;
pub mod transport;

pub use config::{Security, SmtpConfig};
pub use error::{BoxError, CannotSendMail, MailError, Result};
pub use event::{ConnectionListener, TransportListener};
pub use hooks::{FnHooks, NoopHooks, SendHooks};
pub use message::OutgoingMessage;
pub use part::{BodyMode, MimeTypedContent};
pub use sender::{MailSender, NO_SUBJECT};
pub use transport::{CredentialProvider, Credentials, Session, Transport};
