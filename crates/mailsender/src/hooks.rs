//! Extension hooks run during [`MailSender::send`](crate::MailSender::send).

use std::fmt;

use crate::message::OutgoingMessage;
use crate::transport::{SessionConfig, Transport};

/// Customization points of a send.
///
/// Both methods default to doing nothing. Install an implementation with
/// [`MailSender::with_hooks`](crate::MailSender::with_hooks).
pub trait SendHooks {
    /// Called with the session configuration before the transport is created.
    fn before_create_session(&self, config: &mut SessionConfig) {
        let _ = config;
    }

    /// Called with the connected transport and the finalized message, right
    /// before the message is sent.
    fn before_send_message(&self, transport: &mut dyn Transport, message: &mut OutgoingMessage) {
        let _ = (transport, message);
    }
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl SendHooks for NoopHooks {}

type CreateSessionFn = Box<dyn Fn(&mut SessionConfig)>;
type SendMessageFn = Box<dyn Fn(&mut dyn Transport, &mut OutgoingMessage)>;

/// Hooks built from closures.
///
/// ```ignore
/// let hooks = FnHooks::new()
///     .on_create_session(|config| {
///         config.set_property(HELLO_NAME_PROPERTY, "client.example.com");
///     })
///     .on_send_message(|_, message| message.subject.insert_str(0, "[test] "));
/// ```
#[derive(Default)]
pub struct FnHooks {
    create_session: Option<CreateSessionFn>,
    send_message: Option<SendMessageFn>,
}

impl FnHooks {
    /// Creates hooks that do nothing until closures are set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the closure run before the session is created.
    #[must_use]
    pub fn on_create_session(mut self, hook: impl Fn(&mut SessionConfig) + 'static) -> Self {
        self.create_session = Some(Box::new(hook));
        self
    }

    /// Sets the closure run before the message is sent.
    #[must_use]
    pub fn on_send_message(
        mut self,
        hook: impl Fn(&mut dyn Transport, &mut OutgoingMessage) + 'static,
    ) -> Self {
        self.send_message = Some(Box::new(hook));
        self
    }
}

impl SendHooks for FnHooks {
    fn before_create_session(&self, config: &mut SessionConfig) {
        if let Some(hook) = &self.create_session {
            hook(config);
        }
    }

    fn before_send_message(&self, transport: &mut dyn Transport, message: &mut OutgoingMessage) {
        if let Some(hook) = &self.send_message {
            hook(transport, message);
        }
    }
}

impl fmt::Debug for FnHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHooks")
            .field("create_session", &self.create_session.is_some())
            .field("send_message", &self.send_message.is_some())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::config::SmtpConfig;
    use crate::transport::{HELLO_NAME_PROPERTY, SmtpTransport};

    fn session_config() -> SessionConfig {
        SessionConfig::new(&SmtpConfig::new("localhost"), Some("me@example.com"))
    }

    #[test]
    fn test_noop_hooks_leave_config_alone() {
        let mut config = session_config();
        NoopHooks.before_create_session(&mut config);
        assert_eq!(config, session_config());
    }

    #[test]
    fn test_fn_hooks_run_closures() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let hooks = FnHooks::new()
            .on_create_session(|config| {
                config.set_property(HELLO_NAME_PROPERTY, "client.example.com");
            })
            .on_send_message(move |transport, message| {
                assert!(!transport.is_connected());
                message.subject.insert_str(0, "[test] ");
                counter.set(counter.get() + 1);
            });

        let mut config = session_config();
        hooks.before_create_session(&mut config);
        assert_eq!(config.property(HELLO_NAME_PROPERTY), Some("client.example.com"));

        let mut transport = SmtpTransport::new(config);
        let mut message = OutgoingMessage::new("me@example.com".parse().unwrap(), "Report");
        hooks.before_send_message(&mut transport, &mut message);

        assert_eq!(message.subject, "[test] Report");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_fn_hooks_without_closures() {
        let hooks = FnHooks::new();
        let mut config = session_config();
        hooks.before_create_session(&mut config);
        assert!(config.properties.is_empty());
        assert!(format!("{hooks:?}").contains("create_session: false"));
    }
}
