//! The mutable message builder.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SmtpConfig;
use crate::event::{ConnectionListener, TransportListener};
use crate::hooks::{NoopHooks, SendHooks};
use crate::part::{self, BodyMode, BodyPartFactory, MimeTypedContent};
use crate::store::{MultiMap, OrderedSet};
use crate::transport::{CredentialProvider, Session, SmtpSession};

/// Subject used until one is set.
pub const NO_SUBJECT: &str = "no subject";

/// Fluent builder for a multipart message, sent with [`MailSender::send`].
///
/// A sender targets one SMTP host. Message state accumulates through the
/// `add_*`/`set_*` calls, survives [`send`](MailSender::send), and is cleared
/// with [`reset`](MailSender::reset). A sender is meant to be driven by a
/// single flow; share it across threads only behind external locking.
///
/// ```ignore
/// let mut sender = MailSender::with_login("smtp.example.com", "me", "secret");
/// sender
///     .set_from("me@example.com")
///     .set_subject("Weekly report")
///     .add_recipient("team@example.com")
///     .add_text("See attached.")
///     .add_file("report.pdf");
/// sender.send()?;
/// ```
pub struct MailSender {
    pub(crate) config: SmtpConfig,
    pub(crate) credentials: Option<Box<dyn CredentialProvider>>,
    pub(crate) session: Box<dyn Session>,
    pub(crate) hooks: Box<dyn SendHooks>,
    pub(crate) factory: BodyPartFactory,
    pub(crate) mode: BodyMode,
    pub(crate) text: String,
    pub(crate) subject: String,
    pub(crate) from: Option<String>,
    pub(crate) files: MultiMap<String, PathBuf>,
    pub(crate) file_contents: MultiMap<String, MimeTypedContent>,
    pub(crate) images: MultiMap<String, PathBuf>,
    pub(crate) image_contents: MultiMap<String, MimeTypedContent>,
    pub(crate) recipients: OrderedSet<String>,
    pub(crate) recipients_cc: OrderedSet<String>,
    pub(crate) recipients_bcc: OrderedSet<String>,
    pub(crate) transport_listeners: Vec<Arc<dyn TransportListener>>,
    pub(crate) connection_listeners: Vec<Arc<dyn ConnectionListener>>,
}

impl MailSender {
    /// Creates a sender for `host` without authentication.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self::from_config(SmtpConfig::new(host))
    }

    /// Creates a sender for `host` authenticating with a login and password.
    #[must_use]
    pub fn with_login(
        host: impl Into<String>,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::from_config(SmtpConfig::new(host).with_login(login, password))
    }

    /// Creates a sender for `host` asking `provider` for credentials on connect.
    #[must_use]
    pub fn with_credential_provider(
        host: impl Into<String>,
        provider: impl CredentialProvider + 'static,
    ) -> Self {
        let mut sender = Self::new(host);
        sender.credentials = Some(Box::new(provider));
        sender
    }

    /// Creates a sender from a full server configuration.
    #[must_use]
    pub fn from_config(config: SmtpConfig) -> Self {
        let credentials = config
            .credentials()
            .map(|c| Box::new(c) as Box<dyn CredentialProvider>);
        Self {
            config,
            credentials,
            session: Box::new(SmtpSession),
            hooks: Box::new(NoopHooks),
            factory: BodyPartFactory,
            mode: BodyMode::default(),
            text: String::new(),
            subject: NO_SUBJECT.to_string(),
            from: None,
            files: MultiMap::new(),
            file_contents: MultiMap::new(),
            images: MultiMap::new(),
            image_contents: MultiMap::new(),
            recipients: OrderedSet::new(),
            recipients_cc: OrderedSet::new(),
            recipients_bcc: OrderedSet::new(),
            transport_listeners: Vec::new(),
            connection_listeners: Vec::new(),
        }
    }

    /// Replaces the session that creates transports.
    #[must_use]
    pub fn with_session(mut self, session: impl Session + 'static) -> Self {
        self.session = Box::new(session);
        self
    }

    /// Installs send hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: impl SendHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    // Body

    /// Appends to the body text.
    pub fn add_text(&mut self, text: &str) -> &mut Self {
        self.text.push_str(text);
        self
    }

    /// Renders the body as `text/plain`.
    pub fn set_text_mode(&mut self) -> &mut Self {
        self.mode = BodyMode::Text;
        self
    }

    /// Renders the body as `text/html`.
    pub fn set_html_mode(&mut self) -> &mut Self {
        self.mode = BodyMode::Html;
        self
    }

    // Attachments

    /// Attaches a file under its own file name.
    ///
    /// Paths without a file name (empty, `..`) are ignored.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        if let Some(name) = part::file_name(path) {
            self.files.put_value(name, path.to_path_buf());
        }
        self
    }

    /// Attaches a file under `name`. Several files may share a name.
    pub fn add_named_file(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> &mut Self {
        self.files.put_value(name.into(), path.into());
        self
    }

    /// Attaches a copy of `content` under `name`.
    pub fn add_file_content(
        &mut self,
        name: impl Into<String>,
        content: &[u8],
        mime_type: impl Into<String>,
    ) -> &mut Self {
        self.file_contents
            .put_value(name.into(), MimeTypedContent::new(content, mime_type));
        self
    }

    /// Embeds an image file referenced as `cid:<content_id>` and switches to HTML.
    ///
    /// A later image with the same content-id replaces this one.
    pub fn add_image(&mut self, content_id: impl Into<String>, path: impl Into<PathBuf>) -> &mut Self {
        let content_id = content_id.into();
        self.image_contents.remove(&content_id);
        self.images.replace(content_id, path.into());
        self.set_html_mode()
    }

    /// Embeds a copy of image bytes referenced as `cid:<content_id>` and switches to HTML.
    ///
    /// A later image with the same content-id replaces this one.
    pub fn add_image_content(
        &mut self,
        content_id: impl Into<String>,
        content: &[u8],
        mime_type: impl Into<String>,
    ) -> &mut Self {
        let content_id = content_id.into();
        self.images.remove(&content_id);
        self.image_contents
            .replace(content_id, MimeTypedContent::new(content, mime_type));
        self.set_html_mode()
    }

    // Recipients

    /// Adds a recipient. Adding an address twice has no effect.
    pub fn add_recipient(&mut self, address: impl Into<String>) -> &mut Self {
        self.recipients.insert(address.into());
        self
    }

    /// Adds a CC recipient.
    pub fn add_recipient_cc(&mut self, address: impl Into<String>) -> &mut Self {
        self.recipients_cc.insert(address.into());
        self
    }

    /// Adds a BCC recipient.
    pub fn add_recipient_bcc(&mut self, address: impl Into<String>) -> &mut Self {
        self.recipients_bcc.insert(address.into());
        self
    }

    /// Adds several recipients.
    pub fn add_recipients<I, S>(&mut self, addresses: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipients.extend(addresses.into_iter().map(Into::into));
        self
    }

    /// Adds several CC recipients.
    pub fn add_recipients_cc<I, S>(&mut self, addresses: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipients_cc.extend(addresses.into_iter().map(Into::into));
        self
    }

    /// Adds several BCC recipients.
    pub fn add_recipients_bcc<I, S>(&mut self, addresses: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipients_bcc.extend(addresses.into_iter().map(Into::into));
        self
    }

    /// Replaces the recipients.
    pub fn set_recipients<I, S>(&mut self, addresses: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipients.clear();
        self.add_recipients(addresses)
    }

    /// Replaces the CC recipients.
    pub fn set_recipients_cc<I, S>(&mut self, addresses: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipients_cc.clear();
        self.add_recipients_cc(addresses)
    }

    /// Replaces the BCC recipients.
    pub fn set_recipients_bcc<I, S>(&mut self, addresses: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipients_bcc.clear();
        self.add_recipients_bcc(addresses)
    }

    /// Removes a recipient if present.
    pub fn remove_recipient(&mut self, address: &str) -> &mut Self {
        self.recipients.remove(&address.to_string());
        self
    }

    /// Removes a CC recipient if present.
    pub fn remove_recipient_cc(&mut self, address: &str) -> &mut Self {
        self.recipients_cc.remove(&address.to_string());
        self
    }

    /// Removes a BCC recipient if present.
    pub fn remove_recipient_bcc(&mut self, address: &str) -> &mut Self {
        self.recipients_bcc.remove(&address.to_string());
        self
    }

    // Envelope

    /// Sets the sender address.
    pub fn set_from(&mut self, address: impl Into<String>) -> &mut Self {
        self.from = Some(address.into());
        self
    }

    /// Sets the subject; `None` restores [`NO_SUBJECT`].
    pub fn set_subject<'a>(&mut self, subject: impl Into<Option<&'a str>>) -> &mut Self {
        self.subject = subject.into().unwrap_or(NO_SUBJECT).to_string();
        self
    }

    // Listeners

    /// Registers a delivery listener for subsequent sends.
    pub fn add_transport_listener(&mut self, listener: Arc<dyn TransportListener>) -> &mut Self {
        self.transport_listeners.push(listener);
        self
    }

    /// Registers a connection listener for subsequent sends.
    pub fn add_connection_listener(&mut self, listener: Arc<dyn ConnectionListener>) -> &mut Self {
        self.connection_listeners.push(listener);
        self
    }

    /// Clears the message state.
    ///
    /// Text, attachments, images, recipients and listeners are emptied, the
    /// subject goes back to [`NO_SUBJECT`] and the sender is unset. The server
    /// configuration, credentials, session, hooks and body mode are kept.
    pub fn reset(&mut self) -> &mut Self {
        self.text.clear();
        self.files.clear();
        self.file_contents.clear();
        self.images.clear();
        self.image_contents.clear();
        self.recipients.clear();
        self.recipients_cc.clear();
        self.recipients_bcc.clear();
        self.transport_listeners.clear();
        self.connection_listeners.clear();
        self.subject = NO_SUBJECT.to_string();
        self.from = None;
        self
    }

    // Accessors

    /// Server configuration.
    #[must_use]
    pub const fn config(&self) -> &SmtpConfig {
        &self.config
    }

    /// Returns true if a credential provider is configured.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Sender address.
    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.from.as_deref()
    }

    /// Accumulated body text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Body mode.
    #[must_use]
    pub const fn mode(&self) -> BodyMode {
        self.mode
    }

    /// Recipients.
    #[must_use]
    pub const fn recipients(&self) -> &OrderedSet<String> {
        &self.recipients
    }

    /// CC recipients.
    #[must_use]
    pub const fn recipients_cc(&self) -> &OrderedSet<String> {
        &self.recipients_cc
    }

    /// BCC recipients.
    #[must_use]
    pub const fn recipients_bcc(&self) -> &OrderedSet<String> {
        &self.recipients_bcc
    }

    /// File attachments by name.
    #[must_use]
    pub const fn files(&self) -> &MultiMap<String, PathBuf> {
        &self.files
    }

    /// In-memory attachments by name.
    #[must_use]
    pub const fn file_contents(&self) -> &MultiMap<String, MimeTypedContent> {
        &self.file_contents
    }

    /// Image files by content-id.
    #[must_use]
    pub const fn images(&self) -> &MultiMap<String, PathBuf> {
        &self.images
    }

    /// In-memory images by content-id.
    #[must_use]
    pub const fn image_contents(&self) -> &MultiMap<String, MimeTypedContent> {
        &self.image_contents
    }

    /// Number of registered delivery listeners.
    #[must_use]
    pub fn transport_listener_count(&self) -> usize {
        self.transport_listeners.len()
    }

    /// Number of registered connection listeners.
    #[must_use]
    pub fn connection_listener_count(&self) -> usize {
        self.connection_listeners.len()
    }
}

impl fmt::Debug for MailSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailSender")
            .field("host", &self.config.host)
            .field("port", &self.config.effective_port())
            .field("credentials", &self.credentials.is_some())
            .field("mode", &self.mode)
            .field("subject", &self.subject)
            .field("from", &self.from)
            .field("recipients", &self.recipients)
            .field("recipients_cc", &self.recipients_cc)
            .field("recipients_bcc", &self.recipients_bcc)
            .field("files", &self.files.value_count())
            .field("file_contents", &self.file_contents.value_count())
            .field("images", &self.images.len())
            .field("image_contents", &self.image_contents.len())
            .field("transport_listeners", &self.transport_listeners.len())
            .field("connection_listeners", &self.connection_listeners.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for MailSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MailSender {{")?;
        writeln!(f, "\tsubject: {}", self.subject)?;
        writeln!(f, "\tfrom: {}", self.from.as_deref().unwrap_or("none"))?;
        writeln!(f, "\ttext: {}", self.text)?;
        writeln!(f, "\trecipients: {}", self.recipients)?;
        writeln!(f, "\trecipients CC: {}", self.recipients_cc)?;
        writeln!(f, "\trecipients BCC: {}", self.recipients_bcc)?;

        writeln!(f, "\tfiles attachments:")?;
        for (name, path) in self.files.values() {
            writeln!(f, "\t\t{name}: {}", path.display())?;
        }
        writeln!(f, "\tdata attachments:")?;
        for (name, content) in self.file_contents.values() {
            writeln!(f, "\t\t{name}: {}", content.mime_type)?;
        }

        writeln!(f, "\tmode: {}", self.mode)?;
        write!(f, "}}")
    }
}
