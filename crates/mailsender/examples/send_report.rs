//! Sends a small HTML report with an attachment and an inline logo.
//!
//! ```text
//! RUST_LOG=mailsender=trace cargo run --example send_report -- smtp.json me@example.com you@example.com
//! ```
//!
//! `smtp.json` holds an [`SmtpConfig`]:
//!
//! ```text
//! { "host": "smtp.example.com", "security": "starttls", "username": "me", "password": "secret" }
//! ```

use std::sync::Arc;

use anyhow::{Context, bail};
use mailsender::event::LoggingListener;
use mailsender::{MailSender, SmtpConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LOGO: &[u8] = b"GIF89a\x01\x00\x01\x00\x80\x00\x00\x00\x00\x00\xff\xff\xff!\xf9\x04\x01\x00\x00\x00\x00,\x00\x00\x00\x00\x01\x00\x01\x00\x00\x02\x02D\x01\x00;";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailsender=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(config_path), Some(from)) = (args.next(), args.next()) else {
        bail!("usage: send_report <smtp.json> <from> <recipient>...");
    };
    let recipients: Vec<String> = args.collect();
    if recipients.is_empty() {
        bail!("at least one recipient is required");
    }

    let raw = std::fs::read_to_string(&config_path)
        .with_context(|| format!("reading {config_path}"))?;
    let config: SmtpConfig = serde_json::from_str(&raw).context("parsing SMTP configuration")?;

    let listener = Arc::new(LoggingListener);
    let mut sender = MailSender::from_config(config);
    sender
        .set_from(from)
        .set_subject("Daily report")
        .set_recipients(recipients)
        .add_text("<h1>Daily report</h1><p>Figures attached.</p><img src=\"cid:logo\">")
        .add_image_content("logo", LOGO, "image/gif")
        .add_file_content("figures.csv", b"day,orders\nmon,12\ntue,17\n", "text/csv")
        .add_transport_listener(listener.clone())
        .add_connection_listener(listener);

    sender.send().context("sending report")?;
    Ok(())
}
