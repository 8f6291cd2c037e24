use std::future::Future;
use std::path::Path;

use anyhow::Context;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::info;

use crate::config::MailingConfig;

pub trait MailTransport {
    fn deliver(&self, message: Message) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Authenticated SMTP with STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &MailingConfig) -> anyhow::Result<Self> {
        let credentials =
            Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .with_context(|| format!("failed to set up SMTP relay {}", config.smtp_host))?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();
        Ok(Self { transport })
    }
}

impl MailTransport for SmtpMailer {
    async fn deliver(&self, message: Message) -> anyhow::Result<()> {
        self.transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;
        Ok(())
    }
}

/// Plain-text body plus the image as a binary attachment named after the file.
pub fn build_message(config: &MailingConfig, image_path: &Path) -> anyhow::Result<Message> {
    let from: Mailbox = config
        .sender()
        .parse()
        .with_context(|| format!("invalid sender address {:?}", config.sender()))?;
    let to: Mailbox = config
        .mail_to
        .parse()
        .with_context(|| format!("invalid recipient address {:?}", config.mail_to))?;

    let content = std::fs::read(image_path)
        .with_context(|| format!("failed to read {}", image_path.display()))?;
    let filename = image_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table_image.png".to_string());
    let attachment =
        Attachment::new(filename).body(content, ContentType::parse("application/octet-stream")?);

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(config.mail_subject.as_str())
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(config.mail_body.clone()))
                .singlepart(attachment),
        )?;
    Ok(message)
}

pub async fn send_report<T: MailTransport>(
    transport: &T,
    config: &MailingConfig,
    image_path: &Path,
) -> anyhow::Result<()> {
    let message = build_message(config, image_path)?;
    transport.deliver(message).await?;
    info!("Report mailed to {}", config.mail_to);
    Ok(())
}
