// src/notify/email.rs
use anyhow::{Context, Result};
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::Dispatcher;
use crate::config::EmailConfig;
use crate::render::RenderedDigest;

pub struct EmailDispatcher {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailDispatcher {
    pub fn from_config(cfg: &EmailConfig) -> Result<Self> {
        let user = cfg.username.clone().context("email.username missing")?;
        let pass = cfg.password.clone().context("email.password missing")?;
        let recipient = cfg.recipient.as_deref().context("email.recipient missing")?;

        let creds = Credentials::new(user.clone(), pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_host)
            .with_context(|| format!("invalid smtp host {}", cfg.smtp_host))?
            .port(cfg.smtp_port)
            .credentials(creds)
            .build();

        let from = Mailbox::new(
            Some(cfg.from_name.clone()),
            user.parse::<lettre::Address>()
                .context("invalid sender address")?,
        );
        let to = recipient
            .parse::<Mailbox>()
            .context("invalid recipient address")?;

        Ok(Self { mailer, from, to })
    }

    pub fn message(&self, doc: &RenderedDigest) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(doc.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                doc.text.clone(),
                doc.html.clone(),
            ))
            .context("build email")
    }
}

#[async_trait::async_trait]
impl Dispatcher for EmailDispatcher {
    async fn deliver(&self, doc: &RenderedDigest) -> Result<()> {
        let msg = self.message(doc)?;
        self.mailer.send(msg).await.context("send email")?;
        tracing::info!(target: "digest", to = %self.to, "digest e-mail sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
