use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, info, warn};

use crate::config::SmtpConfig;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    subject: String,
}

impl SmtpNotifier {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let credentials = Credentials::new(cfg.from_address.clone(), cfg.password.clone());
        let builder = if cfg.enable_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.server)
                .context("smtp relay")?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.server)
        };
        let mailer = builder.port(cfg.port).credentials(credentials).build();
        let from = cfg
            .from_address
            .parse::<Mailbox>()
            .with_context(|| format!("SMTP_FROM_ADDRESS {}", cfg.from_address))?;
        Ok(Self {
            mailer,
            from,
            subject: cfg.subject.clone(),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, body: &str) -> anyhow::Result<()> {
        let to: Mailbox = to.parse().with_context(|| format!("recipient {to}"))?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(self.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_owned())
            .context("build message")?;
        self.mailer.send(email).await.context("smtp send")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub to: String,
    pub body: String,
}

/// Handle to the background delivery worker. Dispatch never waits for SMTP.
#[derive(Clone)]
pub struct Mailer {
    tx: mpsc::Sender<Envelope>,
}

impl Mailer {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn(notifier: Arc<dyn Notifier>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Envelope>(capacity.max(1));
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                match notifier.send(&envelope.to, &envelope.body).await {
                    Ok(()) => info!(to = %envelope.to, "email sent"),
                    Err(e) => error!(error = ?e, to = %envelope.to, "email delivery failed"),
                }
            }
            info!("mail worker stopped");
        });
        Self { tx }
    }

    /// Queues a message. Returns whether it was queued; failure is logged only.
    pub fn dispatch(&self, to: &str, body: String) -> bool {
        let envelope = Envelope {
            to: to.to_owned(),
            body,
        };
        match self.tx.try_send(envelope) {
            Ok(()) => true,
            Err(TrySendError::Full(envelope)) => {
                warn!(to = %envelope.to, "mail queue full, message dropped");
                false
            }
            Err(TrySendError::Closed(envelope)) => {
                error!(to = %envelope.to, "mail worker gone, message dropped");
                false
            }
        }
    }
}

pub fn passcode_message(username: &str, code: &str, ttl_minutes: i64) -> String {
    format!(
        "Hello {username},\n\n\
         Your temporary passcode is {code}\n\n\
         It can be used to sign in for the next {ttl_minutes} minutes.\n"
    )
}

#[cfg(test)]
pub use fakes::{FailingNotifier, RecordingNotifier};
