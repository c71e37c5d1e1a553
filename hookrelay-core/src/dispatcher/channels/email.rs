//! SMTP email channel.

use crate::dispatcher::{ChannelError, NotificationChannel, OutboundMessage};
use async_trait::async_trait;
use hookrelay_sdk::config::{EmailConfig, SmtpSecurity};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailChannel {
    /// Parses every address up front, so a bad address fails here rather
    /// than on each send.
    pub fn new(config: EmailConfig, timeout: Duration) -> Result<Self, ChannelError> {
        if config.recipients.is_empty() {
            return Err(ChannelError::Misconfigured("no recipient_emails".to_owned()));
        }
        let from: Mailbox = config.sender.parse()?;
        let to = config
            .recipients
            .iter()
            .map(|r| r.trim().parse::<Mailbox>())
            .collect::<Result<Vec<_>, _>>()?;

        let builder = match config.security {
            SmtpSecurity::ImplicitTls => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server)?
            }
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)?
            }
            SmtpSecurity::Plain => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_server)
            }
        };
        let mut builder = builder.port(config.smtp_port).timeout(Some(timeout));
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(config.username, config.password));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }

    fn build_message(&self, message: &OutboundMessage<'_>) -> Result<Message, ChannelError> {
        let subject = if message.parts > 1 {
            format!("{} ({}/{})", message.subject, message.part, message.parts)
        } else {
            message.subject.to_owned()
        };

        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }
        Ok(builder
            .header(ContentType::TEXT_PLAIN)
            .body(message.text.to_owned())?)
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    fn max_message_len(&self) -> Option<usize> {
        None
    }

    async fn send(&self, message: &OutboundMessage<'_>) -> Result<(), ChannelError> {
        let email = self.build_message(message)?;
        self.transport.send(email).await?;
        Ok(())
    }
}
