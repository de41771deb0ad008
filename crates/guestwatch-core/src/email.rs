use crate::config::SmtpConfig;
use crate::credentials::SmtpCredentials;
use crate::error::{GuestwatchError, Result};
use crate::notify::{Channel, OutboundMessage, Transport};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport as _};

const SMTP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Plain-text alert email over an authenticated STARTTLS relay.
/// One message per recipient so a bad address only fails itself.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, credentials: SmtpCredentials) -> Result<Self> {
        let from: Mailbox = credentials.sender.parse().map_err(|e| {
            GuestwatchError::Config(vec![format!(
                "SMTP_EMAIL '{}' is not a valid address: {e}",
                credentials.sender
            )])
        })?;
        let transport = SmtpTransport::starttls_relay(&config.host)
            .map_err(|e| GuestwatchError::Delivery(format!("smtp relay {}: {e}", config.host)))?
            .port(config.port)
            .timeout(Some(SMTP_TIMEOUT))
            .credentials(Credentials::new(credentials.sender, credentials.password))
            .build();
        Ok(Self { transport, from })
    }

    fn build_message(&self, recipient: &str, message: &OutboundMessage) -> Result<Message> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| GuestwatchError::Delivery(format!("invalid recipient '{recipient}': {e}")))?;
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone().unwrap_or_default())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| GuestwatchError::Delivery(e.to_string()))
    }
}

impl Transport for SmtpMailer {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    fn send(&self, recipient: &str, message: &OutboundMessage) -> Result<()> {
        let email = self.build_message(recipient, message)?;
        self.transport
            .send(&email)
            .map_err(|e| GuestwatchError::Delivery(format!("smtp: {e}")))?;
        Ok(())
    }
}
