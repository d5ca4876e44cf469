//! Mail service.
//!
//! Fire-and-forget SMTP delivery; used only by the password-reset flow.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use photoboard_common::{AppError, AppResult, config::MailConfig};

/// Mail service backed by an SMTP relay.
///
/// When no relay is configured, sends are logged and dropped so local
/// development needs no mail setup.
#[derive(Clone)]
pub struct MailService {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
}

impl MailService {
    /// Create a mail service from configuration.
    pub fn from_config(config: &MailConfig) -> AppResult<Self> {
        let Some(ref host) = config.smtp_host else {
            tracing::info!("No SMTP relay configured; outgoing mail is disabled");
            return Ok(Self {
                transport: None,
                from: config.from.clone(),
            });
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| AppError::Mail(e.to_string()))?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: Some(builder.build()),
            from: config.from.clone(),
        })
    }

    /// Send a plain-text message.
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let Some(ref transport) = self.transport else {
            tracing::debug!(to = %to, subject = %subject, "Mail disabled; dropping message");
            return Ok(());
        };

        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| AppError::Mail(format!("Bad from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| AppError::Mail(format!("Bad to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AppError::Mail(e.to_string()))?;

        transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;

        tracing::debug!(to = %to, subject = %subject, "Sent mail");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_mail_drops_silently() {
        let service = MailService::from_config(&MailConfig::default()).unwrap();
        // No relay configured: send succeeds without network access.
        service
            .send("alice@example.com", "Hello", "Body")
            .await
            .unwrap();
    }
}
