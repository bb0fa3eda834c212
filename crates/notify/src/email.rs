//! SMTP email notifier via `lettre` with TLS support.
//!
//! Delivers alert notifications as emails through an SMTP server.
//! Supports STARTTLS and implicit TLS connections.

use crate::traits::{AlertMessage, Notifier, NotifyError};
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

/// Sends alert notifications as emails via SMTP.
#[derive(Debug)]
pub struct EmailNotifier {
    name: String,
    /// Async SMTP transport for sending emails.
    transport: AsyncSmtpTransport<Tokio1Executor>,
    /// Sender mailbox.
    from: Mailbox,
    /// Recipient mailboxes.
    to: Vec<Mailbox>,
}

impl EmailNotifier {
    /// Build an `EmailNotifier` from SMTP configuration.
    ///
    /// - `smtp_host`: SMTP server hostname.
    /// - `smtp_port`: Optional port (defaults to 587; port 465 always uses
    ///   implicit TLS).
    /// - `tls`: Whether to use TLS. `None` or `Some(true)` enables STARTTLS.
    /// - `from`: Sender address (e.g. `"vigil@example.com"` or `"Vigil <vigil@example.com>"`).
    /// - `to`: Recipient addresses.
    ///
    /// SMTP credentials are resolved from the `SMTP_USERNAME` and `SMTP_PASSWORD`
    /// environment variables. If both are set, they are passed to the transport;
    /// otherwise the connection is unauthenticated.
    pub fn from_config(
        name: String,
        smtp_host: &str,
        smtp_port: Option<u16>,
        tls: Option<bool>,
        from: &str,
        to: &[String],
    ) -> Result<Self, NotifyError> {
        let from_mailbox: Mailbox = from
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        let to_mailboxes: Vec<Mailbox> = to
            .iter()
            .map(|addr| {
                addr.parse()
                    .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if to_mailboxes.is_empty() {
            return Err(NotifyError::Config(
                "at least one recipient is required".to_string(),
            ));
        }

        let port = smtp_port.unwrap_or(587);
        let use_tls = tls.unwrap_or(true);

        // Port 465 uses implicit TLS; everything else uses STARTTLS when TLS is enabled.
        let mut builder = if port == 465 || use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host).port(port)
        };

        // Attach credentials from environment if available.
        if let (Ok(username), Ok(password)) =
            (std::env::var("SMTP_USERNAME"), std::env::var("SMTP_PASSWORD"))
        {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            name,
            transport: builder.build(),
            from: from_mailbox,
            to: to_mailboxes,
        })
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    /// Send a notification email to all configured recipients.
    async fn send(&self, message: &AlertMessage) -> Result<(), NotifyError> {
        let mut message_builder = Message::builder().from(self.from.clone());

        for recipient in &self.to {
            message_builder = message_builder.to(recipient.clone());
        }

        let subject = format!("[{}] {}", message.level.tag(), message.alert_name);
        let email = message_builder
            .subject(&subject)
            .body(message.render_body())
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            channel = %self.name,
            alert = %message.alert_name,
            recipients = self.to.len(),
            "notification delivered"
        );

        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipients() -> Vec<String> {
        vec!["admin@example.com".to_string()]
    }

    #[test]
    fn parse_email_with_display_name() {
        let mailbox: Mailbox = "Alice <alice@example.com>".parse().unwrap();
        assert_eq!(mailbox.email.to_string(), "alice@example.com");
    }

    #[test]
    fn from_config_valid() {
        let notifier = EmailNotifier::from_config(
            "mail".to_string(),
            "smtp.example.com",
            Some(587),
            Some(true),
            "vigil@example.com",
            &recipients(),
        );
        assert!(notifier.is_ok());
        assert_eq!(notifier.unwrap().name(), "mail");
    }

    #[test]
    fn from_config_invalid_from_address() {
        let result = EmailNotifier::from_config(
            "mail".to_string(),
            "smtp.example.com",
            None,
            None,
            "bad-address",
            &recipients(),
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Configuration error"), "got: {err}");
    }

    #[test]
    fn from_config_invalid_to_address() {
        let result = EmailNotifier::from_config(
            "mail".to_string(),
            "smtp.example.com",
            None,
            None,
            "vigil@example.com",
            &["not-valid".to_string()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn from_config_empty_recipients() {
        let result = EmailNotifier::from_config(
            "mail".to_string(),
            "smtp.example.com",
            None,
            None,
            "vigil@example.com",
            &[],
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("at least one recipient"), "got: {err}");
    }

    #[test]
    fn from_config_implicit_tls_port() {
        let notifier = EmailNotifier::from_config(
            "mail".to_string(),
            "smtp.example.com",
            Some(465),
            None,
            "vigil@example.com",
            &recipients(),
        );
        assert!(notifier.is_ok());
    }

    #[test]
    fn from_config_no_tls() {
        let notifier = EmailNotifier::from_config(
            "mail".to_string(),
            "smtp.example.com",
            Some(25),
            Some(false),
            "vigil@example.com",
            &recipients(),
        );
        assert!(notifier.is_ok());
    }
}
