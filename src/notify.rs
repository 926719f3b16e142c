//! Email notification delivery via SMTP.
//!
//! [`SmtpNotifier`] wraps the `lettre` async SMTP transport to send the
//! single plaintext report each run produces. Sender and recipient are the
//! same configured mailbox. The relay connection uses implicit TLS (port 465
//! by default). Delivery is attempted exactly once with no retry; there is no
//! further collaborator to report a delivery failure to.

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for notification delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The configured mailbox address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP relay host.
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Default SMTP port (implicit TLS).
const DEFAULT_SMTP_PORT: u16 = 465;

/// Configuration for the SMTP report delivery.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 465, implicit TLS).
    pub smtp_port: u16,
    /// Mailbox used as both sender and recipient, and as the SMTP username.
    pub mailbox: String,
    /// SMTP password for the mailbox.
    pub password: String,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `MAILBOX_ADDRESS` is not set, signalling that
    /// notification delivery is not configured. The orchestrator cannot run
    /// without it.
    ///
    /// | Variable           | Required | Default          |
    /// |--------------------|----------|------------------|
    /// | `MAILBOX_ADDRESS`  | yes      | —                |
    /// | `MAILBOX_PASSWORD` | no       | empty            |
    /// | `SMTP_HOST`        | no       | `smtp.gmail.com` |
    /// | `SMTP_PORT`        | no       | `465`            |
    pub fn from_env() -> Option<Self> {
        let mailbox = std::env::var("MAILBOX_ADDRESS").ok()?;
        Some(Self {
            smtp_host: std::env::var("SMTP_HOST").unwrap_or_else(|_| DEFAULT_SMTP_HOST.to_string()),
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            mailbox,
            password: std::env::var("MAILBOX_PASSWORD").unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Delivers the run report. The orchestrator is generic over this trait so
/// tests can capture the report instead of talking to a relay.
pub trait Notifier: Send + Sync {
    /// Deliver one message. No internal retry.
    fn notify(
        &self,
        subject: &str,
        body: &str,
    ) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send;
}

/// Sends the report to the configured mailbox over authenticated SMTP.
pub struct SmtpNotifier {
    config: EmailConfig,
}

impl SmtpNotifier {
    /// Create a notifier with the given configuration.
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

impl Notifier for SmtpNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let email = Message::builder()
            .from(self.config.mailbox.parse()?)
            .to(self.config.mailbox.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)?
            .port(self.config.smtp_port)
            .credentials(Credentials::new(
                self.config.mailbox.clone(),
                self.config.password.clone(),
            ))
            .build();

        mailer.send(email).await?;

        tracing::info!(to = %self.config.mailbox, subject, "Report email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_returns_none_without_mailbox() {
        std::env::remove_var("MAILBOX_ADDRESS");
        assert!(EmailConfig::from_env().is_none());
    }

    #[test]
    fn notify_error_display_build() {
        let err = NotifyError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }

    #[test]
    fn notify_error_display_address() {
        let addr_err: Result<lettre::Address, _> = "not-an-email".parse();
        let err = NotifyError::Address(addr_err.unwrap_err());
        assert!(err.to_string().contains("Email address parse error"));
    }
}
