use async_trait::async_trait;
use spn_core::tracking::Notifier;

use super::email::EmailDelivery;

/// [`Notifier`] backed by SMTP.
///
/// When SMTP is not configured every send is reported as failed, so the
/// reconciler leaves notification flags unset and retries on a later run.
pub struct EmailNotifier {
    delivery: Option<EmailDelivery>,
}

impl EmailNotifier {
    pub fn new(delivery: EmailDelivery) -> Self {
        Self {
            delivery: Some(delivery),
        }
    }

    /// A notifier with no transport; every send returns `false`.
    pub fn disabled() -> Self {
        Self { delivery: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.delivery.is_some()
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> bool {
        let Some(delivery) = &self.delivery else {
            tracing::warn!(to = recipient, subject, "SMTP not configured, email not sent");
            return false;
        };
        match delivery.send_html(recipient, subject, html_body).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(to = recipient, subject, error = %e, "Failed to send email");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::email::EmailConfig;

    #[tokio::test]
    async fn disabled_notifier_reports_failure() {
        let notifier = EmailNotifier::disabled();
        assert!(!notifier.is_enabled());
        assert!(!notifier.send("owner@example.com", "subject", "<p>x</p>").await);
    }

    #[tokio::test]
    async fn unparseable_recipient_reports_failure() {
        let notifier = EmailNotifier::new(EmailDelivery::new(EmailConfig {
            smtp_host: "smtp.invalid".into(),
            smtp_port: 587,
            from_address: "automation@example.com".into(),
            smtp_user: None,
            smtp_password: None,
        }));
        assert!(!notifier.send("not-an-email", "subject", "<p>x</p>").await);
    }
}
