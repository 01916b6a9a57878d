use std::time::Duration;

use anyhow::Context;
use axum::async_trait;
use serde::Serialize;
use time::Date;
use tracing::{debug, info, warn};

use crate::config::MailConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    EmailVerification,
    PasswordReset,
    BookingConfirmation,
}

/// Values substituted into a transactional mail.
#[derive(Debug, Clone)]
pub enum TemplateData {
    Verification {
        token: String,
    },
    PasswordReset {
        token: String,
    },
    Booking {
        service_name: String,
        start_date: Date,
        end_date: Date,
        total_price: i64,
    },
}

impl TemplateData {
    pub fn kind(&self) -> NotificationKind {
        match self {
            TemplateData::Verification { .. } => NotificationKind::EmailVerification,
            TemplateData::PasswordReset { .. } => NotificationKind::PasswordReset,
            TemplateData::Booking { .. } => NotificationKind::BookingConfirmation,
        }
    }
}

/// A rendered message, ready for delivery.
#[derive(Debug, Clone, Serialize)]
pub struct Mail {
    pub kind: NotificationKind,
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl Mail {
    pub fn render(to: &str, data: &TemplateData, base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        let (subject, html) = match data {
            TemplateData::Verification { token } => (
                "Verify your email address".to_string(),
                format!(
                    "<div><h1>Welcome to Pawstay!</h1>\
                     <p>Please verify your email address by clicking the link below:</p>\
                     <a href=\"{base_url}/verify-email?token={token}\">Verify Email</a>\
                     <p>This link will expire in 24 hours.</p>\
                     <p>If you didn't create an account, you can safely ignore this email.</p></div>"
                ),
            ),
            TemplateData::PasswordReset { token } => (
                "Reset your password".to_string(),
                format!(
                    "<div><h1>Password Reset Request</h1>\
                     <p>You requested to reset your password. Click the link below to set a new password:</p>\
                     <a href=\"{base_url}/reset-password?token={token}\">Reset Password</a>\
                     <p>This link will expire in 1 hour.</p>\
                     <p>If you didn't request a password reset, you can safely ignore this email.</p></div>"
                ),
            ),
            TemplateData::Booking {
                service_name,
                start_date,
                end_date,
                total_price,
            } => (
                "Booking Confirmation".to_string(),
                format!(
                    "<div><h1>Booking Confirmation</h1>\
                     <p>Your booking has been received with the following details:</p>\
                     <ul><li>Service: {service_name}</li>\
                     <li>Start Date: {start_date}</li>\
                     <li>End Date: {end_date}</li>\
                     <li>Total Price: ${total_price}</li></ul>\
                     <p>Thank you for choosing Pawstay!</p></div>"
                ),
            ),
        };
        Self {
            kind: data.kind(),
            to: to.to_string(),
            subject,
            html,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, data: TemplateData) -> anyhow::Result<()>;
}

/// Delivers mail through an HTTP mail API.
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
    base_url: String,
}

#[derive(Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    #[serde(flatten)]
    mail: &'a Mail,
}

impl HttpMailer {
    pub fn new(cfg: &MailConfig, api_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build mail http client")?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: cfg.api_key.clone(),
            from: cfg.from.clone(),
            base_url: cfg.base_url.clone(),
        })
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send(&self, recipient: &str, data: TemplateData) -> anyhow::Result<()> {
        let mail = Mail::render(recipient, &data, &self.base_url);
        let mut req = self.client.post(&self.api_url).json(&OutgoingMail {
            from: &self.from,
            mail: &mail,
        });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        req.send()
            .await
            .context("mail api request")?
            .error_for_status()
            .context("mail api response")?;
        debug!(kind = ?mail.kind, to = %mail.to, "mail delivered");
        Ok(())
    }
}

/// Writes mail to the log instead of delivering it.
#[derive(Clone)]
pub struct LogMailer {
    base_url: String,
}

impl LogMailer {
    pub fn new(cfg: &MailConfig) -> Self {
        Self {
            base_url: cfg.base_url.clone(),
        }
    }
}

#[async_trait]
impl Notifier for LogMailer {
    async fn send(&self, recipient: &str, data: TemplateData) -> anyhow::Result<()> {
        let mail = Mail::render(recipient, &data, &self.base_url);
        info!(kind = ?mail.kind, to = %mail.to, subject = %mail.subject, "mail not delivered (no MAIL_API_URL)");
        debug!(html = %mail.html, "mail body");
        Ok(())
    }
}

/// Sends a notification after the primary write already succeeded.
/// Failures and timeouts are logged and swallowed; returns whether it was sent.
pub async fn send_best_effort(
    notifier: &dyn Notifier,
    recipient: &str,
    data: TemplateData,
    limit: Duration,
) -> bool {
    let kind = data.kind();
    match tokio::time::timeout(limit, notifier.send(recipient, data)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(error = ?e, ?kind, to = %recipient, "notification failed");
            false
        }
        Err(_) => {
            warn!(?kind, to = %recipient, "notification timed out");
            false
        }
    }
}

#[cfg(test)]
pub use recording::RecordingNotifier;


#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn booking_mail_lists_service_dates_and_total() {
        let data = TemplateData::Booking {
            service_name: "Overnight Stay".into(),
            start_date: date!(2024 - 03 - 20),
            end_date: date!(2024 - 03 - 22),
            total_price: 150,
        };
        let mail = Mail::render("jane@example.com", &data, "http://x");
        assert_eq!(mail.kind, NotificationKind::BookingConfirmation);
        assert!(mail.html.contains("Overnight Stay"));
        assert!(mail.html.contains("2024-03-20"));
        assert!(mail.html.contains("2024-03-22"));
        assert!(mail.html.contains("$150"));
    }

    #[test]
    fn reset_mail_links_to_reset_page() {
        let data = TemplateData::PasswordReset { token: "abc".into() };
        let mail = Mail::render("a@b.co", &data, "https://pawstay.example/");
        assert_eq!(mail.subject, "Reset your password");
        assert!(mail
            .html
            .contains("https://pawstay.example/reset-password?token=abc"));
    }

    #[tokio::test]
    async fn best_effort_swallows_failures() {
        let notifier = RecordingNotifier::failing();
        let sent = send_best_effort(
            &notifier,
            "a@b.co",
            TemplateData::Verification { token: "t".into() },
            Duration::from_secs(1),
        )
        .await;
        assert!(!sent);
    }

    #[tokio::test]
    async fn best_effort_reports_delivery() {
        let notifier = RecordingNotifier::default();
        let sent = send_best_effort(
            &notifier,
            "a@b.co",
            TemplateData::Verification { token: "t".into() },
            Duration::from_secs(1),
        )
        .await;
        assert!(sent);
        assert_eq!(notifier.sent().len(), 1);
    }
}
