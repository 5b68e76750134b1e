//! Transactional mail client.
//!
//! Sends password-reset codes and admin credentials through an HTTP mail
//! API. Delivery is advisory on every path that uses it; callers log
//! failures and keep going. A mailer built without an endpoint is disabled
//! and drops mail, which is the mode tests and local development run in.

use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("Mail request failed: {0}")]
    Request(String),

    #[error("Mail API returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Outbound message payload for the mail API.
#[derive(Debug, Serialize)]
struct MailPayload<'a> {
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    /// Endpoint and bearer token; `None` disables delivery.
    endpoint: Option<(String, String)>,
    from: String,
}

impl Mailer {
    pub fn new(api_url: Option<String>, api_token: Option<String>, from: String) -> Self {
        let endpoint = match (api_url, api_token) {
            (Some(url), Some(token)) if !url.is_empty() => Some((url, token)),
            _ => {
                warn!("Mail API not configured; outbound mail is disabled");
                None
            }
        };
        Self {
            http: build_http_client(),
            endpoint,
            from,
        }
    }

    /// A mailer that drops everything (tests, local development).
    pub fn disabled() -> Self {
        Self {
            http: build_http_client(),
            endpoint: None,
            from: String::new(),
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    pub async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), MailerError> {
        let Some((url, token)) = &self.endpoint else {
            debug!(to, subject, "Mail dropped (mailer disabled)");
            return Ok(());
        };

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .header("X-Mail-From", &self.from)
            .json(&MailPayload { to, subject, text })
            .send()
            .await
            .map_err(|e| MailerError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Api {
                status: status.as_u16(),
                body,
            });
        }

        debug!(to, subject, "Mail sent");
        Ok(())
    }

    /// Initial login credentials for a freshly provisioned admin account.
    pub async fn send_credentials(&self, to: &str, password: &str) -> Result<(), MailerError> {
        let text = format!(
            "Your admin account has been created. Email: {to}, password: {password}. \
             Change your password after the first login."
        );
        self.send(to, "Admin account created", &text).await
    }

    /// Password-reset code mail.
    pub async fn send_reset_code(&self, to: &str, code: &str) -> Result<(), MailerError> {
        let text = format!(
            "Your password reset code is {code}. It expires in 10 minutes. \
             If you did not request this, ignore this message."
        );
        self.send(to, "Password reset code", &text).await
    }
}

/// The workspace builds reqwest with `rustls-no-provider`, so a crypto
/// provider must be installed before the first `Client` is constructed.
/// Installing ring is a no-op if a provider is already in place.
fn build_http_client() -> reqwest::Client {
    let _ = rustls::crypto::ring::default_provider().install_default();
    reqwest::Client::new()
}
