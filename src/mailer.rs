use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// OutgoingEmail
///
/// One HTML message, in the shape the mail API expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

// 1. Mailer Contract
/// Mailer
///
/// The abstract contract for outbound email. Swapping the HTTP implementation for the
/// recording mock lets the notification flow be tested without a network.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Hands the message to the provider. The error string is the provider's reason.
    async fn send(&self, email: OutgoingEmail) -> Result<(), String>;
}

// 2. The Real Implementation (Resend-compatible HTTP API)
/// HttpMailer
///
/// POSTs `{from, to, subject, html}` as JSON with a bearer API key. Any non-2xx answer
/// is a delivery failure.
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpMailer {
    pub fn new(api_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), String> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&email)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(format!("mail API responded {}: {}", status, body))
    }
}

// 3. The Mock Implementation
/// MockMailer
///
/// Records every message instead of sending it. Used by tests and by local runs
/// without `MAIL_API_URL`.
#[derive(Clone, Default)]
pub struct MockMailer {
    /// When true, every send returns a simulated failure.
    pub should_fail: bool,
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Messages accepted so far, oldest first.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), String> {
        if self.should_fail {
            return Err("Mock Mailer Error: Simulation requested".to_string());
        }
        tracing::debug!(to = %email.to, subject = %email.subject, "mock mailer recorded email");
        match self.sent.lock() {
            Ok(mut sent) => sent.push(email),
            Err(poisoned) => poisoned.into_inner().push(email),
        }
        Ok(())
    }
}

/// MailerState
///
/// The concrete type used to share the mailer across the application state.
pub type MailerState = Arc<dyn Mailer>;
