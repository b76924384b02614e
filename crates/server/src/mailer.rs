//! Mail relay client for invitation and settlement notifications.
//!
//! Delivery is best-effort: the relay is invoked after the engine operation
//! commits, and failures never roll back or fail the triggering request.

use serde::Serialize;

#[derive(Serialize)]
struct MailPayload<'a> {
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Posts `{to, subject, text}` to a configured relay endpoint, or drops the
/// message when no relay is configured.
#[derive(Debug)]
pub enum Mailer {
    Relay { client: reqwest::Client, url: String },
    Noop,
}

impl Mailer {
    pub fn relay(url: impl Into<String>) -> Self {
        Self::Relay {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn noop() -> Self {
        Self::Noop
    }

    pub async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), String> {
        match self {
            Self::Relay { client, url } => {
                let response = client
                    .post(url)
                    .json(&MailPayload { to, subject, text })
                    .send()
                    .await
                    .map_err(|err| err.to_string())?;
                if !response.status().is_success() {
                    return Err(format!("relay returned {}", response.status()));
                }
                Ok(())
            }
            Self::Noop => {
                tracing::debug!(to, subject, "mail relay not configured, dropping message");
                Ok(())
            }
        }
    }
}
