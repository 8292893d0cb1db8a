//! Transactional email via the Brevo REST API.
//!
//! Used once: mailing a freshly generated password to a new user. Delivery
//! is best-effort; the caller decides whether a failure aborts anything.

use serde::Serialize;
use std::time::Duration;

const BREVO_ENDPOINT: &str = "https://api.brevo.com/v3/smtp/email";
const SENDER_NAME: &str = "Relato";
const SENDER_EMAIL: &str = "no-reply@relato.app";
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("BREVO_API_KEY is not set")]
    MissingApiKey,

    #[error("email request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    sender: Party<'a>,
    to: Vec<Party<'a>>,
    subject: &'a str,
    #[serde(rename = "htmlContent")]
    html_content: String,
    #[serde(rename = "textContent")]
    text_content: &'a str,
}

#[derive(Serialize)]
struct Party<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    email: &'a str,
}

/// Mail the generated password to a newly created user.
pub async fn send_credentials(name: &str, email: &str, password: &str) -> Result<(), EmailError> {
    let api_key = std::env::var("BREVO_API_KEY").map_err(|_| EmailError::MissingApiKey)?;

    let body = SendEmailRequest {
        sender: Party {
            name: Some(SENDER_NAME),
            email: SENDER_EMAIL,
        },
        to: vec![Party { name: None, email }],
        subject: "Your Relato access credentials",
        html_content: format!(
            "<h1>Hello, {name}!</h1>\
             <p>Here are your credentials for Relato:</p>\
             <p>Email: <strong>{email}</strong></p>\
             <p>Password: <strong>{password}</strong></p>"
        ),
        text_content: "Relato access credentials",
    };

    let client = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;
    let response = client
        .post(BREVO_ENDPOINT)
        .header("accept", "application/json")
        .header("api-key", api_key)
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(EmailError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    tracing::info!("credential email sent to {email}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_uses_brevo_field_names() {
        let body = SendEmailRequest {
            sender: Party {
                name: Some(SENDER_NAME),
                email: SENDER_EMAIL,
            },
            to: vec![Party {
                name: None,
                email: "ana@example.pt",
            }],
            subject: "s",
            html_content: "<p>x</p>".to_string(),
            text_content: "x",
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"htmlContent\""));
        assert!(json.contains("\"textContent\""));
        assert!(json.contains("\"ana@example.pt\""));
        // Recipient entries omit the name field entirely when unset.
        assert!(!json.contains("\"name\":null"));
    }
}
