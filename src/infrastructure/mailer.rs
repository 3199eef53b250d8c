use std::collections::BTreeMap;

use reqwest::blocking::Client;

use crate::domain::errors::DomainError;
use crate::domain::ports::{MailMessage, Mailer, PASSWORD_RESET_TEMPLATE};

const DEFAULT_BASE_URL: &str = "https://api.mailgun.net";

/// Rendered bodies of a message.
#[derive(Debug, PartialEq)]
pub struct Rendered {
    pub text: String,
    pub html: String,
}

fn field<'a>(data: &'a BTreeMap<String, String>, key: &str) -> Result<&'a str, DomainError> {
    data.get(key)
        .map(String::as_str)
        .ok_or_else(|| DomainError::Internal(format!("mail template data is missing '{key}'")))
}

pub fn render(template: &str, data: &BTreeMap<String, String>) -> Result<Rendered, DomainError> {
    match template {
        PASSWORD_RESET_TEMPLATE => {
            let link = field(data, "link")?;
            let minutes = field(data, "expiresInMinutes")?;
            Ok(Rendered {
                text: format!(
                    "Hello,\n\n\
                     You requested a password reset. Follow the link below to choose a new password:\n\n\
                     {link}\n\n\
                     The link expires in {minutes} minutes. If you did not ask for this, ignore this email.\n"
                ),
                html: format!(
                    "<p>Hello,</p>\
                     <p>You requested a password reset. Follow the link below to choose a new password:</p>\
                     <p><a href=\"{link}\">Reset your password</a></p>\
                     <p>The link expires in {minutes} minutes. If you did not ask for this, ignore this email.</p>"
                ),
            })
        }
        other => Err(DomainError::Internal(format!("unknown mail template '{other}'"))),
    }
}

#[derive(Debug, Clone)]
pub struct MailgunCredentials {
    pub domain: String,
    pub api_key: String,
}

pub struct MailgunMailer {
    client: Client,
    credentials: MailgunCredentials,
    base_url: String,
}

impl MailgunMailer {
    pub fn new(credentials: MailgunCredentials) -> Self {
        Self {
            client: Client::new(),
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Mailer for MailgunMailer {
    fn send(&self, message: &MailMessage) -> Result<(), DomainError> {
        let body = render(&message.template, &message.data)?;
        let form = [
            ("from", message.from.as_str()),
            ("to", message.to.as_str()),
            ("subject", message.subject.as_str()),
            ("text", body.text.as_str()),
            ("html", body.html.as_str()),
        ];

        let response = self
            .client
            .post(format!(
                "{}/v3/{}/messages",
                self.base_url, self.credentials.domain
            ))
            .basic_auth("api", Some(&self.credentials.api_key))
            .form(&form)
            .send()?;

        if !response.status().is_success() {
            return Err(DomainError::Upstream(format!(
                "mailgun: {}",
                response.status()
            )));
        }
        log::info!("sent '{}' mail to {}", message.template, message.to);
        Ok(())
    }
}

/// Writes messages to the log instead of delivering them.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: &MailMessage) -> Result<(), DomainError> {
        let body = render(&message.template, &message.data)?;
        log::info!(
            "mail delivery disabled; to={} subject={:?}\n{}",
            message.to,
            message.subject,
            body.text
        );
        Ok(())
    }
}
