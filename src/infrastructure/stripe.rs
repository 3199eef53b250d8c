//! Stripe payment intents over the REST API.

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::domain::errors::DomainError;
use crate::domain::money::Money;
use crate::domain::ports::PaymentGateway;

const DEFAULT_BASE_URL: &str = "https://api.stripe.com";

pub struct StripeGateway {
    client: Client,
    secret_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct PaymentIntent {
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            secret_key: secret_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Customer-facing wording for a Stripe card error code.
pub fn card_error_message(code: &str) -> &'static str {
    match code {
        "card_declined" => "Your card was declined",
        "expired_card" => "Your card is expired",
        "incorrect_cvc" => "Incorrect CVC code",
        "incorrect_zip" => "Incorrect zip/postal code",
        "amount_too_large" => "The amount is too large to charge to your card",
        "amount_too_small" => "The amount is too small to charge to your card",
        "balance_insufficient" => "Insufficient balance",
        "postal_code_invalid" => "Your postal code is invalid",
        _ => "Your card was declined",
    }
}

fn classify(error: StripeError) -> DomainError {
    match error.kind.as_deref() {
        Some("card_error") => DomainError::PaymentDeclined(
            card_error_message(error.code.as_deref().unwrap_or_default()).to_string(),
        ),
        _ => match error.code.as_deref() {
            Some(code @ ("amount_too_large" | "amount_too_small")) => {
                DomainError::PaymentDeclined(card_error_message(code).to_string())
            }
            _ => DomainError::Upstream(format!(
                "stripe: {}",
                error.message.unwrap_or_else(|| "request failed".to_string())
            )),
        },
    }
}

impl PaymentGateway for StripeGateway {
    fn create_payment_intent(&self, currency: &str, amount: Money) -> Result<String, DomainError> {
        let params = [
            ("amount", amount.minor_units().to_string()),
            ("currency", currency.to_string()),
            (
                "metadata[integration_check]",
                "accept_a_payment".to_string(),
            ),
        ];

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&params)
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(match response.json::<ErrorBody>() {
                Ok(body) => classify(body.error),
                Err(_) => DomainError::Upstream(format!("stripe: {status}")),
            });
        }

        let intent: PaymentIntent = response.json()?;
        Ok(intent.client_secret)
    }
}

/// Stand-in used when no Stripe secret is configured.
pub struct DisabledPaymentGateway;

impl PaymentGateway for DisabledPaymentGateway {
    fn create_payment_intent(&self, _currency: &str, _amount: Money) -> Result<String, DomainError> {
        Err(DomainError::Upstream(
            "payment gateway is not configured".to_string(),
        ))
    }
}
