use crate::domain::errors::DomainError;
use crate::domain::money::Money;
use crate::domain::ports::PaymentGateway;

pub struct PaymentService<G> {
    gateway: G,
    currency: String,
    publishable_key: String,
}

impl<G: PaymentGateway> PaymentService<G> {
    pub fn new(gateway: G, currency: impl Into<String>, publishable_key: impl Into<String>) -> Self {
        Self {
            gateway,
            currency: currency.into(),
            publishable_key: publishable_key.into(),
        }
    }

    /// Create a payment intent and return its client secret.
    pub fn process(&self, amount: Money) -> Result<String, DomainError> {
        if amount.is_zero() {
            return Err(DomainError::invalid_field("amount", "amount must be greater than zero"));
        }
        let secret = self.gateway.create_payment_intent(&self.currency, amount)?;
        log::info!("payment intent created: amount={} {}", amount, self.currency);
        Ok(secret)
    }

    pub fn publishable_key(&self) -> &str {
        &self.publishable_key
    }
}
