//! Payment collaborator.
//!
//! The orchestrator only needs an opaque confirmation token for a charge.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("invalid payment amount {0}")]
    InvalidAmount(Decimal),

    #[error("unsupported currency '{0}'")]
    UnsupportedCurrency(String),

    #[error("payment declined: {0}")]
    Declined(String),
}

#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Charges `amount` in `currency` and returns the confirmation token.
    async fn process_payment(&self, amount: Decimal, currency: &str)
        -> Result<String, PaymentError>;
}

/// Accepts every well-formed charge without contacting a processor.
#[derive(Debug, Clone, Default)]
pub struct MockPaymentService;

impl MockPaymentService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentService for MockPaymentService {
    async fn process_payment(
        &self,
        amount: Decimal,
        currency: &str,
    ) -> Result<String, PaymentError> {
        if amount.is_sign_negative() {
            return Err(PaymentError::InvalidAmount(amount));
        }
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PaymentError::UnsupportedCurrency(currency.to_string()));
        }

        let payment_id = format!("mock-pay-{}", Uuid::new_v4().simple());
        tracing::debug!(%amount, currency, %payment_id, "mock payment accepted");
        Ok(payment_id)
    }
}
