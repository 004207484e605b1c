//! Payment gateway abstraction.
//!
//! Amounts cross this boundary in integer minor units.

use std::time::Duration;

use async_trait::async_trait;
use moneyvate_shared::types::Currency;
use thiserror::Error;

/// Errors reported by the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The gateway refused the operation.
    #[error("payment declined: {0}")]
    Declined(String),

    /// The gateway could not be reached.
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete in time.
    #[error("payment gateway call timed out after {0:?}")]
    Timeout(Duration),
}

impl GatewayError {
    /// Returns the error code for upward surfaces.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Declined(_) => "PAYMENT_DECLINED",
            Self::Unavailable(_) => "GATEWAY_UNAVAILABLE",
            Self::Timeout(_) => "GATEWAY_TIMEOUT",
        }
    }

    /// Returns true if retrying later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

/// Result of creating a charge for a new goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeIntent {
    /// Secret the client uses to confirm the charge.
    pub client_secret: String,
    /// Reference used later to refund against the charge.
    pub payment_reference: String,
}

/// Money movement collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Refunds `amount_minor_units` against `payment_reference`.
    async fn refund(&self, payment_reference: &str, amount_minor_units: i64) -> Result<(), GatewayError>;

    /// Creates a charge for a new goal.
    async fn create_charge(
        &self,
        amount_minor_units: i64,
        currency: Currency,
    ) -> Result<ChargeIntent, GatewayError>;
}

/// Gateway that is never reachable.
///
/// Used where no payment provider is configured; refunds end up
/// `refundFailed` and stay retryable.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableGateway;

#[async_trait]
impl PaymentGateway for UnavailableGateway {
    async fn refund(&self, _payment_reference: &str, _amount_minor_units: i64) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable("no payment provider configured".to_string()))
    }

    async fn create_charge(
        &self,
        _amount_minor_units: i64,
        _currency: Currency,
    ) -> Result<ChargeIntent, GatewayError> {
        Err(GatewayError::Unavailable("no payment provider configured".to_string()))
    }
}
