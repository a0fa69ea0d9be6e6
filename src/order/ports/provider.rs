//! Payment provider port.
//!
//! Each provider adapter speaks its own HTTP API and normalizes native
//! statuses into [`OrderStatus`]. The orchestrator only sees this trait.

use crate::order::domain::{
    CartItem, Customer, OrderReference, OrderStatus, PaymentId, PaymentProviderKind,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, PaymentProviderError>;

/// Data a provider needs to open a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentRequest {
    /// Client idempotency key, forwarded to providers that support one.
    pub order_reference: OrderReference,
    /// Cart lines being paid for.
    pub items: Vec<CartItem>,
    /// Amount to charge.
    pub total_amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Where the provider sends the payer after approval.
    pub return_url: Option<String>,
    /// Where the provider sends the payer after aborting.
    pub cancel_url: Option<String>,
}

/// Normalized provider answer for a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPayment {
    /// Provider-assigned payment identifier.
    pub id: PaymentId,
    /// Normalized status.
    pub status: OrderStatus,
    /// Order reference the payment belongs to.
    pub order_reference: OrderReference,
    /// Amount reported by the provider, if any.
    pub amount: Option<Decimal>,
    /// Link the payer follows to approve the payment, if any.
    pub approval_url: Option<String>,
    /// Secret handed to a browser SDK to confirm the payment, if any.
    pub client_secret: Option<String>,
}

/// A payment service provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Returns which provider this adapter talks to.
    fn kind(&self) -> PaymentProviderKind;

    /// Opens a provider-side payment.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentProviderError`] when the provider rejects the call or
    /// answers with an unreadable body.
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> ProviderResult<ProviderPayment>;

    /// Captures funds for an approved payment.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentProviderError`] when the provider rejects the call or
    /// answers with an unreadable body.
    async fn capture_payment(
        &self,
        payment_id: &PaymentId,
        order_reference: &OrderReference,
    ) -> ProviderResult<ProviderPayment>;

    /// Returns the normalized current status of a payment.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentProviderError`] when the provider rejects the call or
    /// answers with an unreadable body.
    async fn get_payment_status(&self, payment_id: &PaymentId) -> ProviderResult<OrderStatus>;

    /// Returns payer details when the payer has engaged with the payment.
    ///
    /// `None` means no interaction is visible yet.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentProviderError`] when the provider rejects the call or
    /// answers with an unreadable body.
    async fn get_payer(&self, payment_id: &PaymentId) -> ProviderResult<Option<Customer>>;
}

/// Errors returned by payment provider adapters.
#[derive(Debug, Clone, Error)]
pub enum PaymentProviderError {
    /// The provider answered with a non-success status.
    #[error("provider API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or provider error message.
        message: String,
    },

    /// The provider answered with a body that could not be interpreted.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// No adapter is configured for the provider.
    #[error("payment provider not configured: {0}")]
    Unsupported(PaymentProviderKind),

    /// Network or TLS failure.
    #[error("provider transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl PaymentProviderError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
