//! HTTP plumbing shared by the provider clients.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::de::DeserializeOwned;

use crate::order::{
    domain::PaymentId,
    ports::{PaymentProviderError, ProviderResult},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Builds the HTTP client used for provider calls.
pub(super) fn build_client() -> ProviderResult<reqwest::Client> {
    reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(PaymentProviderError::transport)
}

/// Sends a request and decodes a JSON success body.
///
/// Non-2xx answers become [`PaymentProviderError::Api`] carrying the body.
pub(super) async fn send_json<T>(request: reqwest::RequestBuilder) -> ProviderResult<T>
where
    T: DeserializeOwned,
{
    let response = request
        .send()
        .await
        .map_err(PaymentProviderError::transport)?;
    let status = response.status();

    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(PaymentProviderError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|err| PaymentProviderError::MalformedResponse(err.to_string()))
}

/// Formats an amount with exactly two decimals, as `PayPal` and Mollie expect.
pub(super) fn format_major_units(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

/// Converts an amount to integer minor units, as Stripe expects.
pub(super) fn to_minor_units(amount: Decimal) -> ProviderResult<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| {
            PaymentProviderError::MalformedResponse(format!("amount {amount} out of range"))
        })
}

/// Converts integer minor units back to a decimal amount.
pub(super) fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// Parses a decimal amount string from a provider body.
pub(super) fn parse_amount(value: &str) -> ProviderResult<Decimal> {
    Decimal::from_str(value).map_err(|err| {
        PaymentProviderError::MalformedResponse(format!("invalid amount '{value}': {err}"))
    })
}

/// Validates a provider-assigned identifier.
pub(super) fn payment_id(raw: String) -> ProviderResult<PaymentId> {
    PaymentId::new(raw).map_err(|err| PaymentProviderError::MalformedResponse(err.to_string()))
}
