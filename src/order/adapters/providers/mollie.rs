//! Mollie Payments v2 client.
//!
//! Payments are opened with manual capture. Capturing an `authorized`
//! payment issues an explicit capture; any other status is reported as-is
//! after a fresh fetch.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::http::{build_client, format_major_units, parse_amount, payment_id, send_json};
use crate::config::MollieConfig;
use crate::order::{
    domain::{Customer, OrderReference, OrderStatus, PaymentId, PaymentProviderKind},
    ports::{PaymentIntentRequest, PaymentProvider, ProviderPayment, ProviderResult},
};

const ORDER_REFERENCE_METADATA_KEY: &str = "order_reference";

/// Maps a Mollie payment status onto [`OrderStatus`].
#[must_use]
pub fn normalize_status(native: &str) -> OrderStatus {
    match native {
        "paid" => OrderStatus::Completed,
        "authorized" | "pending" => OrderStatus::Approved,
        "open" => OrderStatus::Created,
        "canceled" | "expired" => OrderStatus::Voided,
        _ => OrderStatus::Failed,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MolliePayment {
    id: String,
    status: String,
    amount: Option<MollieAmount>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
    customer_id: Option<String>,
    details: Option<MollieDetails>,
    #[serde(rename = "_links", default)]
    links: Option<MollieLinks>,
}

#[derive(Debug, Deserialize)]
struct MollieAmount {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MollieDetails {
    consumer_name: Option<String>,
    consumer_account: Option<String>,
    card_holder: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MollieLinks {
    checkout: Option<MollieLink>,
}

#[derive(Debug, Deserialize)]
struct MollieLink {
    href: String,
}

/// Extracts payer details from a payment body.
///
/// Mollie exposes no payer email on payments; the consumer account or
/// customer id proves interaction.
pub(super) fn payer_from_payment(payment: &MolliePayment) -> Option<Customer> {
    let details = payment.details.as_ref();
    let mut customer = Customer::new();
    if let Some(name) = details.and_then(|found| {
        found
            .consumer_name
            .as_deref()
            .or(found.card_holder.as_deref())
    }) {
        customer = customer.with_name(name);
    }
    if let Some(account) = details
        .and_then(|found| found.consumer_account.as_deref())
        .or(payment.customer_id.as_deref())
    {
        customer = customer.with_payer_id(account);
    }
    customer.is_interaction_signal().then_some(customer)
}

/// Converts a payment body into a normalized payment.
pub(super) fn payment_from_body(
    payment: MolliePayment,
    fallback_reference: &OrderReference,
) -> ProviderResult<ProviderPayment> {
    let order_reference = payment
        .metadata
        .as_ref()
        .and_then(|metadata| metadata.get(ORDER_REFERENCE_METADATA_KEY))
        .and_then(|reference| OrderReference::new(reference.as_str()).ok())
        .unwrap_or_else(|| fallback_reference.clone());
    let amount = payment
        .amount
        .as_ref()
        .map(|amount| parse_amount(&amount.value))
        .transpose()?;
    let approval_url = payment
        .links
        .as_ref()
        .and_then(|links| links.checkout.as_ref())
        .map(|link| link.href.clone());
    Ok(ProviderPayment {
        status: normalize_status(&payment.status),
        id: payment_id(payment.id)?,
        order_reference,
        amount,
        approval_url,
        client_secret: None,
    })
}

/// Mollie REST client.
#[derive(Clone)]
pub struct MollieProvider {
    client: reqwest::Client,
    config: MollieConfig,
}

impl MollieProvider {
    /// Creates a Mollie client.
    ///
    /// # Errors
    ///
    /// Returns [`crate::order::ports::PaymentProviderError::Transport`] if the
    /// HTTP client fails to build.
    pub fn new(config: MollieConfig) -> ProviderResult<Self> {
        Ok(Self {
            client: build_client()?,
            config,
        })
    }

    fn payment_url(&self, payment_id: &PaymentId) -> String {
        format!("{}/payments/{payment_id}", self.config.api_base)
    }

    async fn fetch_payment(&self, payment_id: &PaymentId) -> ProviderResult<MolliePayment> {
        let request = self
            .client
            .get(self.payment_url(payment_id))
            .bearer_auth(self.config.api_key.expose_secret());
        send_json(request).await
    }
}

#[async_trait]
impl PaymentProvider for MollieProvider {
    fn kind(&self) -> PaymentProviderKind {
        PaymentProviderKind::Mollie
    }

    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> ProviderResult<ProviderPayment> {
        let body = serde_json::json!({
            "amount": {
                "currency": request.currency,
                "value": format_major_units(request.total_amount),
            },
            "description": format!("Order {}", request.order_reference),
            "redirectUrl": request.return_url,
            "cancelUrl": request.cancel_url,
            "captureMode": "manual",
            "metadata": { "order_reference": request.order_reference.as_str() },
        });

        let http_request = self
            .client
            .post(format!("{}/payments", self.config.api_base))
            .bearer_auth(self.config.api_key.expose_secret())
            .header("Idempotency-Key", request.order_reference.as_str())
            .json(&body);
        let payment: MolliePayment = send_json(http_request).await?;
        debug!(payment_id = %payment.id, status = %payment.status, "mollie payment created");
        payment_from_body(payment, &request.order_reference)
    }

    async fn capture_payment(
        &self,
        payment_id: &PaymentId,
        order_reference: &OrderReference,
    ) -> ProviderResult<ProviderPayment> {
        let current = self.fetch_payment(payment_id).await?;
        if current.status != "authorized" {
            return payment_from_body(current, order_reference);
        }

        let request = self
            .client
            .post(format!("{}/captures", self.payment_url(payment_id)))
            .bearer_auth(self.config.api_key.expose_secret())
            .header("Idempotency-Key", format!("capture-{order_reference}"))
            .json(&serde_json::json!({}));
        let _capture: serde_json::Value = send_json(request).await?;

        let captured = self.fetch_payment(payment_id).await?;
        payment_from_body(captured, order_reference)
    }

    async fn get_payment_status(&self, payment_id: &PaymentId) -> ProviderResult<OrderStatus> {
        let payment = self.fetch_payment(payment_id).await?;
        Ok(normalize_status(&payment.status))
    }

    async fn get_payer(&self, payment_id: &PaymentId) -> ProviderResult<Option<Customer>> {
        let payment = self.fetch_payment(payment_id).await?;
        Ok(payer_from_payment(&payment))
    }
}

impl std::fmt::Debug for MollieProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MollieProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
