//! Stripe Payment Intents client.
//!
//! Intents are created with manual capture so that funds move only when the
//! orchestrator captures. Requests are form-encoded and carry the order
//! reference as `Idempotency-Key`.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::http::{build_client, from_minor_units, payment_id, send_json, to_minor_units};
use crate::config::StripeConfig;
use crate::order::{
    domain::{Customer, OrderReference, OrderStatus, PaymentId, PaymentProviderKind},
    ports::{PaymentIntentRequest, PaymentProvider, ProviderPayment, ProviderResult},
};

const ORDER_REFERENCE_METADATA_KEY: &str = "order_reference";

/// Maps a Stripe payment intent status onto [`OrderStatus`].
#[must_use]
pub fn normalize_status(native: &str) -> OrderStatus {
    match native {
        "succeeded" => OrderStatus::Completed,
        "processing" | "requires_capture" => OrderStatus::Approved,
        "requires_action" => OrderStatus::PayerActionRequired,
        "requires_payment_method" | "requires_confirmation" => OrderStatus::Created,
        "canceled" => OrderStatus::Voided,
        _ => OrderStatus::Failed,
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct StripePaymentIntent {
    id: String,
    status: String,
    amount: Option<i64>,
    amount_received: Option<i64>,
    client_secret: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    receipt_email: Option<String>,
    customer: Option<String>,
    latest_charge: Option<LatestCharge>,
}

/// `latest_charge` is an id unless the request expands it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LatestCharge {
    Expanded(Box<StripeCharge>),
    Id(String),
}

#[derive(Debug, Deserialize)]
struct StripeCharge {
    billing_details: Option<BillingDetails>,
}

#[derive(Debug, Deserialize)]
struct BillingDetails {
    email: Option<String>,
    name: Option<String>,
}

impl StripePaymentIntent {
    fn billing_details(&self) -> Option<&BillingDetails> {
        match self.latest_charge.as_ref()? {
            LatestCharge::Expanded(charge) => charge.billing_details.as_ref(),
            LatestCharge::Id(_) => None,
        }
    }
}

/// Extracts payer details from an intent with an expanded latest charge.
pub(super) fn payer_from_intent(intent: &StripePaymentIntent) -> Option<Customer> {
    let billing = intent.billing_details();
    let mut customer = Customer::new();
    if let Some(email) = billing
        .and_then(|details| details.email.as_deref())
        .or(intent.receipt_email.as_deref())
    {
        customer = customer.with_email(email);
    }
    if let Some(name) = billing.and_then(|details| details.name.as_deref()) {
        customer = customer.with_name(name);
    }
    if let Some(id) = intent.customer.as_deref() {
        customer = customer.with_payer_id(id);
    }
    customer.is_interaction_signal().then_some(customer)
}

/// Converts an intent body into a normalized payment.
pub(super) fn payment_from_intent(
    intent: StripePaymentIntent,
    fallback_reference: &OrderReference,
) -> ProviderResult<ProviderPayment> {
    let order_reference = intent
        .metadata
        .get(ORDER_REFERENCE_METADATA_KEY)
        .and_then(|reference| OrderReference::new(reference.as_str()).ok())
        .unwrap_or_else(|| fallback_reference.clone());
    let amount = intent
        .amount_received
        .filter(|received| *received > 0)
        .or(intent.amount)
        .map(from_minor_units);
    Ok(ProviderPayment {
        status: normalize_status(&intent.status),
        id: payment_id(intent.id)?,
        order_reference,
        amount,
        approval_url: None,
        client_secret: intent.client_secret,
    })
}

/// Stripe REST client.
#[derive(Clone)]
pub struct StripeProvider {
    client: reqwest::Client,
    config: StripeConfig,
}

impl StripeProvider {
    /// Creates a Stripe client.
    ///
    /// # Errors
    ///
    /// Returns [`crate::order::ports::PaymentProviderError::Transport`] if the
    /// HTTP client fails to build.
    pub fn new(config: StripeConfig) -> ProviderResult<Self> {
        Ok(Self {
            client: build_client()?,
            config,
        })
    }

    fn intent_url(&self, payment_id: &PaymentId) -> String {
        format!("{}/v1/payment_intents/{payment_id}", self.config.api_base)
    }

    async fn fetch_intent(
        &self,
        payment_id: &PaymentId,
        expand_charge: bool,
    ) -> ProviderResult<StripePaymentIntent> {
        let mut request = self
            .client
            .get(self.intent_url(payment_id))
            .bearer_auth(self.config.secret_key.expose_secret());
        if expand_charge {
            request = request.query(&[("expand[]", "latest_charge")]);
        }
        send_json(request).await
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn kind(&self) -> PaymentProviderKind {
        PaymentProviderKind::Stripe
    }

    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> ProviderResult<ProviderPayment> {
        let amount = to_minor_units(request.total_amount)?.to_string();
        let currency = request.currency.to_ascii_lowercase();
        let metadata_key = format!("metadata[{ORDER_REFERENCE_METADATA_KEY}]");
        let form = [
            ("amount", amount.as_str()),
            ("currency", currency.as_str()),
            ("capture_method", "manual"),
            ("automatic_payment_methods[enabled]", "true"),
            (metadata_key.as_str(), request.order_reference.as_str()),
        ];

        let http_request = self
            .client
            .post(format!("{}/v1/payment_intents", self.config.api_base))
            .bearer_auth(self.config.secret_key.expose_secret())
            .header("Idempotency-Key", request.order_reference.as_str())
            .form(&form);
        let intent: StripePaymentIntent = send_json(http_request).await?;
        debug!(payment_id = %intent.id, status = %intent.status, "stripe intent created");
        payment_from_intent(intent, &request.order_reference)
    }

    async fn capture_payment(
        &self,
        payment_id: &PaymentId,
        order_reference: &OrderReference,
    ) -> ProviderResult<ProviderPayment> {
        let request = self
            .client
            .post(format!("{}/capture", self.intent_url(payment_id)))
            .bearer_auth(self.config.secret_key.expose_secret())
            .header("Idempotency-Key", format!("capture-{order_reference}"));
        let intent: StripePaymentIntent = send_json(request).await?;
        payment_from_intent(intent, order_reference)
    }

    async fn get_payment_status(&self, payment_id: &PaymentId) -> ProviderResult<OrderStatus> {
        let intent = self.fetch_intent(payment_id, false).await?;
        Ok(normalize_status(&intent.status))
    }

    async fn get_payer(&self, payment_id: &PaymentId) -> ProviderResult<Option<Customer>> {
        let intent = self.fetch_intent(payment_id, true).await?;
        Ok(payer_from_intent(&intent))
    }
}

impl std::fmt::Debug for StripeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
