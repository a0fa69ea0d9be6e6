//! `PayPal` Orders v2 client.
//!
//! Every call first exchanges the client credentials for a bearer token.
//! `PayPal` already reports statuses in the order vocabulary.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::debug;

use super::http::{build_client, format_major_units, parse_amount, payment_id, send_json};
use crate::config::PaypalConfig;
use crate::order::{
    domain::{Customer, OrderReference, OrderStatus, PaymentId, PaymentProviderKind},
    ports::{PaymentIntentRequest, PaymentProvider, ProviderPayment, ProviderResult},
};

/// Maps a `PayPal` order status onto [`OrderStatus`].
///
/// Unknown values map to [`OrderStatus::Failed`].
#[must_use]
pub fn normalize_status(native: &str) -> OrderStatus {
    OrderStatus::try_from(native).unwrap_or(OrderStatus::Failed)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct PaypalOrder {
    id: String,
    status: String,
    #[serde(default)]
    links: Vec<PaypalLink>,
    #[serde(default)]
    payer: Option<PaypalPayer>,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Deserialize)]
struct PaypalLink {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct PaypalPayer {
    email_address: Option<String>,
    payer_id: Option<String>,
    name: Option<PaypalName>,
}

#[derive(Debug, Deserialize)]
struct PaypalName {
    given_name: Option<String>,
    surname: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    reference_id: Option<String>,
    amount: Option<PaypalAmount>,
    payments: Option<PaypalPayments>,
}

#[derive(Debug, Deserialize)]
struct PaypalPayments {
    #[serde(default)]
    captures: Vec<PaypalCapture>,
}

#[derive(Debug, Deserialize)]
struct PaypalCapture {
    amount: Option<PaypalAmount>,
}

#[derive(Debug, Deserialize)]
struct PaypalAmount {
    value: String,
}

impl PaypalOrder {
    /// Returns the link the payer follows to approve the order.
    fn approval_url(&self) -> Option<String> {
        self.links
            .iter()
            .find(|link| link.rel == "approve" || link.rel == "payer-action")
            .map(|link| link.href.clone())
    }

    /// Returns the captured amount, falling back to the ordered amount.
    fn amount(&self) -> ProviderResult<Option<rust_decimal::Decimal>> {
        let unit = self.purchase_units.first();
        let captured = unit
            .and_then(|purchase| purchase.payments.as_ref())
            .and_then(|payments| payments.captures.first())
            .and_then(|capture| capture.amount.as_ref());
        let ordered = unit.and_then(|purchase| purchase.amount.as_ref());
        captured
            .or(ordered)
            .map(|amount| parse_amount(&amount.value))
            .transpose()
    }

    fn reference_id(&self) -> Option<&str> {
        self.purchase_units
            .first()
            .and_then(|purchase| purchase.reference_id.as_deref())
    }
}

/// Extracts payer details from an order body.
///
/// Returns `None` until the payer has logged in and approved.
pub(super) fn payer_from_order(order: &PaypalOrder) -> Option<Customer> {
    let payer = order.payer.as_ref()?;
    let mut customer = Customer::new();
    if let Some(email) = payer.email_address.as_deref() {
        customer = customer.with_email(email);
    }
    if let Some(id) = payer.payer_id.as_deref() {
        customer = customer.with_payer_id(id);
    }
    if let Some(name) = payer.name.as_ref() {
        let full_name = [name.given_name.as_deref(), name.surname.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        customer = customer.with_name(full_name);
    }
    customer.is_interaction_signal().then_some(customer)
}

/// Converts an order body into a normalized payment.
pub(super) fn payment_from_order(
    order: PaypalOrder,
    fallback_reference: &OrderReference,
) -> ProviderResult<ProviderPayment> {
    let order_reference = order
        .reference_id()
        .and_then(|reference| OrderReference::new(reference).ok())
        .unwrap_or_else(|| fallback_reference.clone());
    let amount = order.amount()?;
    let approval_url = order.approval_url();
    Ok(ProviderPayment {
        status: normalize_status(&order.status),
        id: payment_id(order.id)?,
        order_reference,
        amount,
        approval_url,
        client_secret: None,
    })
}

/// `PayPal` REST client.
#[derive(Clone)]
pub struct PaypalProvider {
    client: reqwest::Client,
    config: PaypalConfig,
}

impl PaypalProvider {
    /// Creates a `PayPal` client.
    ///
    /// # Errors
    ///
    /// Returns [`crate::order::ports::PaymentProviderError::Transport`] if the
    /// HTTP client fails to build.
    pub fn new(config: PaypalConfig) -> ProviderResult<Self> {
        Ok(Self {
            client: build_client()?,
            config,
        })
    }

    async fn access_token(&self) -> ProviderResult<String> {
        let request = self
            .client
            .post(format!("{}/v1/oauth2/token", self.config.api_base))
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.expose_secret()),
            )
            .form(&[("grant_type", "client_credentials")]);
        let token: TokenResponse = send_json(request).await?;
        Ok(token.access_token)
    }

    async fn fetch_order(&self, payment_id: &PaymentId) -> ProviderResult<PaypalOrder> {
        let token = self.access_token().await?;
        let request = self
            .client
            .get(format!(
                "{}/v2/checkout/orders/{payment_id}",
                self.config.api_base
            ))
            .bearer_auth(token);
        send_json(request).await
    }
}

#[async_trait]
impl PaymentProvider for PaypalProvider {
    fn kind(&self) -> PaymentProviderKind {
        PaymentProviderKind::Paypal
    }

    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> ProviderResult<ProviderPayment> {
        let token = self.access_token().await?;
        let currency = request.currency.as_str();
        let items: Vec<serde_json::Value> = request
            .items
            .iter()
            .map(|item| {
                serde_json::json!({
                    "name": item.name(),
                    "sku": item.product_id().as_str(),
                    "quantity": item.quantity().to_string(),
                    "unit_amount": {
                        "currency_code": currency,
                        "value": format_major_units(item.unit_price()),
                    },
                })
            })
            .collect();
        let total = format_major_units(request.total_amount);
        let body = serde_json::json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": request.order_reference.as_str(),
                "custom_id": request.order_reference.as_str(),
                "amount": {
                    "currency_code": currency,
                    "value": total,
                    "breakdown": {
                        "item_total": { "currency_code": currency, "value": total },
                    },
                },
                "items": items,
            }],
            "application_context": {
                "return_url": request.return_url,
                "cancel_url": request.cancel_url,
                "user_action": "PAY_NOW",
            },
        });

        let http_request = self
            .client
            .post(format!("{}/v2/checkout/orders", self.config.api_base))
            .bearer_auth(token)
            .header("PayPal-Request-Id", request.order_reference.as_str())
            .json(&body);
        let order: PaypalOrder = send_json(http_request).await?;
        debug!(payment_id = %order.id, status = %order.status, "paypal order created");
        payment_from_order(order, &request.order_reference)
    }

    async fn capture_payment(
        &self,
        payment_id: &PaymentId,
        order_reference: &OrderReference,
    ) -> ProviderResult<ProviderPayment> {
        let token = self.access_token().await?;
        let request = self
            .client
            .post(format!(
                "{}/v2/checkout/orders/{payment_id}/capture",
                self.config.api_base
            ))
            .bearer_auth(token)
            .header("PayPal-Request-Id", format!("capture-{order_reference}"))
            .json(&serde_json::json!({}));
        let order: PaypalOrder = send_json(request).await?;
        payment_from_order(order, order_reference)
    }

    async fn get_payment_status(&self, payment_id: &PaymentId) -> ProviderResult<OrderStatus> {
        let order = self.fetch_order(payment_id).await?;
        Ok(normalize_status(&order.status))
    }

    async fn get_payer(&self, payment_id: &PaymentId) -> ProviderResult<Option<Customer>> {
        let order = self.fetch_order(payment_id).await?;
        Ok(payer_from_order(&order))
    }
}

impl std::fmt::Debug for PaypalProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaypalProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
