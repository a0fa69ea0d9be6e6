//! Tests for provider status normalization and response mapping.

use super::{mollie, paypal, stripe};
use crate::order::domain::{OrderReference, OrderStatus};
use rstest::{fixture, rstest};
use rust_decimal::Decimal;

#[fixture]
fn fallback_reference() -> OrderReference {
    OrderReference::new("ref-fallback").expect("valid reference")
}

#[rstest]
#[case("CREATED", OrderStatus::Created)]
#[case("APPROVED", OrderStatus::Approved)]
#[case("VOIDED", OrderStatus::Voided)]
#[case("COMPLETED", OrderStatus::Completed)]
#[case("SAVED", OrderStatus::Saved)]
#[case("PAYER_ACTION_REQUIRED", OrderStatus::PayerActionRequired)]
#[case("SOMETHING_NEW", OrderStatus::Failed)]
#[case("", OrderStatus::Failed)]
fn paypal_status_passes_through_known_values(#[case] native: &str, #[case] expected: OrderStatus) {
    assert_eq!(paypal::normalize_status(native), expected);
}

#[rstest]
#[case("succeeded", OrderStatus::Completed)]
#[case("processing", OrderStatus::Approved)]
#[case("requires_capture", OrderStatus::Approved)]
#[case("requires_action", OrderStatus::PayerActionRequired)]
#[case("requires_payment_method", OrderStatus::Created)]
#[case("requires_confirmation", OrderStatus::Created)]
#[case("canceled", OrderStatus::Voided)]
#[case("mystery", OrderStatus::Failed)]
fn stripe_status_maps_onto_order_vocabulary(#[case] native: &str, #[case] expected: OrderStatus) {
    assert_eq!(stripe::normalize_status(native), expected);
}

#[rstest]
#[case("paid", OrderStatus::Completed)]
#[case("authorized", OrderStatus::Approved)]
#[case("pending", OrderStatus::Approved)]
#[case("open", OrderStatus::Created)]
#[case("canceled", OrderStatus::Voided)]
#[case("expired", OrderStatus::Voided)]
#[case("failed", OrderStatus::Failed)]
#[case("unheard-of", OrderStatus::Failed)]
fn mollie_status_maps_onto_order_vocabulary(#[case] native: &str, #[case] expected: OrderStatus) {
    assert_eq!(mollie::normalize_status(native), expected);
}

#[rstest]
fn paypal_order_without_payer_is_not_an_interaction() {
    let body = serde_json::json!({ "id": "5O190127TN364715T", "status": "CREATED" });
    let order: paypal::PaypalOrder = serde_json::from_value(body).expect("valid order body");

    assert!(paypal::payer_from_order(&order).is_none());
}

#[rstest]
fn paypal_payer_details_become_customer() {
    let body = serde_json::json!({
        "id": "5O190127TN364715T",
        "status": "APPROVED",
        "payer": {
            "email_address": "buyer@example.com",
            "payer_id": "QYR5Z8XDVJNXQ",
            "name": { "given_name": "Ada", "surname": "Lovelace" }
        }
    });
    let order: paypal::PaypalOrder = serde_json::from_value(body).expect("valid order body");

    let customer = paypal::payer_from_order(&order).expect("payer should be present");

    assert_eq!(customer.email(), Some("buyer@example.com"));
    assert_eq!(customer.payer_id(), Some("QYR5Z8XDVJNXQ"));
    assert_eq!(customer.name(), Some("Ada Lovelace"));
}

#[rstest]
fn paypal_capture_body_reports_captured_amount(fallback_reference: OrderReference) {
    let body = serde_json::json!({
        "id": "5O190127TN364715T",
        "status": "COMPLETED",
        "purchase_units": [{
            "reference_id": "ref-42",
            "amount": { "currency_code": "EUR", "value": "99.00" },
            "payments": { "captures": [{ "amount": { "currency_code": "EUR", "value": "98.50" } }] }
        }]
    });
    let order: paypal::PaypalOrder = serde_json::from_value(body).expect("valid order body");

    let payment =
        paypal::payment_from_order(order, &fallback_reference).expect("payment should map");

    assert_eq!(payment.status, OrderStatus::Completed);
    assert_eq!(payment.order_reference.as_str(), "ref-42");
    assert_eq!(payment.amount, Some(Decimal::new(9850, 2)));
}

#[rstest]
fn paypal_created_body_exposes_approval_link(fallback_reference: OrderReference) {
    let body = serde_json::json!({
        "id": "5O190127TN364715T",
        "status": "CREATED",
        "links": [
            { "href": "https://api.paypal.test/self", "rel": "self" },
            { "href": "https://www.paypal.test/approve", "rel": "approve" }
        ]
    });
    let order: paypal::PaypalOrder = serde_json::from_value(body).expect("valid order body");

    let payment =
        paypal::payment_from_order(order, &fallback_reference).expect("payment should map");

    assert_eq!(
        payment.approval_url.as_deref(),
        Some("https://www.paypal.test/approve")
    );
    assert_eq!(payment.order_reference, fallback_reference);
}

#[rstest]
fn stripe_intent_maps_minor_units_and_metadata(fallback_reference: OrderReference) {
    let body = serde_json::json!({
        "id": "pi_123",
        "status": "requires_capture",
        "amount": 12345,
        "amount_received": 0,
        "client_secret": "pi_123_secret_abc",
        "metadata": { "order_reference": "ref-stripe" }
    });
    let intent: stripe::StripePaymentIntent =
        serde_json::from_value(body).expect("valid intent body");

    let payment =
        stripe::payment_from_intent(intent, &fallback_reference).expect("payment should map");

    assert_eq!(payment.status, OrderStatus::Approved);
    assert_eq!(payment.amount, Some(Decimal::new(12345, 2)));
    assert_eq!(payment.order_reference.as_str(), "ref-stripe");
    assert_eq!(payment.client_secret.as_deref(), Some("pi_123_secret_abc"));
}

#[rstest]
fn stripe_unexpanded_charge_without_customer_is_not_an_interaction() {
    let body = serde_json::json!({
        "id": "pi_123",
        "status": "requires_payment_method",
        "latest_charge": "ch_1"
    });
    let intent: stripe::StripePaymentIntent =
        serde_json::from_value(body).expect("valid intent body");

    assert!(stripe::payer_from_intent(&intent).is_none());
}

#[rstest]
fn stripe_billing_details_become_customer() {
    let body = serde_json::json!({
        "id": "pi_123",
        "status": "requires_capture",
        "latest_charge": {
            "billing_details": { "email": "payer@example.com", "name": "Grace Hopper" }
        }
    });
    let intent: stripe::StripePaymentIntent =
        serde_json::from_value(body).expect("valid intent body");

    let customer = stripe::payer_from_intent(&intent).expect("payer should be present");

    assert_eq!(customer.email(), Some("payer@example.com"));
    assert_eq!(customer.name(), Some("Grace Hopper"));
}

#[rstest]
fn mollie_payment_maps_checkout_link_and_amount(fallback_reference: OrderReference) {
    let body = serde_json::json!({
        "id": "tr_WDqYK6vllg",
        "status": "open",
        "amount": { "currency": "EUR", "value": "10.00" },
        "metadata": { "order_reference": "ref-mollie" },
        "_links": { "checkout": { "href": "https://www.mollie.test/checkout/select-method/WDqYK6vllg" } }
    });
    let payment_body: mollie::MolliePayment =
        serde_json::from_value(body).expect("valid payment body");

    let payment =
        mollie::payment_from_body(payment_body, &fallback_reference).expect("payment should map");

    assert_eq!(payment.status, OrderStatus::Created);
    assert_eq!(payment.amount, Some(Decimal::new(1000, 2)));
    assert_eq!(payment.order_reference.as_str(), "ref-mollie");
    assert!(payment.approval_url.is_some());
}

#[rstest]
fn mollie_consumer_details_become_customer() {
    let body = serde_json::json!({
        "id": "tr_WDqYK6vllg",
        "status": "paid",
        "details": { "consumerName": "T. TEST", "consumerAccount": "NL53INGB0618365937" }
    });
    let payment_body: mollie::MolliePayment =
        serde_json::from_value(body).expect("valid payment body");

    let customer = mollie::payer_from_payment(&payment_body).expect("payer should be present");

    assert_eq!(customer.name(), Some("T. TEST"));
    assert_eq!(customer.payer_id(), Some("NL53INGB0618365937"));
    assert!(customer.email().is_none());
}
