//! Given steps for order lifecycle BDD scenarios.

use super::world::{OrderLifecycleWorld, run_async};
use atelier::order::{
    domain::{CartLineInput, Customer, OrderReference, OrderStatus, PaymentProviderKind},
    ports::OrderRepository,
    services::CreateIntentRequest,
};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use rust_decimal::Decimal;

#[given(
    r#"a PayPal checkout for {quantity:i64} of "{product}" at {price:i64} under reference "{reference}""#
)]
fn paypal_checkout(
    world: &mut OrderLifecycleWorld,
    quantity: i64,
    product: String,
    price: i64,
    reference: String,
) -> Result<(), eyre::Report> {
    let line = CartLineInput::new(
        product.as_str(),
        format!("Product {product}"),
        Decimal::new(price, 0),
        quantity,
    );
    let request = CreateIntentRequest::new(PaymentProviderKind::Paypal, vec![line])
        .with_order_reference(reference.as_str());
    let payment = run_async(world.service.create_intent(request))
        .wrap_err("create payment intent for scenario")?;

    world.payment_id = Some(payment.id);
    world.order_reference = Some(OrderReference::new(reference)?);
    Ok(())
}

#[given(r#"the payer "{email}" has engaged with the checkout"#)]
fn payer_engaged(world: &mut OrderLifecycleWorld, email: String) -> Result<(), eyre::Report> {
    let payer = Customer::new()
        .with_email(email)
        .with_name("Ada Lovelace")
        .with_payer_id("PAYER-1");
    world
        .provider
        .set_payer(world.payment_id()?, payer)
        .wrap_err("attach payer to provider payment")
}

#[given("the payer interaction has been checked")]
fn interaction_checked(world: &mut OrderLifecycleWorld) -> Result<(), eyre::Report> {
    world.check_interaction()
}

#[given("the payment has been captured")]
fn payment_captured(world: &mut OrderLifecycleWorld) -> Result<(), eyre::Report> {
    let payment_id = world.payment_id()?.clone();
    let reference = world.order_reference()?.clone();
    run_async(world.service.capture(&payment_id, &reference)).wrap_err("capture payment")?;
    Ok(())
}

#[given("the order was completed by another process")]
fn completed_elsewhere(world: &mut OrderLifecycleWorld) -> Result<(), eyre::Report> {
    let mut order = world.stored_order()?;
    let expected = order.status();
    order.transition_to(OrderStatus::Completed, &*world.clock)?;
    run_async(world.orders.update(&order, expected)).wrap_err("write completed order")?;
    Ok(())
}
