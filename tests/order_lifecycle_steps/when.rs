//! When steps for order lifecycle BDD scenarios.

use super::world::{OrderLifecycleWorld, run_async};
use chrono::Duration;
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when("the payer interaction is checked")]
fn check_interaction(world: &mut OrderLifecycleWorld) -> Result<(), eyre::Report> {
    world.check_interaction()
}

#[when("the payment is captured again")]
fn capture_again(world: &mut OrderLifecycleWorld) -> Result<(), eyre::Report> {
    let payment_id = world.payment_id()?.clone();
    let reference = world.order_reference()?.clone();
    world.last_result = Some(run_async(world.service.capture(&payment_id, &reference)));
    Ok(())
}

#[when(r#"an admin cancels the order with reason "{reason}""#)]
fn admin_cancels(world: &mut OrderLifecycleWorld, reason: String) -> Result<(), eyre::Report> {
    let payment_id = world.payment_id()?.clone();
    world.last_result = Some(run_async(world.service.cancel(&payment_id, reason)));
    Ok(())
}

#[when("{minutes:i64} minutes pass and the reminder scheduler runs")]
fn scheduler_runs(world: &mut OrderLifecycleWorld, minutes: i64) -> Result<(), eyre::Report> {
    world.clock.advance(Duration::minutes(minutes));
    run_async(world.service.reminders().run_due()).wrap_err("run due reminders")?;
    Ok(())
}
