//! Behaviour tests for the order payment lifecycle and reminder delivery.

#[path = "order_lifecycle_steps/mod.rs"]
mod order_lifecycle_steps_defs;

use order_lifecycle_steps_defs::world::{OrderLifecycleWorld, world};
use rstest_bdd_macros::scenario;

#[scenario(
    path = "tests/features/order_lifecycle.feature",
    name = "Payer interaction persists the order and schedules reminders"
)]
#[tokio::test(flavor = "multi_thread")]
async fn interaction_persists_and_schedules(world: OrderLifecycleWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/order_lifecycle.feature",
    name = "Capturing a paid order never reaches the provider"
)]
#[tokio::test(flavor = "multi_thread")]
async fn paid_order_capture_is_refused(world: OrderLifecycleWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/order_lifecycle.feature",
    name = "Admin cancellation withdraws pending reminders"
)]
#[tokio::test(flavor = "multi_thread")]
async fn admin_cancellation_withdraws_reminders(world: OrderLifecycleWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/order_lifecycle.feature",
    name = "A due reminder for a completed order is withdrawn"
)]
#[tokio::test(flavor = "multi_thread")]
async fn completed_order_reminder_is_withdrawn(world: OrderLifecycleWorld) {
    let _ = world;
}
