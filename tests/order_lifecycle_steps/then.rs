//! Then steps for order lifecycle BDD scenarios.

use std::str::FromStr;

use super::world::OrderLifecycleWorld;
use atelier::order::{domain::OrderStatus, services::OrderLifecycleError};
use atelier::reminder::domain::{ReminderTask, ReminderTaskStatus, ReminderTaskType};
use chrono::Duration;
use rstest_bdd_macros::then;
use rust_decimal::Decimal;

fn task_of_type(
    world: &OrderLifecycleWorld,
    task_type: &str,
) -> Result<ReminderTask, eyre::Report> {
    let expected_type = ReminderTaskType::try_from(task_type)
        .map_err(|err| eyre::eyre!("invalid task type in scenario: {err}"))?;
    world
        .reminder_tasks()?
        .into_iter()
        .find(|task| task.task_type() == expected_type)
        .ok_or_else(|| eyre::eyre!("no {task_type} task was scheduled"))
}

#[then(r#"the order status is "{status}""#)]
fn order_status_is(world: &OrderLifecycleWorld, status: String) -> Result<(), eyre::Report> {
    let expected = OrderStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let order = world.stored_order()?;

    if order.status() != expected {
        return Err(eyre::eyre!(
            "expected status {expected}, found {}",
            order.status()
        ));
    }
    Ok(())
}

#[then(r#"the order total is "{total}""#)]
fn order_total_is(world: &OrderLifecycleWorld, total: String) -> Result<(), eyre::Report> {
    let expected = Decimal::from_str(&total)?;
    let order = world.stored_order()?;

    if order.total_amount() != expected {
        return Err(eyre::eyre!(
            "expected total {expected}, found {}",
            order.total_amount()
        ));
    }
    Ok(())
}

#[then(r#"the "{task_type}" task is due {minutes:i64} minutes after persistence"#)]
fn task_due_after_persistence(
    world: &OrderLifecycleWorld,
    task_type: String,
    minutes: i64,
) -> Result<(), eyre::Report> {
    let persisted_at = world
        .persisted_at
        .ok_or_else(|| eyre::eyre!("order was never persisted in this scenario"))?;
    let task = task_of_type(world, &task_type)?;
    let expected = persisted_at + Duration::minutes(minutes);

    if task.status() != ReminderTaskStatus::Pending || task.scheduled_for() != expected {
        return Err(eyre::eyre!(
            "expected pending {task_type} due at {expected}, found {} due at {}",
            task.status().as_str(),
            task.scheduled_for()
        ));
    }
    Ok(())
}

#[then("the operation fails because the order is already paid")]
fn fails_already_paid(world: &OrderLifecycleWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing operation result"))?;

    if !matches!(result, Err(OrderLifecycleError::AlreadyPaid(_))) {
        return Err(eyre::eyre!("expected AlreadyPaid error, got {result:?}"));
    }
    Ok(())
}

#[then("the provider capture call count is {count:usize}")]
fn provider_capture_calls(world: &OrderLifecycleWorld, count: usize) -> Result<(), eyre::Report> {
    let calls = world.provider.capture_calls();
    if calls != count {
        return Err(eyre::eyre!("expected {count} capture calls, found {calls}"));
    }
    Ok(())
}

#[then("the order payment attempt count is {count:usize}")]
fn payment_attempt_count(world: &OrderLifecycleWorld, count: usize) -> Result<(), eyre::Report> {
    let attempts = world.stored_order()?.payment_attempts().len();
    if attempts != count {
        return Err(eyre::eyre!(
            "expected {count} payment attempts, found {attempts}"
        ));
    }
    Ok(())
}

#[then(r#"the count of "{status}" reminder tasks is {count:usize}"#)]
fn reminder_task_count(
    world: &OrderLifecycleWorld,
    status: String,
    count: usize,
) -> Result<(), eyre::Report> {
    let expected_status = ReminderTaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid task status in scenario: {err}"))?;
    let matching = world
        .reminder_tasks()?
        .iter()
        .filter(|task| task.status() == expected_status)
        .count();

    if matching != count {
        return Err(eyre::eyre!(
            "expected {count} {status} reminder tasks, found {matching}"
        ));
    }
    Ok(())
}

#[then("the status notification count is {count:usize}")]
fn status_notification_count(
    world: &OrderLifecycleWorld,
    count: usize,
) -> Result<(), eyre::Report> {
    let sent = world
        .notifications
        .status_notifications_for(world.payment_id()?)
        .len();
    if sent != count {
        return Err(eyre::eyre!(
            "expected {count} status notifications, found {sent}"
        ));
    }
    Ok(())
}

#[then(r#"the "{task_type}" task is "{status}" with error "{error}""#)]
fn task_finished_with_error(
    world: &OrderLifecycleWorld,
    task_type: String,
    status: String,
    error: String,
) -> Result<(), eyre::Report> {
    let expected_status = ReminderTaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid task status in scenario: {err}"))?;
    let task = task_of_type(world, &task_type)?;

    if task.status() != expected_status || task.error() != Some(error.as_str()) {
        return Err(eyre::eyre!(
            "expected {task_type} {status} with error {error:?}, found {} with {:?}",
            task.status().as_str(),
            task.error()
        ));
    }
    Ok(())
}

#[then("no reminder was sent")]
fn no_reminder_sent(world: &OrderLifecycleWorld) -> Result<(), eyre::Report> {
    let reminders = world.notifications.reminders_for(world.payment_id()?);
    if !reminders.is_empty() {
        return Err(eyre::eyre!("expected no reminders, found {reminders:?}"));
    }
    Ok(())
}
