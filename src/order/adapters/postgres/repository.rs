//! `PostgreSQL` repository implementation for durable order storage.

use super::{
    models::{NewOrderRow, OrderChangeset, OrderRow},
    schema::orders,
};
use crate::order::{
    domain::{
        Cancellation, FulfillmentStatus, Order, OrderId, OrderReference, OrderStatus,
        PaymentId, PaymentProviderKind, PersistedOrderData, ReminderKind, ReminderLog,
    },
    ports::{OrderRepository, OrderRepositoryError, OrderRepositoryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use rust_decimal::Decimal;
use std::str::FromStr;

/// `PostgreSQL` connection pool type used by order adapters.
pub type OrderPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed order repository.
#[derive(Debug, Clone)]
pub struct PostgresOrderRepository {
    pool: OrderPgPool,
}

impl PostgresOrderRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: OrderPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> OrderRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> OrderRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(OrderRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(OrderRepositoryError::persistence)?
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn store(&self, order: &Order) -> OrderRepositoryResult<()> {
        let payment_id = order.payment_id().clone();
        let order_reference = order.order_reference().clone();
        let new_row = to_new_row(order)?;

        self.run_blocking(move |connection| {
            diesel::insert_into(orders::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                        if is_reference_unique_violation(info.as_ref()) =>
                    {
                        OrderRepositoryError::DuplicateReference(order_reference.clone())
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        OrderRepositoryError::DuplicatePaymentId(payment_id.clone())
                    }
                    _ => OrderRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(
        &self,
        order: &Order,
        expected_status: OrderStatus,
    ) -> OrderRepositoryResult<()> {
        let order_id = order.id().into_inner();
        let payment_id = order.payment_id().clone();
        let changeset = to_changeset(order)?;

        self.run_blocking(move |connection| {
            let updated = diesel::update(
                orders::table
                    .filter(orders::id.eq(order_id))
                    .filter(orders::status.eq(expected_status.as_str())),
            )
            .set(&changeset)
            .execute(connection)
            .map_err(OrderRepositoryError::persistence)?;

            if updated > 0 {
                return Ok(());
            }

            let stored_status = orders::table
                .filter(orders::id.eq(order_id))
                .select(orders::status)
                .first::<String>(connection)
                .optional()
                .map_err(OrderRepositoryError::persistence)?;
            match stored_status {
                None => Err(OrderRepositoryError::NotFound(payment_id)),
                Some(actual) => Err(OrderRepositoryError::StatusConflict {
                    payment_id,
                    expected: expected_status,
                    actual: OrderStatus::try_from(actual.as_str())
                        .map_err(OrderRepositoryError::persistence)?,
                }),
            }
        })
        .await
    }

    async fn find_by_payment_id(
        &self,
        payment_id: &PaymentId,
    ) -> OrderRepositoryResult<Option<Order>> {
        let lookup = payment_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = find_row_by_payment_id(connection, &lookup)?;
            row.map(row_to_order).transpose()
        })
        .await
    }

    async fn find_by_reference(
        &self,
        order_reference: &OrderReference,
    ) -> OrderRepositoryResult<Option<Order>> {
        let lookup = order_reference.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = orders::table
                .filter(orders::order_reference.eq(lookup))
                .select(OrderRow::as_select())
                .first::<OrderRow>(connection)
                .optional()
                .map_err(OrderRepositoryError::persistence)?;
            row.map(row_to_order).transpose()
        })
        .await
    }

    async fn find_abandoned(&self, cutoff: DateTime<Utc>) -> OrderRepositoryResult<Vec<Order>> {
        self.run_blocking(move |connection| {
            let rows = orders::table
                .filter(orders::status.eq(OrderStatus::PayerActionRequired.as_str()))
                .filter(orders::followup_reminder_sent_at.lt(cutoff))
                .order(orders::followup_reminder_sent_at.asc())
                .select(OrderRow::as_select())
                .load::<OrderRow>(connection)
                .map_err(OrderRepositoryError::persistence)?;
            rows.into_iter().map(row_to_order).collect()
        })
        .await
    }

    async fn record_reminder_sent(
        &self,
        payment_id: &PaymentId,
        kind: ReminderKind,
        sent_at: DateTime<Utc>,
    ) -> OrderRepositoryResult<bool> {
        let lookup = payment_id.clone();
        self.run_blocking(move |connection| {
            let Some(row) = find_row_by_payment_id(connection, lookup.as_str())? else {
                return Err(OrderRepositoryError::NotFound(lookup));
            };
            let target = orders::table.filter(orders::id.eq(row.id));
            let updated = match kind {
                ReminderKind::Initial => {
                    diesel::update(target.filter(orders::initial_reminder_sent_at.is_null()))
                        .set(orders::initial_reminder_sent_at.eq(Some(sent_at)))
                        .execute(connection)
                }
                ReminderKind::Followup => {
                    diesel::update(target.filter(orders::followup_reminder_sent_at.is_null()))
                        .set(orders::followup_reminder_sent_at.eq(Some(sent_at)))
                        .execute(connection)
                }
            }
            .map_err(OrderRepositoryError::persistence)?;
            Ok(updated > 0)
        })
        .await
    }
}

fn find_row_by_payment_id(
    connection: &mut PgConnection,
    payment_id: &str,
) -> OrderRepositoryResult<Option<OrderRow>> {
    orders::table
        .filter(
            orders::paypal_order_id
                .eq(payment_id)
                .or(orders::stripe_payment_intent_id.eq(payment_id))
                .or(orders::mollie_payment_id.eq(payment_id)),
        )
        .select(OrderRow::as_select())
        .first::<OrderRow>(connection)
        .optional()
        .map_err(OrderRepositoryError::persistence)
}

fn is_reference_unique_violation(info: &dyn DatabaseErrorInformation) -> bool {
    info.constraint_name()
        .is_some_and(|name| name == "idx_orders_order_reference_unique")
}

/// Provider-specific payment id columns; exactly one is set.
#[derive(Debug, Default, PartialEq, Eq)]
struct PaymentIdColumns {
    paypal_order_id: Option<String>,
    stripe_payment_intent_id: Option<String>,
    mollie_payment_id: Option<String>,
}

fn payment_id_columns(provider: PaymentProviderKind, payment_id: &PaymentId) -> PaymentIdColumns {
    let value = Some(payment_id.as_str().to_owned());
    match provider {
        PaymentProviderKind::Paypal => PaymentIdColumns {
            paypal_order_id: value,
            ..PaymentIdColumns::default()
        },
        PaymentProviderKind::Stripe => PaymentIdColumns {
            stripe_payment_intent_id: value,
            ..PaymentIdColumns::default()
        },
        PaymentProviderKind::Mollie => PaymentIdColumns {
            mollie_payment_id: value,
            ..PaymentIdColumns::default()
        },
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> OrderRepositoryResult<serde_json::Value> {
    serde_json::to_value(value).map_err(OrderRepositoryError::persistence)
}

fn to_optional_json<T: serde::Serialize>(
    value: Option<&T>,
) -> OrderRepositoryResult<Option<serde_json::Value>> {
    value.map(to_json).transpose()
}

fn from_json<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> OrderRepositoryResult<T> {
    serde_json::from_value(value).map_err(OrderRepositoryError::persistence)
}

fn to_new_row(order: &Order) -> OrderRepositoryResult<NewOrderRow> {
    let PaymentIdColumns {
        paypal_order_id,
        stripe_payment_intent_id,
        mollie_payment_id,
    } = payment_id_columns(order.provider(), order.payment_id());
    let reminders = order.reminders();
    let cancellation = order.cancellation();

    Ok(NewOrderRow {
        id: order.id().into_inner(),
        order_reference: order.order_reference().as_str().to_owned(),
        provider: order.provider().as_str().to_owned(),
        paypal_order_id,
        stripe_payment_intent_id,
        mollie_payment_id,
        status: order.status().as_str().to_owned(),
        fulfillment_status: order.fulfillment_status().as_str().to_owned(),
        items: to_json(&order.items())?,
        total_amount: order.total_amount().to_string(),
        currency: order.currency().to_owned(),
        measurements: to_optional_json(order.measurements())?,
        delivery_details: to_optional_json(order.delivery_details())?,
        customer: to_json(order.customer())?,
        is_paid: order.is_paid(),
        paid_at: order.paid_at(),
        payment_attempts: to_json(&order.payment_attempts())?,
        status_email_sent: order.status_email_sent(),
        initial_reminder_sent_at: reminders.initial_sent_at,
        followup_reminder_sent_at: reminders.followup_sent_at,
        cancellation_reason: cancellation.map(|details| details.reason.clone()),
        cancelled_at: cancellation.map(|details| details.cancelled_at),
        created_at: order.created_at(),
        updated_at: order.updated_at(),
    })
}

fn to_changeset(order: &Order) -> OrderRepositoryResult<OrderChangeset> {
    let cancellation = order.cancellation();
    Ok(OrderChangeset {
        status: order.status().as_str().to_owned(),
        fulfillment_status: order.fulfillment_status().as_str().to_owned(),
        customer: to_json(order.customer())?,
        measurements: to_optional_json(order.measurements())?,
        delivery_details: to_optional_json(order.delivery_details())?,
        is_paid: order.is_paid(),
        paid_at: order.paid_at(),
        payment_attempts: to_json(&order.payment_attempts())?,
        status_email_sent: order.status_email_sent(),
        cancellation_reason: cancellation.map(|details| details.reason.clone()),
        cancelled_at: cancellation.map(|details| details.cancelled_at),
        updated_at: order.updated_at(),
    })
}

fn row_to_order(row: OrderRow) -> OrderRepositoryResult<Order> {
    let OrderRow {
        id,
        order_reference,
        provider: persisted_provider,
        paypal_order_id,
        stripe_payment_intent_id,
        mollie_payment_id,
        status: persisted_status,
        fulfillment_status: persisted_fulfillment,
        items,
        total_amount,
        currency,
        measurements,
        delivery_details,
        customer,
        is_paid,
        paid_at,
        payment_attempts,
        status_email_sent,
        initial_reminder_sent_at,
        followup_reminder_sent_at,
        cancellation_reason,
        cancelled_at,
        created_at,
        updated_at,
    } = row;

    let provider = PaymentProviderKind::try_from(persisted_provider.as_str())
        .map_err(OrderRepositoryError::persistence)?;
    let raw_payment_id = match provider {
        PaymentProviderKind::Paypal => paypal_order_id,
        PaymentProviderKind::Stripe => stripe_payment_intent_id,
        PaymentProviderKind::Mollie => mollie_payment_id,
    }
    .unwrap_or_default();
    let payment_id = PaymentId::new(raw_payment_id).map_err(OrderRepositoryError::persistence)?;
    let status = OrderStatus::try_from(persisted_status.as_str())
        .map_err(OrderRepositoryError::persistence)?;
    let fulfillment_status = FulfillmentStatus::try_from(persisted_fulfillment.as_str())
        .map_err(OrderRepositoryError::persistence)?;
    let total_amount =
        Decimal::from_str(&total_amount).map_err(OrderRepositoryError::persistence)?;
    let cancellation = match (cancellation_reason, cancelled_at) {
        (Some(reason), Some(at)) => Some(Cancellation {
            reason,
            cancelled_at: at,
        }),
        _ => None,
    };

    let data = PersistedOrderData {
        id: OrderId::from_uuid(id),
        order_reference: OrderReference::new(order_reference)
            .map_err(OrderRepositoryError::persistence)?,
        provider,
        payment_id,
        status,
        fulfillment_status,
        items: from_json(items)?,
        total_amount,
        currency,
        measurements: measurements.map(from_json).transpose()?,
        delivery_details: delivery_details.map(from_json).transpose()?,
        customer: from_json(customer)?,
        is_paid,
        paid_at,
        payment_attempts: from_json(payment_attempts)?,
        status_email_sent,
        reminders: ReminderLog {
            initial_sent_at: initial_reminder_sent_at,
            followup_sent_at: followup_reminder_sent_at,
        },
        cancellation,
        created_at,
        updated_at,
    };
    Ok(Order::from_persisted(data))
}
