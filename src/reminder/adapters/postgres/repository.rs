//! `PostgreSQL` repository implementation for reminder tasks.

use super::{
    models::{NewReminderTaskRow, ReminderTaskRow},
    schema::reminder_tasks,
};
use crate::order::adapters::postgres::OrderPgPool;
use crate::order::domain::PaymentId;
use crate::reminder::{
    domain::{
        PersistedReminderTaskData, ReminderTask, ReminderTaskId, ReminderTaskStatus,
        ReminderTaskType,
    },
    ports::{ReminderTaskRepository, ReminderTaskRepositoryError, ReminderTaskRepositoryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

const PENDING: &str = ReminderTaskStatus::Pending.as_str();

/// `PostgreSQL`-backed reminder task repository.
///
/// Shares the connection pool type used by the order repository.
#[derive(Debug, Clone)]
pub struct PostgresReminderTaskRepository {
    pool: OrderPgPool,
}

impl PostgresReminderTaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: OrderPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> ReminderTaskRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> ReminderTaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(ReminderTaskRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(ReminderTaskRepositoryError::persistence)?
    }
}

#[async_trait]
impl ReminderTaskRepository for PostgresReminderTaskRepository {
    async fn insert(&self, task: &ReminderTask) -> ReminderTaskRepositoryResult<()> {
        let payment_id = task.order_payment_id().clone();
        let task_type = task.task_type();
        let new_row = to_row(task)?;

        self.run_blocking(move |connection| {
            // The partial unique index on pending tasks is the only other
            // unique constraint besides the primary key.
            diesel::insert_into(reminder_tasks::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        ReminderTaskRepositoryError::DuplicatePending {
                            payment_id: payment_id.clone(),
                            task_type,
                        }
                    }
                    _ => ReminderTaskRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_by_order(
        &self,
        payment_id: &PaymentId,
    ) -> ReminderTaskRepositoryResult<Vec<ReminderTask>> {
        let lookup = payment_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let rows = reminder_tasks::table
                .filter(reminder_tasks::order_payment_id.eq(lookup))
                .order((
                    reminder_tasks::scheduled_for.asc(),
                    reminder_tasks::created_at.asc(),
                ))
                .select(ReminderTaskRow::as_select())
                .load::<ReminderTaskRow>(connection)
                .map_err(ReminderTaskRepositoryError::persistence)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn find_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> ReminderTaskRepositoryResult<Vec<ReminderTask>> {
        let row_limit = i64::try_from(limit).map_err(ReminderTaskRepositoryError::persistence)?;
        self.run_blocking(move |connection| {
            let rows = reminder_tasks::table
                .filter(reminder_tasks::status.eq(PENDING))
                .filter(reminder_tasks::scheduled_for.le(now))
                .filter(
                    reminder_tasks::lease_expires_at
                        .is_null()
                        .or(reminder_tasks::lease_expires_at.le(now)),
                )
                .order((
                    reminder_tasks::scheduled_for.asc(),
                    reminder_tasks::created_at.asc(),
                ))
                .limit(row_limit)
                .select(ReminderTaskRow::as_select())
                .load::<ReminderTaskRow>(connection)
                .map_err(ReminderTaskRepositoryError::persistence)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn try_claim(
        &self,
        id: ReminderTaskId,
        now: DateTime<Utc>,
        lease_expires_at: DateTime<Utc>,
    ) -> ReminderTaskRepositoryResult<Option<ReminderTask>> {
        self.run_blocking(move |connection| {
            let row = diesel::update(
                reminder_tasks::table
                    .filter(reminder_tasks::id.eq(id.into_inner()))
                    .filter(reminder_tasks::status.eq(PENDING))
                    .filter(
                        reminder_tasks::lease_expires_at
                            .is_null()
                            .or(reminder_tasks::lease_expires_at.le(now)),
                    ),
            )
            .set((
                reminder_tasks::lease_expires_at.eq(Some(lease_expires_at)),
                reminder_tasks::updated_at.eq(now),
            ))
            .returning(ReminderTaskRow::as_returning())
            .get_result::<ReminderTaskRow>(connection)
            .optional()
            .map_err(ReminderTaskRepositoryError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn update_claimed(
        &self,
        task: &ReminderTask,
        lease_expires_at: DateTime<Utc>,
    ) -> ReminderTaskRepositoryResult<bool> {
        let task_id = task.id();
        let row = to_row(task)?;
        self.run_blocking(move |connection| {
            let updated = diesel::update(
                reminder_tasks::table
                    .filter(reminder_tasks::id.eq(task_id.into_inner()))
                    .filter(reminder_tasks::status.eq(PENDING))
                    .filter(reminder_tasks::lease_expires_at.eq(Some(lease_expires_at))),
            )
            .set(&row)
            .execute(connection)
            .map_err(ReminderTaskRepositoryError::persistence)?;
            if updated > 0 {
                return Ok(true);
            }
            let exists = diesel::select(diesel::dsl::exists(
                reminder_tasks::table.filter(reminder_tasks::id.eq(task_id.into_inner())),
            ))
            .get_result::<bool>(connection)
            .map_err(ReminderTaskRepositoryError::persistence)?;
            if exists {
                Ok(false)
            } else {
                Err(ReminderTaskRepositoryError::NotFound(task_id))
            }
        })
        .await
    }

    async fn cancel_pending_for_order(
        &self,
        payment_id: &PaymentId,
        now: DateTime<Utc>,
    ) -> ReminderTaskRepositoryResult<usize> {
        let lookup = payment_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            diesel::update(
                reminder_tasks::table
                    .filter(reminder_tasks::order_payment_id.eq(lookup))
                    .filter(reminder_tasks::status.eq(PENDING)),
            )
            .set((
                reminder_tasks::status.eq(ReminderTaskStatus::Cancelled.as_str()),
                reminder_tasks::lease_expires_at.eq(None::<DateTime<Utc>>),
                reminder_tasks::updated_at.eq(now),
            ))
            .execute(connection)
            .map_err(ReminderTaskRepositoryError::persistence)
        })
        .await
    }
}

fn to_row(task: &ReminderTask) -> ReminderTaskRepositoryResult<NewReminderTaskRow> {
    Ok(NewReminderTaskRow {
        id: task.id().into_inner(),
        order_payment_id: task.order_payment_id().as_str().to_owned(),
        task_type: task.task_type().as_str().to_owned(),
        scheduled_for: task.scheduled_for(),
        status: task.status().as_str().to_owned(),
        executed_at: task.executed_at(),
        error: task.error().map(str::to_owned),
        attempts: i32::try_from(task.attempts())
            .map_err(ReminderTaskRepositoryError::persistence)?,
        lease_expires_at: task.lease_expires_at(),
        created_at: task.created_at(),
        updated_at: task.updated_at(),
    })
}

fn row_to_task(row: ReminderTaskRow) -> ReminderTaskRepositoryResult<ReminderTask> {
    let ReminderTaskRow {
        id,
        order_payment_id,
        task_type: persisted_type,
        scheduled_for,
        status: persisted_status,
        executed_at,
        error,
        attempts,
        lease_expires_at,
        created_at,
        updated_at,
    } = row;

    let data = PersistedReminderTaskData {
        id: ReminderTaskId::from_uuid(id),
        order_payment_id: PaymentId::new(order_payment_id)
            .map_err(ReminderTaskRepositoryError::persistence)?,
        task_type: ReminderTaskType::try_from(persisted_type.as_str())
            .map_err(ReminderTaskRepositoryError::persistence)?,
        scheduled_for,
        status: ReminderTaskStatus::try_from(persisted_status.as_str())
            .map_err(ReminderTaskRepositoryError::persistence)?,
        executed_at,
        error,
        attempts: u32::try_from(attempts).map_err(ReminderTaskRepositoryError::persistence)?,
        lease_expires_at,
        created_at,
        updated_at,
    };
    Ok(ReminderTask::from_persisted(data))
}
