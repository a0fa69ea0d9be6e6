//! In-memory reminder task repository for tests and single-process use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::order::domain::PaymentId;
use crate::reminder::{
    domain::{ReminderTask, ReminderTaskId},
    ports::{ReminderTaskRepository, ReminderTaskRepositoryError, ReminderTaskRepositoryResult},
};

/// Thread-safe in-memory reminder task repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReminderTaskRepository {
    tasks: Arc<RwLock<HashMap<ReminderTaskId, ReminderTask>>>,
}

impl InMemoryReminderTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: &dyn std::fmt::Display) -> ReminderTaskRepositoryError {
    ReminderTaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

fn sorted_by_due(mut tasks: Vec<ReminderTask>) -> Vec<ReminderTask> {
    tasks.sort_by_key(|task| (task.scheduled_for(), task.created_at()));
    tasks
}

#[async_trait]
impl ReminderTaskRepository for InMemoryReminderTaskRepository {
    async fn insert(&self, task: &ReminderTask) -> ReminderTaskRepositoryResult<()> {
        let mut tasks = self.tasks.write().map_err(|err| lock_error(&err))?;
        if task.is_pending() {
            let duplicate = tasks.values().any(|existing| {
                existing.is_pending()
                    && existing.order_payment_id() == task.order_payment_id()
                    && existing.task_type() == task.task_type()
            });
            if duplicate {
                return Err(ReminderTaskRepositoryError::DuplicatePending {
                    payment_id: task.order_payment_id().clone(),
                    task_type: task.task_type(),
                });
            }
        }
        tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn find_by_order(
        &self,
        payment_id: &PaymentId,
    ) -> ReminderTaskRepositoryResult<Vec<ReminderTask>> {
        let tasks = self.tasks.read().map_err(|err| lock_error(&err))?;
        let matching = tasks
            .values()
            .filter(|task| task.order_payment_id() == payment_id)
            .cloned()
            .collect();
        Ok(sorted_by_due(matching))
    }

    async fn find_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> ReminderTaskRepositoryResult<Vec<ReminderTask>> {
        let tasks = self.tasks.read().map_err(|err| lock_error(&err))?;
        let due = tasks
            .values()
            .filter(|task| task.is_claimable(now))
            .cloned()
            .collect();
        Ok(sorted_by_due(due).into_iter().take(limit).collect())
    }

    async fn try_claim(
        &self,
        id: ReminderTaskId,
        now: DateTime<Utc>,
        lease_expires_at: DateTime<Utc>,
    ) -> ReminderTaskRepositoryResult<Option<ReminderTask>> {
        let mut tasks = self.tasks.write().map_err(|err| lock_error(&err))?;
        let Some(task) = tasks.get_mut(&id) else {
            return Ok(None);
        };
        if !task.is_pending() || task.is_leased(now) {
            return Ok(None);
        }
        task.claim(lease_expires_at, now)
            .map_err(ReminderTaskRepositoryError::persistence)?;
        Ok(Some(task.clone()))
    }

    async fn update_claimed(
        &self,
        task: &ReminderTask,
        lease_expires_at: DateTime<Utc>,
    ) -> ReminderTaskRepositoryResult<bool> {
        let mut tasks = self.tasks.write().map_err(|err| lock_error(&err))?;
        let Some(stored) = tasks.get_mut(&task.id()) else {
            return Err(ReminderTaskRepositoryError::NotFound(task.id()));
        };
        if !stored.is_pending() || stored.lease_expires_at() != Some(lease_expires_at) {
            return Ok(false);
        }
        stored.clone_from(task);
        Ok(true)
    }

    async fn cancel_pending_for_order(
        &self,
        payment_id: &PaymentId,
        now: DateTime<Utc>,
    ) -> ReminderTaskRepositoryResult<usize> {
        let mut tasks = self.tasks.write().map_err(|err| lock_error(&err))?;
        let mut count = 0;
        for task in tasks.values_mut() {
            if task.is_pending() && task.order_payment_id() == payment_id {
                task.cancel(None, now)
                    .map_err(ReminderTaskRepositoryError::persistence)?;
                count += 1;
            }
        }
        Ok(count)
    }
}
