//! Scheduling and delivery of abandoned-checkout reminders.
//!
//! [`ReminderScheduler::schedule`] enqueues an initial and a follow-up task
//! for an order awaiting the payer. A polling loop (or an explicit call to
//! [`ReminderScheduler::run_due`]) claims due tasks with a lease, re-checks
//! the order, and delivers the reminder through the notification gateway.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::order::{
    domain::{Order, OrderStatus, PaymentId},
    ports::{NotificationGateway, OrderRepository, OrderRepositoryError},
};
use crate::reminder::{
    domain::{ReminderDomainError, ReminderTask, ReminderTaskType},
    ports::{ReminderTaskRepository, ReminderTaskRepositoryError},
};

/// Timing and delivery settings for reminders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderSettings {
    /// Delay before the initial reminder.
    pub initial_delay: Duration,
    /// Delay before the follow-up reminder.
    pub followup_delay: Duration,
    /// Period of the polling loop.
    pub poll_interval: StdDuration,
    /// Maximum tasks handled per tick.
    pub batch_size: usize,
    /// How long a claimed task stays invisible to other workers.
    pub lease_duration: Duration,
    /// Failed deliveries after which a task is cancelled; `None` retries
    /// forever.
    pub max_attempts: Option<u32>,
    /// Base URL the order reference is appended to in reminder links.
    pub order_url_base: String,
    /// Whether scheduling starts the polling loop when it is not running.
    pub auto_start: bool,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            initial_delay: Duration::minutes(1),
            followup_delay: Duration::hours(24),
            poll_interval: StdDuration::from_secs(60),
            batch_size: 50,
            lease_duration: Duration::minutes(5),
            max_attempts: Some(10),
            order_url_base: "http://localhost:3000/orders".to_owned(),
            auto_start: true,
        }
    }
}

impl ReminderSettings {
    /// Builds the link sent with a reminder for `order`.
    #[must_use]
    pub fn order_url(&self, order: &Order) -> String {
        format!(
            "{}/{}",
            self.order_url_base.trim_end_matches('/'),
            order.order_reference()
        )
    }
}

/// Why scheduling did not create tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No durable order exists for the payment.
    OrderNotFound,
    /// The order no longer awaits the payer.
    NotAwaitingPayer(OrderStatus),
}

/// Result of [`ReminderScheduler::schedule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Tasks were created; reminders already delivered are left out.
    Scheduled(Vec<ReminderTask>),
    /// Nothing was scheduled.
    Skipped(SkipReason),
}

/// Counters for one polling tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tasks claimed by this worker.
    pub claimed: usize,
    /// Reminders delivered.
    pub completed: usize,
    /// Tasks withdrawn after re-validation or the retry limit.
    pub cancelled: usize,
    /// Deliveries that failed and stay pending.
    pub failed: usize,
    /// Tasks left alone because another worker won the claim, an earlier
    /// task of the same order failed, or the task was cancelled while it ran.
    pub skipped: usize,
}

/// Service-level errors for reminder scheduling.
#[derive(Debug, Error)]
pub enum ReminderSchedulerError {
    /// Order lookup or marker update failed.
    #[error(transparent)]
    Orders(#[from] OrderRepositoryError),
    /// Task storage failed.
    #[error(transparent)]
    Tasks(#[from] ReminderTaskRepositoryError),
    /// A finished task was mutated.
    #[error(transparent)]
    Domain(#[from] ReminderDomainError),
}

/// Result type for reminder scheduler operations.
pub type ReminderSchedulerResult<T> = Result<T, ReminderSchedulerError>;

enum TaskOutcome {
    Completed,
    Cancelled,
    Failed,
    Superseded,
}

struct PollingLoop {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Reminder scheduling service.
pub struct ReminderScheduler<R, T, N, C>
where
    R: OrderRepository,
    T: ReminderTaskRepository,
    N: NotificationGateway,
    C: Clock + Send + Sync,
{
    orders: Arc<R>,
    tasks: Arc<T>,
    notifications: Arc<N>,
    clock: Arc<C>,
    settings: Arc<ReminderSettings>,
    polling: Arc<Mutex<Option<PollingLoop>>>,
}

impl<R, T, N, C> Clone for ReminderScheduler<R, T, N, C>
where
    R: OrderRepository,
    T: ReminderTaskRepository,
    N: NotificationGateway,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            orders: Arc::clone(&self.orders),
            tasks: Arc::clone(&self.tasks),
            notifications: Arc::clone(&self.notifications),
            clock: Arc::clone(&self.clock),
            settings: Arc::clone(&self.settings),
            polling: Arc::clone(&self.polling),
        }
    }
}

impl<R, T, N, C> ReminderScheduler<R, T, N, C>
where
    R: OrderRepository + 'static,
    T: ReminderTaskRepository + 'static,
    N: NotificationGateway + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a reminder scheduler.
    #[must_use]
    pub fn new(
        orders: Arc<R>,
        tasks: Arc<T>,
        notifications: Arc<N>,
        clock: Arc<C>,
        settings: ReminderSettings,
    ) -> Self {
        Self {
            orders,
            tasks,
            notifications,
            clock,
            settings: Arc::new(settings),
            polling: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the active settings.
    #[must_use]
    pub fn settings(&self) -> &ReminderSettings {
        &self.settings
    }

    /// Replaces pending reminders for an order awaiting the payer.
    ///
    /// Reminders the order already recorded as delivered are not scheduled
    /// again.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderSchedulerError`] when order lookup or task storage
    /// fails.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn schedule(&self, payment_id: &PaymentId) -> ReminderSchedulerResult<ScheduleOutcome> {
        let Some(order) = self.orders.find_by_payment_id(payment_id).await? else {
            info!("skipping reminders: order not found");
            return Ok(ScheduleOutcome::Skipped(SkipReason::OrderNotFound));
        };
        if order.status() != OrderStatus::PayerActionRequired {
            info!(status = %order.status(), "skipping reminders: order not awaiting payer");
            return Ok(ScheduleOutcome::Skipped(SkipReason::NotAwaitingPayer(
                order.status(),
            )));
        }

        let now = self.clock.utc();
        let replaced = self.tasks.cancel_pending_for_order(payment_id, now).await?;
        if replaced > 0 {
            debug!(replaced, "cancelled previously pending reminders");
        }

        let mut scheduled = Vec::new();
        for task_type in ReminderTaskType::ALL {
            if order.reminder_sent(task_type.kind()) {
                continue;
            }
            let delay = match task_type {
                ReminderTaskType::InitialReminder => self.settings.initial_delay,
                ReminderTaskType::FollowupReminder => self.settings.followup_delay,
            };
            let task = ReminderTask::new(payment_id.clone(), task_type, now + delay, &*self.clock);
            self.tasks.insert(&task).await?;
            scheduled.push(task);
        }
        info!(count = scheduled.len(), "scheduled reminders");

        if self.settings.auto_start && self.start_polling() {
            debug!("polling loop auto-started");
        }
        Ok(ScheduleOutcome::Scheduled(scheduled))
    }

    /// Cancels every pending reminder of an order.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderSchedulerError::Tasks`] when task storage fails.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn cancel_all(&self, payment_id: &PaymentId) -> ReminderSchedulerResult<usize> {
        let cancelled = self
            .tasks
            .cancel_pending_for_order(payment_id, self.clock.utc())
            .await?;
        if cancelled > 0 {
            info!(cancelled, "cancelled pending reminders");
        }
        Ok(cancelled)
    }

    /// Runs one polling tick over the due tasks.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderSchedulerError::Tasks`] when the due tasks cannot be
    /// listed. Failures of individual tasks are recorded on the task.
    pub async fn run_due(&self) -> ReminderSchedulerResult<TickReport> {
        let now = self.clock.utc();
        let due = self.tasks.find_due(now, self.settings.batch_size).await?;
        let mut report = TickReport::default();
        let mut failed_orders: HashSet<PaymentId> = HashSet::new();

        for task in due {
            if failed_orders.contains(task.order_payment_id()) {
                report.skipped += 1;
                continue;
            }
            let lease_expires_at = now + self.settings.lease_duration;
            let Some(claimed) = self
                .tasks
                .try_claim(task.id(), now, lease_expires_at)
                .await?
            else {
                report.skipped += 1;
                continue;
            };
            report.claimed += 1;

            let payment_id = claimed.order_payment_id().clone();
            let lease = claimed.lease_expires_at().unwrap_or(lease_expires_at);
            match self.execute(claimed, lease).await {
                Ok(TaskOutcome::Completed) => report.completed += 1,
                Ok(TaskOutcome::Cancelled) => report.cancelled += 1,
                Ok(TaskOutcome::Superseded) => report.skipped += 1,
                Ok(TaskOutcome::Failed) => {
                    report.failed += 1;
                    failed_orders.insert(payment_id);
                }
                Err(err) => {
                    warn!(payment_id = %payment_id, error = %err, "reminder task bookkeeping failed");
                    report.failed += 1;
                    failed_orders.insert(payment_id);
                }
            }
        }

        if report.claimed > 0 {
            info!(
                claimed = report.claimed,
                completed = report.completed,
                cancelled = report.cancelled,
                failed = report.failed,
                "reminder tick finished"
            );
        }
        Ok(report)
    }

    #[instrument(
        skip(self, task),
        fields(task_id = %task.id(), payment_id = %task.order_payment_id(), task_type = %task.task_type())
    )]
    async fn execute(
        &self,
        mut task: ReminderTask,
        lease: DateTime<Utc>,
    ) -> ReminderSchedulerResult<TaskOutcome> {
        let Some(order) = self.orders.find_by_payment_id(task.order_payment_id()).await? else {
            return self.withdraw(task, lease, "Order not found".to_owned()).await;
        };
        if order.status() != OrderStatus::PayerActionRequired {
            let reason = format!("Order status changed to {}", order.status());
            return self.withdraw(task, lease, reason).await;
        }
        let kind = task.task_type().kind();
        if order.reminder_sent(kind) {
            return self
                .withdraw(task, lease, "Reminder already sent".to_owned())
                .await;
        }

        let order_url = self.settings.order_url(&order);
        match self
            .notifications
            .send_reminder_notification(&order, &order_url, kind)
            .await
        {
            Ok(()) => {
                let now = self.clock.utc();
                self.orders
                    .record_reminder_sent(task.order_payment_id(), kind, now)
                    .await?;
                task.complete(now)?;
                info!("reminder delivered");
                self.persist(&task, lease, TaskOutcome::Completed).await
            }
            Err(err) => {
                let now = self.clock.utc();
                let message = err.to_string();
                task.record_failure(message.clone(), now)?;
                let limit_reached = self
                    .settings
                    .max_attempts
                    .is_some_and(|limit| task.attempts() >= limit);
                if limit_reached {
                    task.cancel(Some(format!("Retry limit reached: {message}")), now)?;
                    warn!(attempts = task.attempts(), error = %message, "reminder abandoned after retry limit");
                } else {
                    warn!(attempts = task.attempts(), error = %message, "reminder delivery failed");
                }
                self.persist(&task, lease, TaskOutcome::Failed).await
            }
        }
    }

    async fn withdraw(
        &self,
        mut task: ReminderTask,
        lease: DateTime<Utc>,
        reason: String,
    ) -> ReminderSchedulerResult<TaskOutcome> {
        info!(reason = %reason, "cancelling reminder task");
        task.cancel(Some(reason), self.clock.utc())?;
        self.persist(&task, lease, TaskOutcome::Cancelled).await
    }

    /// Writes the task back unless it changed since it was claimed.
    async fn persist(
        &self,
        task: &ReminderTask,
        lease: DateTime<Utc>,
        outcome: TaskOutcome,
    ) -> ReminderSchedulerResult<TaskOutcome> {
        if self.tasks.update_claimed(task, lease).await? {
            return Ok(outcome);
        }
        info!("reminder task changed while running; keeping stored state");
        Ok(TaskOutcome::Superseded)
    }

    /// Starts the polling loop unless one is already running.
    ///
    /// Must be called from within a Tokio runtime. Returns `false` when a loop
    /// was already running.
    #[must_use = "false means another loop was already running"]
    pub fn start_polling(&self) -> bool {
        let mut polling = self.polling.lock().unwrap_or_else(PoisonError::into_inner);
        if polling
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
        {
            return false;
        }

        let token = CancellationToken::new();
        let scheduler = self.clone();
        let loop_token = token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.settings.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = loop_token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = scheduler.run_due().await {
                            warn!(error = %err, "reminder tick failed");
                        }
                    }
                }
            }
            debug!("reminder polling loop stopped");
        });
        *polling = Some(PollingLoop { token, handle });
        info!(
            interval_secs = self.settings.poll_interval.as_secs(),
            "reminder polling loop started"
        );
        true
    }

    /// Returns whether the polling loop is running.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.polling
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Stops the polling loop and waits for the current tick to finish.
    pub async fn stop_polling(&self) {
        let running = self
            .polling
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(PollingLoop { token, handle }) = running else {
            return;
        };
        token.cancel();
        if let Err(err) = handle.await {
            warn!(error = %err, "reminder polling loop ended abnormally");
        }
    }
}
