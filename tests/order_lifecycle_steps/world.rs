//! Shared world state for order lifecycle BDD scenarios.

use std::sync::Arc;

use atelier::clock::ManualClock;
use atelier::order::{
    adapters::{
        memory::{
            InMemoryOrderRepository, InMemoryPaymentProvider, InMemoryTemporaryOrderCache,
            RecordingNotificationGateway,
        },
        providers::ProviderRegistry,
    },
    domain::{Order, OrderReference, PaymentId, PaymentProviderKind},
    ports::{OrderRepository, PaymentProvider},
    services::{OrderLifecycleResult, OrderLifecycleService},
};
use atelier::reminder::{
    adapters::memory::InMemoryReminderTaskRepository,
    domain::ReminderTask,
    ports::ReminderTaskRepository,
    services::{ReminderScheduler, ReminderSettings},
};
use chrono::{DateTime, TimeZone, Utc};
use eyre::WrapErr;
use mockable::Clock;
use rstest::fixture;

/// Service type used by the BDD world.
pub type TestOrderService = OrderLifecycleService<
    InMemoryOrderRepository,
    InMemoryTemporaryOrderCache<ManualClock>,
    InMemoryReminderTaskRepository,
    RecordingNotificationGateway,
    ManualClock,
>;

/// Scenario world for order lifecycle behaviour tests.
pub struct OrderLifecycleWorld {
    pub service: TestOrderService,
    pub orders: Arc<InMemoryOrderRepository>,
    pub tasks: Arc<InMemoryReminderTaskRepository>,
    pub notifications: Arc<RecordingNotificationGateway>,
    pub provider: Arc<InMemoryPaymentProvider>,
    pub clock: Arc<ManualClock>,
    pub payment_id: Option<PaymentId>,
    pub order_reference: Option<OrderReference>,
    pub persisted_at: Option<DateTime<Utc>>,
    pub last_result: Option<OrderLifecycleResult<Order>>,
}

impl OrderLifecycleWorld {
    /// Creates a world over in-memory adapters with a `PayPal` provider.
    #[must_use]
    pub fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 5, 4, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        let clock = Arc::new(ManualClock::new(start));
        let orders = Arc::new(InMemoryOrderRepository::new());
        let tasks = Arc::new(InMemoryReminderTaskRepository::new());
        let notifications = Arc::new(RecordingNotificationGateway::new());
        let provider = Arc::new(InMemoryPaymentProvider::new(PaymentProviderKind::Paypal));

        let scheduler = ReminderScheduler::new(
            Arc::clone(&orders),
            Arc::clone(&tasks),
            Arc::clone(&notifications),
            Arc::clone(&clock),
            ReminderSettings {
                auto_start: false,
                ..ReminderSettings::default()
            },
        );
        let service = OrderLifecycleService::new(
            Arc::clone(&orders),
            Arc::new(InMemoryTemporaryOrderCache::new(Arc::clone(&clock))),
            Arc::clone(&notifications),
            scheduler,
            ProviderRegistry::new()
                .with_provider(Arc::clone(&provider) as Arc<dyn PaymentProvider>),
            Arc::clone(&clock),
        );

        Self {
            service,
            orders,
            tasks,
            notifications,
            provider,
            clock,
            payment_id: None,
            order_reference: None,
            persisted_at: None,
            last_result: None,
        }
    }

    /// Returns the payment opened by the scenario.
    pub fn payment_id(&self) -> Result<&PaymentId, eyre::Report> {
        self.payment_id
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing payment id in scenario world"))
    }

    /// Returns the order reference used by the scenario.
    pub fn order_reference(&self) -> Result<&OrderReference, eyre::Report> {
        self.order_reference
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing order reference in scenario world"))
    }

    /// Checks payer interaction and records when the order was persisted.
    pub fn check_interaction(&mut self) -> Result<(), eyre::Report> {
        let payment_id = self.payment_id()?.clone();
        let persisted = run_async(self.service.check_interaction(&payment_id))
            .wrap_err("check payer interaction")?;
        if persisted.is_none() {
            return Err(eyre::eyre!("payer interaction did not persist the order"));
        }
        self.persisted_at = Some(self.clock.utc());
        Ok(())
    }

    /// Loads the durable order for the scenario payment.
    pub fn stored_order(&self) -> Result<Order, eyre::Report> {
        let payment_id = self.payment_id()?;
        run_async(self.orders.find_by_payment_id(payment_id))
            .wrap_err("load stored order")?
            .ok_or_else(|| eyre::eyre!("order {payment_id} is not stored"))
    }

    /// Loads every reminder task for the scenario payment.
    pub fn reminder_tasks(&self) -> Result<Vec<ReminderTask>, eyre::Report> {
        let payment_id = self.payment_id()?;
        run_async(self.tasks.find_by_order(payment_id)).wrap_err("load reminder tasks")
    }
}

impl Default for OrderLifecycleWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> OrderLifecycleWorld {
    OrderLifecycleWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
