//! Shared harness wiring the order service to in-memory adapters.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rstest::fixture;
use rust_decimal::Decimal;

use crate::clock::ManualClock;
use crate::order::{
    adapters::{
        memory::{
            InMemoryCatalog, InMemoryOrderRepository, InMemoryPaymentProvider,
            InMemoryTemporaryOrderCache, RecordingNotificationGateway,
        },
        providers::ProviderRegistry,
    },
    domain::{CartLineInput, Customer, Order, PaymentId, PaymentProviderKind, ProductId},
    ports::{CatalogService, PaymentProvider},
    services::{CreateIntentRequest, OrderLifecycleService},
};
use crate::reminder::{
    adapters::memory::InMemoryReminderTaskRepository,
    domain::{ReminderTask, ReminderTaskStatus},
    ports::ReminderTaskRepository,
    services::{ReminderScheduler, ReminderSettings},
};

pub(super) type TestCache = InMemoryTemporaryOrderCache<ManualClock>;
pub(super) type TestScheduler = ReminderScheduler<
    InMemoryOrderRepository,
    InMemoryReminderTaskRepository,
    RecordingNotificationGateway,
    ManualClock,
>;
pub(super) type TestService = OrderLifecycleService<
    InMemoryOrderRepository,
    TestCache,
    InMemoryReminderTaskRepository,
    RecordingNotificationGateway,
    ManualClock,
>;

pub(super) const PRODUCTS: [&str; 3] = ["coat-1", "scarf-1", "hat-1"];

pub(super) fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn product(id: &str) -> ProductId {
    ProductId::new(id).expect("valid product id")
}

pub(super) fn line(id: &str, price: i64, quantity: i64) -> CartLineInput {
    CartLineInput::new(id, format!("Product {id}"), Decimal::new(price, 0), quantity)
}

pub(super) fn payer() -> Customer {
    Customer::new()
        .with_email("ada@example.com")
        .with_name("Ada Lovelace")
        .with_payer_id("PAYER-1")
}

/// Order service over in-memory adapters plus handles for assertions.
pub(super) struct Harness {
    pub(super) service: TestService,
    pub(super) orders: Arc<InMemoryOrderRepository>,
    pub(super) cache: Arc<TestCache>,
    pub(super) tasks: Arc<InMemoryReminderTaskRepository>,
    pub(super) notifications: Arc<RecordingNotificationGateway>,
    pub(super) provider: Arc<InMemoryPaymentProvider>,
    pub(super) catalog: Arc<InMemoryCatalog<ManualClock>>,
    pub(super) clock: Arc<ManualClock>,
}

#[fixture]
pub(super) fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(start_time()));
    let orders = Arc::new(InMemoryOrderRepository::new());
    let cache = Arc::new(InMemoryTemporaryOrderCache::new(Arc::clone(&clock)));
    let tasks = Arc::new(InMemoryReminderTaskRepository::new());
    let notifications = Arc::new(RecordingNotificationGateway::new());
    let provider = Arc::new(InMemoryPaymentProvider::new(PaymentProviderKind::Paypal));
    let catalog = Arc::new(InMemoryCatalog::new(
        PRODUCTS.into_iter().map(product),
        Arc::clone(&clock),
    ));

    let scheduler: TestScheduler = ReminderScheduler::new(
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
        Arc::clone(&cache),
        Arc::clone(&notifications),
        scheduler,
        ProviderRegistry::new().with_provider(Arc::clone(&provider) as Arc<dyn PaymentProvider>),
        Arc::clone(&clock),
    )
    .with_catalog(Arc::clone(&catalog) as Arc<dyn CatalogService>);

    Harness {
        service,
        orders,
        cache,
        tasks,
        notifications,
        provider,
        catalog,
        clock,
    }
}

impl Harness {
    /// Creates a PayPal intent for two `coat-1` at 50 under `reference`.
    pub(super) async fn open_checkout(&self, reference: &str) -> PaymentId {
        let request = CreateIntentRequest::new(
            PaymentProviderKind::Paypal,
            vec![line("coat-1", 50, 2)],
        )
        .with_order_reference(reference);
        self.service
            .create_intent(request)
            .await
            .expect("intent creation should succeed")
            .id
    }

    /// Opens a checkout and lets the payer interact so the order persists.
    pub(super) async fn awaiting_payer(&self, reference: &str) -> (PaymentId, Order) {
        let payment_id = self.open_checkout(reference).await;
        self.provider
            .set_payer(&payment_id, payer())
            .expect("payment exists");
        let order = self
            .service
            .check_interaction(&payment_id)
            .await
            .expect("interaction check should succeed")
            .expect("payer interaction should persist the order");
        (payment_id, order)
    }

    pub(super) async fn tasks_for(&self, payment_id: &PaymentId) -> Vec<ReminderTask> {
        self.tasks
            .find_by_order(payment_id)
            .await
            .expect("task lookup should succeed")
    }

    pub(super) async fn pending_tasks(&self, payment_id: &PaymentId) -> Vec<ReminderTask> {
        self.tasks_for(payment_id)
            .await
            .into_iter()
            .filter(|task| task.status() == ReminderTaskStatus::Pending)
            .collect()
    }

    pub(super) async fn stored(&self, payment_id: &PaymentId) -> Order {
        self.service
            .find_order(payment_id)
            .await
            .expect("lookup should succeed")
            .expect("order should be stored")
    }
}
