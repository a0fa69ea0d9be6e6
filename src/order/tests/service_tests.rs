//! Checkout, persistence, and capture orchestration tests.

use std::sync::Arc;

use chrono::Duration;
use rstest::rstest;
use rust_decimal::Decimal;

use super::support::{Harness, TestScheduler, harness, line, payer, product, start_time};
use crate::order::{
    adapters::{
        memory::{
            InMemoryOrderRepository, InMemoryTemporaryOrderCache, RecordingNotificationGateway,
        },
        providers::ProviderRegistry,
    },
    domain::{
        Cart, CheckoutSnapshot, Customer, Order, OrderDomainError, OrderReference, OrderStatus,
        PaymentId, PaymentProviderKind, ReminderKind,
    },
    ports::{
        OrderRepository, OrderRepositoryError, PaymentProviderError, ProviderPayment,
        TemporaryOrderCache, provider::MockPaymentProvider,
    },
    services::{CreateIntentRequest, OrderLifecycleError, OrderLifecycleService},
};
use crate::reminder::{
    adapters::memory::InMemoryReminderTaskRepository,
    domain::{ReminderTaskStatus, ReminderTaskType},
    services::{ReminderScheduler, ReminderSettings, ScheduleOutcome},
};

fn reference(value: &str) -> OrderReference {
    OrderReference::new(value).expect("valid reference")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_intent_caches_checkout_without_persisting(harness: Harness) {
    let payment_id = harness.open_checkout("ref-cache").await;

    let cached = harness
        .cache
        .get(&payment_id)
        .await
        .expect("cache lookup should succeed")
        .expect("checkout should be cached");
    assert_eq!(cached.snapshot.total_amount, Decimal::new(100, 0));
    assert_eq!(cached.snapshot.order_reference, reference("ref-cache"));
    assert_eq!(cached.cached_at, start_time());
    assert_eq!(
        harness.service.find_order(&payment_id).await.expect("lookup"),
        None
    );
    assert!(harness.tasks_for(&payment_id).await.is_empty());
    assert_eq!(harness.provider.create_calls(), 1);
    assert!(harness.catalog.is_reserved(&product("coat-1")).expect("known product"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_intent_rejects_invalid_cart_before_provider(harness: Harness) {
    let request = CreateIntentRequest::new(PaymentProviderKind::Paypal, Vec::new());

    let result = harness.service.create_intent(request).await;

    assert!(matches!(
        result,
        Err(OrderLifecycleError::Validation(OrderDomainError::EmptyCart))
    ));
    assert_eq!(harness.provider.create_calls(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_intent_for_unconfigured_provider_fails(harness: Harness) {
    let request = CreateIntentRequest::new(PaymentProviderKind::Mollie, vec![line("hat-1", 20, 1)]);

    let result = harness.service.create_intent(request).await;

    assert!(matches!(
        result,
        Err(OrderLifecycleError::Provider(PaymentProviderError::Unsupported(
            PaymentProviderKind::Mollie
        )))
    ));
    assert!(!harness.catalog.is_reserved(&product("hat-1")).expect("known product"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unavailable_product_releases_earlier_reservations(harness: Harness) {
    harness.open_checkout("ref-first").await;
    let request = CreateIntentRequest::new(
        PaymentProviderKind::Paypal,
        vec![line("scarf-1", 30, 1), line("coat-1", 50, 1)],
    );

    let result = harness.service.create_intent(request).await;

    assert!(matches!(
        result,
        Err(OrderLifecycleError::ProductUnavailable(ref product_id)) if product_id == &product("coat-1")
    ));
    assert!(!harness.catalog.is_reserved(&product("scarf-1")).expect("known product"));
    assert_eq!(harness.provider.create_calls(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reusing_reference_of_unpaid_order_is_rejected(harness: Harness) {
    harness.awaiting_payer("ref-dup").await;
    let request = CreateIntentRequest::new(PaymentProviderKind::Paypal, vec![line("hat-1", 20, 1)])
        .with_order_reference("ref-dup");

    let result = harness.service.create_intent(request).await;

    assert!(matches!(result, Err(OrderLifecycleError::ReferenceInUse(_))));
    assert_eq!(harness.provider.create_calls(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reusing_reference_of_paid_order_reports_already_paid(harness: Harness) {
    let (payment_id, _) = harness.awaiting_payer("ref-paid").await;
    harness
        .service
        .capture(&payment_id, &reference("ref-paid"))
        .await
        .expect("capture should succeed");
    let request = CreateIntentRequest::new(PaymentProviderKind::Paypal, vec![line("hat-1", 20, 1)])
        .with_order_reference("ref-paid");

    let result = harness.service.create_intent(request).await;

    assert!(matches!(result, Err(OrderLifecycleError::AlreadyPaid(ref id)) if id == &payment_id));
    assert_eq!(harness.provider.create_calls(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn no_interaction_keeps_checkout_provisional(harness: Harness) {
    let payment_id = harness.open_checkout("ref-quiet").await;

    let result = harness
        .service
        .check_interaction(&payment_id)
        .await
        .expect("interaction check should succeed");

    assert_eq!(result, None);
    assert_eq!(harness.cache.len().expect("cache readable"), 1);
    assert_eq!(
        harness.service.find_order(&payment_id).await.expect("lookup"),
        None
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_payment_is_not_found(harness: Harness) {
    let payment_id = PaymentId::new("PAY-missing").expect("valid payment id");

    let result = harness.service.check_interaction(&payment_id).await;

    assert!(matches!(result, Err(OrderLifecycleError::NotFound(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn interaction_persists_order_and_schedules_reminders(harness: Harness) {
    let (payment_id, order) = harness.awaiting_payer("ref-abandon").await;

    assert_eq!(order.status(), OrderStatus::PayerActionRequired);
    assert_eq!(order.total_amount(), Decimal::new(100, 0));
    assert_eq!(order.customer().email(), Some("ada@example.com"));
    assert!(harness.cache.is_empty().expect("cache readable"));

    let tasks = harness.pending_tasks(&payment_id).await;
    let schedule: Vec<_> = tasks
        .iter()
        .map(|task| (task.task_type(), task.scheduled_for()))
        .collect();
    assert_eq!(
        schedule,
        vec![
            (
                ReminderTaskType::InitialReminder,
                start_time() + Duration::minutes(1)
            ),
            (
                ReminderTaskType::FollowupReminder,
                start_time() + Duration::hours(24)
            ),
        ]
    );
    assert!(
        harness
            .notifications
            .status_notifications_for(&payment_id)
            .is_empty()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn persist_is_idempotent(harness: Harness) {
    let payment_id = harness.open_checkout("ref-twice").await;

    let first = harness
        .service
        .persist(&payment_id, None)
        .await
        .expect("first persist should succeed");
    let second = harness
        .service
        .persist(&payment_id, None)
        .await
        .expect("second persist should succeed");

    assert_eq!(first, second);
    assert_eq!(harness.stored(&payment_id).await.id(), first.id());
    assert_eq!(harness.pending_tasks(&payment_id).await.len(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_persist_enriches_customer(harness: Harness) {
    let payment_id = harness.open_checkout("ref-enrich").await;
    harness
        .service
        .persist(&payment_id, Some(Customer::new().with_payer_id("PAYER-7")))
        .await
        .expect("first persist should succeed");

    let enriched = harness
        .service
        .persist(&payment_id, Some(payer()))
        .await
        .expect("second persist should succeed");

    assert_eq!(enriched.customer().payer_id(), Some("PAYER-7"));
    assert_eq!(enriched.customer().email(), Some("ada@example.com"));
    assert_eq!(harness.stored(&payment_id).await, enriched);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn persist_returns_order_stored_by_another_writer(harness: Harness) {
    let payment_id = harness.open_checkout("ref-race").await;
    let cached = harness
        .cache
        .get(&payment_id)
        .await
        .expect("cache lookup")
        .expect("checkout cached");
    let winner = Order::from_checkout(cached.snapshot, None, &*harness.clock);
    harness
        .orders
        .store(&winner)
        .await
        .expect("first writer stores the order");

    let persisted = harness
        .service
        .persist(&payment_id, None)
        .await
        .expect("persist should resolve to the stored order");

    assert_eq!(persisted.id(), winner.id());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn capture_completes_and_locks_order(harness: Harness) {
    let (payment_id, _) = harness.awaiting_payer("ref-capture").await;
    harness.clock.advance(Duration::minutes(10));

    let order = harness
        .service
        .capture(&payment_id, &reference("ref-capture"))
        .await
        .expect("capture should succeed");

    assert_eq!(order.status(), OrderStatus::Completed);
    assert!(order.is_paid());
    assert_eq!(order.paid_at(), Some(start_time() + Duration::minutes(10)));
    assert_eq!(order.payment_attempts().len(), 1);
    assert!(harness.pending_tasks(&payment_id).await.is_empty());
    assert_eq!(
        harness.notifications.status_notifications_for(&payment_id),
        vec![OrderStatus::Completed]
    );
    assert!(harness.stored(&payment_id).await.status_email_sent());
    assert!(harness.catalog.is_sold(&product("coat-1")).expect("known product"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn capture_on_paid_order_never_reaches_provider(harness: Harness) {
    let (payment_id, _) = harness.awaiting_payer("ref-lock").await;
    let paid = harness
        .service
        .capture(&payment_id, &reference("ref-lock"))
        .await
        .expect("capture should succeed");
    harness.clock.advance(Duration::hours(1));

    let result = harness
        .service
        .capture(&payment_id, &reference("ref-lock"))
        .await;

    assert!(matches!(result, Err(OrderLifecycleError::AlreadyPaid(_))));
    assert_eq!(harness.provider.capture_calls(), 1);
    let stored = harness.stored(&payment_id).await;
    assert_eq!(stored.paid_at(), paid.paid_at());
    assert_eq!(stored.payment_attempts().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn paid_order_capture_skips_mocked_provider() {
    let clock = Arc::new(crate::clock::ManualClock::new(start_time()));
    let orders = Arc::new(InMemoryOrderRepository::new());
    let cart = Cart::from_inputs(vec![line("p1", 50, 2)]).expect("valid cart");
    let payment_id = PaymentId::new("PAY-mock").expect("valid payment id");
    let mut order = Order::from_checkout(
        CheckoutSnapshot {
            provider: PaymentProviderKind::Stripe,
            payment_id: payment_id.clone(),
            order_reference: reference("ref-mock"),
            total_amount: cart.total(),
            items: cart.into_items(),
            currency: "EUR".to_owned(),
            measurements: None,
            delivery_details: None,
        },
        None,
        &*clock,
    );
    order
        .record_capture(OrderStatus::Completed, None, &*clock)
        .expect("capture should apply");
    orders.store(&order).await.expect("store should succeed");

    let mut provider = MockPaymentProvider::new();
    provider.expect_kind().return_const(PaymentProviderKind::Stripe);
    provider.expect_capture_payment().never();
    let tasks = Arc::new(InMemoryReminderTaskRepository::new());
    let notifications = Arc::new(RecordingNotificationGateway::new());
    let scheduler: TestScheduler = ReminderScheduler::new(
        Arc::clone(&orders),
        tasks,
        Arc::clone(&notifications),
        Arc::clone(&clock),
        ReminderSettings {
            auto_start: false,
            ..ReminderSettings::default()
        },
    );
    let service = OrderLifecycleService::new(
        orders,
        Arc::new(InMemoryTemporaryOrderCache::new(Arc::clone(&clock))),
        notifications,
        scheduler,
        ProviderRegistry::new().with_provider(Arc::new(provider)),
        clock,
    );

    let result = service.capture(&payment_id, &reference("ref-mock")).await;

    assert!(matches!(result, Err(OrderLifecycleError::AlreadyPaid(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn capture_losing_a_concurrent_write_keeps_its_attempt() {
    let clock = Arc::new(crate::clock::ManualClock::new(start_time()));
    let orders = Arc::new(InMemoryOrderRepository::new());
    let cart = Cart::from_inputs(vec![line("p1", 50, 2)]).expect("valid cart");
    let payment_id = PaymentId::new("PAY-race").expect("valid payment id");
    let order = Order::from_checkout(
        CheckoutSnapshot {
            provider: PaymentProviderKind::Stripe,
            payment_id: payment_id.clone(),
            order_reference: reference("ref-race"),
            total_amount: cart.total(),
            items: cart.into_items(),
            currency: "EUR".to_owned(),
            measurements: None,
            delivery_details: None,
        },
        None,
        &*clock,
    );
    orders.store(&order).await.expect("store should succeed");

    let mut provider = MockPaymentProvider::new();
    provider.expect_kind().return_const(PaymentProviderKind::Stripe);
    let rival_orders = Arc::clone(&orders);
    let rival_clock = Arc::clone(&clock);
    provider
        .expect_capture_payment()
        .times(1)
        .returning(move |captured_id, order_reference| {
            // A second request finishes its capture while this one waits on
            // the provider.
            tokio::task::block_in_place(|| {
                tokio::runtime::Handle::current().block_on(async {
                    let mut rival = rival_orders
                        .find_by_payment_id(captured_id)
                        .await
                        .expect("lookup should succeed")
                        .expect("order exists");
                    let expected = rival.status();
                    rival
                        .record_capture(OrderStatus::Completed, None, &*rival_clock)
                        .expect("capture should apply");
                    rival_orders
                        .update(&rival, expected)
                        .await
                        .expect("rival update should succeed");
                });
            });
            Ok(ProviderPayment {
                id: captured_id.clone(),
                status: OrderStatus::Completed,
                order_reference: order_reference.clone(),
                amount: Some(Decimal::new(100, 0)),
                approval_url: None,
                client_secret: None,
            })
        });
    let notifications = Arc::new(RecordingNotificationGateway::new());
    let scheduler: TestScheduler = ReminderScheduler::new(
        Arc::clone(&orders),
        Arc::new(InMemoryReminderTaskRepository::new()),
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
        notifications,
        scheduler,
        ProviderRegistry::new().with_provider(Arc::new(provider)),
        clock,
    );

    let result = service.capture(&payment_id, &reference("ref-race")).await;

    assert!(matches!(
        result,
        Err(OrderLifecycleError::Repository(
            OrderRepositoryError::StatusConflict {
                actual: OrderStatus::Completed,
                ..
            }
        ))
    ));
    let stored = orders
        .find_by_payment_id(&payment_id)
        .await
        .expect("lookup should succeed")
        .expect("order exists");
    assert_eq!(stored.status(), OrderStatus::Completed);
    assert_eq!(
        stored
            .payment_attempts()
            .iter()
            .map(|attempt| attempt.amount)
            .collect::<Vec<_>>(),
        vec![None, Some(Decimal::new(100, 0))]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn capture_with_foreign_reference_is_rejected(harness: Harness) {
    let (payment_id, _) = harness.awaiting_payer("ref-own").await;

    let result = harness
        .service
        .capture(&payment_id, &reference("ref-foreign"))
        .await;

    assert!(matches!(
        result,
        Err(OrderLifecycleError::ReferenceMismatch { .. })
    ));
    assert_eq!(harness.provider.capture_calls(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn capture_of_cached_checkout_persists_first(harness: Harness) {
    let payment_id = harness.open_checkout("ref-direct").await;

    let order = harness
        .service
        .capture(&payment_id, &reference("ref-direct"))
        .await
        .expect("capture should succeed");

    assert_eq!(order.status(), OrderStatus::Completed);
    assert_eq!(harness.stored(&payment_id).await.id(), order.id());
    assert!(harness.cache.is_empty().expect("cache readable"));
    assert!(harness.pending_tasks(&payment_id).await.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn capture_of_cached_checkout_checks_reference_first(harness: Harness) {
    let payment_id = harness.open_checkout("ref-cached").await;

    let result = harness
        .service
        .capture(&payment_id, &reference("ref-other"))
        .await;

    assert!(matches!(
        result,
        Err(OrderLifecycleError::ReferenceMismatch { .. })
    ));
    assert_eq!(
        harness.service.find_order(&payment_id).await.expect("lookup"),
        None
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_capture_leaves_order_untouched(harness: Harness) {
    let (payment_id, before) = harness.awaiting_payer("ref-fail").await;
    harness
        .provider
        .set_capture_failure(Some(PaymentProviderError::Api {
            status: 502,
            message: "upstream unavailable".to_owned(),
        }));

    let result = harness
        .service
        .capture(&payment_id, &reference("ref-fail"))
        .await;

    assert!(matches!(
        result,
        Err(OrderLifecycleError::Provider(PaymentProviderError::Api {
            status: 502,
            ..
        }))
    ));
    assert_eq!(harness.stored(&payment_id).await, before);
    assert_eq!(harness.pending_tasks(&payment_id).await.len(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn capture_back_to_payer_action_reschedules_without_email(harness: Harness) {
    let (payment_id, _) = harness.awaiting_payer("ref-par").await;
    harness.provider.set_capture_status(OrderStatus::Approved);
    harness
        .service
        .capture(&payment_id, &reference("ref-par"))
        .await
        .expect("approved capture should succeed");
    harness
        .provider
        .set_capture_status(OrderStatus::PayerActionRequired);

    let order = harness
        .service
        .capture(&payment_id, &reference("ref-par"))
        .await
        .expect("capture should succeed");

    assert_eq!(order.status(), OrderStatus::PayerActionRequired);
    assert_eq!(
        harness.notifications.status_notifications_for(&payment_id),
        vec![OrderStatus::Approved]
    );
    assert_eq!(harness.pending_tasks(&payment_id).await.len(), 2);
    let cancelled = harness
        .tasks_for(&payment_id)
        .await
        .into_iter()
        .filter(|task| task.status() == ReminderTaskStatus::Cancelled)
        .count();
    assert_eq!(cancelled, 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delivered_reminders_are_not_rescheduled(harness: Harness) {
    let (payment_id, _) = harness.awaiting_payer("ref-sent").await;
    harness
        .orders
        .record_reminder_sent(&payment_id, ReminderKind::Initial, start_time())
        .await
        .expect("marker should be recorded");

    let scheduled = harness
        .service
        .reminders()
        .schedule(&payment_id)
        .await
        .expect("scheduling should succeed");

    assert!(matches!(scheduled, ScheduleOutcome::Scheduled(ref tasks) if tasks.len() == 1));
    let pending = harness.pending_tasks(&payment_id).await;
    assert_eq!(pending.len(), 1);
    assert!(
        pending
            .iter()
            .all(|task| task.task_type() == ReminderTaskType::FollowupReminder)
    );
}
