//! Orchestration of the order payment lifecycle.
//!
//! A checkout lives only in the temporary cache until the payer interacts
//! with the provider. It is then persisted exactly once, reminders are
//! scheduled, and later captures, syncs, admin updates, and cancellations
//! drive the status machine with the matching side effects.

use std::sync::Arc;

use mockable::Clock;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::checkout::{CheckoutSettings, CreateIntentRequest, Reservations};
use crate::order::{
    adapters::providers::ProviderRegistry,
    domain::{
        Cart, CheckoutSnapshot, Customer, Order, OrderDomainError, OrderReference, OrderStatus,
        PaymentId, ProductId, StatusChange,
    },
    ports::{
        CatalogService, NotificationGateway, OrderCacheError, OrderRepository,
        OrderRepositoryError, PaymentIntentRequest, PaymentProviderError, ProviderPayment,
        TemporaryOrderCache,
    },
};
use crate::reminder::{
    ports::ReminderTaskRepository,
    services::{ReminderScheduler, ReminderSchedulerError},
};

/// Request payload for an explicit status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStatusRequest {
    payment_id: PaymentId,
    status: OrderStatus,
    admin_override: bool,
}

impl UpdateStatusRequest {
    /// Creates a regular status change request.
    #[must_use]
    pub const fn new(payment_id: PaymentId, status: OrderStatus) -> Self {
        Self {
            payment_id,
            status,
            admin_override: false,
        }
    }

    /// Allows leaving a terminal status. The paid lock still applies.
    #[must_use]
    pub const fn with_override(mut self) -> Self {
        self.admin_override = true;
        self
    }
}

/// Normalized error category for transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent invalid input.
    Validation,
    /// The order is paid and locked.
    AlreadyPaid,
    /// A payment provider failed or rejected the call.
    Provider,
    /// The order does not exist.
    NotFound,
    /// The request conflicts with the current order state.
    Conflict,
    /// Infrastructure failure.
    Internal,
}

/// Service-level errors for order lifecycle operations.
#[derive(Debug, Error)]
pub enum OrderLifecycleError {
    /// Domain validation failed.
    #[error(transparent)]
    Validation(OrderDomainError),
    /// The order is paid; nothing was sent to the provider.
    #[error("order for payment {0} is already paid")]
    AlreadyPaid(PaymentId),
    /// The order is in a terminal status.
    #[error("order for payment {payment_id} is already {status}")]
    AlreadyTerminal {
        /// Payment identifier of the order.
        payment_id: PaymentId,
        /// Current terminal status.
        status: OrderStatus,
    },
    /// Neither the cache nor durable storage knows the payment.
    #[error("no order found for payment {0}")]
    NotFound(PaymentId),
    /// The supplied order reference does not belong to the payment.
    #[error("order reference {actual} does not match payment {payment_id}")]
    ReferenceMismatch {
        /// Payment identifier of the order.
        payment_id: PaymentId,
        /// Reference supplied by the caller.
        actual: OrderReference,
    },
    /// The order reference already belongs to an unpaid order.
    #[error("order reference {0} is already in use")]
    ReferenceInUse(OrderReference),
    /// A product could not be reserved.
    #[error("product {0} is not available")]
    ProductUnavailable(ProductId),
    /// Payment provider call failed.
    #[error(transparent)]
    Provider(#[from] PaymentProviderError),
    /// Order repository operation failed.
    #[error(transparent)]
    Repository(#[from] OrderRepositoryError),
    /// Checkout cache operation failed.
    #[error(transparent)]
    Cache(#[from] OrderCacheError),
    /// Reminder scheduling failed.
    #[error(transparent)]
    Reminder(#[from] ReminderSchedulerError),
}

impl From<OrderDomainError> for OrderLifecycleError {
    fn from(err: OrderDomainError) -> Self {
        match err {
            OrderDomainError::AlreadyPaid(payment_id) => Self::AlreadyPaid(payment_id),
            OrderDomainError::TerminalStatus { payment_id, status } => {
                Self::AlreadyTerminal { payment_id, status }
            }
            other => Self::Validation(other),
        }
    }
}

impl OrderLifecycleError {
    /// Returns the normalized category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::ReferenceMismatch { .. } => ErrorKind::Validation,
            Self::AlreadyPaid(_) => ErrorKind::AlreadyPaid,
            Self::AlreadyTerminal { .. } | Self::ReferenceInUse(_) | Self::ProductUnavailable(_) => {
                ErrorKind::Conflict
            }
            Self::NotFound(_) | Self::Repository(OrderRepositoryError::NotFound(_)) => {
                ErrorKind::NotFound
            }
            Self::Repository(
                OrderRepositoryError::StatusConflict { .. }
                | OrderRepositoryError::DuplicatePaymentId(_)
                | OrderRepositoryError::DuplicateReference(_),
            ) => ErrorKind::Conflict,
            Self::Provider(_) => ErrorKind::Provider,
            Self::Repository(OrderRepositoryError::Persistence(_))
            | Self::Cache(_)
            | Self::Reminder(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for order lifecycle operations.
pub type OrderLifecycleResult<T> = Result<T, OrderLifecycleError>;

/// Order lifecycle orchestration service.
pub struct OrderLifecycleService<R, K, T, N, C>
where
    R: OrderRepository,
    K: TemporaryOrderCache,
    T: ReminderTaskRepository,
    N: NotificationGateway,
    C: Clock + Send + Sync,
{
    orders: Arc<R>,
    cache: Arc<K>,
    notifications: Arc<N>,
    reminders: ReminderScheduler<R, T, N, C>,
    providers: ProviderRegistry,
    catalog: Option<Arc<dyn CatalogService>>,
    clock: Arc<C>,
    settings: CheckoutSettings,
}

impl<R, K, T, N, C> OrderLifecycleService<R, K, T, N, C>
where
    R: OrderRepository + 'static,
    K: TemporaryOrderCache,
    T: ReminderTaskRepository + 'static,
    N: NotificationGateway + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a lifecycle service with default checkout settings and no
    /// catalog.
    #[must_use]
    pub fn new(
        orders: Arc<R>,
        cache: Arc<K>,
        notifications: Arc<N>,
        reminders: ReminderScheduler<R, T, N, C>,
        providers: ProviderRegistry,
        clock: Arc<C>,
    ) -> Self {
        Self {
            orders,
            cache,
            notifications,
            reminders,
            providers,
            catalog: None,
            clock,
            settings: CheckoutSettings::default(),
        }
    }

    /// Reserves products in `catalog` during checkout.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogService>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Replaces the checkout settings.
    #[must_use]
    pub fn with_settings(mut self, settings: CheckoutSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the reminder scheduler used by this service.
    #[must_use]
    pub const fn reminders(&self) -> &ReminderScheduler<R, T, N, C> {
        &self.reminders
    }

    /// Validates a cart, opens a provider payment, and caches the checkout.
    ///
    /// Nothing is written to durable storage.
    ///
    /// # Errors
    ///
    /// Returns [`OrderLifecycleError::Validation`] for malformed input,
    /// [`OrderLifecycleError::AlreadyPaid`] or
    /// [`OrderLifecycleError::ReferenceInUse`] when the reference belongs to
    /// an existing order, [`OrderLifecycleError::ProductUnavailable`] when a
    /// product cannot be reserved, and [`OrderLifecycleError::Provider`] when
    /// the provider call fails.
    #[instrument(skip(self, request), fields(provider = %request.provider))]
    pub async fn create_intent(
        &self,
        request: CreateIntentRequest,
    ) -> OrderLifecycleResult<ProviderPayment> {
        let CreateIntentRequest {
            provider: provider_kind,
            lines,
            order_reference,
            measurements,
            delivery_details,
        } = request;
        let cart = Cart::from_inputs(lines)?;
        let reference = match order_reference {
            Some(value) => OrderReference::new(value)?,
            None => OrderReference::generate(),
        };

        if let Some(existing) = self.orders.find_by_reference(&reference).await? {
            if existing.is_paid() {
                warn!(order_reference = %reference, "refusing intent for paid order");
                return Err(OrderLifecycleError::AlreadyPaid(existing.payment_id().clone()));
            }
            return Err(OrderLifecycleError::ReferenceInUse(reference));
        }
        let provider = self.providers.get(provider_kind)?;

        let mut reservations = Reservations::new(self.catalog.clone());
        reservations
            .reserve_all(cart.items().iter().map(|item| item.product_id()))
            .await
            .map_err(OrderLifecycleError::ProductUnavailable)?;

        let intent = PaymentIntentRequest {
            order_reference: reference.clone(),
            items: cart.items().to_vec(),
            total_amount: cart.total(),
            currency: self.settings.currency.clone(),
            return_url: self.settings.return_url.clone(),
            cancel_url: self.settings.cancel_url.clone(),
        };
        let payment = match provider.create_payment_intent(&intent).await {
            Ok(payment) => payment,
            Err(err) => {
                reservations.release_all().await;
                return Err(err.into());
            }
        };

        let snapshot = CheckoutSnapshot {
            provider: provider_kind,
            payment_id: payment.id.clone(),
            order_reference: reference,
            total_amount: intent.total_amount,
            items: intent.items,
            currency: intent.currency,
            measurements,
            delivery_details,
        };
        self.cache.put(&payment.id, snapshot).await?;
        info!(payment_id = %payment.id, status = %payment.status, "payment intent created");
        Ok(payment)
    }

    /// Asks the provider whether the payer engaged and persists the order
    /// when they did.
    ///
    /// Returns the durable order, or `None` while the payer has not
    /// interacted yet.
    ///
    /// # Errors
    ///
    /// Returns [`OrderLifecycleError::NotFound`] when the payment is unknown
    /// and [`OrderLifecycleError::Provider`] when the payer lookup fails.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn check_interaction(
        &self,
        payment_id: &PaymentId,
    ) -> OrderLifecycleResult<Option<Order>> {
        if let Some(order) = self.orders.find_by_payment_id(payment_id).await? {
            return Ok(Some(order));
        }
        let cached = self
            .cache
            .get(payment_id)
            .await?
            .ok_or_else(|| OrderLifecycleError::NotFound(payment_id.clone()))?;
        let provider = self.providers.get(cached.snapshot.provider)?;
        let payer = provider
            .get_payer(payment_id)
            .await?
            .filter(Customer::is_interaction_signal);

        match payer {
            Some(customer) => self.persist(payment_id, Some(customer)).await.map(Some),
            None => {
                debug!("no payer interaction yet");
                Ok(None)
            }
        }
    }

    /// Turns a cached checkout into a durable order awaiting the payer.
    ///
    /// Repeated calls return the existing order, filling in customer details
    /// it did not know yet.
    ///
    /// # Errors
    ///
    /// Returns [`OrderLifecycleError::NotFound`] when neither the cache nor
    /// durable storage knows the payment.
    #[instrument(skip(self, customer), fields(payment_id = %payment_id))]
    pub async fn persist(
        &self,
        payment_id: &PaymentId,
        customer: Option<Customer>,
    ) -> OrderLifecycleResult<Order> {
        if let Some(existing) = self.orders.find_by_payment_id(payment_id).await? {
            return self.enrich(existing, customer.as_ref()).await;
        }
        let cached = self
            .cache
            .get(payment_id)
            .await?
            .ok_or_else(|| OrderLifecycleError::NotFound(payment_id.clone()))?;

        let order = Order::from_checkout(cached.snapshot, customer, &*self.clock);
        match self.orders.store(&order).await {
            Ok(()) => {}
            Err(
                OrderRepositoryError::DuplicatePaymentId(_)
                | OrderRepositoryError::DuplicateReference(_),
            ) => return self.resolve_duplicate(&order).await,
            Err(err) => return Err(err.into()),
        }
        info!(order_id = %order.id(), "order persisted awaiting payer");

        self.evict(payment_id).await;
        self.schedule_reminders(payment_id).await;
        Ok(order)
    }

    /// Captures the payment and applies the resulting status.
    ///
    /// A cached checkout is persisted first. Paid orders never reach the
    /// provider.
    ///
    /// # Errors
    ///
    /// Returns [`OrderLifecycleError::AlreadyPaid`] for paid orders,
    /// [`OrderLifecycleError::ReferenceMismatch`] when `order_reference`
    /// belongs to another payment, [`OrderLifecycleError::AlreadyTerminal`]
    /// for voided or canceled orders, and [`OrderLifecycleError::Provider`]
    /// when the capture call fails.
    #[instrument(skip(self), fields(payment_id = %payment_id, order_reference = %order_reference))]
    pub async fn capture(
        &self,
        payment_id: &PaymentId,
        order_reference: &OrderReference,
    ) -> OrderLifecycleResult<Order> {
        let mut order = match self.orders.find_by_payment_id(payment_id).await? {
            Some(stored) => stored,
            None => {
                let cached = self
                    .cache
                    .get(payment_id)
                    .await?
                    .ok_or_else(|| OrderLifecycleError::NotFound(payment_id.clone()))?;
                ensure_reference(payment_id, &cached.snapshot.order_reference, order_reference)?;
                self.persist(payment_id, None).await?
            }
        };
        order.ensure_not_paid()?;
        ensure_reference(payment_id, order.order_reference(), order_reference)?;
        order.ensure_capturable()?;

        let provider = self.providers.get(order.provider())?;
        let payment = provider.capture_payment(payment_id, order_reference).await?;

        let expected = order.status();
        let change = order.record_capture(payment.status, payment.amount, &*self.clock)?;
        if let Err(err) = self.orders.update(&order, expected).await {
            if matches!(err, OrderRepositoryError::StatusConflict { .. }) {
                self.record_lost_capture(payment_id, &payment).await;
            }
            return Err(err.into());
        }
        info!(previous = %change.previous, status = %change.current, "payment captured");

        self.apply_side_effects(&mut order, change).await;
        Ok(order)
    }

    /// Moves an order to a new status.
    ///
    /// Requesting the current status is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`OrderLifecycleError::NotFound`] for unknown orders,
    /// [`OrderLifecycleError::AlreadyPaid`] for paid orders, and
    /// [`OrderLifecycleError::AlreadyTerminal`] when leaving a terminal
    /// status without an override.
    #[instrument(skip(self, request), fields(payment_id = %request.payment_id, status = %request.status))]
    pub async fn update_status(
        &self,
        request: UpdateStatusRequest,
    ) -> OrderLifecycleResult<Order> {
        let mut order = self.require_order(&request.payment_id).await?;
        if order.status() == request.status {
            debug!("status unchanged");
            return Ok(order);
        }

        let expected = order.status();
        let change = if request.admin_override {
            order.override_status(request.status, &*self.clock)?
        } else {
            order.transition_to(request.status, &*self.clock)?
        };
        self.orders.update(&order, expected).await?;
        info!(previous = %change.previous, admin_override = request.admin_override, "order status updated");

        self.apply_side_effects(&mut order, change).await;
        Ok(order)
    }

    /// Cancels an order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderLifecycleError::NotFound`] for unknown orders and
    /// [`OrderLifecycleError::AlreadyTerminal`] for completed, voided, or
    /// canceled ones.
    #[instrument(skip(self, reason), fields(payment_id = %payment_id))]
    pub async fn cancel(
        &self,
        payment_id: &PaymentId,
        reason: impl Into<String> + Send,
    ) -> OrderLifecycleResult<Order> {
        let mut order = self.require_order(payment_id).await?;
        let expected = order.status();
        let change = order.cancel(reason, &*self.clock)?;
        self.orders.update(&order, expected).await?;
        info!(previous = %change.previous, "order canceled");

        self.apply_side_effects(&mut order, change).await;
        Ok(order)
    }

    /// Fetches the provider status and applies it when it differs.
    ///
    /// # Errors
    ///
    /// Returns [`OrderLifecycleError::NotFound`] for unknown orders,
    /// [`OrderLifecycleError::Provider`] when the lookup fails, and the
    /// status-change errors of [`Self::update_status`].
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn sync(&self, payment_id: &PaymentId) -> OrderLifecycleResult<Order> {
        let mut order = self.require_order(payment_id).await?;
        let provider = self.providers.get(order.provider())?;
        let reported = provider.get_payment_status(payment_id).await?;

        let expected = order.status();
        order.record_attempt(reported, None, &*self.clock);
        let change = if reported == expected {
            StatusChange {
                previous: expected,
                current: expected,
            }
        } else {
            order.transition_to(reported, &*self.clock)?
        };
        self.orders.update(&order, expected).await?;
        debug!(reported = %reported, "provider status synced");

        self.apply_side_effects(&mut order, change).await;
        Ok(order)
    }

    /// Returns orders still awaiting the payer although the follow-up
    /// reminder went out longer ago than the abandonment window.
    ///
    /// # Errors
    ///
    /// Returns [`OrderLifecycleError::Repository`] when the lookup fails.
    pub async fn find_abandoned_orders(&self) -> OrderLifecycleResult<Vec<Order>> {
        let cutoff = self.clock.utc() - self.settings.abandonment_window;
        Ok(self.orders.find_abandoned(cutoff).await?)
    }

    /// Finds a durable order by payment identifier.
    ///
    /// # Errors
    ///
    /// Returns [`OrderLifecycleError::Repository`] when the lookup fails.
    pub async fn find_order(&self, payment_id: &PaymentId) -> OrderLifecycleResult<Option<Order>> {
        Ok(self.orders.find_by_payment_id(payment_id).await?)
    }

    async fn require_order(&self, payment_id: &PaymentId) -> OrderLifecycleResult<Order> {
        self.orders
            .find_by_payment_id(payment_id)
            .await?
            .ok_or_else(|| OrderLifecycleError::NotFound(payment_id.clone()))
    }

    async fn enrich(
        &self,
        mut order: Order,
        customer: Option<&Customer>,
    ) -> OrderLifecycleResult<Order> {
        let Some(details) = customer else {
            return Ok(order);
        };
        let before = order.customer().clone();
        order.enrich_customer(details, &*self.clock);
        if order.customer() != &before {
            self.orders.update(&order, order.status()).await?;
            debug!("customer details enriched");
        }
        Ok(order)
    }

    /// Appends the provider response of a capture whose status write lost a
    /// race to the stored order's attempt history.
    async fn record_lost_capture(&self, payment_id: &PaymentId, payment: &ProviderPayment) {
        let recorded: Result<(), OrderRepositoryError> = async {
            let Some(mut stored) = self.orders.find_by_payment_id(payment_id).await? else {
                return Ok(());
            };
            stored.record_attempt(payment.status, payment.amount, &*self.clock);
            self.orders.update(&stored, stored.status()).await
        }
        .await;
        match recorded {
            Ok(()) => warn!(
                status = %payment.status,
                "capture lost a concurrent status change; attempt recorded"
            ),
            Err(err) => warn!(error = %err, "failed to record attempt of a conflicting capture"),
        }
    }

    async fn resolve_duplicate(&self, order: &Order) -> OrderLifecycleResult<Order> {
        match self.orders.find_by_payment_id(order.payment_id()).await? {
            Some(existing) => {
                debug!("order persisted concurrently; using stored record");
                self.evict(order.payment_id()).await;
                Ok(existing)
            }
            None => Err(OrderLifecycleError::ReferenceInUse(
                order.order_reference().clone(),
            )),
        }
    }

    async fn apply_side_effects(&self, order: &mut Order, change: StatusChange) {
        if change.is_noop() {
            return;
        }
        if change.current == OrderStatus::PayerActionRequired {
            self.schedule_reminders(order.payment_id()).await;
            return;
        }

        if let Err(err) = self.reminders.cancel_all(order.payment_id()).await {
            warn!(payment_id = %order.payment_id(), error = %err, "failed to cancel reminders");
        }
        match change.current {
            OrderStatus::Completed => self.settle_catalog(order, true).await,
            OrderStatus::Voided | OrderStatus::Canceled => self.settle_catalog(order, false).await,
            _ => {}
        }
        self.notify_status(order, change.previous).await;
    }

    async fn schedule_reminders(&self, payment_id: &PaymentId) {
        if let Err(err) = self.reminders.schedule(payment_id).await {
            warn!(payment_id = %payment_id, error = %err, "failed to schedule reminders");
        }
    }

    async fn evict(&self, payment_id: &PaymentId) {
        if let Err(err) = self.cache.evict(payment_id).await {
            warn!(payment_id = %payment_id, error = %err, "failed to evict cached checkout");
        }
    }

    async fn settle_catalog(&self, order: &Order, sold: bool) {
        let Some(catalog) = self.catalog.as_ref() else {
            return;
        };
        for item in order.items() {
            let result = if sold {
                catalog.finalize(item.product_id()).await
            } else {
                catalog.release(item.product_id()).await
            };
            if let Err(err) = result {
                warn!(product_id = %item.product_id(), sold, error = %err, "catalog update failed");
            }
        }
    }

    async fn notify_status(&self, order: &mut Order, previous: OrderStatus) {
        if let Err(err) = self
            .notifications
            .send_status_notification(order, previous)
            .await
        {
            warn!(payment_id = %order.payment_id(), error = %err, "status notification failed");
            return;
        }
        order.mark_status_email_sent();
        if let Err(err) = self.orders.update(order, order.status()).await {
            warn!(payment_id = %order.payment_id(), error = %err, "failed to record status notification");
        }
    }
}

fn ensure_reference(
    payment_id: &PaymentId,
    expected: &OrderReference,
    actual: &OrderReference,
) -> OrderLifecycleResult<()> {
    if expected == actual {
        return Ok(());
    }
    Err(OrderLifecycleError::ReferenceMismatch {
        payment_id: payment_id.clone(),
        actual: actual.clone(),
    })
}
