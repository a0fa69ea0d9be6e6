//! Order aggregate root and its payment lifecycle state machine.

use super::{
    CartItem, CheckoutSnapshot, Customer, DeliveryDetails, FulfillmentStatus, Measurements,
    OrderDomainError, OrderId, OrderReference, OrderStatus, PaymentId, PaymentProviderKind,
    ReminderKind,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One entry of the append-only payment audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAttempt {
    /// Provider that answered the call.
    pub provider: PaymentProviderKind,
    /// Provider payment identifier.
    pub payment_id: PaymentId,
    /// Normalized status reported by the provider.
    pub status: OrderStatus,
    /// Amount reported by the provider, if any.
    pub amount: Option<Decimal>,
    /// When the call completed.
    pub attempted_at: DateTime<Utc>,
}

/// When each abandoned-checkout reminder was delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderLog {
    /// Delivery time of the initial reminder.
    pub initial_sent_at: Option<DateTime<Utc>>,
    /// Delivery time of the follow-up reminder.
    pub followup_sent_at: Option<DateTime<Utc>>,
}

impl ReminderLog {
    /// Returns the delivery time recorded for `kind`.
    #[must_use]
    pub const fn sent_at(&self, kind: ReminderKind) -> Option<DateTime<Utc>> {
        match kind {
            ReminderKind::Initial => self.initial_sent_at,
            ReminderKind::Followup => self.followup_sent_at,
        }
    }

    /// Records a delivery for `kind` unless one is already recorded.
    ///
    /// Returns `true` when the marker was newly set.
    pub const fn record(&mut self, kind: ReminderKind, at: DateTime<Utc>) -> bool {
        let slot = match kind {
            ReminderKind::Initial => &mut self.initial_sent_at,
            ReminderKind::Followup => &mut self.followup_sent_at,
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(at);
        true
    }
}

/// Why and when an order was canceled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    /// Free-form reason supplied by the caller.
    pub reason: String,
    /// Cancellation time.
    pub cancelled_at: DateTime<Utc>,
}

/// Before/after view of a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    /// Status before the operation.
    pub previous: OrderStatus,
    /// Status after the operation.
    pub current: OrderStatus,
}

impl StatusChange {
    /// Returns whether the status did not move.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.previous == self.current
    }
}

/// Order aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_reference: OrderReference,
    provider: PaymentProviderKind,
    payment_id: PaymentId,
    status: OrderStatus,
    fulfillment_status: FulfillmentStatus,
    items: Vec<CartItem>,
    total_amount: Decimal,
    currency: String,
    measurements: Option<Measurements>,
    delivery_details: Option<DeliveryDetails>,
    customer: Customer,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    payment_attempts: Vec<PaymentAttempt>,
    status_email_sent: bool,
    reminders: ReminderLog,
    cancellation: Option<Cancellation>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted order aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedOrderData {
    /// Persisted order identifier.
    pub id: OrderId,
    /// Persisted idempotency key.
    pub order_reference: OrderReference,
    /// Persisted payment provider.
    pub provider: PaymentProviderKind,
    /// Persisted provider payment identifier.
    pub payment_id: PaymentId,
    /// Persisted payment status.
    pub status: OrderStatus,
    /// Persisted fulfillment status.
    pub fulfillment_status: FulfillmentStatus,
    /// Persisted cart snapshot.
    pub items: Vec<CartItem>,
    /// Persisted order total.
    pub total_amount: Decimal,
    /// Persisted currency code.
    pub currency: String,
    /// Persisted measurements.
    pub measurements: Option<Measurements>,
    /// Persisted delivery details.
    pub delivery_details: Option<DeliveryDetails>,
    /// Persisted customer details.
    pub customer: Customer,
    /// Persisted paid flag.
    pub is_paid: bool,
    /// Persisted payment time.
    pub paid_at: Option<DateTime<Utc>>,
    /// Persisted payment audit log.
    pub payment_attempts: Vec<PaymentAttempt>,
    /// Persisted status-email flag.
    pub status_email_sent: bool,
    /// Persisted reminder delivery markers.
    pub reminders: ReminderLog,
    /// Persisted cancellation details.
    pub cancellation: Option<Cancellation>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a durable order from a cached checkout once the payer has
    /// interacted with the provider.
    ///
    /// The order starts in [`OrderStatus::PayerActionRequired`] with
    /// fulfillment [`FulfillmentStatus::Processing`]. A delivery email fills
    /// in a missing customer email.
    #[must_use]
    pub fn from_checkout(
        snapshot: CheckoutSnapshot,
        customer: Option<Customer>,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        let mut known_customer = customer.unwrap_or_default();
        if let Some(email) = snapshot
            .delivery_details
            .as_ref()
            .and_then(DeliveryDetails::email)
        {
            known_customer.fill_missing_from(&Customer::new().with_email(email));
        }

        Self {
            id: OrderId::new(),
            order_reference: snapshot.order_reference,
            provider: snapshot.provider,
            payment_id: snapshot.payment_id,
            status: OrderStatus::PayerActionRequired,
            fulfillment_status: FulfillmentStatus::Processing,
            items: snapshot.items,
            total_amount: snapshot.total_amount,
            currency: snapshot.currency,
            measurements: snapshot.measurements,
            delivery_details: snapshot.delivery_details,
            customer: known_customer,
            is_paid: false,
            paid_at: None,
            payment_attempts: Vec::new(),
            status_email_sent: false,
            reminders: ReminderLog::default(),
            cancellation: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs an order from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedOrderData) -> Self {
        Self {
            id: data.id,
            order_reference: data.order_reference,
            provider: data.provider,
            payment_id: data.payment_id,
            status: data.status,
            fulfillment_status: data.fulfillment_status,
            items: data.items,
            total_amount: data.total_amount,
            currency: data.currency,
            measurements: data.measurements,
            delivery_details: data.delivery_details,
            customer: data.customer,
            is_paid: data.is_paid,
            paid_at: data.paid_at,
            payment_attempts: data.payment_attempts,
            status_email_sent: data.status_email_sent,
            reminders: data.reminders,
            cancellation: data.cancellation,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the order identifier.
    #[must_use]
    pub const fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the client idempotency key.
    #[must_use]
    pub const fn order_reference(&self) -> &OrderReference {
        &self.order_reference
    }

    /// Returns the payment provider.
    #[must_use]
    pub const fn provider(&self) -> PaymentProviderKind {
        self.provider
    }

    /// Returns the provider payment identifier.
    #[must_use]
    pub const fn payment_id(&self) -> &PaymentId {
        &self.payment_id
    }

    /// Returns the payment status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the fulfillment status.
    #[must_use]
    pub const fn fulfillment_status(&self) -> FulfillmentStatus {
        self.fulfillment_status
    }

    /// Returns the cart snapshot.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Returns the order total.
    #[must_use]
    pub const fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    /// Returns the ISO currency code.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Returns the measurements, if any.
    #[must_use]
    pub const fn measurements(&self) -> Option<&Measurements> {
        self.measurements.as_ref()
    }

    /// Returns the delivery details, if any.
    #[must_use]
    pub const fn delivery_details(&self) -> Option<&DeliveryDetails> {
        self.delivery_details.as_ref()
    }

    /// Returns the known customer details.
    #[must_use]
    pub const fn customer(&self) -> &Customer {
        &self.customer
    }

    /// Returns whether funds were captured.
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        self.is_paid
    }

    /// Returns when funds were captured.
    #[must_use]
    pub const fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    /// Returns the payment audit log, oldest first.
    #[must_use]
    pub fn payment_attempts(&self) -> &[PaymentAttempt] {
        &self.payment_attempts
    }

    /// Returns whether a notification for the current status was delivered.
    #[must_use]
    pub const fn status_email_sent(&self) -> bool {
        self.status_email_sent
    }

    /// Returns the reminder delivery markers.
    #[must_use]
    pub const fn reminders(&self) -> ReminderLog {
        self.reminders
    }

    /// Returns whether the reminder of `kind` was delivered.
    #[must_use]
    pub const fn reminder_sent(&self, kind: ReminderKind) -> bool {
        self.reminders.sent_at(kind).is_some()
    }

    /// Returns the cancellation details, if canceled.
    #[must_use]
    pub const fn cancellation(&self) -> Option<&Cancellation> {
        self.cancellation.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Fails when the order is paid and therefore locked.
    ///
    /// # Errors
    ///
    /// Returns [`OrderDomainError::AlreadyPaid`] when `is_paid` is set.
    pub fn ensure_not_paid(&self) -> Result<(), OrderDomainError> {
        if self.is_paid {
            return Err(OrderDomainError::AlreadyPaid(self.payment_id.clone()));
        }
        Ok(())
    }

    /// Fails when a capture must not reach the provider.
    ///
    /// # Errors
    ///
    /// Returns [`OrderDomainError::AlreadyPaid`] for paid orders and
    /// [`OrderDomainError::TerminalStatus`] for voided or canceled ones.
    pub fn ensure_capturable(&self) -> Result<(), OrderDomainError> {
        self.ensure_not_paid()?;
        self.ensure_not_terminal()
    }

    fn ensure_not_terminal(&self) -> Result<(), OrderDomainError> {
        if self.status.is_terminal() {
            return Err(OrderDomainError::TerminalStatus {
                payment_id: self.payment_id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// Appends a provider answer to the audit log.
    pub fn record_attempt(
        &mut self,
        status: OrderStatus,
        amount: Option<Decimal>,
        clock: &impl Clock,
    ) {
        let attempted_at = clock.utc();
        self.payment_attempts.push(PaymentAttempt {
            provider: self.provider,
            payment_id: self.payment_id.clone(),
            status,
            amount,
            attempted_at,
        });
        self.updated_at = attempted_at;
    }

    /// Applies the outcome of a provider capture.
    ///
    /// Appends an audit entry and moves to the captured status. Reaching
    /// [`OrderStatus::Completed`] sets `is_paid` and `paid_at`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderDomainError::AlreadyPaid`] or
    /// [`OrderDomainError::TerminalStatus`] when the order is not capturable;
    /// the order is left unchanged.
    pub fn record_capture(
        &mut self,
        status: OrderStatus,
        amount: Option<Decimal>,
        clock: &impl Clock,
    ) -> Result<StatusChange, OrderDomainError> {
        self.ensure_capturable()?;
        self.record_attempt(status, amount, clock);
        let previous = self.status;
        if previous != status {
            self.set_status(status, clock);
        }
        Ok(StatusChange {
            previous,
            current: self.status,
        })
    }

    /// Moves the order to `target` through a regular transition.
    ///
    /// Requesting the current status is a no-op that reports an unchanged
    /// [`StatusChange`].
    ///
    /// # Errors
    ///
    /// Returns [`OrderDomainError::AlreadyPaid`] for paid orders and
    /// [`OrderDomainError::TerminalStatus`] when the current status is
    /// terminal.
    pub fn transition_to(
        &mut self,
        target: OrderStatus,
        clock: &impl Clock,
    ) -> Result<StatusChange, OrderDomainError> {
        self.ensure_not_paid()?;
        let previous = self.status;
        if previous == target {
            return Ok(StatusChange {
                previous,
                current: previous,
            });
        }
        self.ensure_not_terminal()?;
        self.set_status(target, clock);
        Ok(StatusChange {
            previous,
            current: target,
        })
    }

    /// Moves the order to `target` even out of a terminal status.
    ///
    /// The paid lock still applies.
    ///
    /// # Errors
    ///
    /// Returns [`OrderDomainError::AlreadyPaid`] for paid orders.
    pub fn override_status(
        &mut self,
        target: OrderStatus,
        clock: &impl Clock,
    ) -> Result<StatusChange, OrderDomainError> {
        self.ensure_not_paid()?;
        let previous = self.status;
        if previous != target {
            self.set_status(target, clock);
        }
        Ok(StatusChange {
            previous,
            current: target,
        })
    }

    /// Cancels the order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderDomainError::TerminalStatus`] when the order is already
    /// completed, voided, or canceled.
    pub fn cancel(
        &mut self,
        reason: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<StatusChange, OrderDomainError> {
        self.ensure_not_terminal()?;
        let previous = self.status;
        self.set_status(OrderStatus::Canceled, clock);
        self.fulfillment_status = FulfillmentStatus::Cancelled;
        self.cancellation = Some(Cancellation {
            reason: reason.into(),
            cancelled_at: self.updated_at,
        });
        Ok(StatusChange {
            previous,
            current: OrderStatus::Canceled,
        })
    }

    /// Fills unknown customer fields from `details`.
    pub fn enrich_customer(&mut self, details: &Customer, clock: &impl Clock) {
        let before = self.customer.clone();
        self.customer.fill_missing_from(details);
        if self.customer != before {
            self.touch(clock);
        }
    }

    /// Marks the notification for the current status as delivered.
    pub const fn mark_status_email_sent(&mut self) {
        self.status_email_sent = true;
    }

    /// Records delivery of the reminder of `kind`.
    ///
    /// Returns `false` when the reminder was already recorded.
    pub const fn mark_reminder_sent(&mut self, kind: ReminderKind, at: DateTime<Utc>) -> bool {
        self.reminders.record(kind, at)
    }

    /// Replaces reminder markers with the stored values.
    ///
    /// Status writers never own reminder markers; repositories call this to
    /// keep the stored markers when saving a status change.
    pub(crate) const fn restore_reminders(&mut self, reminders: ReminderLog) {
        self.reminders = reminders;
    }

    /// Returns whether the order still awaits the payer although the
    /// follow-up reminder went out before `cutoff`.
    #[must_use]
    pub fn is_abandoned(&self, cutoff: DateTime<Utc>) -> bool {
        self.status == OrderStatus::PayerActionRequired
            && self
                .reminders
                .followup_sent_at
                .is_some_and(|sent_at| sent_at < cutoff)
    }

    fn set_status(&mut self, target: OrderStatus, clock: &impl Clock) {
        let timestamp = clock.utc();
        self.status = target;
        self.status_email_sent = false;
        if target.is_paid_equivalent() && !self.is_paid {
            self.is_paid = true;
            self.paid_at = Some(timestamp);
        }
        self.updated_at = timestamp;
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
