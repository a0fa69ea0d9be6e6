//! In-memory order repository for tests and single-process deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::order::{
    domain::{Order, OrderId, OrderReference, OrderStatus, PaymentId, ReminderKind},
    ports::{OrderRepository, OrderRepositoryError, OrderRepositoryResult},
};

/// Thread-safe in-memory order repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    state: Arc<RwLock<InMemoryOrderState>>,
}

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: HashMap<OrderId, Order>,
    payment_index: HashMap<PaymentId, OrderId>,
    reference_index: HashMap<OrderReference, OrderId>,
}

impl InMemoryOrderRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl InMemoryOrderState {
    fn by_payment_id(&self, payment_id: &PaymentId) -> Option<&Order> {
        self.payment_index
            .get(payment_id)
            .and_then(|order_id| self.orders.get(order_id))
    }
}

fn lock_error(err: &dyn std::fmt::Display) -> OrderRepositoryError {
    OrderRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn store(&self, order: &Order) -> OrderRepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| lock_error(&err))?;
        if state.payment_index.contains_key(order.payment_id()) {
            return Err(OrderRepositoryError::DuplicatePaymentId(
                order.payment_id().clone(),
            ));
        }
        if state.reference_index.contains_key(order.order_reference()) {
            return Err(OrderRepositoryError::DuplicateReference(
                order.order_reference().clone(),
            ));
        }

        state
            .payment_index
            .insert(order.payment_id().clone(), order.id());
        state
            .reference_index
            .insert(order.order_reference().clone(), order.id());
        state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn update(
        &self,
        order: &Order,
        expected_status: OrderStatus,
    ) -> OrderRepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| lock_error(&err))?;
        let stored = state
            .orders
            .get(&order.id())
            .ok_or_else(|| OrderRepositoryError::NotFound(order.payment_id().clone()))?;
        if stored.status() != expected_status {
            return Err(OrderRepositoryError::StatusConflict {
                payment_id: order.payment_id().clone(),
                expected: expected_status,
                actual: stored.status(),
            });
        }

        let mut updated = order.clone();
        updated.restore_reminders(stored.reminders());
        state.orders.insert(order.id(), updated);
        Ok(())
    }

    async fn find_by_payment_id(
        &self,
        payment_id: &PaymentId,
    ) -> OrderRepositoryResult<Option<Order>> {
        let state = self.state.read().map_err(|err| lock_error(&err))?;
        Ok(state.by_payment_id(payment_id).cloned())
    }

    async fn find_by_reference(
        &self,
        order_reference: &OrderReference,
    ) -> OrderRepositoryResult<Option<Order>> {
        let state = self.state.read().map_err(|err| lock_error(&err))?;
        let order = state
            .reference_index
            .get(order_reference)
            .and_then(|order_id| state.orders.get(order_id))
            .cloned();
        Ok(order)
    }

    async fn find_abandoned(&self, cutoff: DateTime<Utc>) -> OrderRepositoryResult<Vec<Order>> {
        let state = self.state.read().map_err(|err| lock_error(&err))?;
        let mut abandoned: Vec<Order> = state
            .orders
            .values()
            .filter(|order| order.is_abandoned(cutoff))
            .cloned()
            .collect();
        abandoned.sort_by_key(|order| order.reminders().followup_sent_at);
        Ok(abandoned)
    }

    async fn record_reminder_sent(
        &self,
        payment_id: &PaymentId,
        kind: ReminderKind,
        sent_at: DateTime<Utc>,
    ) -> OrderRepositoryResult<bool> {
        let mut state = self.state.write().map_err(|err| lock_error(&err))?;
        let order_id = *state
            .payment_index
            .get(payment_id)
            .ok_or_else(|| OrderRepositoryError::NotFound(payment_id.clone()))?;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| OrderRepositoryError::NotFound(payment_id.clone()))?;
        Ok(order.mark_reminder_sent(kind, sent_at))
    }
}
