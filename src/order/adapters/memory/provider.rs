//! Scriptable payment provider for tests and local runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{
    Arc, RwLock,
    atomic::{AtomicUsize, Ordering},
};

use crate::order::{
    domain::{Customer, OrderReference, OrderStatus, PaymentId, PaymentProviderKind},
    ports::{
        PaymentIntentRequest, PaymentProvider, PaymentProviderError, ProviderPayment,
        ProviderResult,
    },
};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
struct ScriptedPayment {
    status: OrderStatus,
    order_reference: OrderReference,
    amount: Decimal,
    payer: Option<Customer>,
}

#[derive(Debug, Default)]
struct ProviderState {
    payments: HashMap<PaymentId, ScriptedPayment>,
    capture_status: Option<OrderStatus>,
    capture_failure: Option<PaymentProviderError>,
}

/// In-memory stand-in for a real payment provider.
///
/// Payments are created in `CREATED`; captures succeed with `COMPLETED`
/// unless scripted otherwise. Call counters let callers assert that a code
/// path never reached the provider.
#[derive(Debug, Clone)]
pub struct InMemoryPaymentProvider {
    kind: PaymentProviderKind,
    state: Arc<RwLock<ProviderState>>,
    next_id: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
    capture_calls: Arc<AtomicUsize>,
}

impl InMemoryPaymentProvider {
    /// Creates a provider that reports itself as `kind`.
    #[must_use]
    pub fn new(kind: PaymentProviderKind) -> Self {
        Self {
            kind,
            state: Arc::new(RwLock::new(ProviderState::default())),
            next_id: Arc::new(AtomicUsize::new(1)),
            create_calls: Arc::new(AtomicUsize::new(0)),
            capture_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Marks the payer as having engaged with the payment.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentProviderError::Api`] with status 404 for unknown
    /// payments.
    pub fn set_payer(&self, payment_id: &PaymentId, payer: Customer) -> ProviderResult<()> {
        self.with_payment(payment_id, |payment| {
            payment.payer = Some(payer);
            Ok(())
        })
    }

    /// Overrides the provider-side status of a payment.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentProviderError::Api`] with status 404 for unknown
    /// payments.
    pub fn set_status(&self, payment_id: &PaymentId, status: OrderStatus) -> ProviderResult<()> {
        self.with_payment(payment_id, |payment| {
            payment.status = status;
            Ok(())
        })
    }

    /// Sets the status returned by subsequent captures.
    pub fn set_capture_status(&self, status: OrderStatus) {
        if let Ok(mut state) = self.state.write() {
            state.capture_status = Some(status);
        }
    }

    /// Makes subsequent captures fail with `error` (`None` clears it).
    pub fn set_capture_failure(&self, error: Option<PaymentProviderError>) {
        if let Ok(mut state) = self.state.write() {
            state.capture_failure = error;
        }
    }

    /// Returns how many payment intents were requested.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Returns how many captures were requested.
    #[must_use]
    pub fn capture_calls(&self) -> usize {
        self.capture_calls.load(Ordering::SeqCst)
    }

    fn with_payment<T>(
        &self,
        payment_id: &PaymentId,
        f: impl FnOnce(&mut ScriptedPayment) -> ProviderResult<T>,
    ) -> ProviderResult<T> {
        let mut state = self.state.write().map_err(|err| lock_error(&err))?;
        let payment = state
            .payments
            .get_mut(payment_id)
            .ok_or_else(|| not_found(payment_id))?;
        f(payment)
    }
}

fn lock_error(err: &dyn std::fmt::Display) -> PaymentProviderError {
    PaymentProviderError::transport(std::io::Error::other(err.to_string()))
}

fn not_found(payment_id: &PaymentId) -> PaymentProviderError {
    PaymentProviderError::Api {
        status: 404,
        message: format!("payment {payment_id} does not exist"),
    }
}

#[async_trait]
impl PaymentProvider for InMemoryPaymentProvider {
    fn kind(&self) -> PaymentProviderKind {
        self.kind
    }

    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> ProviderResult<ProviderPayment> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let sequence = self.next_id.fetch_add(1, Ordering::SeqCst);
        let payment_id = PaymentId::new(format!("{}-{sequence:06}", self.kind.as_str()))
            .map_err(|err| PaymentProviderError::MalformedResponse(err.to_string()))?;

        let mut state = self.state.write().map_err(|err| lock_error(&err))?;
        state.payments.insert(
            payment_id.clone(),
            ScriptedPayment {
                status: OrderStatus::Created,
                order_reference: request.order_reference.clone(),
                amount: request.total_amount,
                payer: None,
            },
        );
        Ok(ProviderPayment {
            id: payment_id.clone(),
            status: OrderStatus::Created,
            order_reference: request.order_reference.clone(),
            amount: Some(request.total_amount),
            approval_url: Some(format!("https://pay.invalid/approve/{payment_id}")),
            client_secret: None,
        })
    }

    async fn capture_payment(
        &self,
        payment_id: &PaymentId,
        order_reference: &OrderReference,
    ) -> ProviderResult<ProviderPayment> {
        self.capture_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().map_err(|err| lock_error(&err))?;
        if let Some(failure) = state.capture_failure.clone() {
            return Err(failure);
        }
        let capture_status = state.capture_status.unwrap_or(OrderStatus::Completed);
        let payment = state
            .payments
            .get_mut(payment_id)
            .ok_or_else(|| not_found(payment_id))?;
        if &payment.order_reference != order_reference {
            return Err(PaymentProviderError::Api {
                status: 422,
                message: format!("reference {order_reference} does not match payment"),
            });
        }
        payment.status = capture_status;
        Ok(ProviderPayment {
            id: payment_id.clone(),
            status: capture_status,
            order_reference: payment.order_reference.clone(),
            amount: Some(payment.amount),
            approval_url: None,
            client_secret: None,
        })
    }

    async fn get_payment_status(&self, payment_id: &PaymentId) -> ProviderResult<OrderStatus> {
        let state = self.state.read().map_err(|err| lock_error(&err))?;
        state
            .payments
            .get(payment_id)
            .map(|payment| payment.status)
            .ok_or_else(|| not_found(payment_id))
    }

    async fn get_payer(&self, payment_id: &PaymentId) -> ProviderResult<Option<Customer>> {
        let state = self.state.read().map_err(|err| lock_error(&err))?;
        state
            .payments
            .get(payment_id)
            .map(|payment| payment.payer.clone())
            .ok_or_else(|| not_found(payment_id))
    }
}
