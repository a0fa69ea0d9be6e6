//! Lookup of payment provider adapters by provider kind.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{MollieProvider, PaypalProvider, StripeProvider};
use crate::config::AppConfig;
use crate::order::{
    domain::PaymentProviderKind,
    ports::{PaymentProvider, PaymentProviderError, ProviderResult},
};

/// Routes provider calls to the adapter registered for each kind.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<PaymentProviderKind, Arc<dyn PaymentProvider>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry holding every provider with credentials in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentProviderError::Transport`] if an HTTP client fails to
    /// build.
    pub fn from_config(config: &AppConfig) -> ProviderResult<Self> {
        let mut registry = Self::new();
        if let Some(paypal) = config.paypal.clone() {
            registry.register(Arc::new(PaypalProvider::new(paypal)?));
        }
        if let Some(stripe) = config.stripe.clone() {
            registry.register(Arc::new(StripeProvider::new(stripe)?));
        }
        if let Some(mollie) = config.mollie.clone() {
            registry.register(Arc::new(MollieProvider::new(mollie)?));
        }
        Ok(registry)
    }

    /// Adds a provider, replacing any adapter of the same kind.
    pub fn register(&mut self, provider: Arc<dyn PaymentProvider>) {
        self.providers.insert(provider.kind(), provider);
    }

    /// Adds a provider and returns the registry.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn PaymentProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Returns the adapter for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentProviderError::Unsupported`] when no adapter is
    /// registered for `kind`.
    pub fn get(&self, kind: PaymentProviderKind) -> ProviderResult<Arc<dyn PaymentProvider>> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or(PaymentProviderError::Unsupported(kind))
    }

    /// Returns the registered provider kinds.
    #[must_use]
    pub fn kinds(&self) -> Vec<PaymentProviderKind> {
        let mut kinds: Vec<_> = self.providers.keys().copied().collect();
        kinds.sort_by_key(|kind| kind.as_str());
        kinds
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
