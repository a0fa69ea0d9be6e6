//! Customer contact details gathered from checkout and payment providers.

use super::cart::looks_like_email;
use serde::{Deserialize, Serialize};

/// Customer contact details.
///
/// Every field is optional: details arrive piecemeal from the delivery form,
/// the payment provider's payer record, or an admin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    email: Option<String>,
    name: Option<String>,
    payer_id: Option<String>,
}

impl Customer {
    /// Creates an empty customer record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the email address when it is well-formed; malformed values are
    /// dropped.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        let value = email.into().trim().to_owned();
        self.email = looks_like_email(&value).then_some(value);
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = non_blank(name.into());
        self
    }

    /// Sets the provider-side payer account identifier.
    #[must_use]
    pub fn with_payer_id(mut self, payer_id: impl Into<String>) -> Self {
        self.payer_id = non_blank(payer_id.into());
        self
    }

    /// Returns the email address, if known.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the display name, if known.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the provider payer identifier, if known.
    #[must_use]
    pub fn payer_id(&self) -> Option<&str> {
        self.payer_id.as_deref()
    }

    /// Returns whether the customer can be contacted by email.
    #[must_use]
    pub const fn has_contact(&self) -> bool {
        self.email.is_some()
    }

    /// Returns whether the record proves the payer engaged with checkout.
    #[must_use]
    pub const fn is_interaction_signal(&self) -> bool {
        self.email.is_some() || self.payer_id.is_some()
    }

    /// Fills fields that are still unknown from `other`; known values win.
    pub fn fill_missing_from(&mut self, other: &Self) {
        if self.email.is_none() {
            self.email.clone_from(&other.email);
        }
        if self.name.is_none() {
            self.name.clone_from(&other.name);
        }
        if self.payer_id.is_none() {
            self.payer_id.clone_from(&other.payer_id);
        }
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
