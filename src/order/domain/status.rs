//! Order status, fulfillment status, and payment provider vocabularies.

use super::{ParseFulfillmentStatusError, ParseOrderStatusError, ParsePaymentProviderError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment lifecycle status of an order.
///
/// The vocabulary is shared by every payment provider; provider adapters
/// normalize their native statuses into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Payment was created with the provider.
    Created,
    /// The payer approved the payment; funds are not captured yet.
    Approved,
    /// The payment was voided by the provider.
    Voided,
    /// Funds were captured.
    Completed,
    /// The payment was saved for later capture.
    Saved,
    /// The provider needs further customer interaction.
    PayerActionRequired,
    /// The payment failed.
    Failed,
    /// The order was canceled by the shop.
    Canceled,
}

impl OrderStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Created,
        Self::Approved,
        Self::Voided,
        Self::Completed,
        Self::Saved,
        Self::PayerActionRequired,
        Self::Failed,
        Self::Canceled,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Approved => "APPROVED",
            Self::Voided => "VOIDED",
            Self::Completed => "COMPLETED",
            Self::Saved => "SAVED",
            Self::PayerActionRequired => "PAYER_ACTION_REQUIRED",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
        }
    }

    /// Returns whether no further transitions are permitted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Voided | Self::Canceled)
    }

    /// Returns whether reaching this status means funds were captured.
    #[must_use]
    pub const fn is_paid_equivalent(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns whether a regular transition to `target` is allowed.
    ///
    /// Statuses only progress away from non-terminal values; terminal
    /// statuses accept nothing and self-transitions are not transitions.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        !self.is_terminal() && self != target
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = ParseOrderStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "CREATED" => Ok(Self::Created),
            "APPROVED" => Ok(Self::Approved),
            "VOIDED" => Ok(Self::Voided),
            "COMPLETED" => Ok(Self::Completed),
            "SAVED" => Ok(Self::Saved),
            "PAYER_ACTION_REQUIRED" => Ok(Self::PayerActionRequired),
            "FAILED" => Ok(Self::Failed),
            "CANCELED" | "CANCELLED" => Ok(Self::Canceled),
            _ => Err(ParseOrderStatusError(value.to_owned())),
        }
    }
}

/// Warehouse-facing fulfillment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FulfillmentStatus {
    /// The order is being prepared.
    Processing,
    /// The order will not be fulfilled.
    Cancelled,
}

impl FulfillmentStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for FulfillmentStatus {
    type Error = ParseFulfillmentStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "processing" => Ok(Self::Processing),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(ParseFulfillmentStatusError(value.to_owned())),
        }
    }
}

/// Supported payment providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProviderKind {
    /// PayPal Orders API.
    Paypal,
    /// Stripe Payment Intents API.
    Stripe,
    /// Mollie Payments API.
    Mollie,
}

impl PaymentProviderKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paypal => "paypal",
            Self::Stripe => "stripe",
            Self::Mollie => "mollie",
        }
    }
}

impl fmt::Display for PaymentProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PaymentProviderKind {
    type Error = ParsePaymentProviderError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "paypal" => Ok(Self::Paypal),
            "stripe" => Ok(Self::Stripe),
            "mollie" => Ok(Self::Mollie),
            _ => Err(ParsePaymentProviderError(value.to_owned())),
        }
    }
}

/// Which of the two abandoned-checkout reminders is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    /// Short-delay nudge after the payer stalls.
    Initial,
    /// Next-day follow-up.
    Followup,
}

impl ReminderKind {
    /// Returns the identifier passed to notification templates.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Followup => "followup",
        }
    }
}

impl fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
