//! Cart snapshot, measurement, and delivery value types.

use super::{OrderDomainError, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unvalidated cart line as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineInput {
    /// Catalog product identifier.
    pub id: String,
    /// Product display name.
    pub name: String,
    /// Unit price.
    pub price: Decimal,
    /// Number of units.
    pub quantity: i64,
}

impl CartLineInput {
    /// Creates a cart line input.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Decimal, quantity: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            quantity,
        }
    }
}

/// Validated, immutable cart line captured at intent-creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    product_id: ProductId,
    name: String,
    unit_price: Decimal,
    quantity: u32,
}

impl CartItem {
    /// Validates a client cart line.
    ///
    /// # Errors
    ///
    /// Returns [`OrderDomainError`] when the product id or name is empty, the
    /// price is not positive, or the quantity is not a positive integer that
    /// fits in `u32`.
    pub fn from_input(input: CartLineInput) -> Result<Self, OrderDomainError> {
        let product_id = ProductId::new(input.id)?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(OrderDomainError::EmptyProductName(
                product_id.as_str().to_owned(),
            ));
        }
        if input.price <= Decimal::ZERO {
            return Err(OrderDomainError::InvalidPrice {
                product_id: product_id.as_str().to_owned(),
                price: input.price.to_string(),
            });
        }
        let quantity = u32::try_from(input.quantity)
            .ok()
            .filter(|quantity| *quantity > 0)
            .ok_or_else(|| OrderDomainError::InvalidQuantity {
                product_id: product_id.as_str().to_owned(),
                quantity: input.quantity,
            })?;

        Ok(Self {
            product_id,
            name: name.to_owned(),
            unit_price: input.price,
            quantity,
        })
    }

    /// Returns the product identifier.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    /// Returns the product name at snapshot time.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unit price at snapshot time.
    #[must_use]
    pub const fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// Returns the number of units.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Returns `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Validated, non-empty cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Validates every client line and builds a cart.
    ///
    /// # Errors
    ///
    /// Returns [`OrderDomainError::EmptyCart`] for an empty input or the first
    /// line validation error encountered.
    pub fn from_inputs(lines: Vec<CartLineInput>) -> Result<Self, OrderDomainError> {
        if lines.is_empty() {
            return Err(OrderDomainError::EmptyCart);
        }
        let items = lines
            .into_iter()
            .map(CartItem::from_input)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { items })
    }

    /// Returns the cart lines.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Consumes the cart and returns its lines.
    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    /// Returns the sum of all line totals.
    #[must_use]
    pub fn total(&self) -> Decimal {
        total_of(&self.items)
    }
}

/// Sums the line totals of a slice of cart items.
#[must_use]
pub fn total_of(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::line_total).sum()
}

/// Named body measurements submitted with a tailored order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Measurements(BTreeMap<String, Decimal>);

impl Measurements {
    /// Validates a set of named measurements.
    ///
    /// # Errors
    ///
    /// Returns [`OrderDomainError::InvalidMeasurement`] when a name is empty
    /// or a value is not positive.
    pub fn new(
        values: impl IntoIterator<Item = (String, Decimal)>,
    ) -> Result<Self, OrderDomainError> {
        let mut validated = BTreeMap::new();
        for (name, value) in values {
            let trimmed = name.trim();
            if trimmed.is_empty() || value <= Decimal::ZERO {
                return Err(OrderDomainError::InvalidMeasurement(name));
            }
            validated.insert(trimmed.to_owned(), value);
        }
        Ok(Self(validated))
    }

    /// Returns a named measurement.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Decimal> {
        self.0.get(name).copied()
    }

    /// Returns whether no measurements are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Postal address for shipping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    /// First address line.
    pub line1: String,
    /// Optional second address line.
    pub line2: Option<String>,
    /// City or locality.
    pub city: String,
    /// Postal code.
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
}

/// Recipient and address details for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    recipient: String,
    email: Option<String>,
    phone: Option<String>,
    address: ShippingAddress,
}

impl DeliveryDetails {
    /// Validates delivery details.
    ///
    /// # Errors
    ///
    /// Returns [`OrderDomainError::InvalidDeliveryDetails`] when the recipient,
    /// street, city, or postal code is empty, the country is not a two-letter
    /// code, or the email is malformed.
    pub fn new(
        recipient: impl Into<String>,
        email: Option<String>,
        phone: Option<String>,
        address: ShippingAddress,
    ) -> Result<Self, OrderDomainError> {
        let recipient_name = recipient.into().trim().to_owned();
        if recipient_name.is_empty() {
            return Err(invalid_delivery("recipient must not be empty"));
        }
        if address.line1.trim().is_empty()
            || address.city.trim().is_empty()
            || address.postal_code.trim().is_empty()
        {
            return Err(invalid_delivery("street, city, and postal code are required"));
        }
        let country_code = address.country.trim().to_ascii_uppercase();
        if country_code.len() != 2 || !country_code.chars().all(|ch| ch.is_ascii_alphabetic()) {
            return Err(invalid_delivery("country must be a two-letter code"));
        }
        let contact_email = email.map(|value| value.trim().to_owned());
        if contact_email.as_deref().is_some_and(|value| !looks_like_email(value)) {
            return Err(invalid_delivery("email is malformed"));
        }

        let normalized_address = ShippingAddress {
            country: country_code,
            ..address
        };
        Ok(Self {
            recipient: recipient_name,
            email: contact_email,
            phone: phone.map(|value| value.trim().to_owned()),
            address: normalized_address,
        })
    }

    /// Returns the recipient name.
    #[must_use]
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Returns the contact email, if provided.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the contact phone number, if provided.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    /// Returns the shipping address.
    #[must_use]
    pub const fn address(&self) -> &ShippingAddress {
        &self.address
    }
}

fn invalid_delivery(reason: &str) -> OrderDomainError {
    OrderDomainError::InvalidDeliveryDetails(reason.to_owned())
}

pub(crate) fn looks_like_email(value: &str) -> bool {
    let mut parts = value.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    !local.is_empty() && domain.contains('.') && !value.chars().any(char::is_whitespace)
}
