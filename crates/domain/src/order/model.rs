//! Order records and customer details.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use common::Money;
use record_store::{Collection, Record, RecordId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::OrderStatus;
use crate::error::Result;

static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+?998)?[0-9]{9}$").expect("phone pattern is a valid regex")
});

static PHONE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\-()]").expect("separator pattern is a valid regex"));

/// Strips spaces, dashes and parentheses from a phone number.
pub fn normalize_phone(phone: &str) -> String {
    PHONE_SEPARATORS.replace_all(phone, "").into_owned()
}

fn validate_phone(phone: &str) -> std::result::Result<(), ValidationError> {
    if PHONE_PATTERN.is_match(&normalize_phone(phone)) {
        Ok(())
    } else {
        Err(ValidationError::new("phone"))
    }
}

/// Customer data supplied at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CustomerDetails {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Customer name is required and must be at most 255 characters"
    ))]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "Customer email is not a valid address"))]
    pub email: Option<String>,

    #[serde(default)]
    #[validate(custom(
        function = "validate_phone",
        message = "Customer phone must be 9 digits with an optional +998 prefix"
    ))]
    pub phone: Option<String>,
}

impl CustomerDetails {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            phone: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Trims fields, treats blank optional fields as absent, validates,
    /// and returns the details with the phone number normalized.
    pub fn validated(self) -> Result<Self> {
        let blank_to_none = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let details = Self {
            name: self.name.trim().to_string(),
            email: blank_to_none(self.email),
            phone: blank_to_none(self.phone),
        };
        details.validate()?;

        Ok(Self {
            phone: details.phone.as_deref().map(normalize_phone),
            ..details
        })
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a pending order for validated customer details.
    pub fn pending(customer: CustomerDetails, total_amount: Money) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            customer_name: customer.name,
            customer_email: customer.email,
            customer_phone: customer.phone,
            total_amount,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of an order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

impl Record for Order {
    const COLLECTION: Collection = Collection::Orders;
    type Patch = OrderPatch;

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn stamp_created(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }

    fn stamp_updated(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

/// One line of an order, with the price frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub order_id: RecordId,
    pub product_id: RecordId,
    pub product_name: String,
    pub quantity: u32,
    pub price: Money,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn new(
        order_id: RecordId,
        product_id: RecordId,
        product_name: impl Into<String>,
        quantity: u32,
        price: Money,
    ) -> Self {
        Self {
            id: None,
            order_id,
            product_id,
            product_name: product_name.into(),
            quantity,
            price,
            created_at: Utc::now(),
        }
    }

    pub fn subtotal(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// Order items are never edited in place.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderItemPatch {}

impl Record for OrderItem {
    const COLLECTION: Collection = Collection::OrderItems;
    type Patch = OrderItemPatch;

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn stamp_created(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }
}

/// An order together with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderDetails {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of `price × quantity` over the items.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(OrderItem::subtotal).sum()
    }
}

/// Aggregate figures over all orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderStatistics {
    pub total_orders: usize,
    pub by_status: BTreeMap<String, usize>,
    pub total_revenue: Money,
    pub average_order_value: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DomainError;

    #[test]
    fn valid_customer_passes() {
        let customer = CustomerDetails::new("  Aziz Karimov ")
            .with_email("aziz@example.uz")
            .with_phone("+998 (90) 123-45-67")
            .validated()
            .unwrap();

        assert_eq!(customer.name, "Aziz Karimov");
        assert_eq!(customer.email.as_deref(), Some("aziz@example.uz"));
        assert_eq!(customer.phone.as_deref(), Some("+998901234567"));
    }

    #[test]
    fn optional_fields_may_be_blank() {
        let customer = CustomerDetails::new("Dilnoza")
            .with_email("   ")
            .with_phone("")
            .validated()
            .unwrap();
        assert_eq!(customer.email, None);
        assert_eq!(customer.phone, None);
    }

    #[test]
    fn bare_nine_digit_phone_is_accepted() {
        assert!(CustomerDetails::new("A").with_phone("901234567").validated().is_ok());
        assert!(CustomerDetails::new("A").with_phone("998901234567").validated().is_ok());
    }

    #[test]
    fn empty_name_is_rejected() {
        let result = CustomerDetails::new("   ").validated();
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn long_name_is_rejected() {
        let result = CustomerDetails::new("x".repeat(256)).validated();
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(CustomerDetails::new("x".repeat(255)).validated().is_ok());
    }

    #[test]
    fn malformed_email_and_phone_report_both() {
        let result = CustomerDetails::new("Bekzod")
            .with_email("not-an-email")
            .with_phone("+7 999 123 45 67")
            .validated();

        match result {
            Err(DomainError::Validation(messages)) => {
                assert_eq!(messages.len(), 2);
                assert!(messages.iter().any(|m| m.contains("email")));
                assert!(messages.iter().any(|m| m.contains("phone")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn order_item_subtotal() {
        let item = OrderItem::new(
            RecordId::new(1),
            RecordId::new(6),
            "Creatine Monohydrate 500g",
            2,
            Money::new(150_000),
        );
        assert_eq!(item.subtotal(), Money::new(300_000));
    }

    #[test]
    fn order_serializes_status_lowercase() {
        let order = Order::pending(CustomerDetails::new("Kamola"), Money::new(15_000));
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["total_amount"], 15_000);
        assert!(json.get("id").is_none());
    }
}
