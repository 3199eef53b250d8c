use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;
use super::money::Money;
use super::validation::Validator;

pub const STATUS_PROCESSING: &str = "Processing";
pub const STATUS_DELIVERED: &str = "Delivered";

#[derive(Debug, Clone, PartialEq)]
pub struct ShippingInput {
    pub address: String,
    pub city: String,
    pub phone_no: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub name: String,
    pub price: Money,
    pub quantity: i32,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentInput {
    pub reference: String,
    pub status: String,
}

/// Everything a caller supplies to place an order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderInput {
    pub items: Vec<OrderItemInput>,
    pub shipping: ShippingInput,
    pub payment: PaymentInput,
    pub items_price: Money,
    pub tax_price: Money,
    pub shipping_price: Money,
    pub total_price: Money,
}

impl OrderInput {
    /// Check the aggregate before anything is written.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut v = Validator::new();

        v.check(
            !self.items.is_empty(),
            "orderItems",
            "at least one item is required",
        );
        for (i, item) in self.items.iter().enumerate() {
            v.require(&item.name, format!("orderItems[{i}].name"), "item name is required");
            v.check(
                item.quantity >= 1,
                format!("orderItems[{i}].quantity"),
                "quantity must be at least 1",
            );
        }

        v.require(&self.shipping.address, "shippingInfo.address", "address field is empty");
        v.require(&self.shipping.city, "shippingInfo.city", "city field is empty");
        v.require(&self.shipping.phone_no, "shippingInfo.phoneNo", "phone number field is empty");
        v.require(&self.shipping.postal_code, "shippingInfo.postalCode", "postal code field is empty");
        v.require(&self.shipping.country, "shippingInfo.country", "country field is empty");

        v.require(&self.payment.reference, "paymentInfo.id", "payment id is required");
        v.require(&self.payment.status, "paymentInfo.status", "payment status is required");

        let expected = self
            .items_price
            .checked_add(self.tax_price)
            .and_then(|m| m.checked_add(self.shipping_price));
        v.check(
            expected == Some(self.total_price),
            "totalPrice",
            "total must equal items + tax + shipping",
        );

        v.finish()
    }

    /// Assign identities and timestamps, producing the aggregate to persist.
    ///
    /// Every child row carries the header's id.
    pub fn into_order(self, user_id: Uuid, now: DateTime<Utc>) -> Order {
        let order_id = Uuid::new_v4();

        let items = self
            .items
            .into_iter()
            .map(|i| OrderItem {
                id: Uuid::new_v4(),
                order_id,
                product_id: i.product_id,
                name: i.name,
                price: i.price,
                quantity: i.quantity,
                image: i.image,
                created_at: now,
            })
            .collect();

        Order {
            id: order_id,
            user_id,
            items_price: self.items_price,
            tax_price: self.tax_price,
            shipping_price: self.shipping_price,
            total_price: self.total_price,
            order_status: STATUS_PROCESSING.to_string(),
            paid_at: now,
            delivered_at: None,
            created_at: now,
            shipping: Shipping {
                id: Uuid::new_v4(),
                order_id,
                address: self.shipping.address,
                city: self.shipping.city,
                phone_no: self.shipping.phone_no,
                postal_code: self.shipping.postal_code,
                country: self.shipping.country,
                created_at: now,
            },
            items,
            payment: Payment {
                id: Uuid::new_v4(),
                order_id,
                reference: self.payment.reference,
                status: self.payment.status,
                created_at: now,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Shipping {
    pub id: Uuid,
    pub order_id: Uuid,
    pub address: String,
    pub city: String,
    pub phone_no: String,
    pub postal_code: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    #[schema(value_type = String, example = "130.00")]
    pub price: Money,
    pub quantity: i32,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    /// Identifier issued by the payment gateway.
    pub reference: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(value_type = String, example = "130.00")]
    pub items_price: Money,
    #[schema(value_type = String, example = "130.00")]
    pub tax_price: Money,
    #[schema(value_type = String, example = "130.00")]
    pub shipping_price: Money,
    #[schema(value_type = String, example = "130.00")]
    pub total_price: Money,
    pub order_status: String,
    pub paid_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "shippingInfo")]
    pub shipping: Shipping,
    #[serde(rename = "orderItems")]
    pub items: Vec<OrderItem>,
    #[serde(rename = "paymentInfo")]
    pub payment: Payment,
}

impl Order {
    pub fn is_delivered(&self) -> bool {
        self.order_status == STATUS_DELIVERED
    }
}

/// Outcome of a status transition, applied to the stored order header.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: String,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Decide how an order moves from `current` to `target`.
///
/// A delivered order is final. Only the exact status `Delivered` stamps the
/// delivery time; any other status clears it.
pub fn plan_status_change(
    current: &str,
    target: &str,
    now: DateTime<Utc>,
) -> Result<StatusChange, DomainError> {
    if current == STATUS_DELIVERED {
        return Err(DomainError::Conflict(
            "order has already been delivered".to_string(),
        ));
    }
    let target = target.trim();
    if target.is_empty() {
        return Err(DomainError::invalid_field("status", "status field is empty"));
    }
    Ok(StatusChange {
        status: target.to_string(),
        delivered_at: (target == STATUS_DELIVERED).then_some(now),
    })
}

/// Sum of order totals, used by the admin overview.
pub fn total_amount(orders: &[Order]) -> Result<Money, DomainError> {
    orders.iter().try_fold(Money::ZERO, |sum, o| {
        sum.checked_add(o.total_price).ok_or_else(|| {
            DomainError::Internal("sum of order totals is out of range".to_string())
        })
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn order_input() -> OrderInput {
        OrderInput {
            items: vec![OrderItemInput {
                product_id: Uuid::new_v4(),
                name: "Kettle".to_string(),
                price: Money::from_minor(10_000),
                quantity: 1,
                image: "https://img.example/kettle.png".to_string(),
            }],
            shipping: ShippingInput {
                address: "1 Main Street".to_string(),
                city: "Accra".to_string(),
                phone_no: "0200000000".to_string(),
                postal_code: "00233".to_string(),
                country: "Ghana".to_string(),
            },
            payment: PaymentInput {
                reference: "pi_123".to_string(),
                status: "succeeded".to_string(),
            },
            items_price: Money::from_minor(10_000),
            tax_price: Money::from_minor(1_000),
            shipping_price: Money::from_minor(2_000),
            total_price: Money::from_minor(13_000),
        }
    }
}
