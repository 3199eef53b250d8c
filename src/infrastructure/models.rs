use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::money::Money;
use crate::domain::order::{Order, OrderItem, Payment, Shipping};
use crate::domain::product::{Image, Product, Review};
use crate::domain::user::{Avatar, User};
use crate::schema::{
    avatars, images, order_items, orders, payments, products, reviews, shippings, tokens, users,
};

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items_price: i64,
    pub tax_price: i64,
    pub shipping_price: i64,
    pub total_price: i64,
    pub order_status: String,
    pub paid_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable)]
#[diesel(table_name = shippings)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ShippingRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub postal: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price: i64,
    pub quantity: i32,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable)]
#[diesel(table_name = payments)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub reference: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl OrderRow {
    pub fn from_order(o: &Order) -> Self {
        OrderRow {
            id: o.id,
            user_id: o.user_id,
            items_price: o.items_price.minor_units(),
            tax_price: o.tax_price.minor_units(),
            shipping_price: o.shipping_price.minor_units(),
            total_price: o.total_price.minor_units(),
            order_status: o.order_status.clone(),
            paid_at: o.paid_at,
            delivered_at: o.delivered_at,
            created_at: o.created_at,
        }
    }

    /// Reassemble the aggregate. A header without its shipping or payment
    /// row is a storage inconsistency, not a client error.
    pub fn into_order(
        self,
        shipping: Option<ShippingRow>,
        items: Vec<OrderItemRow>,
        payment: Option<PaymentRow>,
    ) -> Result<Order, DomainError> {
        let shipping = shipping.ok_or_else(|| {
            DomainError::Internal(format!("order {} has no shipping row", self.id))
        })?;
        let payment = payment.ok_or_else(|| {
            DomainError::Internal(format!("order {} has no payment row", self.id))
        })?;

        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            items_price: Money::from_minor(self.items_price),
            tax_price: Money::from_minor(self.tax_price),
            shipping_price: Money::from_minor(self.shipping_price),
            total_price: Money::from_minor(self.total_price),
            order_status: self.order_status,
            paid_at: self.paid_at,
            delivered_at: self.delivered_at,
            created_at: self.created_at,
            shipping: shipping.into(),
            items: items.into_iter().map(Into::into).collect(),
            payment: payment.into(),
        })
    }
}

impl From<&Shipping> for ShippingRow {
    fn from(s: &Shipping) -> Self {
        ShippingRow {
            id: s.id,
            order_id: s.order_id,
            address: s.address.clone(),
            city: s.city.clone(),
            phone: s.phone_no.clone(),
            postal: s.postal_code.clone(),
            country: s.country.clone(),
            created_at: s.created_at,
        }
    }
}

impl From<ShippingRow> for Shipping {
    fn from(r: ShippingRow) -> Self {
        Shipping {
            id: r.id,
            order_id: r.order_id,
            address: r.address,
            city: r.city,
            phone_no: r.phone,
            postal_code: r.postal,
            country: r.country,
            created_at: r.created_at,
        }
    }
}

impl From<&OrderItem> for OrderItemRow {
    fn from(i: &OrderItem) -> Self {
        OrderItemRow {
            id: i.id,
            order_id: i.order_id,
            product_id: i.product_id,
            name: i.name.clone(),
            price: i.price.minor_units(),
            quantity: i.quantity,
            image: i.image.clone(),
            created_at: i.created_at,
        }
    }
}

impl From<OrderItemRow> for OrderItem {
    fn from(r: OrderItemRow) -> Self {
        OrderItem {
            id: r.id,
            order_id: r.order_id,
            product_id: r.product_id,
            name: r.name,
            price: Money::from_minor(r.price),
            quantity: r.quantity,
            image: r.image,
            created_at: r.created_at,
        }
    }
}

impl From<&Payment> for PaymentRow {
    fn from(p: &Payment) -> Self {
        PaymentRow {
            id: p.id,
            order_id: p.order_id,
            reference: p.reference.clone(),
            status: p.status.clone(),
            created_at: p.created_at,
        }
    }
}

impl From<PaymentRow> for Payment {
    fn from(r: PaymentRow) -> Self {
        Payment {
            id: r.id,
            order_id: r.order_id,
            reference: r.reference,
            status: r.status,
            created_at: r.created_at,
        }
    }
}

// ── Products ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub description: String,
    pub ratings: i32,
    pub category: String,
    pub seller: String,
    pub stock: i32,
    pub num_of_reviews: i32,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = products)]
pub struct ProductChangeset<'a> {
    pub name: &'a str,
    pub price: i64,
    pub description: &'a str,
    pub category: &'a str,
    pub seller: &'a str,
    pub stock: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable)]
#[diesel(table_name = images)]
#[diesel(primary_key(public_id))]
#[diesel(belongs_to(ProductRow, foreign_key = product_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ImageRow {
    pub public_id: String,
    pub url: String,
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable)]
#[diesel(table_name = reviews)]
#[diesel(belongs_to(ProductRow, foreign_key = product_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReviewRow {
    pub id: Uuid,
    pub name: String,
    pub rating: i32,
    pub comment: String,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ProductRow {
    pub fn into_product(self, images: Vec<ImageRow>, reviews: Option<Vec<ReviewRow>>) -> Product {
        Product {
            id: self.id,
            name: self.name,
            price: Money::from_minor(self.price),
            description: self.description,
            ratings: self.ratings,
            category: self.category,
            seller: self.seller,
            stock: self.stock,
            num_of_reviews: self.num_of_reviews,
            user_id: self.user_id,
            created_at: self.created_at,
            images: images.into_iter().map(Into::into).collect(),
            reviews: reviews.map(|rs| rs.into_iter().map(Into::into).collect()),
        }
    }
}

impl From<ImageRow> for Image {
    fn from(r: ImageRow) -> Self {
        Image {
            public_id: r.public_id,
            url: r.url,
        }
    }
}

impl From<ReviewRow> for Review {
    fn from(r: ReviewRow) -> Self {
        Review {
            id: r.id,
            product_id: r.product_id,
            user_id: r.user_id,
            name: r.name,
            rating: r.rating,
            comment: r.comment,
            created_at: r.created_at,
        }
    }
}

// ── Users & tokens ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable)]
#[diesel(table_name = avatars)]
#[diesel(primary_key(public_id))]
#[diesel(belongs_to(UserRow, foreign_key = user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AvatarRow {
    pub public_id: String,
    pub url: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tokens)]
pub struct NewTokenRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: &'a [u8],
    pub expiry: DateTime<Utc>,
    pub scope: &'a str,
}

impl UserRow {
    pub fn into_user(self, avatar: Option<AvatarRow>) -> Result<User, DomainError> {
        let role = self
            .role
            .parse()
            .map_err(|_| DomainError::Internal(format!("user {} has role '{}'", self.id, self.role)))?;
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            role,
            avatar: avatar.map(|a| Avatar {
                public_id: a.public_id,
                url: a.url,
            }),
            created_at: self.created_at,
        })
    }
}
