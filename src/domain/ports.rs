//! Boundaries between the use cases and the outside world.
//!
//! Every port is synchronous. Callers on the async side run them inside
//! `actix_web::web::block`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::money::Money;
use super::order::Order;
use super::product::{
    Image, NewProduct, NewReview, Product, ProductInput, ProductPage, ProductQuery, Review,
    ReviewSummary,
};
use super::token::IssuedToken;
use super::user::{Avatar, NewUser, User, UserChanges, UserCredentials};

// ── Persistence ──────────────────────────────────────────────────────────────

#[cfg_attr(test, mockall::automock)]
pub trait OrderRepository: Send + Sync + 'static {
    /// Persist the header and every dependent row as one unit.
    fn create(&self, order: &Order) -> Result<(), DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>, DomainError>;
    fn list_all(&self) -> Result<Vec<Order>, DomainError>;
    /// Apply a status transition and the matching stock decrements atomically.
    fn update_status(
        &self,
        id: Uuid,
        status: &str,
        now: DateTime<Utc>,
    ) -> Result<Order, DomainError>;
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait ProductRepository: Send + Sync + 'static {
    fn create(&self, product: &NewProduct) -> Result<Product, DomainError>;
    /// Product with its images and reviews.
    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    fn search(&self, query: &ProductQuery) -> Result<ProductPage, DomainError>;
    fn list_all(&self) -> Result<Vec<Product>, DomainError>;
    /// Overwrite the catalog fields; `images`, when present, replaces every
    /// stored image.
    fn update(
        &self,
        id: Uuid,
        fields: &ProductInput,
        images: Option<Vec<Image>>,
    ) -> Result<Product, DomainError>;
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
    fn add_review(
        &self,
        review: &NewReview,
        now: DateTime<Utc>,
    ) -> Result<ReviewSummary, DomainError>;
    fn list_reviews(&self, product_id: Uuid) -> Result<Vec<Review>, DomainError>;
    fn find_review(
        &self,
        product_id: Uuid,
        review_id: Uuid,
    ) -> Result<Option<Review>, DomainError>;
    fn delete_review(
        &self,
        product_id: Uuid,
        review_id: Uuid,
    ) -> Result<ReviewSummary, DomainError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait AuthRepository: Send + Sync + 'static {
    fn create_user(&self, user: &NewUser) -> Result<User, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError>;
    fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, DomainError>;
    fn find_credentials_by_id(&self, id: Uuid) -> Result<Option<UserCredentials>, DomainError>;
    fn list_users(&self) -> Result<Vec<User>, DomainError>;
    fn update_profile(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
        avatar: Option<Avatar>,
    ) -> Result<User, DomainError>;
    fn update_user(&self, id: Uuid, changes: &UserChanges) -> Result<User, DomainError>;
    fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DomainError>;
    fn delete_user(&self, id: Uuid) -> Result<bool, DomainError>;
    /// Store `token` as the user's only token.
    fn replace_token(&self, token: &IssuedToken) -> Result<(), DomainError>;
    /// Owner of an unexpired token with the given hash and scope.
    fn find_user_by_token(
        &self,
        hash: &[u8],
        scope: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, DomainError>;
    /// Drop every token of the user that owns `hash`.
    fn revoke_tokens(&self, hash: &[u8]) -> Result<u64, DomainError>;
    fn delete_tokens_for_user(&self, user_id: Uuid) -> Result<(), DomainError>;
}

// ── External collaborators ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub public_id: String,
    pub url: String,
}

impl From<StoredImage> for Image {
    fn from(s: StoredImage) -> Self {
        Image {
            public_id: s.public_id,
            url: s.url,
        }
    }
}

impl From<StoredImage> for Avatar {
    fn from(s: StoredImage) -> Self {
        Avatar {
            public_id: s.public_id,
            url: s.url,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait ImageStore: Send + Sync + 'static {
    /// `data` is a data URI or a remote URL.
    fn upload(&self, folder: &str, data: &str) -> Result<StoredImage, DomainError>;
    fn destroy(&self, public_id: &str) -> Result<(), DomainError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Returns the client secret of the created intent. Card declines are
    /// reported as [`DomainError::PaymentDeclined`].
    fn create_payment_intent(&self, currency: &str, amount: Money)
        -> Result<String, DomainError>;
}

/// Template of the password recovery mail.
pub const PASSWORD_RESET_TEMPLATE: &str = "password-reset";

#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub template: String,
    pub data: BTreeMap<String, String>,
}

#[cfg_attr(test, mockall::automock)]
pub trait Mailer: Send + Sync + 'static {
    fn send(&self, message: &MailMessage) -> Result<(), DomainError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait PasswordHasher: Send + Sync + 'static {
    fn hash(&self, password: &str) -> Result<String, DomainError>;
    fn verify(&self, password: &str, hash: &str) -> Result<bool, DomainError>;
}

// ── Shared handles ───────────────────────────────────────────────────────────

impl<T: OrderRepository + ?Sized> OrderRepository for Arc<T> {
    fn create(&self, order: &Order) -> Result<(), DomainError> {
        (**self).create(order)
    }
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        (**self).find_by_id(id)
    }
    fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>, DomainError> {
        (**self).list_by_user(user_id)
    }
    fn list_all(&self) -> Result<Vec<Order>, DomainError> {
        (**self).list_all()
    }
    fn update_status(
        &self,
        id: Uuid,
        status: &str,
        now: DateTime<Utc>,
    ) -> Result<Order, DomainError> {
        (**self).update_status(id, status, now)
    }
    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        (**self).delete(id)
    }
}

impl<T: ProductRepository + ?Sized> ProductRepository for Arc<T> {
    fn create(&self, product: &NewProduct) -> Result<Product, DomainError> {
        (**self).create(product)
    }
    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        (**self).find_by_id(id)
    }
    fn search(&self, query: &ProductQuery) -> Result<ProductPage, DomainError> {
        (**self).search(query)
    }
    fn list_all(&self) -> Result<Vec<Product>, DomainError> {
        (**self).list_all()
    }
    fn update(
        &self,
        id: Uuid,
        fields: &ProductInput,
        images: Option<Vec<Image>>,
    ) -> Result<Product, DomainError> {
        (**self).update(id, fields, images)
    }
    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        (**self).delete(id)
    }
    fn add_review(
        &self,
        review: &NewReview,
        now: DateTime<Utc>,
    ) -> Result<ReviewSummary, DomainError> {
        (**self).add_review(review, now)
    }
    fn list_reviews(&self, product_id: Uuid) -> Result<Vec<Review>, DomainError> {
        (**self).list_reviews(product_id)
    }
    fn find_review(
        &self,
        product_id: Uuid,
        review_id: Uuid,
    ) -> Result<Option<Review>, DomainError> {
        (**self).find_review(product_id, review_id)
    }
    fn delete_review(
        &self,
        product_id: Uuid,
        review_id: Uuid,
    ) -> Result<ReviewSummary, DomainError> {
        (**self).delete_review(product_id, review_id)
    }
}

impl<T: AuthRepository + ?Sized> AuthRepository for Arc<T> {
    fn create_user(&self, user: &NewUser) -> Result<User, DomainError> {
        (**self).create_user(user)
    }
    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        (**self).find_by_id(id)
    }
    fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, DomainError> {
        (**self).find_credentials_by_email(email)
    }
    fn find_credentials_by_id(&self, id: Uuid) -> Result<Option<UserCredentials>, DomainError> {
        (**self).find_credentials_by_id(id)
    }
    fn list_users(&self) -> Result<Vec<User>, DomainError> {
        (**self).list_users()
    }
    fn update_profile(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
        avatar: Option<Avatar>,
    ) -> Result<User, DomainError> {
        (**self).update_profile(id, name, email, avatar)
    }
    fn update_user(&self, id: Uuid, changes: &UserChanges) -> Result<User, DomainError> {
        (**self).update_user(id, changes)
    }
    fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DomainError> {
        (**self).update_password(id, password_hash)
    }
    fn delete_user(&self, id: Uuid) -> Result<bool, DomainError> {
        (**self).delete_user(id)
    }
    fn replace_token(&self, token: &IssuedToken) -> Result<(), DomainError> {
        (**self).replace_token(token)
    }
    fn find_user_by_token(
        &self,
        hash: &[u8],
        scope: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, DomainError> {
        (**self).find_user_by_token(hash, scope, now)
    }
    fn revoke_tokens(&self, hash: &[u8]) -> Result<u64, DomainError> {
        (**self).revoke_tokens(hash)
    }
    fn delete_tokens_for_user(&self, user_id: Uuid) -> Result<(), DomainError> {
        (**self).delete_tokens_for_user(user_id)
    }
}

impl<T: ImageStore + ?Sized> ImageStore for Arc<T> {
    fn upload(&self, folder: &str, data: &str) -> Result<StoredImage, DomainError> {
        (**self).upload(folder, data)
    }
    fn destroy(&self, public_id: &str) -> Result<(), DomainError> {
        (**self).destroy(public_id)
    }
}

impl<T: PaymentGateway + ?Sized> PaymentGateway for Arc<T> {
    fn create_payment_intent(
        &self,
        currency: &str,
        amount: Money,
    ) -> Result<String, DomainError> {
        (**self).create_payment_intent(currency, amount)
    }
}

impl<T: Mailer + ?Sized> Mailer for Arc<T> {
    fn send(&self, message: &MailMessage) -> Result<(), DomainError> {
        (**self).send(message)
    }
}

impl<T: PasswordHasher + ?Sized> PasswordHasher for Arc<T> {
    fn hash(&self, password: &str) -> Result<String, DomainError> {
        (**self).hash(password)
    }
    fn verify(&self, password: &str, hash: &str) -> Result<bool, DomainError> {
        (**self).verify(password, hash)
    }
}
