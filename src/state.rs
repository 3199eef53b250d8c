//! Services shared by every worker, wired over trait objects so handlers can
//! be driven by real adapters or by mocks.

use std::sync::Arc;

use crate::application::auth_service::AuthService;
use crate::application::order_service::OrderService;
use crate::application::payment_service::PaymentService;
use crate::application::product_service::ProductService;
use crate::domain::ports::{
    AuthRepository, ImageStore, Mailer, OrderRepository, PasswordHasher, PaymentGateway,
    ProductRepository,
};

pub type DynOrderRepository = Arc<dyn OrderRepository>;
pub type DynProductRepository = Arc<dyn ProductRepository>;
pub type DynAuthRepository = Arc<dyn AuthRepository>;
pub type DynImageStore = Arc<dyn ImageStore>;
pub type DynPaymentGateway = Arc<dyn PaymentGateway>;
pub type DynMailer = Arc<dyn Mailer>;
pub type DynPasswordHasher = Arc<dyn PasswordHasher>;

pub type Orders = OrderService<DynOrderRepository>;
pub type Products = ProductService<DynProductRepository, DynImageStore>;
pub type Auth = AuthService<DynAuthRepository, DynPasswordHasher, DynImageStore, DynMailer>;
pub type Payments = PaymentService<DynPaymentGateway>;

pub struct AppState {
    pub orders: Orders,
    pub products: Products,
    pub auth: Auth,
    pub payments: Payments,
}
