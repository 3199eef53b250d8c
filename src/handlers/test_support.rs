//! App state over mocks for handler tests.

use std::sync::Arc;

use actix_web::http::header::AUTHORIZATION;
use actix_web::web;
use chrono::Utc;
use uuid::Uuid;

use crate::application::auth_service::AuthService;
use crate::application::order_service::OrderService;
use crate::application::payment_service::PaymentService;
use crate::application::product_service::ProductService;
use crate::config::AuthConfig;
use crate::domain::ports::{
    MockAuthRepository, MockImageStore, MockMailer, MockOrderRepository, MockPasswordHasher,
    MockPaymentGateway, MockProductRepository,
};
use crate::domain::user::{Role, User};
use crate::state::{
    AppState, DynAuthRepository, DynImageStore, DynMailer, DynOrderRepository, DynPasswordHasher,
    DynPaymentGateway, DynProductRepository,
};

pub const TOKEN: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub fn bearer() -> (actix_web::http::header::HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {TOKEN}"))
}

pub struct Mocks {
    pub orders: MockOrderRepository,
    pub products: MockProductRepository,
    pub auth: MockAuthRepository,
    pub hasher: MockPasswordHasher,
    pub images: MockImageStore,
    pub mailer: MockMailer,
    pub gateway: MockPaymentGateway,
}

impl Mocks {
    pub fn new() -> Self {
        Self {
            orders: MockOrderRepository::new(),
            products: MockProductRepository::new(),
            auth: MockAuthRepository::new(),
            hasher: MockPasswordHasher::new(),
            images: MockImageStore::new(),
            mailer: MockMailer::new(),
            gateway: MockPaymentGateway::new(),
        }
    }

    /// Make [`TOKEN`] resolve to a fresh user with `role`.
    pub fn sign_in(&mut self, role: Role) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ama".to_string(),
            email: "ama@example.com".to_string(),
            role,
            avatar: None,
            created_at: Utc::now(),
        };
        let found = user.clone();
        self.auth
            .expect_find_user_by_token()
            .returning(move |_, _, _| Ok(Some(found.clone())));
        user
    }

    pub fn state(self) -> web::Data<AppState> {
        let orders: DynOrderRepository = Arc::new(self.orders);
        let products: DynProductRepository = Arc::new(self.products);
        let users: DynAuthRepository = Arc::new(self.auth);
        let hasher: DynPasswordHasher = Arc::new(self.hasher);
        let images: DynImageStore = Arc::new(self.images);
        let mailer: DynMailer = Arc::new(self.mailer);
        let gateway: DynPaymentGateway = Arc::new(self.gateway);

        web::Data::new(AppState {
            orders: OrderService::new(orders),
            products: ProductService::new(products, images.clone()),
            auth: AuthService::new(
                users,
                hasher,
                images,
                mailer,
                AuthConfig {
                    token_ttl: chrono::Duration::hours(24),
                    reset_token_ttl: chrono::Duration::minutes(60),
                    frontend_url: "https://shop.example".to_string(),
                    mail_from: "no-reply@shop.example".to_string(),
                },
            ),
            payments: PaymentService::new(gateway, "usd", "pk_test_123"),
        })
    }

    /// Route table plus state, ready for `App::configure`.
    pub fn app(self) -> impl FnOnce(&mut web::ServiceConfig) {
        let state = self.state();
        move |cfg: &mut web::ServiceConfig| {
            cfg.app_data(state)
                .app_data(super::json_config())
                .app_data(super::query_config())
                .app_data(super::path_config());
            super::configure(cfg);
        }
    }
}
