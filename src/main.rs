use std::sync::Arc;

use actix_web::web;
use dotenvy::dotenv;
use shop_service::application::auth_service::AuthService;
use shop_service::application::order_service::OrderService;
use shop_service::application::payment_service::PaymentService;
use shop_service::application::product_service::ProductService;
use shop_service::config::Config;
use shop_service::infrastructure::auth_repo::DieselAuthRepository;
use shop_service::infrastructure::cloudinary::{CloudinaryStore, DisabledImageStore};
use shop_service::infrastructure::mailer::{LogMailer, MailgunMailer};
use shop_service::infrastructure::order_repo::DieselOrderRepository;
use shop_service::infrastructure::password::BcryptHasher;
use shop_service::infrastructure::product_repo::DieselProductRepository;
use shop_service::infrastructure::stripe::{DisabledPaymentGateway, StripeGateway};
use shop_service::state::{
    DynAuthRepository, DynImageStore, DynMailer, DynOrderRepository, DynPasswordHasher,
    DynPaymentGateway, DynProductRepository,
};
use shop_service::{build_server, create_pool, run_migrations, AppState, RateLimiter};

// The HTTP adapters use reqwest's blocking client, which may be neither
// built nor dropped inside an async runtime. Everything is wired here on the
// main thread and the runtime is only entered to serve.
fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().expect("invalid configuration");

    let pool = create_pool(&config.database.url, &config.database.pool)
        .expect("Failed to create database pool");
    run_migrations(&pool).expect("Failed to run database migrations");

    let images: DynImageStore = match config.cloudinary.clone() {
        Some(credentials) => Arc::new(CloudinaryStore::new(credentials)),
        None => {
            log::warn!("CLOUDINARY_* not set; image uploads are disabled");
            Arc::new(DisabledImageStore)
        }
    };
    let gateway: DynPaymentGateway = match config.payment.secret_key.clone() {
        Some(secret) => Arc::new(StripeGateway::new(secret)),
        None => {
            log::warn!("STRIPE_SECRET not set; payments are disabled");
            Arc::new(DisabledPaymentGateway)
        }
    };
    let mailer: DynMailer = match config.mailgun.clone() {
        Some(credentials) => Arc::new(MailgunMailer::new(credentials)),
        None => {
            log::warn!("MAILGUN_* not set; mail is written to the log");
            Arc::new(LogMailer)
        }
    };
    let hasher: DynPasswordHasher = Arc::new(BcryptHasher::default());

    let orders: DynOrderRepository = Arc::new(DieselOrderRepository::new(pool.clone()));
    let products: DynProductRepository = Arc::new(DieselProductRepository::new(pool.clone()));
    let users: DynAuthRepository = Arc::new(DieselAuthRepository::new(pool));

    let state = web::Data::new(AppState {
        orders: OrderService::new(orders),
        products: ProductService::new(products, images.clone()),
        auth: AuthService::new(users, hasher, images, mailer, config.auth.clone()),
        payments: PaymentService::new(
            gateway,
            config.payment.currency.clone(),
            config.payment.publishable_key.clone(),
        ),
    });
    let limiter = web::Data::new(RateLimiter::new(&config.rate_limit));

    let host = config.server.host.clone();
    let port = config.server.port;
    log::info!("Starting server at http://{}:{}", host, port);

    let served = state.clone();
    let result = actix_web::rt::System::new()
        .block_on(async move { build_server(served, limiter, &host, port)?.await });

    // Last handle to the adapters goes away outside the runtime.
    drop(state);
    result
}
