pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod rate_limit;
pub mod schema;
pub mod state;

use actix_web::middleware::{from_fn, Logger};
use actix_web::{web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

pub use db::{create_pool, DbPool};
pub use rate_limit::RateLimiter;
pub use state::AppState;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("applied {} pending migration(s)", applied.len());
    Ok(())
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Shop API", description = "Orders, catalog, accounts and payments"),
    paths(
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::my_orders,
        handlers::orders::all_orders,
        handlers::orders::update_order,
        handlers::orders::delete_order,
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::create_product,
        handlers::products::admin_products,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::products::create_review,
        handlers::products::list_reviews,
        handlers::products::delete_review,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::forgot_password,
        handlers::auth::reset_password,
        handlers::auth::update_password,
        handlers::auth::me,
        handlers::auth::update_profile,
        handlers::auth::list_users,
        handlers::auth::get_user,
        handlers::auth::update_user,
        handlers::auth::delete_user,
        handlers::payment::process_payment,
        handlers::payment::stripe_api_key,
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "orders", description = "Checkout and order administration"),
        (name = "products", description = "Catalog and reviews"),
        (name = "auth", description = "Accounts and sessions"),
        (name = "payment", description = "Card payments"),
    )
)]
pub struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: web::Data<AppState>,
    limiter: web::Data<RateLimiter>,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(limiter.clone())
            .app_data(handlers::json_config())
            .app_data(handlers::query_config())
            .app_data(handlers::path_config())
            .wrap(from_fn(rate_limit::enforce))
            .wrap(Logger::default())
            .configure(handlers::configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
