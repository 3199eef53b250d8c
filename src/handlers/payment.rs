use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::money::Money;
use crate::errors::AppError;
use crate::handlers::extractors::AuthUser;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessPaymentRequest {
    #[schema(value_type = String, example = "130.00")]
    pub amount: Money,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessPaymentResponse {
    pub success: bool,
    pub client_secret: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StripeKeyResponse {
    pub stripe_api_key: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /payment/process
#[utoipa::path(
    post,
    path = "/api/v1/payment/process",
    request_body = ProcessPaymentRequest,
    responses(
        (status = 200, description = "Payment intent created", body = ProcessPaymentResponse),
        (status = 402, description = "Card declined"),
        (status = 422, description = "Missing or zero amount"),
        (status = 502, description = "Payment provider unavailable"),
    ),
    security(("bearer" = [])),
    tag = "payment"
)]
pub async fn process_payment(
    state: web::Data<AppState>,
    _user: AuthUser,
    body: web::Json<ProcessPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let amount = body.into_inner().amount;

    let client_secret = web::block(move || state.payments.process(amount))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ProcessPaymentResponse {
        success: true,
        client_secret,
    }))
}

/// GET /payment/stripeapi
#[utoipa::path(
    get,
    path = "/api/v1/payment/stripeapi",
    responses(
        (status = 200, description = "Publishable key for the browser SDK", body = StripeKeyResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer" = [])),
    tag = "payment"
)]
pub async fn stripe_api_key(
    state: web::Data<AppState>,
    _user: AuthUser,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(StripeKeyResponse {
        stripe_api_key: state.payments.publishable_key().to_string(),
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payment")
            .route("/process", web::post().to(process_payment))
            .route("/stripeapi", web::get().to(stripe_api_key)),
    );
}

#[cfg(test)]
mod tests {
    use crate::domain::errors::DomainError;
    use crate::domain::money::Money;
    use crate::domain::user::Role;
    use crate::handlers::test_support::{bearer, Mocks};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn process_returns_client_secret() {
        let mut mocks = Mocks::new();
        mocks.sign_in(Role::User);
        mocks
            .gateway
            .expect_create_payment_intent()
            .withf(|currency, amount| currency == "usd" && *amount == Money::from_minor(13_000))
            .times(1)
            .returning(|_, _| Ok("pi_123_secret_456".to_string()));
        let app = test::init_service(App::new().configure(mocks.app())).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/payment/process")
            .insert_header(bearer())
            .set_json(json!({ "amount": "130.00" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["client_secret"], "pi_123_secret_456");
    }

    #[actix_web::test]
    async fn declined_card_is_402() {
        let mut mocks = Mocks::new();
        mocks.sign_in(Role::User);
        mocks
            .gateway
            .expect_create_payment_intent()
            .returning(|_, _| Err(DomainError::PaymentDeclined("Your card was declined.".to_string())));
        let app = test::init_service(App::new().configure(mocks.app())).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/payment/process")
            .insert_header(bearer())
            .set_json(json!({ "amount": 12.5 }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Your card was declined.");
    }

    #[actix_web::test]
    async fn negative_amount_is_rejected_before_the_gateway() {
        let mut mocks = Mocks::new();
        mocks.sign_in(Role::User);
        mocks.gateway.expect_create_payment_intent().never();
        let app = test::init_service(App::new().configure(mocks.app())).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/payment/process")
            .insert_header(bearer())
            .set_json(json!({ "amount": "-5" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn stripe_key_requires_login() {
        let mocks = Mocks::new();
        let app = test::init_service(App::new().configure(mocks.app())).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/payment/stripeapi")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn stripe_key_is_published() {
        let mut mocks = Mocks::new();
        mocks.sign_in(Role::User);
        let app = test::init_service(App::new().configure(mocks.app())).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/payment/stripeapi")
            .insert_header(bearer())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["stripeApiKey"], "pk_test_123");
    }
}
