//! Authenticated callers, resolved from `Authorization: Bearer <token>`.

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

use crate::domain::token::TOKEN_LENGTH;
use crate::domain::user::Principal;
use crate::errors::AppError;
use crate::state::AppState;

/// Any caller holding a valid session token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

/// A caller with the `admin` role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Principal);

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (token.len() == TOKEN_LENGTH).then(|| token.to_string())
}

async fn authenticate(
    state: Option<web::Data<AppState>>,
    token: Option<String>,
) -> Result<Principal, AppError> {
    let state =
        state.ok_or_else(|| AppError::Internal("application state is not registered".to_string()))?;
    let token = token.ok_or_else(|| {
        AppError::Unauthorized("login first to access this resource".to_string())
    })?;

    let principal = web::block(move || state.auth.authenticate(&token))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(principal)
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);
        Box::pin(async move { authenticate(state, token).await.map(AuthUser) })
    }
}

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);
        Box::pin(async move {
            let principal = authenticate(state, token).await?;
            if !principal.is_admin() {
                return Err(AppError::Forbidden(format!(
                    "role ({}) is not allowed to access this resource",
                    principal.role
                )));
            }
            Ok(AdminUser(principal))
        })
    }
}
