pub mod auth;
pub mod extractors;
pub mod orders;
pub mod payment;
pub mod products;

#[cfg(test)]
pub(crate) mod test_support;

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{web, HttpRequest};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::errors::FieldErrors;
use crate::errors::AppError;

/// Body of responses that carry nothing but the outcome.
#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Body errors: well-formed JSON with the wrong shape is a validation
/// failure, anything else a bad request.
pub fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    match &err {
        JsonPayloadError::Deserialize(e) if e.is_data() => {
            let mut fields = FieldErrors::new();
            fields.insert("body".to_string(), e.to_string());
            AppError::Validation(fields).into()
        }
        _ => AppError::BadRequest(err.to_string()).into(),
    }
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(json_error)
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err: QueryPayloadError, _req| AppError::BadRequest(err.to_string()).into())
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err: PathError, _req| AppError::BadRequest(err.to_string()).into())
}

/// Every route under `/api/v1`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(orders::configure)
            .configure(products::configure)
            .configure(auth::configure)
            .configure(payment::configure),
    );
}
