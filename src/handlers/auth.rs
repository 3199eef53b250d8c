use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::auth_service::Session;
use crate::domain::user::{ProfileChanges, Registration, Role, User, UserChanges};
use crate::errors::AppError;
use crate::handlers::extractors::{AdminUser, AuthUser};
use crate::handlers::SuccessResponse;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Data URI or remote URL of the avatar image.
    pub avatar: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub name: String,
    pub email: String,
    /// A new avatar; omit to keep the current one.
    pub avatar: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    /// `user` or `admin`
    pub role: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub success: bool,
    /// Bearer token for the `Authorization` header.
    pub token: String,
    pub user: User,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        SessionResponse {
            success: true,
            token: s.token,
            user: s.user,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

// ── Sessions ─────────────────────────────────────────────────────────────────

/// POST /auth/register
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = SessionResponse),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Failed validation"),
    ),
    tag = "auth"
)]
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let registration = Registration {
        name: body.name,
        email: body.email,
        password: body.password,
        avatar: body.avatar,
    };

    let session = web::block(move || state.auth.register(registration))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(SessionResponse::from(session)))
}

/// POST /auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 401, description = "Invalid email or password"),
    ),
    tag = "auth"
)]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let session = web::block(move || state.auth.login(&body.email, &body.password))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(SessionResponse::from(session)))
}

/// GET /auth/logout/{token}
#[utoipa::path(
    get,
    path = "/api/v1/auth/logout/{token}",
    params(("token" = String, Path, description = "Session token to revoke")),
    responses(
        (status = 200, description = "Every token of the owner revoked", body = MessageResponse),
        (status = 401, description = "Malformed token"),
    ),
    tag = "auth"
)]
pub async fn logout(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let token = path.into_inner();

    web::block(move || state.auth.logout(&token))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(MessageResponse {
        success: true,
        message: "Logged out".to_string(),
    }))
}

// ── Passwords ────────────────────────────────────────────────────────────────

/// POST /auth/password/forgot
///
/// Mails a reset link to the account owner.
#[utoipa::path(
    post,
    path = "/api/v1/auth/password/forgot",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset link sent", body = MessageResponse),
        (status = 404, description = "No account with this email"),
        (status = 502, description = "Mail delivery failed"),
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    state: web::Data<AppState>,
    body: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let email = body.into_inner().email;
    let recipient = email.clone();

    web::block(move || state.auth.forgot_password(&email))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(MessageResponse {
        success: true,
        message: format!("Email sent to: {recipient}"),
    }))
}

/// PUT /auth/password/reset/{token}
#[utoipa::path(
    put,
    path = "/api/v1/auth/password/reset/{token}",
    params(("token" = String, Path, description = "Reset token from the mailed link")),
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed and signed in", body = SessionResponse),
        (status = 400, description = "Passwords do not match"),
        (status = 401, description = "Reset token invalid or expired"),
    ),
    tag = "auth"
)]
pub async fn reset_password(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let token = path.into_inner();
    let body = body.into_inner();

    let session = web::block(move || {
        state
            .auth
            .reset_password(&token, &body.password, &body.confirm_password)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(SessionResponse::from(session)))
}

/// PUT /auth/password/update
#[utoipa::path(
    put,
    path = "/api/v1/auth/password/update",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password changed, new session issued", body = SessionResponse),
        (status = 401, description = "Old password is incorrect"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn update_password(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    body: web::Json<UpdatePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let session = web::block(move || {
        state
            .auth
            .update_password(&principal, &body.old_password, &body.password)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(SessionResponse::from(session)))
}

// ── Profile ──────────────────────────────────────────────────────────────────

/// GET /auth/me
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "The caller's account", body = UserResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<HttpResponse, AppError> {
    let user = web::block(move || state.auth.me(&principal))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(UserResponse {
        success: true,
        user,
    }))
}

/// PUT /auth/me/update
#[utoipa::path(
    put,
    path = "/api/v1/auth/me/update",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 409, description = "Email taken by another account"),
        (status = 422, description = "Failed validation"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn update_profile(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let changes = ProfileChanges {
        name: body.name,
        email: body.email,
        avatar: body.avatar,
    };

    let user = web::block(move || state.auth.update_profile(&principal, changes))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(UserResponse {
        success: true,
        user,
    }))
}

// ── Administration ───────────────────────────────────────────────────────────

/// GET /auth/admin/users
#[utoipa::path(
    get,
    path = "/api/v1/auth/admin/users",
    responses(
        (status = 200, description = "Every account", body = UsersResponse),
        (status = 403, description = "Caller is not an administrator"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn list_users(
    state: web::Data<AppState>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let users = web::block(move || state.auth.list_users())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(UsersResponse {
        success: true,
        users,
    }))
}

/// GET /auth/admin/user/{id}
#[utoipa::path(
    get,
    path = "/api/v1/auth/admin/user/{id}",
    params(("id" = Uuid, Path, description = "User UUID")),
    responses(
        (status = 200, description = "The account", body = UserResponse),
        (status = 404, description = "User not found"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn get_user(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let user = web::block(move || state.auth.get_user(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(UserResponse {
        success: true,
        user,
    }))
}

/// PUT /auth/admin/user/{id}
#[utoipa::path(
    put,
    path = "/api/v1/auth/admin/user/{id}",
    params(("id" = Uuid, Path, description = "User UUID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Account updated", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 422, description = "Unknown role or invalid fields"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn update_user(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let body = body.into_inner();
    let changes = UserChanges {
        role: body.role.trim().parse::<Role>()?,
        name: body.name,
        email: body.email,
    };

    let user = web::block(move || state.auth.update_user(id, changes))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(UserResponse {
        success: true,
        user,
    }))
}

/// DELETE /auth/admin/user/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/auth/admin/user/{id}",
    params(("id" = Uuid, Path, description = "User UUID")),
    responses(
        (status = 200, description = "Account deleted", body = SuccessResponse),
        (status = 404, description = "User not found"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn delete_user(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    web::block(move || state.auth.delete_user(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(SuccessResponse { success: true }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout/{token}", web::get().to(logout))
            .route("/password/forgot", web::post().to(forgot_password))
            .route("/password/reset/{token}", web::put().to(reset_password))
            .route("/password/update", web::put().to(update_password))
            .route("/me", web::get().to(me))
            .route("/me/update", web::put().to(update_profile))
            .route("/admin/users", web::get().to(list_users))
            .route("/admin/user/{id}", web::get().to(get_user))
            .route("/admin/user/{id}", web::put().to(update_user))
            .route("/admin/user/{id}", web::delete().to(delete_user)),
    );
}
