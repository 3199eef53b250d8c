use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::money::Money;
use crate::domain::order::{Order, OrderInput, OrderItemInput, PaymentInput, ShippingInput};
use crate::errors::AppError;
use crate::handlers::extractors::{AdminUser, AuthUser};
use crate::handlers::SuccessResponse;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product: Uuid,
    #[serde(default)]
    pub name: String,
    /// Unit price in major units, e.g. "9.99"
    #[schema(value_type = String, example = "100.00")]
    pub price: Money,
    #[serde(default)]
    pub image: String,
    pub quantity: i32,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ShippingInfoRequest {
    pub address: String,
    pub city: String,
    pub phone_no: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct PaymentInfoRequest {
    /// Identifier issued by the payment gateway.
    pub id: String,
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub order_items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub shipping_info: ShippingInfoRequest,
    #[serde(default)]
    pub payment_info: PaymentInfoRequest,
    #[schema(value_type = String, example = "100.00")]
    pub items_price: Money,
    #[schema(value_type = String, example = "10.00")]
    pub tax_price: Money,
    #[schema(value_type = String, example = "20.00")]
    pub shipping_price: Money,
    #[schema(value_type = String, example = "130.00")]
    pub total_price: Money,
}

impl From<CreateOrderRequest> for OrderInput {
    fn from(r: CreateOrderRequest) -> Self {
        OrderInput {
            items: r
                .order_items
                .into_iter()
                .map(|i| OrderItemInput {
                    product_id: i.product,
                    name: i.name,
                    price: i.price,
                    quantity: i.quantity,
                    image: i.image,
                })
                .collect(),
            shipping: ShippingInput {
                address: r.shipping_info.address,
                city: r.shipping_info.city,
                phone_no: r.shipping_info.phone_no,
                postal_code: r.shipping_info.postal_code,
                country: r.shipping_info.country,
            },
            payment: PaymentInput {
                reference: r.payment_info.id,
                status: r.payment_info.status,
            },
            items_price: r.items_price,
            tax_price: r.tax_price,
            shipping_price: r.shipping_price,
            total_price: r.total_price,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub success: bool,
    pub order: Order,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrdersResponse {
    pub success: bool,
    pub orders: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllOrdersResponse {
    pub success: bool,
    #[schema(value_type = String, example = "1300.00")]
    pub total_amount: Money,
    pub orders: Vec<Order>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders/new
///
/// Places an order for the caller. The header, shipping, items and payment
/// rows are written in one transaction.
#[utoipa::path(
    post,
    path = "/api/v1/orders/new",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 401, description = "Not authenticated"),
        (status = 422, description = "Failed validation"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let input = OrderInput::from(body.into_inner());

    let order = web::block(move || state.orders.create_order(&principal, input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(OrderResponse {
        success: true,
        order,
    }))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 403, description = "Order belongs to someone else"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let order = web::block(move || state.orders.get_order(&principal, id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse {
        success: true,
        order,
    }))
}

/// GET /orders/me
#[utoipa::path(
    get,
    path = "/api/v1/orders/me",
    responses(
        (status = 200, description = "The caller's orders, oldest first", body = OrdersResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn my_orders(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<HttpResponse, AppError> {
    let orders = web::block(move || state.orders.my_orders(&principal))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrdersResponse {
        success: true,
        orders,
    }))
}

/// GET /orders/admin/orders
#[utoipa::path(
    get,
    path = "/api/v1/orders/admin/orders",
    responses(
        (status = 200, description = "Every order with the sum of totals", body = AllOrdersResponse),
        (status = 403, description = "Caller is not an administrator"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn all_orders(
    state: web::Data<AppState>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let overview = web::block(move || state.orders.all_orders())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(AllOrdersResponse {
        success: true,
        total_amount: overview.total_amount,
        orders: overview.orders,
    }))
}

/// PUT /orders/admin/order/{id}
///
/// Moves the order to a new status and takes the ordered quantities out of
/// stock. Delivered orders are final.
#[utoipa::path(
    put,
    path = "/api/v1/orders/admin/order/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Already delivered, or not enough stock"),
        (status = 422, description = "Status missing"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn update_order(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let status = body.into_inner().status;

    let order = web::block(move || state.orders.update_status(id, &status))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse {
        success: true,
        order,
    }))
}

/// DELETE /orders/admin/order/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/orders/admin/order/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order deleted", body = SuccessResponse),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn delete_order(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    web::block(move || state.orders.delete_order(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(SuccessResponse { success: true }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/orders")
            .route("/new", web::post().to(create_order))
            .route("/me", web::get().to(my_orders))
            .route("/admin/orders", web::get().to(all_orders))
            .route("/admin/order/{id}", web::put().to(update_order))
            .route("/admin/order/{id}", web::delete().to(delete_order))
            .route("/{id}", web::get().to(get_order)),
    );
}
