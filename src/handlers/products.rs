use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::money::Money;
use crate::domain::product::{Product, ProductInput, ProductQuery, Review, ReviewSummary, PAGE_SIZE};
use crate::errors::AppError;
use crate::handlers::extractors::{AdminUser, AuthUser};
use crate::handlers::SuccessResponse;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductRequest {
    #[serde(default)]
    pub name: String,
    #[schema(value_type = String, example = "49.99")]
    pub price: Money,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub seller: String,
    #[serde(default)]
    pub stock: i32,
    /// Data URIs or remote URLs. On update, a non-empty list replaces every
    /// stored image.
    #[serde(default)]
    pub images: Vec<String>,
}

impl ProductRequest {
    fn into_parts(self) -> (ProductInput, Vec<String>) {
        (
            ProductInput {
                name: self.name,
                price: self.price,
                description: self.description,
                category: self.category,
                seller: self.seller,
                stock: self.stock,
            },
            self.images,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub keyword: Option<String>,
    /// 1-based; anything below 1 is page 1.
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub product_id: Uuid,
    pub rating: i32,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewsParams {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReviewParams {
    pub product_id: Uuid,
    pub id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPageResponse {
    pub success: bool,
    /// Products matching the keyword across all pages.
    pub product_count: i64,
    pub res_per_page: i64,
    /// Products on this page.
    pub filtered_products_count: usize,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub success: bool,
    pub product: Product,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductsResponse {
    pub success: bool,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummaryResponse {
    pub success: bool,
    pub ratings: i32,
    pub num_of_reviews: i32,
}

impl From<ReviewSummary> for ReviewSummaryResponse {
    fn from(s: ReviewSummary) -> Self {
        ReviewSummaryResponse {
            success: true,
            ratings: s.ratings,
            num_of_reviews: s.num_of_reviews,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewsResponse {
    pub success: bool,
    pub reviews: Vec<Review>,
}

// ── Catalog ──────────────────────────────────────────────────────────────────

/// GET /product/products
///
/// One page of twelve products, oldest first, optionally filtered by a
/// case-insensitive substring of the name.
#[utoipa::path(
    get,
    path = "/api/v1/product/products",
    params(
        ("keyword" = Option<String>, Query, description = "Substring of the product name"),
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
    ),
    responses((status = 200, description = "One page of products", body = ProductPageResponse)),
    tag = "products"
)]
pub async fn list_products(
    state: web::Data<AppState>,
    query: web::Query<SearchParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let query = ProductQuery {
        keyword: params.keyword,
        page: params.page,
    };

    let page = web::block(move || state.products.search(&query))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ProductPageResponse {
        success: true,
        product_count: page.total,
        res_per_page: PAGE_SIZE,
        filtered_products_count: page.products.len(),
        products: page.products,
    }))
}

/// GET /product/product/{id}
#[utoipa::path(
    get,
    path = "/api/v1/product/product/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Product with images and reviews", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "products"
)]
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let product = web::block(move || state.products.get_product(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ProductResponse {
        success: true,
        product,
    }))
}

// ── Administration ───────────────────────────────────────────────────────────

/// POST /product/new
///
/// Uploads the images, then stores the product and its image rows.
#[utoipa::path(
    post,
    path = "/api/v1/product/new",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 403, description = "Caller is not an administrator"),
        (status = 422, description = "Failed validation"),
        (status = 502, description = "Image upload failed"),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn create_product(
    state: web::Data<AppState>,
    AdminUser(principal): AdminUser,
    body: web::Json<ProductRequest>,
) -> Result<HttpResponse, AppError> {
    let (input, images) = body.into_inner().into_parts();

    let product = web::block(move || state.products.create_product(&principal, input, &images))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(ProductResponse {
        success: true,
        product,
    }))
}

/// GET /product/admin/products
#[utoipa::path(
    get,
    path = "/api/v1/product/admin/products",
    responses(
        (status = 200, description = "Every product with its images", body = ProductsResponse),
        (status = 403, description = "Caller is not an administrator"),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn admin_products(
    state: web::Data<AppState>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let products = web::block(move || state.products.list_all())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ProductsResponse {
        success: true,
        products,
    }))
}

/// PUT /product/admin/product/{id}
///
/// Ratings and the review count are derived and cannot be set here.
#[utoipa::path(
    put,
    path = "/api/v1/product/admin/product/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 404, description = "Product not found"),
        (status = 422, description = "Failed validation"),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn update_product(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<ProductRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let (input, images) = body.into_inner().into_parts();

    let product = web::block(move || {
        state
            .products
            .update_product(id, input, Some(images.as_slice()))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ProductResponse {
        success: true,
        product,
    }))
}

/// DELETE /product/admin/product/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/product/admin/product/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Product deleted", body = SuccessResponse),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn delete_product(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    web::block(move || state.products.delete_product(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(SuccessResponse { success: true }))
}

// ── Reviews ──────────────────────────────────────────────────────────────────

/// PUT /product/review
#[utoipa::path(
    put,
    path = "/api/v1/product/review",
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review stored, product summary recomputed", body = ReviewSummaryResponse),
        (status = 404, description = "Product not found"),
        (status = 422, description = "Rating outside 1..5 or empty comment"),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn create_review(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    body: web::Json<ReviewRequest>,
) -> Result<HttpResponse, AppError> {
    let review = body.into_inner();

    let summary = web::block(move || {
        state
            .products
            .add_review(&principal, review.product_id, review.rating, review.comment)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ReviewSummaryResponse::from(summary)))
}

/// GET /product/reviews
#[utoipa::path(
    get,
    path = "/api/v1/product/reviews",
    params(("id" = Uuid, Query, description = "Product UUID")),
    responses((status = 200, description = "Reviews of the product", body = ReviewsResponse)),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn list_reviews(
    state: web::Data<AppState>,
    _user: AuthUser,
    query: web::Query<ReviewsParams>,
) -> Result<HttpResponse, AppError> {
    let product_id = query.into_inner().id;

    let reviews = web::block(move || state.products.list_reviews(product_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ReviewsResponse {
        success: true,
        reviews,
    }))
}

/// DELETE /product/reviews
#[utoipa::path(
    delete,
    path = "/api/v1/product/reviews",
    params(
        ("productId" = Uuid, Query, description = "Product UUID"),
        ("id" = Uuid, Query, description = "Review UUID"),
    ),
    responses(
        (status = 200, description = "Review deleted, product summary recomputed", body = ReviewSummaryResponse),
        (status = 403, description = "Caller is neither the author nor an administrator"),
        (status = 404, description = "No such review on this product"),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn delete_review(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    query: web::Query<DeleteReviewParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();

    let summary = web::block(move || {
        state
            .products
            .delete_review(&principal, params.product_id, params.id)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ReviewSummaryResponse::from(summary)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/product")
            .route("/products", web::get().to(list_products))
            .route("/product/{id}", web::get().to(get_product))
            .route("/new", web::post().to(create_product))
            .route("/admin/products", web::get().to(admin_products))
            .route("/admin/product/{id}", web::put().to(update_product))
            .route("/admin/product/{id}", web::delete().to(delete_product))
            .route("/review", web::put().to(create_review))
            .route("/reviews", web::get().to(list_reviews))
            .route("/reviews", web::delete().to(delete_review)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use crate::domain::product::Image;
    use crate::domain::user::Role;
    use crate::handlers::test_support::{bearer, Mocks};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use chrono::Utc;
    use serde_json::{json, Value};

    fn product(name: &str) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price: Money::from_minor(4_999),
            description: "Boils water".to_string(),
            ratings: 4,
            category: "Home".to_string(),
            seller: "Acme".to_string(),
            stock: 3,
            num_of_reviews: 2,
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
            images: vec![Image {
                public_id: "products/1".to_string(),
                url: "https://img.example/products/1".to_string(),
            }],
            reviews: None,
        }
    }

    #[actix_web::test]
    async fn search_reports_page_metadata() {
        let mut mocks = Mocks::new();
        mocks
            .products
            .expect_search()
            .withf(|q| q.keyword.as_deref() == Some("kett") && q.page == 2)
            .returning(|_| {
                Ok(crate::domain::product::ProductPage {
                    total: 13,
                    products: vec![product("Kettle")],
                })
            });
        let app = test::init_service(App::new().configure(mocks.app())).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/product/products?keyword=kett&page=2")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["productCount"], 13);
        assert_eq!(body["resPerPage"], 12);
        assert_eq!(body["filteredProductsCount"], 1);
        assert_eq!(body["products"][0]["price"], "49.99");
        assert_eq!(body["products"][0]["images"][0]["publicId"], "products/1");
    }

    #[actix_web::test]
    async fn missing_product_is_404() {
        let mut mocks = Mocks::new();
        mocks.products.expect_find_by_id().returning(|_| Ok(None));
        let app = test::init_service(App::new().configure(mocks.app())).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/product/product/{}", Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn malformed_product_id_is_400() {
        let mocks = Mocks::new();
        let app = test::init_service(App::new().configure(mocks.app())).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/product/product/not-a-uuid")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn create_requires_admin() {
        let mut mocks = Mocks::new();
        mocks.sign_in(Role::User);
        mocks.products.expect_create().never();
        let app = test::init_service(App::new().configure(mocks.app())).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/product/new")
            .insert_header(bearer())
            .set_json(json!({ "name": "Kettle", "price": "49.99", "description": "d", "seller": "s" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn over_precise_price_is_422() {
        let mut mocks = Mocks::new();
        mocks.sign_in(Role::Admin);
        mocks.products.expect_create().never();
        let app = test::init_service(App::new().configure(mocks.app())).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/product/new")
            .insert_header(bearer())
            .set_json(json!({ "name": "Kettle", "price": "49.999", "description": "d", "seller": "s" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn admin_creates_product() {
        let mut mocks = Mocks::new();
        mocks.sign_in(Role::Admin);
        mocks
            .products
            .expect_create()
            .withf(|p| p.fields.price == Money::from_minor(4_999) && p.images.is_empty())
            .returning(|_| Ok(product("Kettle")));
        let app = test::init_service(App::new().configure(mocks.app())).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/product/new")
            .insert_header(bearer())
            .set_json(json!({
                "name": "Kettle",
                "price": 49.99,
                "description": "Boils water",
                "category": "Home",
                "seller": "Acme",
                "stock": 3
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[actix_web::test]
    async fn review_returns_recomputed_summary() {
        let mut mocks = Mocks::new();
        mocks.sign_in(Role::User);
        mocks.products.expect_add_review().returning(|_, _| {
            Ok(ReviewSummary {
                ratings: 3,
                num_of_reviews: 2,
            })
        });
        let app = test::init_service(App::new().configure(mocks.app())).await;

        let req = test::TestRequest::put()
            .uri("/api/v1/product/review")
            .insert_header(bearer())
            .set_json(json!({ "productId": Uuid::new_v4(), "rating": 2, "comment": "Meh" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["ratings"], 3);
        assert_eq!(body["numOfReviews"], 2);
    }

    #[actix_web::test]
    async fn deleting_someone_elses_review_is_403() {
        let mut mocks = Mocks::new();
        mocks.sign_in(Role::User);
        mocks.products.expect_find_review().returning(|product_id, id| {
            Ok(Some(Review {
                id,
                product_id,
                user_id: Uuid::new_v4(),
                name: "Kofi".to_string(),
                rating: 5,
                comment: "Great".to_string(),
                created_at: Utc::now(),
            }))
        });
        mocks.products.expect_delete_review().never();
        let app = test::init_service(App::new().configure(mocks.app())).await;

        let req = test::TestRequest::delete()
            .uri(&format!(
                "/api/v1/product/reviews?productId={}&id={}",
                Uuid::new_v4(),
                Uuid::new_v4()
            ))
            .insert_header(bearer())
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn image_store_failure_is_502() {
        let mut mocks = Mocks::new();
        mocks.sign_in(Role::Admin);
        mocks
            .images
            .expect_upload()
            .returning(|_, _| Err(DomainError::Upstream("image store is not configured".to_string())));
        mocks.products.expect_create().never();
        let app = test::init_service(App::new().configure(mocks.app())).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/product/new")
            .insert_header(bearer())
            .set_json(json!({
                "name": "Kettle",
                "price": "49.99",
                "description": "Boils water",
                "seller": "Acme",
                "images": ["data:image/png;base64,AAAA"]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
