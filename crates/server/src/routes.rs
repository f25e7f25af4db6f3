pub mod users;
pub mod addresses;
pub mod cart;
pub mod coupons;
pub mod orders;
pub mod catalog;
pub mod reviews;
pub mod admin;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;

use common::{messages, types::Health};

use crate::errors::JsonApiError;
use crate::observability;
use crate::openapi::ApiDoc;
use crate::rate_limit;
use crate::startup::ServerState;

pub type ApiResult<T> = Result<T, JsonApiError>;

/// `{"message": ..., "data": ...}`; either half may be absent.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn data<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { message: None, data: Some(data) })
}

pub fn message(key: &str) -> Json<Envelope<()>> {
    Json(Envelope { message: Some(messages::text(key).to_string()), data: None })
}

pub fn done<T: Serialize>(key: &str, data: T) -> Json<Envelope<T>> {
    Json(Envelope { message: Some(messages::text(key).to_string()), data: Some(data) })
}

pub fn created<T: Serialize>(key: &str, data: T) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, done(key, data))
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn user_routes() -> Router<ServerState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/fresh-login", post(users::fresh_login))
        .route("/user-token-refresh", post(users::refresh))
        .route("/logout", post(users::logout))
        .route("/user-roles", get(users::list_roles).post(users::create_role))
        .route("/user-roles-assign", post(users::assign_role))
        .route("/user-email-confirm/:confirmation_id", get(users::confirm_email))
        .route(
            "/confirm-email-resend/:user_id",
            get(users::confirmation_status).post(users::resend_confirmation),
        )
        .route(
            "/address",
            get(addresses::list)
                .post(addresses::create)
                .put(addresses::update)
                .delete(addresses::remove),
        )
}

fn shop_routes() -> Router<ServerState> {
    Router::new()
        .route("/cart", get(cart::get_cart).post(cart::create_cart).delete(cart::delete_cart))
        .route(
            "/cart-item",
            get(cart::list_items)
                .post(cart::add_item)
                .put(cart::update_item)
                .delete(cart::remove_item),
        )
        .route("/apply-coupon/:coupon_code", post(cart::apply_coupon))
        .route("/cart-merge/:cart_id", post(cart::merge))
        .route(
            "/coupon/:code",
            get(coupons::get).post(coupons::create).put(coupons::update).delete(coupons::remove),
        )
        .route("/coupons", get(coupons::list))
        .route("/coupon-product-mapping/:code", post(coupons::map_products))
        .route("/order", post(orders::place))
        .route("/orders", get(orders::list))
        .route("/order/:order_id", get(orders::get).delete(orders::cancel))
        .route("/order/:order_id/pay", post(orders::pay))
        .route("/order-receiver", post(orders::create_receiver))
        .route(
            "/order-receiver/:id",
            get(orders::get_receiver).put(orders::update_receiver).delete(orders::remove_receiver),
        )
}

fn catalog_routes() -> Router<ServerState> {
    Router::new()
        .route(
            "/product-category/:id",
            get(catalog::get_category).put(catalog::update_category).delete(catalog::remove_category),
        )
        .route(
            "/product-categories/:parent_id",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/product/:slug",
            get(catalog::get_product).put(catalog::update_product).delete(catalog::remove_product),
        )
        .route("/product", post(catalog::create_product))
        .route("/products", get(catalog::list_products).post(catalog::bulk_create))
        .route(
            "/product-attribute/:attr_id",
            get(catalog::get_attribute).put(catalog::update_attribute).delete(catalog::remove_attribute),
        )
        .route("/product-attribute", post(catalog::create_attribute))
        .route("/product-attributes/:slug", get(catalog::list_attributes))
        .route(
            "/product-attribute-option/:opt_id",
            get(catalog::get_option).put(catalog::update_option).delete(catalog::remove_option),
        )
        .route("/product-attribute-option", post(catalog::create_option))
        .route("/product-attribute-options/:attr_id", get(catalog::list_options))
        .route("/product-image/:slug", get(catalog::list_images).post(catalog::register_images))
        .route(
            "/product-image/:slug/:filename",
            get(catalog::get_image).delete(catalog::remove_image),
        )
        .route(
            "/product-review/:product_id",
            get(reviews::get).post(reviews::create).put(reviews::update).delete(reviews::remove),
        )
        .route("/product-reviews/:product_id", get(reviews::list))
}

fn admin_routes() -> Router<ServerState> {
    Router::new()
        .route("/admin/users", get(admin::list_users))
        .route("/admin/orders", get(admin::list_orders))
        .route("/admin/orders/:order_id/status", put(admin::update_order_status))
}

/// Build the full application router: health and metrics endpoints, the rate-limited API and admin routes
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    // 探针与文档不计入限流
    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(observability::metrics))
        .route("/api-docs/openapi.json", get(openapi_json));

    let api = Router::new()
        .merge(user_routes())
        .merge(shop_routes())
        .merge(catalog_routes())
        .merge(admin_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit::limit_by_ip));

    public
        .merge(api)
        .with_state(state)
        .layer(middleware::from_fn(observability::track_requests))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // 每次请求创建 span，包含方法和路径等，日志级别为 INFO
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                // 请求到达时打点
                .on_request(
                    DefaultOnRequest::new()
                        .level(Level::INFO),
                )
                // 响应返回时打点，包含状态码与耗时
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                // 失败（5xx 等）时以 ERROR 记录
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR),
                )
        )
}
