use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(utoipa::ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Ten digits, not starting with 0.
    pub phone_no: String,
    pub dob: Option<chrono::NaiveDate>,
    /// `male`, `female` or `other`.
    pub gender: Option<String>,
    pub password: String,
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Session type: `web` (default) or `mobile`.
    #[serde(rename = "type")]
    pub session_type: Option<String>,
}

#[derive(utoipa::ToSchema)]
pub struct TokenPair { pub access_token: String, pub refresh_token: String, pub note: String }

#[derive(utoipa::ToSchema)]
pub struct PlaceOrderRequest {
    pub order_receiver_id: Uuid,
    pub address_ids: Vec<Uuid>,
    /// Minor units.
    pub shipping_cost: i64,
    pub payment_token: String,
    pub test_mode: bool,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::users::register,
        crate::routes::users::login,
        crate::routes::users::fresh_login,
        crate::routes::users::refresh,
        crate::routes::users::logout,
        crate::routes::catalog::get_product,
        crate::routes::catalog::list_products,
        crate::routes::coupons::get,
        crate::routes::orders::place,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            TokenPair,
            PlaceOrderRequest,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "catalog"),
        (name = "coupons"),
        (name = "orders")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_checkout_and_auth_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/login"));
        assert!(doc.paths.paths.contains_key("/order"));
        assert!(doc.paths.paths.contains_key("/product/{slug}"));
    }
}
