use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use models::coupon;
use service::coupons::{self, CouponInput, CouponUpdate, ProductSelection};

use super::{created, data, done, message, ApiResult, Envelope};
use crate::auth::{require_roles, AuthUser, STAFF};
use crate::errors::JsonBody;
use crate::startup::ServerState;

#[utoipa::path(get, path = "/coupon/{code}", tag = "coupons", params(("code" = String, Path, description = "Coupon code")), responses((status = 200, description = "Coupon"), (status = 404, description = "Not Found")))]
pub async fn get(State(state): State<ServerState>, Path(code): Path<String>) -> ApiResult<Json<Envelope<coupon::Model>>> {
    Ok(data(coupons::get_coupon(&state.db, &code).await?))
}

pub async fn list(State(state): State<ServerState>) -> ApiResult<Json<Envelope<Vec<coupon::Model>>>> {
    Ok(data(coupons::list_coupons(&state.db).await?))
}

pub async fn create(
    State(state): State<ServerState>,
    user: AuthUser,
    Path(code): Path<String>,
    JsonBody(input): JsonBody<CouponInput>,
) -> ApiResult<(StatusCode, Json<Envelope<coupon::Model>>)> {
    require_roles(&state, &user, STAFF).await?;
    let saved = coupons::create_coupon(&state.db, &code, input).await?;
    Ok(created("coupon_created", saved))
}

pub async fn update(
    State(state): State<ServerState>,
    user: AuthUser,
    Path(code): Path<String>,
    JsonBody(input): JsonBody<CouponUpdate>,
) -> ApiResult<Json<Envelope<coupon::Model>>> {
    require_roles(&state, &user, STAFF).await?;
    let saved = coupons::update_coupon(&state.db, &code, input).await?;
    Ok(done("coupon_updated", saved))
}

pub async fn remove(State(state): State<ServerState>, user: AuthUser, Path(code): Path<String>) -> ApiResult<Json<Envelope<()>>> {
    require_roles(&state, &user, STAFF).await?;
    coupons::deactivate_coupon(&state.db, &code).await?;
    Ok(message("coupon_deleted"))
}

pub async fn map_products(
    State(state): State<ServerState>,
    user: AuthUser,
    Path(code): Path<String>,
    JsonBody(selection): JsonBody<ProductSelection>,
) -> ApiResult<Json<Envelope<Vec<Uuid>>>> {
    require_roles(&state, &user, STAFF).await?;
    let mapped = coupons::map_products(&state.db, &code, selection).await?;
    Ok(done("coupon_mapped", mapped))
}
