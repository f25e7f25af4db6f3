//! Cart endpoints. Anonymous callers get a cart bound to their client IP;
//! signed-in callers get one bound to their user.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use models::cart as cart_model;
use service::cart::{self, AddItem, CartLine, CartOwner, CartView, ItemKey, UpdateItem};

use super::{created, data, done, message, ApiResult, Envelope};
use crate::auth::{AuthUser, ClientIp, MaybeUser};
use crate::errors::JsonBody;
use crate::startup::ServerState;

fn owner(user: Option<AuthUser>, ip: String) -> CartOwner {
    CartOwner::new(user.map(|u| u.user_id), ip)
}

pub async fn get_cart(
    State(state): State<ServerState>,
    MaybeUser(user): MaybeUser,
    ClientIp(ip): ClientIp,
) -> ApiResult<Json<Envelope<CartView>>> {
    Ok(data(cart::get_cart(&state.db, &owner(user, ip)).await?))
}

pub async fn create_cart(
    State(state): State<ServerState>,
    MaybeUser(user): MaybeUser,
    ClientIp(ip): ClientIp,
) -> ApiResult<(StatusCode, Json<Envelope<cart_model::Model>>)> {
    let saved = cart::create_cart(&state.db, &owner(user, ip)).await?;
    Ok(created("cart_created", saved))
}

pub async fn delete_cart(
    State(state): State<ServerState>,
    MaybeUser(user): MaybeUser,
    ClientIp(ip): ClientIp,
) -> ApiResult<Json<Envelope<()>>> {
    cart::delete_cart(&state.db, &owner(user, ip)).await?;
    Ok(message("cart_deleted"))
}

pub async fn list_items(
    State(state): State<ServerState>,
    MaybeUser(user): MaybeUser,
    ClientIp(ip): ClientIp,
) -> ApiResult<Json<Envelope<Vec<CartLine>>>> {
    Ok(data(cart::list_items(&state.db, &owner(user, ip)).await?))
}

pub async fn add_item(
    State(state): State<ServerState>,
    MaybeUser(user): MaybeUser,
    ClientIp(ip): ClientIp,
    JsonBody(input): JsonBody<AddItem>,
) -> ApiResult<(StatusCode, Json<Envelope<CartView>>)> {
    let view = cart::add_item(&state.db, &owner(user, ip), input).await?;
    Ok(created("cart_item_added", view))
}

pub async fn update_item(
    State(state): State<ServerState>,
    MaybeUser(user): MaybeUser,
    ClientIp(ip): ClientIp,
    JsonBody(input): JsonBody<UpdateItem>,
) -> ApiResult<Json<Envelope<CartView>>> {
    let view = cart::update_item(&state.db, &owner(user, ip), input).await?;
    Ok(done("cart_item_updated", view))
}

pub async fn remove_item(
    State(state): State<ServerState>,
    MaybeUser(user): MaybeUser,
    ClientIp(ip): ClientIp,
    JsonBody(key): JsonBody<ItemKey>,
) -> ApiResult<Json<Envelope<CartView>>> {
    let view = cart::remove_item(&state.db, &owner(user, ip), key).await?;
    Ok(done("cart_item_deleted", view))
}

pub async fn apply_coupon(
    State(state): State<ServerState>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    Path(code): Path<String>,
) -> ApiResult<Json<Envelope<CartView>>> {
    let view = cart::apply_coupon(&state.db, &owner(Some(user), ip), &code).await?;
    Ok(done("cart_coupon_applied", view))
}

pub async fn merge(
    State(state): State<ServerState>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    Path(cart_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<CartView>>> {
    let view = cart::merge(&state.db, &owner(Some(user), ip), cart_id).await?;
    Ok(done("cart_merged", view))
}
