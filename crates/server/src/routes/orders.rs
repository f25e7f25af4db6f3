//! Checkout, payment retries, cancellation and order receivers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;
use uuid::Uuid;

use models::{order, order_receiver};
use service::cart::CartOwner;
use service::errors::ServiceError;
use service::orders::{self, OrderDetail, PayOrder, PlaceOrder, ReceiverInput};

use super::{created, data, done, message, ApiResult, Envelope};
use crate::auth::{AuthUser, ClientIp};
use crate::errors::JsonBody;
use crate::observability::{record_payment, ORDERS_PLACED_TOTAL};
use crate::startup::ServerState;

#[utoipa::path(post, path = "/order", tag = "orders", request_body = crate::openapi::PlaceOrderRequest, responses((status = 201, description = "Order placed and paid"), (status = 402, description = "Card declined"), (status = 404, description = "Cart missing or empty"), (status = 409, description = "Order already exists for the cart")))]
pub async fn place(
    State(state): State<ServerState>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    JsonBody(input): JsonBody<PlaceOrder>,
) -> ApiResult<(StatusCode, Json<Envelope<order::Model>>)> {
    let owner = CartOwner::new(Some(user.user_id), ip);
    let result = orders::place_order(&state.db, &state.checkout, &owner, input).await;
    // 支付失败时订单已落库，同样计入下单数
    if matches!(result, Ok(_) | Err(ServiceError::Payment { .. })) {
        ORDERS_PLACED_TOTAL.inc();
        record_payment(&result);
    }
    let placed = result?;
    info!(event = "order_placed", order_id = %placed.id, user_id = %user.user_id, total = placed.total);
    Ok(created("order_placed", placed))
}

pub async fn pay(
    State(state): State<ServerState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    JsonBody(input): JsonBody<PayOrder>,
) -> ApiResult<Json<Envelope<order::Model>>> {
    let result = orders::retry_payment(&state.db, &state.checkout, user.user_id, order_id, input).await;
    record_payment(&result);
    Ok(done("order_paid", result?))
}

pub async fn list(State(state): State<ServerState>, user: AuthUser) -> ApiResult<Json<Envelope<Vec<order::Model>>>> {
    Ok(data(orders::list_orders(&state.db, user.user_id).await?))
}

pub async fn get(State(state): State<ServerState>, user: AuthUser, Path(order_id): Path<Uuid>) -> ApiResult<Json<Envelope<OrderDetail>>> {
    Ok(data(orders::get_order(&state.db, user.user_id, order_id).await?))
}

pub async fn cancel(State(state): State<ServerState>, user: AuthUser, Path(order_id): Path<Uuid>) -> ApiResult<Json<Envelope<order::Model>>> {
    let cancelled = orders::cancel_order(&state.db, user.user_id, order_id).await?;
    Ok(done("order_cancelled", cancelled))
}

pub async fn create_receiver(
    State(state): State<ServerState>,
    user: AuthUser,
    JsonBody(input): JsonBody<ReceiverInput>,
) -> ApiResult<(StatusCode, Json<Envelope<order_receiver::Model>>)> {
    let saved = orders::create_receiver(&state.db, user.user_id, input).await?;
    Ok(created("order_receiver_created", saved))
}

pub async fn get_receiver(
    State(state): State<ServerState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Envelope<order_receiver::Model>>> {
    Ok(data(orders::get_receiver(&state.db, user.user_id, id).await?))
}

pub async fn update_receiver(
    State(state): State<ServerState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(input): JsonBody<ReceiverInput>,
) -> ApiResult<Json<Envelope<order_receiver::Model>>> {
    let saved = orders::update_receiver(&state.db, user.user_id, id, input).await?;
    Ok(done("order_receiver_updated", saved))
}

pub async fn remove_receiver(State(state): State<ServerState>, user: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<Envelope<()>>> {
    orders::deactivate_receiver(&state.db, user.user_id, id).await?;
    Ok(message("order_receiver_deleted"))
}
