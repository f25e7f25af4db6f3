//! Admin-only listings and the shipping status workflow.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use models::order::{self, OrderStatus};
use service::admin::{self, UserSummary};
use service::pagination::{Page, Pagination};

use super::{done, ApiResult, Envelope};
use crate::auth::{require_roles, AuthUser, ADMIN};
use crate::errors::JsonBody;
use crate::startup::ServerState;

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: OrderStatus,
}

pub async fn list_users(
    State(state): State<ServerState>,
    user: AuthUser,
    Query(opts): Query<Pagination>,
) -> ApiResult<Json<Page<UserSummary>>> {
    require_roles(&state, &user, ADMIN).await?;
    Ok(Json(admin::list_users(&state.db, opts).await?))
}

pub async fn list_orders(
    State(state): State<ServerState>,
    user: AuthUser,
    Query(opts): Query<Pagination>,
) -> ApiResult<Json<Page<order::Model>>> {
    require_roles(&state, &user, ADMIN).await?;
    Ok(Json(admin::list_all_orders(&state.db, opts).await?))
}

pub async fn update_order_status(
    State(state): State<ServerState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    JsonBody(body): JsonBody<StatusBody>,
) -> ApiResult<Json<Envelope<order::Model>>> {
    require_roles(&state, &user, ADMIN).await?;
    let saved = admin::update_order_status(&state.db, order_id, body.status).await?;
    Ok(done("order_status_updated", saved))
}
