use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use models::address;
use service::addresses::{self, AddressInput, AddressUpdate};

use super::{created, done, message, ApiResult, Envelope};
use crate::auth::AuthUser;
use crate::errors::JsonBody;
use crate::startup::ServerState;

#[derive(Debug, Deserialize)]
pub struct AddressId {
    pub id: Uuid,
}

pub async fn list(State(state): State<ServerState>, user: AuthUser) -> ApiResult<Json<Value>> {
    let items = addresses::list_addresses(&state.db, user.user_id).await?;
    Ok(Json(json!({ "addresses": items })))
}

pub async fn create(
    State(state): State<ServerState>,
    user: AuthUser,
    JsonBody(input): JsonBody<AddressInput>,
) -> ApiResult<(StatusCode, Json<Envelope<address::Model>>)> {
    let saved = addresses::create_address(&state.db, user.user_id, input).await?;
    Ok(created("address_created", saved))
}

pub async fn update(
    State(state): State<ServerState>,
    user: AuthUser,
    JsonBody(input): JsonBody<AddressUpdate>,
) -> ApiResult<Json<Envelope<address::Model>>> {
    let saved = addresses::update_address(&state.db, user.user_id, input).await?;
    Ok(done("address_updated", saved))
}

pub async fn remove(
    State(state): State<ServerState>,
    user: AuthUser,
    JsonBody(body): JsonBody<AddressId>,
) -> ApiResult<Json<Envelope<()>>> {
    addresses::deactivate_address(&state.db, user.user_id, body.id).await?;
    Ok(message("address_deleted"))
}
