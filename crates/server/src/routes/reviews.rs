use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use models::review;
use service::reviews::{self, ReviewInput, ReviewUpdate};

use super::{created, data, done, message, ApiResult, Envelope};
use crate::auth::AuthUser;
use crate::errors::JsonBody;
use crate::startup::ServerState;

pub async fn get(State(state): State<ServerState>, Path(product_id): Path<Uuid>) -> ApiResult<Json<Envelope<review::Model>>> {
    Ok(data(reviews::get_review(&state.db, product_id).await?))
}

pub async fn list(State(state): State<ServerState>, Path(product_id): Path<Uuid>) -> ApiResult<Json<Envelope<Vec<review::Model>>>> {
    Ok(data(reviews::list_reviews(&state.db, product_id).await?))
}

pub async fn create(
    State(state): State<ServerState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    JsonBody(input): JsonBody<ReviewInput>,
) -> ApiResult<(StatusCode, Json<Envelope<review::Model>>)> {
    let saved = reviews::create_review(&state.db, user.user_id, product_id, input).await?;
    Ok(created("review_created", saved))
}

pub async fn update(
    State(state): State<ServerState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    JsonBody(input): JsonBody<ReviewUpdate>,
) -> ApiResult<Json<Envelope<review::Model>>> {
    let saved = reviews::update_review(&state.db, user.user_id, product_id, input).await?;
    Ok(done("review_updated", saved))
}

pub async fn remove(State(state): State<ServerState>, user: AuthUser, Path(product_id): Path<Uuid>) -> ApiResult<Json<Envelope<()>>> {
    reviews::deactivate_review(&state.db, user.user_id, product_id).await?;
    Ok(message("review_deleted"))
}
