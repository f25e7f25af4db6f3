//! Accounts: registration, login sessions, email confirmation and roles.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use common::messages;
use service::auth::domain::{AuthUser as Account, ConfirmationStatus, LoginInput, LoginResult, RegisterInput};
use service::roles::{self, AssignReport};

use super::{created, message, ApiResult, Envelope};
use crate::auth::{require_roles, AuthUser, ClientIp, RefreshUser, ADMIN, AUTH_COOKIE};
use crate::errors::{JsonBody, ValidJson};
use crate::startup::ServerState;

#[derive(Debug, Deserialize)]
pub struct RoleBody {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignBody {
    pub role: String,
    #[serde(default)]
    pub users: Vec<String>,
}

fn auth_cookie(token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(AUTH_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(false);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

#[utoipa::path(post, path = "/register", tag = "auth", request_body = crate::openapi::RegisterRequest, responses((status = 201, description = "Registered"), (status = 400, description = "Bad Request"), (status = 409, description = "Conflict")))]
pub async fn register(
    State(state): State<ServerState>,
    ValidJson(input): ValidJson<RegisterInput>,
) -> ApiResult<(StatusCode, Json<Envelope<Account>>)> {
    let user = state.auth.register(input).await?;
    let msg = messages::format("user_registered", &user.email);
    Ok((StatusCode::CREATED, Json(Envelope { message: Some(msg), data: Some(user) })))
}

#[utoipa::path(post, path = "/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Logged In", body = crate::openapi::TokenPair), (status = 400, description = "Email not confirmed"), (status = 401, description = "Unauthorized")))]
pub async fn login(
    State(state): State<ServerState>,
    ClientIp(ip): ClientIp,
    jar: CookieJar,
    ValidJson(input): ValidJson<LoginInput>,
) -> ApiResult<(CookieJar, Json<LoginResult>)> {
    let result = state.auth.login(input, &ip).await?;
    let jar = jar.add(auth_cookie(result.access_token.clone()));
    Ok((jar, Json(result)))
}

#[utoipa::path(post, path = "/fresh-login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Fresh access token"), (status = 401, description = "Unauthorized")))]
pub async fn fresh_login(State(state): State<ServerState>, ValidJson(input): ValidJson<LoginInput>) -> ApiResult<Json<Value>> {
    let access_token = state.auth.fresh_login(input).await?;
    Ok(Json(json!({ "access_token": access_token })))
}

#[utoipa::path(post, path = "/user-token-refresh", tag = "auth", responses((status = 200, description = "Non-fresh access token"), (status = 401, description = "Unauthorized"), (status = 440, description = "Session expired")))]
pub async fn refresh(State(state): State<ServerState>, user: RefreshUser) -> ApiResult<Json<Value>> {
    let access_token = state.auth.refresh(user.user_id, &user.token).await?;
    Ok(Json(json!({ "access_token": access_token })))
}

#[utoipa::path(post, path = "/logout", tag = "auth", responses((status = 200, description = "Logged out")))]
pub async fn logout(
    State(state): State<ServerState>,
    jar: CookieJar,
    user: RefreshUser,
) -> ApiResult<(CookieJar, Json<Envelope<()>>)> {
    state.auth.logout(user.user_id, &user.token).await?;
    let jar = jar.remove(Cookie::build(AUTH_COOKIE).path("/"));
    Ok((jar, message("user_logged_out")))
}

pub async fn confirm_email(State(state): State<ServerState>, Path(confirmation_id): Path<String>) -> ApiResult<Json<Envelope<()>>> {
    state.auth.confirm_email(&confirmation_id).await?;
    Ok(message("confirmation_confirmed"))
}

/// Confirmation rows for a user; used by tests and local tooling.
pub async fn confirmation_status(State(state): State<ServerState>, Path(user_id): Path<Uuid>) -> ApiResult<Json<ConfirmationStatus>> {
    Ok(Json(state.auth.confirmation_status(user_id).await?))
}

pub async fn resend_confirmation(State(state): State<ServerState>, Path(user_id): Path<Uuid>) -> ApiResult<Json<Envelope<()>>> {
    state.auth.resend_confirmation(user_id).await?;
    Ok(message("confirmation_resent"))
}

pub async fn list_roles(State(state): State<ServerState>, user: AuthUser) -> ApiResult<Json<Value>> {
    require_roles(&state, &user, ADMIN).await?;
    let roles = roles::list_roles(&state.db).await?;
    Ok(Json(json!({ "roles": roles })))
}

pub async fn create_role(
    State(state): State<ServerState>,
    user: AuthUser,
    JsonBody(body): JsonBody<RoleBody>,
) -> ApiResult<(StatusCode, Json<Envelope<models::user_role::Model>>)> {
    require_roles(&state, &user, ADMIN).await?;
    let role = roles::create_role(&state.db, &body.role).await?;
    Ok(created("role_created", role))
}

pub async fn assign_role(
    State(state): State<ServerState>,
    user: AuthUser,
    JsonBody(body): JsonBody<AssignBody>,
) -> ApiResult<Json<AssignReport>> {
    require_roles(&state, &user, ADMIN).await?;
    Ok(Json(roles::assign_role(&state.db, &body.role, &body.users).await?))
}
