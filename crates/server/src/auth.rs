//! Request extractors for the caller's identity and address.
//!
//! Access tokens are read from `Authorization: Bearer <token>` and fall back
//! to the `auth_token` cookie set at login. Refresh tokens are only accepted
//! from the header.

use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;
use uuid::Uuid;

use service::auth::domain::TokenKind;
use service::errors::ServiceError;
use service::roles;

use crate::errors::JsonApiError;
use crate::startup::ServerState;

pub const AUTH_COOKIE: &str = "auth_token";

pub const ADMIN: &[&str] = &["admin"];
pub const STAFF: &[&str] = &["admin", "shop_keeper"];

/// Caller holding a valid access token.
#[derive(Clone, Copy, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub fresh: bool,
}

/// Access token when present; anonymous callers get `None`.
#[derive(Clone, Copy, Debug)]
pub struct MaybeUser(pub Option<AuthUser>);

/// Caller presenting a refresh token; the raw token is kept for session lookup.
#[derive(Clone, Debug)]
pub struct RefreshUser {
    pub user_id: Uuid,
    pub token: String,
}

/// Client address used for sessions and rate limiting.
#[derive(Clone, Debug)]
pub struct ClientIp(pub String);

fn bearer(headers: &HeaderMap) -> Result<Option<String>, JsonApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else { return Ok(None) };
    let value = value.to_str().map_err(|_| JsonApiError::unauthorized("token_invalid"))?;
    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
        _ => {
            warn!("invalid Authorization format (expect Bearer)");
            Err(JsonApiError::unauthorized("token_invalid"))
        }
    }
}

fn access_token(parts: &Parts) -> Result<Option<String>, JsonApiError> {
    if let Some(token) = bearer(&parts.headers)? {
        return Ok(Some(token));
    }
    // Cookie 回退：登录时写入的 auth_token
    let jar = CookieJar::from_headers(&parts.headers);
    Ok(jar.get(AUTH_COOKIE).map(|c| c.value().to_string()).filter(|t| !t.is_empty()))
}

fn verify_access(state: &ServerState, token: &str) -> Result<AuthUser, JsonApiError> {
    let claims = state.auth.verify_token(token, TokenKind::Access).map_err(|e| {
        warn!(error = %e, "access token rejected");
        JsonApiError::unauthorized("token_invalid")
    })?;
    Ok(AuthUser { user_id: claims.sub, fresh: claims.fresh })
}

#[async_trait]
impl FromRequestParts<ServerState> for AuthUser {
    type Rejection = JsonApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ServerState) -> Result<Self, Self::Rejection> {
        match access_token(parts)? {
            Some(token) => verify_access(state, &token),
            None => Err(JsonApiError::unauthorized("unauthorized")),
        }
    }
}

#[async_trait]
impl FromRequestParts<ServerState> for MaybeUser {
    type Rejection = JsonApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ServerState) -> Result<Self, Self::Rejection> {
        // 携带了 token 但无效时仍然拒绝，避免静默降级为匿名购物车
        match access_token(parts)? {
            Some(token) => Ok(Self(Some(verify_access(state, &token)?))),
            None => Ok(Self(None)),
        }
    }
}

#[async_trait]
impl FromRequestParts<ServerState> for RefreshUser {
    type Rejection = JsonApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ServerState) -> Result<Self, Self::Rejection> {
        let token = bearer(&parts.headers)?.ok_or_else(|| JsonApiError::unauthorized("unauthorized"))?;
        let claims = state.auth.verify_token(&token, TokenKind::Refresh).map_err(|e| {
            warn!(error = %e, "refresh token rejected");
            JsonApiError::unauthorized("token_invalid")
        })?;
        Ok(Self { user_id: claims.sub, token })
    }
}

#[async_trait]
impl FromRequestParts<ServerState> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &ServerState) -> Result<Self, Self::Rejection> {
        Ok(Self(client_ip(parts, &state.config.server.trusted_proxies)))
    }
}

/// Socket peer address; `X-Forwarded-For` only counts when the peer is a
/// trusted proxy, and then the right-most untrusted hop is the client.
pub fn client_ip(parts: &Parts, trusted: &[IpAddr]) -> String {
    let Some(peer) = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| addr.ip()) else {
        return "0.0.0.0".to_string();
    };
    if !trusted.contains(&peer) {
        return peer.to_string();
    }
    let hops: Vec<IpAddr> = parts
        .headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|hop| hop.trim().parse().ok())
        .collect();
    hops.into_iter()
        .rev()
        .find(|hop| !trusted.contains(hop))
        .unwrap_or(peer)
        .to_string()
}

/// 403 unless the caller holds one of `allowed`.
pub async fn require_roles(state: &ServerState, user: &AuthUser, allowed: &[&str]) -> Result<(), JsonApiError> {
    if roles::user_has_any_role(&state.db, user.user_id, allowed).await? {
        return Ok(());
    }
    warn!(user_id = %user.user_id, ?allowed, "role check failed");
    Err(ServiceError::forbidden().into())
}
