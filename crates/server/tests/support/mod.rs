#![allow(dead_code)]

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use configs::AppConfig;
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@shop.example";
pub const PASSWORD: &str = "S3curePass!";

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.database.url = "sqlite::memory:".into();
    cfg.auth.jwt_secret = "test-secret".into();
    cfg.auth.bootstrap_admin_email = Some(ADMIN_EMAIL.into());
    cfg.payment.allow_test_mode = true;
    cfg.mail.enabled = false;
    cfg.server.images_dir = std::env::temp_dir()
        .join(format!("storefront-it-{}", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned();
    cfg
}

/// Router over a fresh, migrated in-memory database.
pub async fn build_app(cfg: AppConfig) -> anyhow::Result<Router> {
    let mut opt = ConnectOptions::new(cfg.database.url.clone());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await?;
    migration::Migrator::up(&db, None).await?;
    service::roles::ensure_default_roles(&db).await?;
    Ok(server::build_app(server::build_state(cfg, db)?))
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> anyhow::Result<Reply> {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header("authorization", format!("Bearer {t}"));
    }
    let req = match body {
        Some(b) => req.header("content-type", "application/json").body(Body::from(serde_json::to_vec(&b)?))?,
        None => req.body(Body::empty())?,
    };
    send(app, req).await
}

pub async fn send(app: &Router, req: Request<Body>) -> anyhow::Result<Reply> {
    let resp = app.clone().oneshot(req).await?;
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Ok(Reply { status, headers, body })
}

pub fn register_body(email: &str) -> Value {
    json!({
        "email": email,
        "first_name": "Jane",
        "last_name": "Doe",
        "phone_no": "9876543210",
        "password": PASSWORD,
    })
}

/// Register and confirm `email`; returns the user id.
pub async fn register_confirmed(app: &Router, email: &str) -> anyhow::Result<String> {
    let reply = call(app, "POST", "/register", None, Some(register_body(email))).await?;
    assert_eq!(reply.status, StatusCode::CREATED, "register: {}", reply.body);
    let user_id = reply.body["data"]["id"].as_str().unwrap_or_default().to_string();

    let status = call(app, "GET", &format!("/confirm-email-resend/{user_id}"), None, None).await?;
    let confirmation = status.body["confirmation"][0]["id"].as_str().unwrap_or_default().to_string();
    let reply = call(app, "GET", &format!("/user-email-confirm/{confirmation}"), None, None).await?;
    assert_eq!(reply.status, StatusCode::OK, "confirm: {}", reply.body);
    Ok(user_id)
}

/// Log in and return `(access_token, refresh_token)`.
pub async fn login(app: &Router, email: &str) -> anyhow::Result<(String, String)> {
    let reply = call(app, "POST", "/login", None, Some(json!({"email": email, "password": PASSWORD}))).await?;
    assert_eq!(reply.status, StatusCode::OK, "login: {}", reply.body);
    let access = reply.body["access_token"].as_str().unwrap_or_default().to_string();
    let refresh = reply.body["refresh_token"].as_str().unwrap_or_default().to_string();
    Ok((access, refresh))
}
