mod support;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use support::{build_app, call, login, register_body, register_confirmed, send, test_config, PASSWORD};

#[tokio::test]
async fn test_register_and_login_flow() -> anyhow::Result<()> {
    let app = build_app(test_config()).await?;
    let email = "jane@example.com";

    let reply = call(&app, "POST", "/register", None, Some(register_body(email))).await?;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert!(reply.body["message"].as_str().unwrap_or_default().contains(email));
    let user_id = reply.body["data"]["id"].as_str().unwrap_or_default().to_string();

    // Duplicate email
    let reply = call(&app, "POST", "/register", None, Some(register_body(email))).await?;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    // Unconfirmed accounts cannot log in yet
    let creds = json!({"email": email, "password": PASSWORD});
    let reply = call(&app, "POST", "/login", None, Some(creds.clone())).await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let status = call(&app, "GET", &format!("/confirm-email-resend/{user_id}"), None, None).await?;
    let confirmation = status.body["confirmation"][0]["id"].as_str().unwrap_or_default().to_string();
    let reply = call(&app, "GET", &format!("/user-email-confirm/{confirmation}"), None, None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    let reply = call(&app, "GET", &format!("/user-email-confirm/{confirmation}"), None, None).await?;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = call(&app, "POST", "/login", None, Some(creds)).await?;
    assert_eq!(reply.status, StatusCode::OK);
    // Must set cookie
    let cookie = reply.headers.get("set-cookie").and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert!(cookie.starts_with("auth_token="));
    assert!(reply.body["note"].as_str().unwrap_or_default().contains("Active sessions: 1."));

    // The cookie alone authenticates
    let token = reply.body["access_token"].as_str().unwrap_or_default();
    let req = Request::builder()
        .method("GET")
        .uri("/address")
        .header("cookie", format!("auth_token={token}"))
        .body(Body::empty())?;
    let reply = send(&app, req).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["addresses"], json!([]));
    Ok(())
}

#[tokio::test]
async fn test_refresh_and_logout() -> anyhow::Result<()> {
    let app = build_app(test_config()).await?;
    register_confirmed(&app, "sam@example.com").await?;
    let (access, refresh) = login(&app, "sam@example.com").await?;

    let reply = call(&app, "POST", "/user-token-refresh", Some(&refresh), None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["access_token"].is_string());

    // Access tokens are not accepted where a refresh token is expected
    let reply = call(&app, "POST", "/user-token-refresh", Some(&access), None).await?;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = call(&app, "POST", "/logout", Some(&refresh), None).await?;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = call(&app, "POST", "/user-token-refresh", Some(&refresh), None).await?;
    assert_eq!(reply.status.as_u16(), 440);
    Ok(())
}

#[tokio::test]
async fn test_fresh_login_returns_access_token_only() -> anyhow::Result<()> {
    let app = build_app(test_config()).await?;
    register_confirmed(&app, "kim@example.com").await?;
    let reply = call(&app, "POST", "/fresh-login", None, Some(json!({"email": "kim@example.com", "password": PASSWORD}))).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["access_token"].is_string());
    assert!(reply.body.get("refresh_token").is_none());
    Ok(())
}

#[tokio::test]
async fn test_request_errors_are_json() -> anyhow::Result<()> {
    let app = build_app(test_config()).await?;

    // Missing token
    let reply = call(&app, "GET", "/orders", None, None).await?;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert!(reply.body["message"].is_string());

    // Garbage token
    let reply = call(&app, "GET", "/orders", Some("not-a-jwt"), None).await?;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    // Malformed body
    let req = Request::builder()
        .method("POST")
        .uri("/login")
        .header("content-type", "application/json")
        .body(Body::from("{\"email\": "))?;
    let reply = send(&app, req).await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "Bad Request");

    // Field rules
    let mut body = register_body("bad@example.com");
    body["phone_no"] = json!("12345");
    let reply = call(&app, "POST", "/register", None, Some(body)).await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    // Unknown email
    let reply = call(&app, "POST", "/login", None, Some(json!({"email": "ghost@example.com", "password": PASSWORD}))).await?;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_roles_require_admin() -> anyhow::Result<()> {
    let app = build_app(test_config()).await?;
    register_confirmed(&app, support::ADMIN_EMAIL).await?;
    register_confirmed(&app, "clerk@example.com").await?;
    let (admin, _) = login(&app, support::ADMIN_EMAIL).await?;
    let (clerk, _) = login(&app, "clerk@example.com").await?;

    let reply = call(&app, "GET", "/user-roles", Some(&clerk), None).await?;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = call(&app, "GET", "/user-roles", Some(&admin), None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    let roles = reply.body["roles"].as_array().cloned().unwrap_or_default();
    assert!(roles.contains(&json!("admin")) && roles.contains(&json!("shop_keeper")));

    let reply = call(&app, "POST", "/user-roles", Some(&admin), Some(json!({"role": "shop_keeper"}))).await?;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let body = json!({"role": "shop_keeper", "users": ["clerk@example.com", "nobody@example.com"]});
    let reply = call(&app, "POST", "/user-roles-assign", Some(&admin), Some(body)).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["Success"], json!(["clerk@example.com"]));
    assert_eq!(reply.body["User not found"], json!(["nobody@example.com"]));
    Ok(())
}
