mod support;

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;

use support::{build_app, call, send, test_config, Reply};

async fn from_peer(app: &Router, peer: &str, forwarded_for: &str) -> anyhow::Result<Reply> {
    let mut req = Request::builder()
        .uri("/products")
        .header("x-forwarded-for", forwarded_for)
        .body(Body::empty())?;
    req.extensions_mut().insert(ConnectInfo(peer.parse::<SocketAddr>()?));
    send(app, req).await
}

#[tokio::test]
async fn test_hourly_limit_returns_429() -> anyhow::Result<()> {
    let mut cfg = test_config();
    cfg.rate_limit.requests_per_hour = 2;
    let app = build_app(cfg).await?;

    for _ in 0..2 {
        let reply = call(&app, "GET", "/coupons", None, None).await?;
        assert_eq!(reply.status, StatusCode::OK);
    }
    let reply = call(&app, "GET", "/coupons", None, None).await?;
    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(reply.body["message"], "rate limit exceeded, please try again later.");

    // Health and metrics are not limited
    let reply = call(&app, "GET", "/health", None, None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    let reply = call(&app, "GET", "/metrics", None, None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_forwarded_for_from_untrusted_peer_does_not_reset_limit() -> anyhow::Result<()> {
    let mut cfg = test_config();
    cfg.rate_limit.requests_per_hour = 2;
    let app = build_app(cfg).await?;

    let mut statuses = Vec::new();
    for i in 0..6 {
        statuses.push(from_peer(&app, "198.51.100.9:50000", &format!("1.2.3.{i}")).await?.status);
    }
    assert_eq!(&statuses[..2], &[StatusCode::OK, StatusCode::OK]);
    assert!(statuses[2..].iter().all(|s| *s == StatusCode::TOO_MANY_REQUESTS));
    Ok(())
}

#[tokio::test]
async fn test_trusted_proxy_limits_each_forwarded_client() -> anyhow::Result<()> {
    let mut cfg = test_config();
    cfg.rate_limit.requests_per_hour = 1;
    cfg.server.trusted_proxies = vec!["10.0.0.1".parse()?];
    let app = build_app(cfg).await?;

    assert_eq!(from_peer(&app, "10.0.0.1:50000", "203.0.113.7").await?.status, StatusCode::OK);
    assert_eq!(from_peer(&app, "10.0.0.1:50000", "203.0.113.8").await?.status, StatusCode::OK);
    assert_eq!(
        from_peer(&app, "10.0.0.1:50000", "203.0.113.7").await?.status,
        StatusCode::TOO_MANY_REQUESTS
    );
    Ok(())
}

#[tokio::test]
async fn test_openapi_document_is_served() -> anyhow::Result<()> {
    let app = build_app(test_config()).await?;
    let reply = call(&app, "GET", "/api-docs/openapi.json", None, None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["paths"]["/order"].is_object());
    Ok(())
}
