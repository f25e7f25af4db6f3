mod support;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use support::{build_app, call, login, register_confirmed, test_config, ADMIN_EMAIL};

#[tokio::test]
async fn test_catalog_writes_need_staff_role() -> anyhow::Result<()> {
    let app = build_app(test_config()).await?;
    register_confirmed(&app, "shopper@example.com").await?;
    let (shopper, _) = login(&app, "shopper@example.com").await?;
    let product = json!({"name": "Desk Lamp", "price": 2500});

    let reply = call(&app, "POST", "/product", None, Some(product.clone())).await?;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = call(&app, "POST", "/product", Some(&shopper), Some(product)).await?;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    // Reads stay public
    let reply = call(&app, "GET", "/products", None, None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["total_items"], 0);
    Ok(())
}

#[tokio::test]
async fn test_cart_coupon_and_checkout() -> anyhow::Result<()> {
    let app = build_app(test_config()).await?;
    register_confirmed(&app, ADMIN_EMAIL).await?;
    register_confirmed(&app, "buyer@example.com").await?;
    let (admin, _) = login(&app, ADMIN_EMAIL).await?;
    let (buyer, _) = login(&app, "buyer@example.com").await?;

    // Catalog
    let reply = call(&app, "POST", "/product", Some(&admin), Some(json!({"name": "Desk Lamp", "price": 2500}))).await?;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["data"]["slug"], "desk-lamp");
    let product_id = reply.body["data"]["id"].as_str().unwrap_or_default().to_string();

    let reply = call(&app, "POST", "/product", Some(&admin), Some(json!({"name": "Desk Lamp", "price": 2500}))).await?;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = call(&app, "POST", "/product", Some(&admin), Some(json!({"name": "Free Lamp", "price": 0}))).await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    // Coupon: 10% capped at 300
    let coupon = json!({
        "coupon_type": "percentage",
        "value": 10,
        "max_value": 300,
        "start_at": (Utc::now() - Duration::hours(1)).to_rfc3339(),
        "expire_at": (Utc::now() + Duration::days(7)).to_rfc3339(),
    });
    let reply = call(&app, "POST", "/coupon/WELCOME10", Some(&admin), Some(coupon)).await?;
    assert_eq!(reply.status, StatusCode::CREATED);
    let reply = call(&app, "POST", "/coupon-product-mapping/WELCOME10", Some(&admin), Some(json!({"slugs": ["desk-lamp"]}))).await?;
    assert_eq!(reply.status, StatusCode::OK);

    // Cart
    let reply = call(&app, "POST", "/apply-coupon/WELCOME10", Some(&buyer), None).await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let item = json!({"product_id": product_id, "quantity": 1});
    let reply = call(&app, "POST", "/cart-item", Some(&buyer), Some(item.clone())).await?;
    assert_eq!(reply.status, StatusCode::CREATED);
    let reply = call(&app, "POST", "/cart-item", Some(&buyer), Some(item)).await?;
    assert_eq!(reply.body["data"]["cart_items"][0]["quantity"], 2);
    assert_eq!(reply.body["data"]["total"], 5000);

    let reply = call(&app, "POST", "/apply-coupon/WELCOME10", Some(&buyer), None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["total"], 4700);

    let reply = call(&app, "POST", "/apply-coupon/NOPE", Some(&buyer), None).await?;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    // Checkout
    let reply = call(&app, "POST", "/order-receiver", Some(&buyer), Some(json!({"user": "self"}))).await?;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["data"]["first_name"], "Jane");
    let receiver_id = reply.body["data"]["id"].as_str().unwrap_or_default().to_string();

    let order = json!({
        "order_receiver_id": receiver_id,
        "shipping_cost": 500,
        "payment_token": "tok_visa",
        "test_mode": true,
    });
    let reply = call(&app, "POST", "/order", Some(&buyer), Some(order.clone())).await?;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["data"]["total"], 5200);
    assert_eq!(reply.body["data"]["payment_status"], "paid");
    assert_eq!(reply.body["data"]["status"], "placed");
    let order_id = reply.body["data"]["id"].as_str().unwrap_or_default().to_string();

    // Paid carts are closed; the next order finds no cart items
    let reply = call(&app, "POST", "/order", Some(&buyer), Some(order)).await?;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = call(&app, "GET", "/orders", Some(&buyer), None).await?;
    assert_eq!(reply.body["data"].as_array().map(Vec::len), Some(1));

    let reply = call(&app, "GET", &format!("/order/{order_id}"), Some(&buyer), None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["items"][0]["quantity"], 2);

    // Shipping workflow
    let status_uri = format!("/admin/orders/{order_id}/status");
    let reply = call(&app, "PUT", &status_uri, Some(&buyer), Some(json!({"status": "shipped"}))).await?;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    let reply = call(&app, "PUT", &status_uri, Some(&admin), Some(json!({"status": "shipped"}))).await?;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = call(&app, "DELETE", &format!("/order/{order_id}"), Some(&buyer), None).await?;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = call(&app, "GET", "/admin/orders", Some(&admin), None).await?;
    assert_eq!(reply.body["total_items"], 1);
    Ok(())
}

#[tokio::test]
async fn test_anonymous_cart_is_keyed_by_client_ip() -> anyhow::Result<()> {
    let app = build_app(test_config()).await?;

    let reply = call(&app, "POST", "/cart", None, None).await?;
    assert_eq!(reply.status, StatusCode::CREATED);
    let reply = call(&app, "POST", "/cart", None, None).await?;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = call(&app, "GET", "/cart", None, None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["total"], 0);
    assert_eq!(reply.body["data"]["cart_items"], json!([]));

    let reply = call(&app, "DELETE", "/cart", None, None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    Ok(())
}
