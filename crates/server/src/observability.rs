use std::time::Instant;

use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram, IntCounter, IntCounterVec,
    TextEncoder,
};

use service::errors::ServiceError;

// Prometheus metrics (default registry)
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "storefront_http_requests_total",
        "Total HTTP requests by method and status",
        &["method", "status"]
    )
    .expect("register http_requests_total")
});

pub static REQUEST_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "storefront_request_duration_seconds",
        "Request duration in seconds",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("register request_duration")
});

pub static RATE_LIMITED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "storefront_rate_limited_total",
        "Total requests rejected by rate limiter"
    )
    .expect("register rate_limited_total")
});

pub static ORDERS_PLACED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "storefront_orders_placed_total",
        "Total orders created from carts"
    )
    .expect("register orders_placed_total")
});

pub static PAYMENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "storefront_payments_total",
        "Payment attempts by outcome",
        &["outcome"]
    )
    .expect("register payments_total")
});

/// Count a payment attempt from the charge result.
pub fn record_payment<T>(result: &Result<T, ServiceError>) {
    let outcome = match result {
        Ok(_) => "paid",
        Err(ServiceError::Payment { .. }) => "failed",
        Err(_) => return,
    };
    PAYMENTS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Middleware counting every request and timing it.
pub async fn track_requests(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let started = Instant::now();
    let resp = next.run(req).await;
    REQUEST_DURATION.observe(started.elapsed().as_secs_f64());
    HTTP_REQUESTS_TOTAL.with_label_values(&[&method, resp.status().as_str()]).inc();
    resp
}

pub fn encode_metrics() -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {e}"));
    }
    (StatusCode::OK, String::from_utf8(buffer).unwrap_or_default())
}

pub async fn metrics() -> Response {
    let (status, body) = encode_metrics();
    (status, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_outcomes_are_counted() {
        let before = PAYMENTS_TOTAL.with_label_values(&["failed"]).get();
        record_payment::<()>(&Err(ServiceError::Payment { status: 402, body: serde_json::json!({}) }));
        record_payment::<()>(&Err(ServiceError::not_found("order_not_found")));
        assert_eq!(PAYMENTS_TOTAL.with_label_values(&["failed"]).get(), before + 1);
    }

    #[test]
    fn encoded_metrics_include_storefront_counters() {
        ORDERS_PLACED_TOTAL.inc();
        let (status, body) = encode_metrics();
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("storefront_orders_placed_total"));
    }
}
