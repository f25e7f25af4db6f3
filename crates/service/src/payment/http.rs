use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::{ChargeReceipt, ChargeRequest, PaymentError, PaymentGateway};

const IDEMPOTENCY_KEY: &str = "Idempotency-Key";

/// Card-processor style REST gateway: `POST {api_base}/charges` with a bearer key.
#[derive(Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    id: String,
}

impl HttpGateway {
    pub fn new(api_base: &str, api_key: &str, timeout: Duration) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::new(500, e.to_string()))?;
        Ok(Self { client, api_base: api_base.trim_end_matches('/').to_string(), api_key: api_key.to_string() })
    }

    fn error_type(body: &Value) -> &str {
        body.get("error")
            .and_then(|e| e.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("api_error")
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    fn name(&self) -> &'static str {
        "http"
    }

    #[instrument(skip(self, req), fields(order_id = %req.order_id, amount = req.amount, key = %req.idempotency_key))]
    async fn charge(&self, req: &ChargeRequest) -> Result<ChargeReceipt, PaymentError> {
        let payload = json!({
            "amount": req.amount,
            "currency": req.currency,
            "source": req.token,
            "metadata": { "order_id": req.order_id },
        });
        let resp = self
            .client
            .post(format!("{}/charges", self.api_base))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(IDEMPOTENCY_KEY, &req.idempotency_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "payment gateway unreachable");
                if e.is_connect() || e.is_timeout() {
                    PaymentError::unavailable()
                } else {
                    PaymentError::new(500, e.to_string())
                }
            })?;

        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let kind = Self::error_type(&body).to_string();
            warn!(status = status.as_u16(), error_type = %kind, "charge rejected");
            return Err(PaymentError::from_vendor(&kind, body));
        }
        let parsed: ChargeResponse =
            serde_json::from_value(body).map_err(|e| PaymentError::new(500, format!("unexpected gateway response: {e}")))?;
        info!(event = "charge_succeeded", reference = %parsed.id);
        Ok(ChargeReceipt { reference: parsed.id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use uuid::Uuid;

    /// One-shot HTTP server answering with a fixed status and JSON body.
    async fn canned(status: &str, body: &str) -> String {
        recording(status, body).await.0
    }

    /// Like `canned`, also handing back the raw request it received.
    async fn recording(status: &str, body: &str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            if let Ok((mut sock, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let n = sock.read(&mut buf).await.unwrap_or(0);
                let _ = tx.send(String::from_utf8_lossy(&buf[..n]).into_owned());
                let _ = sock.write_all(response.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });
        (format!("http://{addr}"), rx)
    }

    fn req() -> ChargeRequest {
        ChargeRequest {
            order_id: Uuid::new_v4(),
            amount: 1999,
            currency: "inr".into(),
            token: "tok_visa".into(),
            idempotency_key: "order-1:2".into(),
        }
    }

    #[tokio::test]
    async fn success_returns_reference() {
        let base = canned("200 OK", r#"{"id":"ch_123","status":"succeeded"}"#).await;
        let gw = HttpGateway::new(&base, "sk_test", Duration::from_secs(5)).unwrap();
        assert_eq!(gw.charge(&req()).await.unwrap().reference, "ch_123");
    }

    #[tokio::test]
    async fn charge_sends_idempotency_key() {
        let (base, request) = recording("200 OK", r#"{"id":"ch_456"}"#).await;
        let gw = HttpGateway::new(&base, "sk_test", Duration::from_secs(5)).unwrap();
        gw.charge(&req()).await.unwrap();
        let raw = request.await.unwrap().to_lowercase();
        assert!(raw.contains("idempotency-key: order-1:2"), "{raw}");
        assert!(raw.contains("authorization: bearer sk_test"));
    }

    #[tokio::test]
    async fn card_error_passes_body_through() {
        let body = r#"{"error":{"type":"card_error","message":"Your card was declined."}}"#;
        let base = canned("402 Payment Required", body).await;
        let gw = HttpGateway::new(&base, "sk_test", Duration::from_secs(5)).unwrap();
        let err = gw.charge(&req()).await.unwrap_err();
        assert_eq!(err.status, 402);
        assert_eq!(err.body["error"]["message"], "Your card was declined.");
    }

    #[tokio::test]
    async fn unreachable_gateway_is_502() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let gw = HttpGateway::new(&format!("http://{addr}"), "sk_test", Duration::from_secs(2)).unwrap();
        assert_eq!(gw.charge(&req()).await.unwrap_err().status, 502);
    }
}
