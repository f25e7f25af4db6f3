use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::{ChargeReceipt, ChargeRequest, PaymentError, PaymentGateway};

/// In-process gateway that accepts every charge.
#[derive(Clone, Debug, Default)]
pub struct TestGateway;

#[async_trait]
impl PaymentGateway for TestGateway {
    fn name(&self) -> &'static str {
        "test"
    }

    async fn charge(&self, req: &ChargeRequest) -> Result<ChargeReceipt, PaymentError> {
        let reference = format!("test_{}", Uuid::new_v4().simple());
        info!(event = "test_charge", order_id = %req.order_id, amount = req.amount, %reference);
        Ok(ChargeReceipt { reference })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_succeeds() {
        let req = ChargeRequest {
            order_id: Uuid::new_v4(),
            amount: 100,
            currency: "inr".into(),
            token: "tok".into(),
            idempotency_key: "k:1".into(),
        };
        let receipt = TestGateway.charge(&req).await.unwrap();
        assert!(receipt.reference.starts_with("test_"));
    }
}
