use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    pub success: bool,
    pub transaction_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundOutcome {
    pub refund_id: String,
    pub amount: f64,
}

/// Charges and refunds booking payments.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn charge(&self, transaction_id: &str, amount: u32) -> Result<PaymentOutcome>;

    async fn refund(&self, transaction_id: &str, amount: f64) -> Result<RefundOutcome>;
}

/// Succeeds except for a random `failure_rate` share of charges.
#[derive(Debug, Clone)]
pub struct MockPaymentProcessor {
    failure_rate: f64,
}

impl MockPaymentProcessor {
    pub fn new(failure_rate: f64) -> Self {
        let failure_rate = if failure_rate.is_finite() { failure_rate.clamp(0.0, 1.0) } else { 0.0 };
        Self { failure_rate }
    }

    pub fn always_succeeds() -> Self {
        Self::new(0.0)
    }
}

#[async_trait]
impl PaymentProcessor for MockPaymentProcessor {
    async fn charge(&self, transaction_id: &str, amount: u32) -> Result<PaymentOutcome> {
        let failed = rand::thread_rng().gen_bool(self.failure_rate);
        tracing::debug!(transaction_id, amount, failed, "mock payment processed");

        Ok(PaymentOutcome {
            success: !failed,
            transaction_id: transaction_id.to_string(),
            message: if failed {
                "Payment failed".to_string()
            } else {
                "Payment processed successfully".to_string()
            },
        })
    }

    async fn refund(&self, transaction_id: &str, amount: f64) -> Result<RefundOutcome> {
        tracing::debug!(transaction_id, amount, "mock refund processed");
        Ok(RefundOutcome { refund_id: Uuid::new_v4().to_string(), amount })
    }
}
