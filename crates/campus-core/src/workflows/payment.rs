//! Payment gateway collaborator.
//!
//! Real providers are out of scope; [`MockPaymentGateway`] approves or
//! declines according to a configurable status.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Charge requested for a registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: u64,
    pub student_id: String,
    pub registration_id: String,
    pub description: String,
}

/// Handle returned when a payment is initiated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment_id: String,
    pub payment_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate(&self, request: PaymentRequest) -> anyhow::Result<PaymentReceipt>;

    async fn verify(&self, payment_id: &str) -> anyhow::Result<PaymentStatus>;
}

/// In-memory gateway that records requests and reports a fixed status.
pub struct MockPaymentGateway {
    status: Mutex<PaymentStatus>,
    requests: Mutex<Vec<PaymentRequest>>,
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::with_status(PaymentStatus::Completed)
    }

    pub fn with_status(status: PaymentStatus) -> Self {
        Self {
            status: Mutex::new(status),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_status(&self, status: PaymentStatus) {
        *self.status.lock().unwrap() = status;
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn initiate(&self, request: PaymentRequest) -> anyhow::Result<PaymentReceipt> {
        if request.amount == 0 {
            anyhow::bail!("payment amount must be positive");
        }
        let payment_id = format!("PAY-{}", uuid::Uuid::new_v4());
        self.requests.lock().unwrap().push(request);
        Ok(PaymentReceipt {
            payment_url: format!("https://pay.example.invalid/checkout/{payment_id}"),
            payment_id,
        })
    }

    async fn verify(&self, payment_id: &str) -> anyhow::Result<PaymentStatus> {
        if !payment_id.starts_with("PAY-") {
            anyhow::bail!("unknown payment id {payment_id}");
        }
        Ok(*self.status.lock().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(amount: u64) -> PaymentRequest {
        PaymentRequest {
            amount,
            student_id: "S-1".into(),
            registration_id: "r-1".into(),
            description: "Semester 2-1 registration".into(),
        }
    }

    #[tokio::test]
    async fn test_initiate_records_request() {
        let gateway = MockPaymentGateway::new();
        let receipt = gateway.initiate(request(45_000)).await.unwrap();
        assert!(receipt.payment_id.starts_with("PAY-"));
        assert!(receipt.payment_url.ends_with(&receipt.payment_id));
        assert_eq!(gateway.requests().len(), 1);
        assert_eq!(
            gateway.verify(&receipt.payment_id).await.unwrap(),
            PaymentStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_zero_amount_rejected() {
        let gateway = MockPaymentGateway::new();
        assert!(gateway.initiate(request(0)).await.is_err());
        assert!(gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_configurable_status() {
        let gateway = MockPaymentGateway::with_status(PaymentStatus::Pending);
        let receipt = gateway.initiate(request(1)).await.unwrap();
        assert_eq!(
            gateway.verify(&receipt.payment_id).await.unwrap(),
            PaymentStatus::Pending
        );
        gateway.set_status(PaymentStatus::Failed);
        assert_eq!(
            gateway.verify(&receipt.payment_id).await.unwrap(),
            PaymentStatus::Failed
        );
        assert!(gateway.verify("bogus").await.is_err());
    }
}
