use async_trait::async_trait;
use xerror::zap_engine::PaymentError;

#[derive(Debug, Clone, Default)]
pub struct PaymentReceipt {
    /// Payment preimage, when the wallet offers it back.
    pub preimage: Option<String>,
}

/// WebLN-style in-page wallet boundary. Absence of a bridge is not an
/// error: the invoice is handed back for manual settlement instead.
#[async_trait]
pub trait WalletBridge: Send + Sync {
    /// Authorization step some providers require before payment.
    async fn enable(&self) -> Result<(), PaymentError>;

    async fn send_payment(&self, invoice: &str) -> Result<PaymentReceipt, PaymentError>;
}

/// One settlement attempt against the bridge. Never retried implicitly;
/// the engine exposes an explicit user-triggered retry instead.
pub async fn attempt_payment(bridge: &dyn WalletBridge, invoice: &str) -> Result<PaymentReceipt, PaymentError> {
    bridge.enable().await?;
    bridge.send_payment(invoice).await
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RefusingBridge;

    #[async_trait]
    impl WalletBridge for RefusingBridge {
        async fn enable(&self) -> Result<(), PaymentError> {
            Err(PaymentError::Rejected(String::from("user denied access")))
        }

        async fn send_payment(&self, _invoice: &str) -> Result<PaymentReceipt, PaymentError> {
            unreachable!("enable failed first")
        }
    }

    #[tokio::test]
    async fn test_enable_failure_short_circuits() {
        let err = attempt_payment(&RefusingBridge, "lnbc1...").await.unwrap_err();
        assert_eq!(err, PaymentError::Rejected(String::from("user denied access")));
    }
}
