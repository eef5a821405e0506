pub mod checkout;
pub mod entitlements;
pub mod manual_activation;
pub mod payment_webhook;
pub mod reconciliation;
pub mod subscription_ledger;
