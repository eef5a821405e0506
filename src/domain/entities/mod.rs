pub mod billing_period;
pub mod money;
pub mod payment_notification;
pub mod payment_status;
pub mod plan;
pub mod plan_limits;
pub mod subscription;
