pub mod clock;
pub mod payment_gateway;
