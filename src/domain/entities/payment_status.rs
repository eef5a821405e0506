use serde::{Deserialize, Serialize};

/// Payment status as reported by the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GatewayPaymentStatus {
    #[default]
    Pending,
    WaitingForCapture,
    Succeeded,
    Canceled,
}

impl GatewayPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayPaymentStatus::Pending => "pending",
            GatewayPaymentStatus::WaitingForCapture => "waiting_for_capture",
            GatewayPaymentStatus::Succeeded => "succeeded",
            GatewayPaymentStatus::Canceled => "canceled",
        }
    }

    /// Lenient conversion from a gateway status string.
    /// Unknown values map to `Pending`, which never grants anything.
    pub fn from_gateway(s: &str) -> Self {
        match s {
            "succeeded" => GatewayPaymentStatus::Succeeded,
            "canceled" | "cancelled" => GatewayPaymentStatus::Canceled,
            "waiting_for_capture" => GatewayPaymentStatus::WaitingForCapture,
            _ => GatewayPaymentStatus::Pending,
        }
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, GatewayPaymentStatus::Succeeded)
    }

    /// Terminal states do not change any more on the gateway side.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GatewayPaymentStatus::Succeeded | GatewayPaymentStatus::Canceled
        )
    }
}

impl std::fmt::Display for GatewayPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GatewayPaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(GatewayPaymentStatus::Pending),
            "waiting_for_capture" => Ok(GatewayPaymentStatus::WaitingForCapture),
            "succeeded" => Ok(GatewayPaymentStatus::Succeeded),
            "canceled" => Ok(GatewayPaymentStatus::Canceled),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}
