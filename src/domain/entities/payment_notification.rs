//! Inbound payment gateway notifications as a closed set of variants.
//!
//! The gateway sends untyped JSON. It is parsed once, at the edge, into
//! [`PaymentNotification`]; everything downstream matches on the variant
//! and never looks at raw fields again.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::{billing_period::BillingPeriod, money::Money, plan::Plan};

pub const NOTIFICATION_TYPE: &str = "notification";
pub const EVENT_PAYMENT_SUCCEEDED: &str = "payment.succeeded";
pub const EVENT_PAYMENT_CANCELED: &str = "payment.canceled";

/// Metadata attached to a payment at checkout and echoed back by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMetadata {
    pub user_id: Uuid,
    pub plan: Plan,
    pub period: BillingPeriod,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SucceededPayment {
    pub payment_id: String,
    pub amount: Money,
    pub metadata: PaymentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanceledPayment {
    pub payment_id: String,
    pub amount: Option<Money>,
    pub metadata: PaymentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentNotification {
    Succeeded(SucceededPayment),
    Canceled(CanceledPayment),
    /// Well-formed notification for an event this service does not act on.
    Unknown {
        event: String,
        payment_id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("unsupported notification type: {0:?}")]
    UnsupportedType(Option<String>),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

fn required_str<'a>(value: &'a Value, field: &'static str) -> Result<&'a str, NotificationError> {
    match value.as_str().map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(NotificationError::MissingField(field)),
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> NotificationError {
    NotificationError::InvalidField {
        field,
        reason: reason.into(),
    }
}

fn parse_metadata(object: &Value) -> Result<PaymentMetadata, NotificationError> {
    let metadata = &object["metadata"];
    if !metadata.is_object() {
        return Err(NotificationError::MissingField("object.metadata"));
    }

    let user_id_raw = required_str(&metadata["userId"], "object.metadata.userId")?;
    let plan_raw = required_str(&metadata["plan"], "object.metadata.plan")?;
    let period_raw = required_str(&metadata["period"], "object.metadata.period")?;

    let user_id = Uuid::parse_str(user_id_raw)
        .map_err(|_| invalid("object.metadata.userId", format!("`{user_id_raw}` is not a UUID")))?;
    let plan: Plan = plan_raw
        .parse()
        .map_err(|_| invalid("object.metadata.plan", format!("unknown plan `{plan_raw}`")))?;
    if !plan.is_purchasable() {
        return Err(invalid(
            "object.metadata.plan",
            format!("plan `{plan}` cannot be purchased"),
        ));
    }
    let period: BillingPeriod = period_raw.parse().map_err(|_| {
        invalid(
            "object.metadata.period",
            format!("unknown period `{period_raw}`"),
        )
    })?;

    Ok(PaymentMetadata {
        user_id,
        plan,
        period,
    })
}

fn parse_amount(object: &Value) -> Result<Money, NotificationError> {
    let amount = &object["amount"];
    let value = required_str(&amount["value"], "object.amount.value")?;
    let currency = required_str(&amount["currency"], "object.amount.currency")?;
    Money::parse(value, currency).map_err(|e| invalid("object.amount", e.to_string()))
}

impl PaymentNotification {
    /// Validate a raw notification body.
    ///
    /// Unknown `event` values parse to [`PaymentNotification::Unknown`];
    /// only structural problems with known events are errors.
    pub fn parse(payload: &Value) -> Result<Self, NotificationError> {
        let kind = payload["type"].as_str();
        if kind != Some(NOTIFICATION_TYPE) {
            return Err(NotificationError::UnsupportedType(kind.map(str::to_string)));
        }

        let event = required_str(&payload["event"], "event")?;
        let object = &payload["object"];

        match event {
            EVENT_PAYMENT_SUCCEEDED | EVENT_PAYMENT_CANCELED => {
                if !object.is_object() {
                    return Err(NotificationError::MissingField("object"));
                }
                let payment_id = required_str(&object["id"], "object.id")?.to_string();
                let metadata = parse_metadata(object)?;

                if event == EVENT_PAYMENT_SUCCEEDED {
                    Ok(PaymentNotification::Succeeded(SucceededPayment {
                        payment_id,
                        amount: parse_amount(object)?,
                        metadata,
                    }))
                } else {
                    Ok(PaymentNotification::Canceled(CanceledPayment {
                        payment_id,
                        // A canceled payment may carry an amount; it is kept
                        // for the audit trail when it parses.
                        amount: parse_amount(object).ok(),
                        metadata,
                    }))
                }
            }
            other => Ok(PaymentNotification::Unknown {
                event: other.to_string(),
                payment_id: object["id"].as_str().map(str::to_string),
            }),
        }
    }

    pub fn event_name(&self) -> &str {
        match self {
            PaymentNotification::Succeeded(_) => EVENT_PAYMENT_SUCCEEDED,
            PaymentNotification::Canceled(_) => EVENT_PAYMENT_CANCELED,
            PaymentNotification::Unknown { event, .. } => event,
        }
    }

    pub fn payment_id(&self) -> Option<&str> {
        match self {
            PaymentNotification::Succeeded(p) => Some(&p.payment_id),
            PaymentNotification::Canceled(p) => Some(&p.payment_id),
            PaymentNotification::Unknown { payment_id, .. } => payment_id.as_deref(),
        }
    }
}
