use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Length of one purchased subscription period.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    AsRefStr,
    Display,
    EnumString,
)]
#[sqlx(type_name = "billing_period", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum BillingPeriod {
    Monthly,
    Yearly,
}

impl BillingPeriod {
    fn months(&self) -> Months {
        match self {
            BillingPeriod::Monthly => Months::new(1),
            BillingPeriod::Yearly => Months::new(12),
        }
    }

    /// End of a period starting at `start`, using calendar arithmetic.
    ///
    /// When the target month is shorter than the start day, the result is
    /// clamped to the last day of that month (Jan 31 + 1 month = Feb 28/29).
    /// Returns `None` only when the result falls outside chrono's range.
    pub fn end_date(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        start.checked_add_months(self.months())
    }

    /// Human-readable label used in payment descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            BillingPeriod::Monthly => "1 month",
            BillingPeriod::Yearly => "1 year",
        }
    }
}
