use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Plan tier controlling feature entitlements.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    sqlx::Type,
    AsRefStr,
    Display,
    EnumString,
)]
#[sqlx(type_name = "plan_tier", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl Plan {
    /// Plans that can be bought or granted. FREE is the absence of a purchase.
    pub fn is_purchasable(&self) -> bool {
        matches!(self, Plan::Pro)
    }
}
