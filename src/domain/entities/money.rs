use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("amount is empty")]
    Empty,
    #[error("amount `{0}` is not a non-negative decimal with at most two fraction digits")]
    Malformed(String),
    #[error("amount `{0}` is too large")]
    Overflow(String),
    #[error("currency `{0}` is not a three-letter code")]
    InvalidCurrency(String),
}

/// Amount in minor units (kopecks, cents) plus an ISO 4217 currency code.
///
/// On the wire it is `{"value": "990.00", "currency": "RUB"}`, the shape the
/// payment gateway uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AmountWire", into = "AmountWire")]
pub struct Money {
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Serialize, Deserialize)]
struct AmountWire {
    value: String,
    currency: String,
}

impl TryFrom<AmountWire> for Money {
    type Error = MoneyError;

    fn try_from(wire: AmountWire) -> Result<Self, Self::Error> {
        Money::parse(&wire.value, &wire.currency)
    }
}

impl From<Money> for AmountWire {
    fn from(money: Money) -> Self {
        AmountWire {
            value: money.value(),
            currency: money.currency,
        }
    }
}

impl Money {
    pub fn new(amount_minor: i64, currency: &str) -> Result<Self, MoneyError> {
        Ok(Self {
            amount_minor,
            currency: normalize_currency(currency)?,
        })
    }

    /// Parse a decimal string such as `"990.00"`, `"990.5"` or `"990"`.
    pub fn parse(value: &str, currency: &str) -> Result<Self, MoneyError> {
        let amount_minor = parse_minor_units(value)?;
        Self::new(amount_minor, currency)
    }

    /// Decimal string with exactly two fraction digits.
    pub fn value(&self) -> String {
        format!("{}.{:02}", self.amount_minor / 100, self.amount_minor % 100)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value(), self.currency)
    }
}

fn normalize_currency(currency: &str) -> Result<String, MoneyError> {
    let trimmed = currency.trim();
    if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(MoneyError::InvalidCurrency(currency.to_string()))
    }
}

fn parse_minor_units(raw: &str) -> Result<i64, MoneyError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(MoneyError::Empty);
    }

    let (whole, fraction) = match value.split_once('.') {
        Some((w, f)) => (w, f),
        None => (value, ""),
    };

    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if whole.is_empty() || !digits_only(whole) || !digits_only(fraction) || fraction.len() > 2 {
        return Err(MoneyError::Malformed(raw.to_string()));
    }

    let whole: i64 = whole
        .parse()
        .map_err(|_| MoneyError::Overflow(raw.to_string()))?;
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().unwrap_or(0) * 10,
        _ => fraction.parse::<i64>().unwrap_or(0),
    };

    whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| MoneyError::Overflow(raw.to_string()))
}
