//! Shared value types for the domain records.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Largest meter index (and rate bound) a form may submit.
pub const MAX_METER_INDEX: i64 = 1_000_000_000_000;

/// Largest unit price a form may submit.
pub const MAX_UNIT_PRICE: Decimal = dec!(1000000000000);

/// Metered utility kinds billed to tenants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UtilityType {
    #[serde(alias = "electric", alias = "ELECTRIC")]
    Electric,
    #[serde(alias = "water", alias = "WATER")]
    Water,
}

impl UtilityType {
    /// Every utility type, in bill line order.
    pub const ALL: [UtilityType; 2] = [UtilityType::Electric, UtilityType::Water];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Electric => "Electric",
            Self::Water => "Water",
        }
    }

    /// Unit of consumption shown on bills and reports.
    pub fn unit(self) -> &'static str {
        match self {
            Self::Electric => "kWh",
            Self::Water => "m3",
        }
    }
}

impl fmt::Display for UtilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown utility type \"{0}\", expected Electric or Water")]
pub struct UnknownUtilityType(pub String);

impl FromStr for UtilityType {
    type Err = UnknownUtilityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "electric" => Ok(Self::Electric),
            "water" => Ok(Self::Water),
            _ => Err(UnknownUtilityType(s.to_string())),
        }
    }
}

/// A rejected form field with a human-readable constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field name as it appears in the JSON payload (e.g. `"currentIndex"`).
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Sums amounts, returning `None` if the total cannot be represented.
pub fn checked_sum(amounts: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, a| acc.checked_add(a))
}

/// Rounds a monetary amount to two decimal places, midpoint away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
