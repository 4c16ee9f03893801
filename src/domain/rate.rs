//! Tiered utility pricing rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{FieldError, MAX_METER_INDEX, MAX_UNIT_PRICE, UtilityType};

/// One pricing bracket: usage in `[from, to)` is charged `price` per unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityRate {
    pub id: u64,
    #[serde(rename = "type")]
    pub utility_type: UtilityType,
    /// Bracket number, starting at 1.
    pub tier: u32,
    /// Inclusive lower bound of the usage range.
    pub from: i64,
    /// Exclusive upper bound of the usage range.
    pub to: i64,
    /// Price per unit of consumption.
    pub price: Decimal,
}

impl UtilityRate {
    /// Whether `units` falls inside this bracket.
    pub fn covers(&self, units: i64) -> bool {
        self.from <= units && units < self.to
    }
}

/// Create/update payload for a rate, as submitted by the rate form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateDraft {
    #[serde(rename = "type")]
    pub utility_type: UtilityType,
    pub tier: i64,
    pub from: i64,
    pub to: i64,
    pub price: Decimal,
}

impl RateDraft {
    /// Checks the form constraints and returns every violation.
    ///
    /// Returns an empty vector when the draft is valid.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.tier < 1 {
            errors.push(FieldError::new("tier", "must be >= 1"));
        } else if self.tier > i64::from(u32::MAX) {
            errors.push(FieldError::new("tier", "is out of range"));
        }
        if self.from < 0 {
            errors.push(FieldError::new("from", "must be >= 0"));
        }
        if self.to <= self.from {
            errors.push(FieldError::new("to", "must be > from"));
        } else if self.to > MAX_METER_INDEX {
            errors.push(FieldError::new("to", format!("must be <= {MAX_METER_INDEX}")));
        }
        if self.price <= Decimal::ZERO {
            errors.push(FieldError::new("price", "must be > 0"));
        } else if self.price > MAX_UNIT_PRICE {
            errors.push(FieldError::new("price", format!("must be <= {MAX_UNIT_PRICE}")));
        }

        errors
    }

    /// Validates the draft and turns it into a stored rate.
    ///
    /// # Errors
    ///
    /// Returns the list of field errors when validation fails.
    pub fn into_rate(self, id: u64) -> Result<UtilityRate, Vec<FieldError>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }
        let tier = u32::try_from(self.tier)
            .map_err(|_| vec![FieldError::new("tier", "is out of range")])?;

        Ok(UtilityRate {
            id,
            utility_type: self.utility_type,
            tier,
            from: self.from,
            to: self.to,
            price: self.price,
        })
    }
}

impl From<&UtilityRate> for RateDraft {
    fn from(rate: &UtilityRate) -> Self {
        Self {
            utility_type: rate.utility_type,
            tier: i64::from(rate.tier),
            from: rate.from,
            to: rate.to,
            price: rate.price,
        }
    }
}
