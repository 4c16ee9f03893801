//! Meter readings recorded per contract.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{FieldError, MAX_METER_INDEX, MAX_UNIT_PRICE, UtilityType, round_money};

/// Meter reading for one contract and utility type.
///
/// `consumption` and `total` are derived when the reading is stored:
/// `consumption = current_index - previous_index`, `total = consumption * price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityReading {
    pub id: u64,
    pub contract_id: u64,
    #[serde(rename = "type")]
    pub utility_type: UtilityType,
    pub reading_date: NaiveDate,
    pub previous_index: i64,
    /// True when `previous_index` was taken from the preceding reading
    /// rather than submitted, so it follows that reading when it changes.
    #[serde(default)]
    pub previous_index_inferred: bool,
    pub current_index: i64,
    pub consumption: i64,
    /// Flat unit price entered with the reading.
    pub price: Decimal,
    pub total: Decimal,
    pub note: Option<String>,
}

/// Whether a reading may go below the previous meter index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexPolicy {
    /// Accept any non-negative index; consumption may come out negative.
    #[default]
    AllowDecrease,
    /// Reject readings whose current index is below the previous one.
    RejectDecrease,
}

/// Create/update payload submitted by the reading form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingDraft {
    pub contract_id: u64,
    #[serde(rename = "type")]
    pub utility_type: UtilityType,
    pub reading_date: NaiveDate,
    /// Filled from the latest earlier reading when omitted.
    #[serde(default)]
    pub previous_index: Option<i64>,
    pub current_index: i64,
    pub price: Decimal,
    #[serde(default)]
    pub note: Option<String>,
}

fn check_index(errors: &mut Vec<FieldError>, field: &str, index: i64) {
    if index < 0 {
        errors.push(FieldError::new(field, "must be >= 0"));
    } else if index > MAX_METER_INDEX {
        errors.push(FieldError::new(field, format!("must be <= {MAX_METER_INDEX}")));
    }
}

/// Consumption and total for a pair of indexes.
fn derive(
    previous_index: i64,
    current_index: i64,
    price: Decimal,
    policy: IndexPolicy,
) -> Result<(i64, Decimal), FieldError> {
    if policy == IndexPolicy::RejectDecrease && current_index < previous_index {
        return Err(FieldError::new(
            "currentIndex",
            format!("must be >= previous index {previous_index}"),
        ));
    }
    let consumption = current_index
        .checked_sub(previous_index)
        .ok_or_else(|| FieldError::new("currentIndex", "consumption is out of range"))?;
    let total = Decimal::from(consumption)
        .checked_mul(price)
        .ok_or_else(|| FieldError::new("total", "is out of range"))?;
    Ok((consumption, round_money(total)))
}

impl ReadingDraft {
    /// Checks the form constraints that do not depend on stored history.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if let Some(previous) = self.previous_index {
            check_index(&mut errors, "previousIndex", previous);
        }
        check_index(&mut errors, "currentIndex", self.current_index);
        if self.price < Decimal::ZERO {
            errors.push(FieldError::new("price", "must be >= 0"));
        } else if self.price > MAX_UNIT_PRICE {
            errors.push(FieldError::new("price", format!("must be <= {MAX_UNIT_PRICE}")));
        }

        errors
    }

    /// Validates the draft against `policy` and derives consumption and total.
    ///
    /// `fallback_previous` is used when the draft carries no previous index;
    /// the stored reading is then marked as inferred.
    ///
    /// # Errors
    ///
    /// Returns every field error found.
    pub fn into_reading(
        self,
        id: u64,
        fallback_previous: i64,
        policy: IndexPolicy,
    ) -> Result<UtilityReading, Vec<FieldError>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }

        let previous_index = self.previous_index.unwrap_or(fallback_previous);
        let (consumption, total) =
            derive(previous_index, self.current_index, self.price, policy).map_err(|e| vec![e])?;
        let note = self
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Ok(UtilityReading {
            id,
            contract_id: self.contract_id,
            utility_type: self.utility_type,
            reading_date: self.reading_date,
            previous_index,
            previous_index_inferred: self.previous_index.is_none(),
            current_index: self.current_index,
            consumption,
            price: self.price,
            total,
            note,
        })
    }
}

impl UtilityReading {
    /// Same reading measured from a different previous index.
    ///
    /// # Errors
    ///
    /// Returns the field error when `policy` rejects the new consumption or
    /// the total cannot be represented.
    pub fn rebase(&self, previous_index: i64, policy: IndexPolicy) -> Result<Self, FieldError> {
        let (consumption, total) = derive(previous_index, self.current_index, self.price, policy)?;
        Ok(Self {
            previous_index,
            consumption,
            total,
            ..self.clone()
        })
    }
}
