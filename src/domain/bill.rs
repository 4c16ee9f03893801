//! Monthly utility bills.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::period::Period;
use super::types::UtilityType;

/// How a bill line was priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pricing {
    /// Consumption split across the rate table's brackets.
    Tiered,
    /// No rate table for the type; the readings' own totals are summed.
    Flat,
}

impl Pricing {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tiered => "Tiered",
            Self::Flat => "Flat",
        }
    }
}

/// Portion of consumption charged within one bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierCharge {
    pub tier: u32,
    pub from: i64,
    pub to: i64,
    pub units: i64,
    pub price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillLine {
    #[serde(rename = "type")]
    pub utility_type: UtilityType,
    pub reading_count: usize,
    pub consumption: i64,
    pub pricing: Pricing,
    pub charges: Vec<TierCharge>,
    pub amount: Decimal,
}

/// Bill content before it is stored and assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillStatement {
    pub contract_id: u64,
    pub period: Period,
    pub lines: Vec<BillLine>,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityBill {
    pub id: u64,
    pub contract_id: u64,
    pub period: Period,
    pub lines: Vec<BillLine>,
    pub total: Decimal,
    pub generated_at: DateTime<Utc>,
}

impl UtilityBill {
    pub fn issue(id: u64, statement: BillStatement, generated_at: DateTime<Utc>) -> Self {
        Self {
            id,
            contract_id: statement.contract_id,
            period: statement.period,
            lines: statement.lines,
            total: statement.total,
            generated_at,
        }
    }

    /// The line for `utility_type`, if the bill has one.
    pub fn line(&self, utility_type: UtilityType) -> Option<&BillLine> {
        self.lines.iter().find(|l| l.utility_type == utility_type)
    }
}
