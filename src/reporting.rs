//! Month-level summary across generated bills.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::billing::BillingError;
use crate::domain::{Period, UtilityBill, UtilityType, round_money};

/// Consumption and billed amount for one utility type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeTotals {
    #[serde(rename = "type")]
    pub utility_type: UtilityType,
    /// Units consumed (kWh or m3).
    pub consumption: i64,
    pub amount: Decimal,
}

/// Aggregate figures for every bill issued for one period.
///
/// Computed from the stored bills rather than from readings, so the report
/// agrees with what tenants were actually charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub period: Period,
    pub bill_count: usize,
    /// One entry per utility type, in `UtilityType::ALL` order.
    pub by_type: Vec<TypeTotals>,
    pub grand_total: Decimal,
    /// Grand total divided by bill count; zero when there are no bills.
    pub average_bill: Decimal,
}

impl MonthlySummary {
    /// Summarises the bills of `period`. Bills for other periods are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::OutOfRange`] when a running total overflows.
    pub fn from_bills<'a>(
        period: Period,
        bills: impl IntoIterator<Item = &'a UtilityBill>,
    ) -> Result<Self, BillingError> {
        let out_of_range = |what: String| BillingError::OutOfRange(format!("{period} {what}"));
        let mut by_type: Vec<TypeTotals> = UtilityType::ALL
            .iter()
            .map(|&utility_type| TypeTotals {
                utility_type,
                consumption: 0,
                amount: Decimal::ZERO,
            })
            .collect();
        let mut bill_count = 0_usize;
        let mut grand_total = Decimal::ZERO;

        for bill in bills.into_iter().filter(|b| b.period == period) {
            bill_count += 1;
            grand_total = grand_total
                .checked_add(bill.total)
                .ok_or_else(|| out_of_range("grand total".to_string()))?;
            for line in &bill.lines {
                let Some(totals) = by_type.iter_mut().find(|t| t.utility_type == line.utility_type)
                else {
                    continue;
                };
                let (consumption, amount) = totals
                    .consumption
                    .checked_add(line.consumption)
                    .zip(totals.amount.checked_add(line.amount))
                    .ok_or_else(|| out_of_range(format!("{} totals", line.utility_type)))?;
                totals.consumption = consumption;
                totals.amount = amount;
            }
        }

        let average_bill = if bill_count > 0 {
            round_money(grand_total / Decimal::from(bill_count))
        } else {
            Decimal::ZERO
        };

        Ok(Self {
            period,
            bill_count,
            by_type,
            grand_total,
            average_bill,
        })
    }

    pub fn totals_for(&self, utility_type: UtilityType) -> Option<&TypeTotals> {
        self.by_type.iter().find(|t| t.utility_type == utility_type)
    }
}

impl fmt::Display for MonthlySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Utility Report {} ---", self.period)?;
        writeln!(f, "Bills issued:          {}", self.bill_count)?;
        for t in &self.by_type {
            writeln!(
                f,
                "{:<22} {} {} -> {}",
                format!("{} consumption:", t.utility_type),
                t.consumption,
                t.utility_type.unit(),
                t.amount
            )?;
        }
        writeln!(f, "Grand total:           {}", self.grand_total)?;
        write!(f, "Average bill:          {}", self.average_bill)
    }
}
