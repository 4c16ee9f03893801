//! Tiered rate evaluation and monthly bill generation.

pub mod generator;
pub mod tariff;

use crate::domain::{Period, UtilityType};

pub use generator::generate_monthly_bill;
pub use tariff::{Coverage, CoverageStatus, PartitionIssue, RateTable};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BillingError {
    #[error("contract {contract_id} has no readings in {period}")]
    NoReadings { contract_id: u64, period: Period },
    #[error("{utility_type} rate table is not a contiguous partition: {}", join_issues(.issues))]
    InvalidTariff {
        utility_type: UtilityType,
        issues: Vec<PartitionIssue>,
    },
    /// A sum or product left the range `Decimal`/`i64` can hold.
    #[error("{0} is out of range")]
    OutOfRange(String),
}

fn join_issues(issues: &[PartitionIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
