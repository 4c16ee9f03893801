//! Rate tables: partition checks and consumption splitting across tiers.

use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use super::BillingError;
use crate::domain::{TierCharge, UtilityRate, UtilityType, checked_sum, round_money};

/// A way in which a rate table fails to partition usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PartitionIssue {
    /// The table has no rates.
    Empty,
    /// The lowest bracket does not start at zero.
    DoesNotStartAtZero { tier: u32, from: i64 },
    /// Usage in `[from, to)` is not covered by any bracket.
    Gap {
        previous_tier: u32,
        next_tier: u32,
        from: i64,
        to: i64,
    },
    /// Usage in `[from, to)` is covered by two brackets.
    Overlap {
        previous_tier: u32,
        next_tier: u32,
        from: i64,
        to: i64,
    },
    /// Two rates share the same tier number.
    DuplicateTier { tier: u32 },
}

impl fmt::Display for PartitionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "no rates defined"),
            Self::DoesNotStartAtZero { tier, from } => {
                write!(f, "tier {tier} starts at {from}, expected 0")
            }
            Self::Gap {
                previous_tier,
                next_tier,
                from,
                to,
            } => write!(
                f,
                "usage [{from}, {to}) between tier {previous_tier} and tier {next_tier} is not priced"
            ),
            Self::Overlap {
                previous_tier,
                next_tier,
                from,
                to,
            } => write!(
                f,
                "tier {previous_tier} and tier {next_tier} both price usage [{from}, {to})"
            ),
            Self::DuplicateTier { tier } => write!(f, "tier {tier} is defined more than once"),
        }
    }
}

/// How bills price a utility type given its current rate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoverageStatus {
    Tiered,
    /// No rates; lines are priced from the readings' own totals.
    Flat,
    /// The table is malformed and bill generation will fail.
    Blocked,
}

/// Billing readiness of one utility type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    #[serde(rename = "type")]
    pub utility_type: UtilityType,
    pub tier_count: usize,
    pub status: CoverageStatus,
    pub issues: Vec<PartitionIssue>,
}

/// The rates of a single utility type, ordered by lower bound.
///
/// # Examples
///
/// ```
/// use rental_utilities::billing::RateTable;
/// use rental_utilities::domain::{UtilityRate, UtilityType};
/// use rust_decimal::Decimal;
///
/// let rates = vec![
///     UtilityRate { id: 1, utility_type: UtilityType::Water, tier: 1, from: 0, to: 10, price: Decimal::from(5) },
///     UtilityRate { id: 2, utility_type: UtilityType::Water, tier: 2, from: 10, to: 20, price: Decimal::from(8) },
/// ];
/// let table = RateTable::for_type(UtilityType::Water, &rates);
/// assert!(table.check_partition().is_empty());
/// assert_eq!(table.quote(15), Ok(Decimal::from(90)));
/// ```
#[derive(Debug, Clone)]
pub struct RateTable {
    utility_type: UtilityType,
    tiers: Vec<UtilityRate>,
}

impl RateTable {
    /// Builds the table for `utility_type` from a mixed list of rates.
    pub fn for_type<'a>(
        utility_type: UtilityType,
        rates: impl IntoIterator<Item = &'a UtilityRate>,
    ) -> Self {
        let mut tiers: Vec<UtilityRate> = rates
            .into_iter()
            .filter(|r| r.utility_type == utility_type)
            .cloned()
            .collect();
        tiers.sort_by_key(|r| (r.from, r.tier, r.id));
        Self {
            utility_type,
            tiers,
        }
    }

    pub fn utility_type(&self) -> UtilityType {
        self.utility_type
    }

    pub fn tiers(&self) -> &[UtilityRate] {
        &self.tiers
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Lists every way the table fails to cover usage contiguously from zero.
    ///
    /// Returns an empty vector for a well-formed table.
    pub fn check_partition(&self) -> Vec<PartitionIssue> {
        let Some(first) = self.tiers.first() else {
            return vec![PartitionIssue::Empty];
        };

        let mut issues = Vec::new();
        let mut seen = BTreeSet::new();
        for rate in &self.tiers {
            if !seen.insert(rate.tier) {
                issues.push(PartitionIssue::DuplicateTier { tier: rate.tier });
            }
        }

        if first.from != 0 {
            issues.push(PartitionIssue::DoesNotStartAtZero {
                tier: first.tier,
                from: first.from,
            });
        }

        for pair in self.tiers.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.from > prev.to {
                issues.push(PartitionIssue::Gap {
                    previous_tier: prev.tier,
                    next_tier: next.tier,
                    from: prev.to,
                    to: next.from,
                });
            } else if next.from < prev.to {
                issues.push(PartitionIssue::Overlap {
                    previous_tier: prev.tier,
                    next_tier: next.tier,
                    from: next.from,
                    to: prev.to.min(next.to),
                });
            }
        }

        issues
    }

    pub fn coverage(&self) -> Coverage {
        let issues = self.check_partition();
        let status = if self.is_empty() {
            CoverageStatus::Flat
        } else if issues.is_empty() {
            CoverageStatus::Tiered
        } else {
            CoverageStatus::Blocked
        };
        Coverage {
            utility_type: self.utility_type,
            tier_count: self.tiers.len(),
            status,
            issues,
        }
    }

    /// Returns the table if it can be used for billing.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::InvalidTariff`] when the table is empty or
    /// does not partition usage.
    pub fn ensure_billable(&self) -> Result<&Self, BillingError> {
        let issues = self.check_partition();
        if issues.is_empty() {
            Ok(self)
        } else {
            Err(BillingError::InvalidTariff {
                utility_type: self.utility_type,
                issues,
            })
        }
    }

    /// Splits `consumption` across the brackets it reaches.
    ///
    /// Units above the last bracket's upper bound are charged at the last
    /// bracket's price. Non-positive consumption yields no charges.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::OutOfRange`] when a tier charge overflows.
    pub fn split(&self, consumption: i64) -> Result<Vec<TierCharge>, BillingError> {
        let last = self.tiers.len().saturating_sub(1);
        let mut charges = Vec::new();
        for (i, rate) in self.tiers.iter().enumerate() {
            let upper = if i == last {
                consumption
            } else {
                consumption.min(rate.to)
            };
            let units = upper.saturating_sub(rate.from);
            if units <= 0 {
                continue;
            }
            let amount = Decimal::from(units)
                .checked_mul(rate.price)
                .ok_or_else(|| self.out_of_range(&format!("tier {} charge", rate.tier)))?;
            charges.push(TierCharge {
                tier: rate.tier,
                from: rate.from,
                to: rate.to,
                units,
                price: rate.price,
                amount: round_money(amount),
            });
        }
        Ok(charges)
    }

    /// Total charge for `consumption`.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::OutOfRange`] when the charge overflows.
    pub fn quote(&self, consumption: i64) -> Result<Decimal, BillingError> {
        let charges = self.split(consumption)?;
        checked_sum(charges.iter().map(|c| c.amount))
            .map(round_money)
            .ok_or_else(|| self.out_of_range("charge"))
    }

    fn out_of_range(&self, what: &str) -> BillingError {
        BillingError::OutOfRange(format!("{} {what}", self.utility_type))
    }
}
