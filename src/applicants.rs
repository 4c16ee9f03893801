//! Priority scoring for rental applicants competing for one room.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::FieldError;

/// Lease months that earn the full lease score.
const LEASE_CAP_MONTHS: u32 = 24;
const LEASE_MAX_POINTS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    pub name: String,
    pub monthly_income: Decimal,
    pub household_size: u32,
    pub lease_months: u32,
    pub desired_move_in: NaiveDate,
}

/// A room and the applicants asking for it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankRequest {
    pub monthly_rent: Decimal,
    pub capacity: u32,
    /// Date move-in readiness is measured from; today when omitted.
    #[serde(default)]
    pub evaluation_date: Option<NaiveDate>,
    pub applicants: Vec<Applicant>,
}

impl RankRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.monthly_rent < Decimal::ZERO {
            errors.push(FieldError::new("monthlyRent", "must be >= 0"));
        }
        for (i, a) in self.applicants.iter().enumerate() {
            if a.name.trim().is_empty() {
                errors.push(FieldError::new(format!("applicants[{i}].name"), "is required"));
            }
            if a.monthly_income < Decimal::ZERO {
                errors.push(FieldError::new(
                    format!("applicants[{i}].monthlyIncome"),
                    "must be >= 0",
                ));
            }
        }
        errors
    }
}

/// Points awarded per criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub income: u32,
    pub lease: u32,
    pub move_in: u32,
    pub household: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.income + self.lease + self.move_in + self.household
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedApplicant {
    /// 1-based position after sorting.
    pub rank: usize,
    pub name: String,
    pub score: u32,
    pub breakdown: ScoreBreakdown,
    pub desired_move_in: NaiveDate,
}

fn income_points(income: Decimal, rent: Decimal) -> u32 {
    if rent <= Decimal::ZERO {
        return 40;
    }
    // a quotient past Decimal::MAX is far above any threshold
    let Some(ratio) = income.checked_div(rent) else {
        return if income > Decimal::ZERO { 40 } else { 0 };
    };
    if ratio >= Decimal::from(3) {
        40
    } else if ratio >= Decimal::from(2) {
        25
    } else if ratio >= Decimal::ONE {
        10
    } else {
        0
    }
}

fn lease_points(months: u32) -> u32 {
    months.min(LEASE_CAP_MONTHS) * LEASE_MAX_POINTS / LEASE_CAP_MONTHS
}

fn move_in_points(evaluated_on: NaiveDate, desired: NaiveDate) -> u32 {
    let days = (desired - evaluated_on).num_days().max(0);
    match days {
        0..=14 => 20,
        15..=30 => 10,
        _ => 0,
    }
}

/// Scores one applicant out of 100.
pub fn score(
    applicant: &Applicant,
    monthly_rent: Decimal,
    capacity: u32,
    evaluated_on: NaiveDate,
) -> ScoreBreakdown {
    ScoreBreakdown {
        income: income_points(applicant.monthly_income, monthly_rent),
        lease: lease_points(applicant.lease_months),
        move_in: move_in_points(evaluated_on, applicant.desired_move_in),
        household: if applicant.household_size <= capacity { 10 } else { 0 },
    }
}

/// Scores and orders applicants: highest score first, then the earlier
/// move-in date, then name.
pub fn rank(request: &RankRequest, evaluated_on: NaiveDate) -> Vec<RankedApplicant> {
    let mut scored: Vec<(ScoreBreakdown, &Applicant)> = request
        .applicants
        .iter()
        .map(|a| {
            (
                score(a, request.monthly_rent, request.capacity, evaluated_on),
                a,
            )
        })
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| {
        sb.total()
            .cmp(&sa.total())
            .then_with(|| a.desired_move_in.cmp(&b.desired_move_in))
            .then_with(|| a.name.cmp(&b.name))
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (breakdown, a))| RankedApplicant {
            rank: i + 1,
            name: a.name.clone(),
            score: breakdown.total(),
            breakdown,
            desired_move_in: a.desired_move_in,
        })
        .collect()
}
