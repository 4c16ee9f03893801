//! Monthly bill generation from a contract's readings.

use super::BillingError;
use super::tariff::RateTable;
use crate::domain::{
    BillLine, BillStatement, Contract, Period, Pricing, UtilityRate, UtilityReading, UtilityType,
    checked_sum, round_money,
};

/// Builds the bill for `contract` over `period`.
///
/// Only readings of this contract dated inside the period are used. For each
/// utility type with readings, consumption is summed and priced through the
/// type's rate table; a type with no rates at all falls back to the sum of
/// the readings' own totals.
///
/// # Errors
///
/// - [`BillingError::NoReadings`] when the contract has no readings in the period.
/// - [`BillingError::InvalidTariff`] when a type has rates that do not
///   partition usage.
/// - [`BillingError::OutOfRange`] when consumption or an amount overflows.
pub fn generate_monthly_bill(
    contract: &Contract,
    period: Period,
    readings: &[UtilityReading],
    rates: &[UtilityRate],
) -> Result<BillStatement, BillingError> {
    let in_period: Vec<&UtilityReading> = readings
        .iter()
        .filter(|r| r.contract_id == contract.id && period.contains(r.reading_date))
        .collect();

    if in_period.is_empty() {
        return Err(BillingError::NoReadings {
            contract_id: contract.id,
            period,
        });
    }

    let mut lines = Vec::new();
    for utility_type in UtilityType::ALL {
        let of_type: Vec<&UtilityReading> = in_period
            .iter()
            .copied()
            .filter(|r| r.utility_type == utility_type)
            .collect();
        if of_type.is_empty() {
            continue;
        }
        let table = RateTable::for_type(utility_type, rates);
        lines.push(price_line(utility_type, &of_type, &table)?);
    }

    let total = checked_sum(lines.iter().map(|l| l.amount))
        .map(round_money)
        .ok_or_else(|| BillingError::OutOfRange(format!("{period} bill total")))?;
    tracing::debug!(
        contract_id = contract.id,
        %period,
        lines = lines.len(),
        %total,
        "monthly bill computed"
    );

    Ok(BillStatement {
        contract_id: contract.id,
        period,
        lines,
        total,
    })
}

fn price_line(
    utility_type: UtilityType,
    readings: &[&UtilityReading],
    table: &RateTable,
) -> Result<BillLine, BillingError> {
    let out_of_range = |what: &str| BillingError::OutOfRange(format!("{utility_type} {what}"));
    let consumption = readings
        .iter()
        .try_fold(0_i64, |acc, r| acc.checked_add(r.consumption))
        .ok_or_else(|| out_of_range("consumption"))?;

    if table.is_empty() {
        let amount = checked_sum(readings.iter().map(|r| r.total))
            .ok_or_else(|| out_of_range("amount"))?;
        return Ok(BillLine {
            utility_type,
            reading_count: readings.len(),
            consumption,
            pricing: Pricing::Flat,
            charges: Vec::new(),
            amount: round_money(amount),
        });
    }

    let charges = table.ensure_billable()?.split(consumption)?;
    let amount = checked_sum(charges.iter().map(|c| c.amount))
        .map(round_money)
        .ok_or_else(|| out_of_range("amount"))?;
    Ok(BillLine {
        utility_type,
        reading_count: readings.len(),
        consumption,
        pricing: Pricing::Tiered,
        charges,
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::billing::PartitionIssue;
    use crate::domain::ContractStatus;

    fn contract() -> Contract {
        Contract {
            id: 1,
            room_name: "A101".to_string(),
            tenant_name: "Tenant".to_string(),
            owner_name: "Owner".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
            end_date: None,
            monthly_rent: dec!(3000000),
            status: ContractStatus::Active,
        }
    }

    fn reading(
        id: u64,
        utility_type: UtilityType,
        day: (i32, u32, u32),
        consumption: i64,
        price: Decimal,
    ) -> UtilityReading {
        UtilityReading {
            id,
            contract_id: 1,
            utility_type,
            reading_date: NaiveDate::from_ymd_opt(day.0, day.1, day.2).expect("valid date"),
            previous_index: 0,
            previous_index_inferred: false,
            current_index: consumption,
            consumption,
            price,
            total: Decimal::from(consumption) * price,
            note: None,
        }
    }

    fn electric_rates() -> Vec<UtilityRate> {
        vec![
            UtilityRate {
                id: 1,
                utility_type: UtilityType::Electric,
                tier: 1,
                from: 0,
                to: 50,
                price: dec!(1000),
            },
            UtilityRate {
                id: 2,
                utility_type: UtilityType::Electric,
                tier: 2,
                from: 50,
                to: 100,
                price: dec!(2000),
            },
        ]
    }

    fn may() -> Period {
        Period::new(2024, 5).expect("valid period")
    }

    #[test]
    fn tiered_line_for_electric_and_flat_line_for_water() {
        let readings = vec![
            reading(1, UtilityType::Electric, (2024, 5, 15), 40, dec!(0)),
            reading(2, UtilityType::Electric, (2024, 5, 31), 30, dec!(0)),
            reading(3, UtilityType::Water, (2024, 5, 31), 6, dec!(15000)),
        ];
        let bill = generate_monthly_bill(&contract(), may(), &readings, &electric_rates())
            .expect("bill should generate");

        assert_eq!(bill.lines.len(), 2);
        let electric = &bill.lines[0];
        assert_eq!(electric.utility_type, UtilityType::Electric);
        assert_eq!(electric.pricing, Pricing::Tiered);
        assert_eq!(electric.reading_count, 2);
        assert_eq!(electric.consumption, 70);
        // 50*1000 + 20*2000
        assert_eq!(electric.amount, dec!(90000));

        let water = &bill.lines[1];
        assert_eq!(water.pricing, Pricing::Flat);
        assert!(water.charges.is_empty());
        assert_eq!(water.amount, dec!(90000));

        assert_eq!(bill.total, dec!(180000));
    }

    #[test]
    fn readings_outside_period_or_contract_are_ignored() {
        let mut other_contract = reading(4, UtilityType::Electric, (2024, 5, 10), 500, dec!(0));
        other_contract.contract_id = 2;
        let readings = vec![
            reading(1, UtilityType::Electric, (2024, 4, 30), 100, dec!(0)),
            reading(2, UtilityType::Electric, (2024, 5, 1), 10, dec!(0)),
            reading(3, UtilityType::Electric, (2024, 6, 1), 100, dec!(0)),
            other_contract,
        ];
        let bill = generate_monthly_bill(&contract(), may(), &readings, &electric_rates())
            .expect("bill should generate");
        assert_eq!(bill.lines.len(), 1);
        assert_eq!(bill.lines[0].consumption, 10);
        assert_eq!(bill.total, dec!(10000));
    }

    #[test]
    fn no_readings_in_period_is_an_error() {
        let readings = vec![reading(1, UtilityType::Water, (2024, 4, 30), 5, dec!(1))];
        let err = generate_monthly_bill(&contract(), may(), &readings, &[])
            .expect_err("no readings in May");
        assert_eq!(
            err,
            BillingError::NoReadings {
                contract_id: 1,
                period: may()
            }
        );
    }

    #[test]
    fn broken_rate_table_blocks_billing() {
        let mut rates = electric_rates();
        rates[1].from = 60;
        let readings = vec![reading(1, UtilityType::Electric, (2024, 5, 31), 70, dec!(0))];
        let err = generate_monthly_bill(&contract(), may(), &readings, &rates)
            .expect_err("gap in tariff");
        match err {
            BillingError::InvalidTariff { issues, .. } => {
                assert!(matches!(issues[0], PartitionIssue::Gap { from: 50, to: 60, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn broken_table_for_unused_type_does_not_matter() {
        let water_rate = UtilityRate {
            id: 9,
            utility_type: UtilityType::Water,
            tier: 1,
            from: 5,
            to: 10,
            price: dec!(1),
        };
        let mut rates = electric_rates();
        rates.push(water_rate);
        let readings = vec![reading(1, UtilityType::Electric, (2024, 5, 31), 20, dec!(0))];
        let bill = generate_monthly_bill(&contract(), may(), &readings, &rates)
            .expect("water table is not consulted");
        assert_eq!(bill.total, dec!(20000));
    }

    #[test]
    fn consumption_overflow_is_reported() {
        let readings = vec![
            reading(1, UtilityType::Water, (2024, 5, 10), i64::MAX, dec!(0)),
            reading(2, UtilityType::Water, (2024, 5, 31), i64::MAX, dec!(0)),
        ];
        let err = generate_monthly_bill(&contract(), may(), &readings, &[])
            .expect_err("summed consumption does not fit");
        assert_eq!(err, BillingError::OutOfRange("Water consumption".to_string()));
    }

    #[test]
    fn flat_amount_overflow_is_reported() {
        let mut first = reading(1, UtilityType::Water, (2024, 5, 10), 1, dec!(0));
        first.total = Decimal::MAX;
        let second = reading(2, UtilityType::Water, (2024, 5, 31), 1, dec!(1));
        let err = generate_monthly_bill(&contract(), may(), &[first, second], &[])
            .expect_err("summed totals do not fit");
        assert!(matches!(err, BillingError::OutOfRange(_)));
    }

    #[test]
    fn many_readings_sum_exactly() {
        let readings: Vec<UtilityReading> = (1..=31)
            .map(|day| reading(day, UtilityType::Electric, (2024, 5, day as u32), 10, dec!(0)))
            .collect();
        let bill = generate_monthly_bill(&contract(), may(), &readings, &electric_rates())
            .expect("bill should generate");
        assert_eq!(bill.lines[0].reading_count, 31);
        assert_eq!(bill.lines[0].consumption, 310);
        // 50*1000 + 260*2000
        assert_eq!(bill.total, dec!(570000));
    }
}
