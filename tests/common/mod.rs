//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;

use rental_utilities::config::AppConfig;
use rental_utilities::domain::{
    ContractDraft, ContractStatus, Period, RateDraft, ReadingDraft, UtilityType,
};
use rental_utilities::store::Store;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date")
}

pub fn period(year: i32, month: u32) -> Period {
    Period::new(year, month).expect("valid period")
}

/// Store seeded with the residential tariff (6 electric, 4 water tiers).
pub fn residential_store() -> Store {
    Store::with_rates(AppConfig::residential().tariff.rates).expect("residential rates are valid")
}

/// Active contract for `room` starting 2024-01-01 at 3,000,000 a month.
pub fn contract_draft(room: &str) -> ContractDraft {
    ContractDraft {
        room_name: room.to_string(),
        tenant_name: format!("Tenant of {room}"),
        owner_name: "Owner".to_string(),
        start_date: date(2024, 1, 1),
        end_date: None,
        monthly_rent: Decimal::from(3_000_000),
        status: ContractStatus::Active,
    }
}

/// Reading with an explicit previous index.
pub fn reading_draft(
    contract_id: u64,
    utility_type: UtilityType,
    reading_date: NaiveDate,
    previous_index: i64,
    current_index: i64,
    price: i64,
) -> ReadingDraft {
    ReadingDraft {
        contract_id,
        utility_type,
        reading_date,
        previous_index: Some(previous_index),
        current_index,
        price: Decimal::from(price),
        note: None,
    }
}

pub fn rate_draft(utility_type: UtilityType, tier: i64, from: i64, to: i64, price: i64) -> RateDraft {
    RateDraft {
        utility_type,
        tier,
        from,
        to,
        price: Decimal::from(price),
    }
}
