//! In-memory record store for rates, contracts, readings and bills.
//!
//! Each collection is keyed by a monotonically increasing id. The store is
//! plain data; callers that share it across tasks wrap it in a lock.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::billing::{self, BillingError};
use crate::domain::{
    Contract, ContractDraft, FieldError, IndexPolicy, Period, RateDraft, ReadingDraft,
    UtilityBill, UtilityRate, UtilityReading, UtilityType,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },
    #[error("validation failed: {}", join_fields(.0))]
    Invalid(Vec<FieldError>),
    #[error(transparent)]
    Billing(#[from] BillingError),
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone)]
struct Table<T> {
    rows: BTreeMap<u64, T>,
    last_id: u64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn next_id(&self) -> u64 {
        self.last_id + 1
    }

    fn insert(&mut self, id: u64, row: T) {
        self.last_id = self.last_id.max(id);
        self.rows.insert(id, row);
    }

    fn get(&self, kind: &'static str, id: u64) -> Result<&T, StoreError> {
        self.rows.get(&id).ok_or(StoreError::NotFound { kind, id })
    }

    fn remove(&mut self, kind: &'static str, id: u64) -> Result<T, StoreError> {
        self.rows.remove(&id).ok_or(StoreError::NotFound { kind, id })
    }
}

/// Readings of one contract and utility type form a meter history.
type Meter = (u64, UtilityType);

fn meter_of(reading: &UtilityReading) -> Meter {
    (reading.contract_id, reading.utility_type)
}

/// All records held by the service.
#[derive(Debug, Clone, Default)]
pub struct Store {
    rates: Table<UtilityRate>,
    contracts: Table<Contract>,
    readings: Table<UtilityReading>,
    bills: Table<UtilityBill>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with `rates`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] for the first rate that fails validation.
    pub fn with_rates(rates: impl IntoIterator<Item = RateDraft>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for draft in rates {
            store.create_rate(draft)?;
        }
        Ok(store)
    }

    // --- rates ---

    pub fn rates(&self) -> impl Iterator<Item = &UtilityRate> {
        self.rates.rows.values()
    }

    /// Rates of one utility type, in id order.
    pub fn rates_of(&self, utility_type: UtilityType) -> impl Iterator<Item = &UtilityRate> {
        self.rates().filter(move |r| r.utility_type == utility_type)
    }

    pub fn rate(&self, id: u64) -> Result<&UtilityRate, StoreError> {
        self.rates.get("rate", id)
    }

    pub fn create_rate(&mut self, draft: RateDraft) -> Result<UtilityRate, StoreError> {
        let id = self.rates.next_id();
        let rate = draft.into_rate(id).map_err(StoreError::Invalid)?;
        self.rates.insert(id, rate.clone());
        Ok(rate)
    }

    pub fn update_rate(&mut self, id: u64, draft: RateDraft) -> Result<UtilityRate, StoreError> {
        self.rate(id)?;
        let rate = draft.into_rate(id).map_err(StoreError::Invalid)?;
        self.rates.insert(id, rate.clone());
        Ok(rate)
    }

    pub fn delete_rate(&mut self, id: u64) -> Result<UtilityRate, StoreError> {
        self.rates.remove("rate", id)
    }

    // --- contracts ---

    pub fn contracts(&self) -> impl Iterator<Item = &Contract> {
        self.contracts.rows.values()
    }

    pub fn contract(&self, id: u64) -> Result<&Contract, StoreError> {
        self.contracts.get("contract", id)
    }

    pub fn create_contract(&mut self, draft: ContractDraft) -> Result<Contract, StoreError> {
        let id = self.contracts.next_id();
        let contract = draft.into_contract(id).map_err(StoreError::Invalid)?;
        self.contracts.insert(id, contract.clone());
        Ok(contract)
    }

    // --- readings ---

    pub fn readings(&self) -> impl Iterator<Item = &UtilityReading> {
        self.readings.rows.values()
    }

    pub fn reading(&self, id: u64) -> Result<&UtilityReading, StoreError> {
        self.readings.get("reading", id)
    }

    /// Stores a new reading.
    ///
    /// When the draft has no previous index, the current index of the latest
    /// earlier reading for the same contract and type is used (0 if none).
    /// Such a reading keeps following its predecessor: inserting, editing or
    /// deleting an earlier reading re-derives its consumption and total.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the contract does not exist.
    /// - [`StoreError::Invalid`] if the form constraints or `policy` are
    ///   violated, by this reading or by a later one it would re-derive.
    pub fn create_reading(
        &mut self,
        draft: ReadingDraft,
        policy: IndexPolicy,
    ) -> Result<UtilityReading, StoreError> {
        self.contract(draft.contract_id)?;
        let id = self.readings.next_id();
        let reading = draft
            .into_reading(id, 0, policy)
            .map_err(StoreError::Invalid)?;
        let updates = self.rechain(meter_of(&reading), Some(&reading), None, policy)?;
        self.apply_readings(updates);
        self.reading(id).cloned()
    }

    pub fn update_reading(
        &mut self,
        id: u64,
        draft: ReadingDraft,
        policy: IndexPolicy,
    ) -> Result<UtilityReading, StoreError> {
        let old_meter = meter_of(self.reading(id)?);
        self.contract(draft.contract_id)?;
        let reading = draft
            .into_reading(id, 0, policy)
            .map_err(StoreError::Invalid)?;
        let new_meter = meter_of(&reading);

        let mut updates = self.rechain(new_meter, Some(&reading), None, policy)?;
        if old_meter != new_meter {
            updates.extend(self.rechain(old_meter, None, Some(id), IndexPolicy::AllowDecrease)?);
        }
        self.apply_readings(updates);
        self.reading(id).cloned()
    }

    /// Removes a reading and re-derives the later readings that followed it.
    ///
    /// Deletion always succeeds for an existing reading; the index policy is
    /// not applied to the re-derived readings.
    pub fn delete_reading(&mut self, id: u64) -> Result<UtilityReading, StoreError> {
        let meter = meter_of(self.reading(id)?);
        let updates = self.rechain(meter, None, Some(id), IndexPolicy::AllowDecrease)?;
        let removed = self.readings.remove("reading", id)?;
        self.apply_readings(updates);
        Ok(removed)
    }

    /// Walks one meter's readings in date order as they would be once
    /// `upsert` is stored and `removed` is dropped, re-deriving each reading
    /// whose inferred previous index no longer matches its predecessor.
    /// Returns the readings that changed, `upsert` always included.
    fn rechain(
        &self,
        (contract_id, utility_type): Meter,
        upsert: Option<&UtilityReading>,
        removed: Option<u64>,
        policy: IndexPolicy,
    ) -> Result<Vec<UtilityReading>, StoreError> {
        let replaced = |id: u64| Some(id) == removed || upsert.is_some_and(|u| u.id == id);
        let mut meter: Vec<&UtilityReading> = self
            .readings()
            .filter(|r| {
                r.contract_id == contract_id && r.utility_type == utility_type && !replaced(r.id)
            })
            .chain(upsert)
            .collect();
        meter.sort_by_key(|r| (r.reading_date, r.id));

        let mut changed = Vec::new();
        let mut last_index = 0;
        for reading in meter {
            let is_upsert = upsert.is_some_and(|u| u.id == reading.id);
            if reading.previous_index_inferred && (is_upsert || reading.previous_index != last_index) {
                let rebased = reading.rebase(last_index, policy).map_err(|e| {
                    if is_upsert {
                        StoreError::Invalid(vec![e])
                    } else {
                        StoreError::Invalid(vec![FieldError::new(
                            "currentIndex",
                            format!(
                                "reading {} on {} would be invalid: {e}",
                                reading.id, reading.reading_date
                            ),
                        )])
                    }
                })?;
                changed.push(rebased);
            } else if is_upsert {
                changed.push(reading.clone());
            }
            last_index = reading.current_index;
        }
        Ok(changed)
    }

    fn apply_readings(&mut self, readings: Vec<UtilityReading>) {
        for reading in readings {
            self.readings.insert(reading.id, reading);
        }
    }

    // --- bills ---

    pub fn bills(&self) -> impl Iterator<Item = &UtilityBill> {
        self.bills.rows.values()
    }

    pub fn bill(&self, id: u64) -> Result<&UtilityBill, StoreError> {
        self.bills.get("bill", id)
    }

    /// Bills whose period is `period`.
    pub fn bills_for(&self, period: Period) -> impl Iterator<Item = &UtilityBill> {
        self.bills().filter(move |b| b.period == period)
    }

    /// Generates and stores the bill for a contract and month.
    ///
    /// A bill already stored for the same contract and period is replaced and
    /// keeps its id.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the contract does not exist.
    /// - [`StoreError::Billing`] if the bill cannot be computed.
    pub fn generate_bill(
        &mut self,
        contract_id: u64,
        period: Period,
        now: DateTime<Utc>,
    ) -> Result<UtilityBill, StoreError> {
        let contract = self.contract(contract_id)?;
        let readings: Vec<UtilityReading> = self
            .readings()
            .filter(|r| r.contract_id == contract_id)
            .cloned()
            .collect();
        let rates: Vec<UtilityRate> = self.rates().cloned().collect();
        let statement = billing::generate_monthly_bill(contract, period, &readings, &rates)?;

        let id = self
            .bills()
            .find(|b| b.contract_id == contract_id && b.period == period)
            .map_or_else(|| self.bills.next_id(), |b| b.id);
        let bill = UtilityBill::issue(id, statement, now);
        self.bills.insert(id, bill.clone());
        Ok(bill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::domain::{ContractStatus, MAX_METER_INDEX, MAX_UNIT_PRICE, Pricing};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn contract_draft() -> ContractDraft {
        ContractDraft {
            room_name: "A101".to_string(),
            tenant_name: "Tenant".to_string(),
            owner_name: "Owner".to_string(),
            start_date: date(2024, 1, 1),
            end_date: None,
            monthly_rent: dec!(3000000),
            status: ContractStatus::Active,
        }
    }

    fn reading_draft(contract_id: u64, on: NaiveDate, current: i64) -> ReadingDraft {
        ReadingDraft {
            contract_id,
            utility_type: UtilityType::Electric,
            reading_date: on,
            previous_index: None,
            current_index: current,
            price: dec!(3000),
            note: None,
        }
    }

    fn rate_draft(tier: i64, from: i64, to: i64, price: Decimal) -> RateDraft {
        RateDraft {
            utility_type: UtilityType::Electric,
            tier,
            from,
            to,
            price,
        }
    }

    #[test]
    fn rate_crud_round() {
        let mut store = Store::new();
        let created = store
            .create_rate(rate_draft(1, 0, 50, dec!(1806)))
            .expect("valid rate");
        assert_eq!(created.id, 1);

        let updated = store
            .update_rate(1, rate_draft(1, 0, 60, dec!(1900)))
            .expect("update existing rate");
        assert_eq!(updated.to, 60);
        assert_eq!(store.rate(1).map(|r| r.price), Ok(dec!(1900)));

        store.delete_rate(1).expect("delete existing rate");
        assert_eq!(
            store.rate(1),
            Err(StoreError::NotFound { kind: "rate", id: 1 })
        );
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let mut store = Store::new();
        store.create_rate(rate_draft(1, 0, 50, dec!(1))).expect("valid");
        store.create_rate(rate_draft(2, 50, 100, dec!(2))).expect("valid");
        store.delete_rate(2).expect("delete");
        let third = store.create_rate(rate_draft(2, 50, 100, dec!(2))).expect("valid");
        assert_eq!(third.id, 3);
    }

    #[test]
    fn invalid_rate_is_rejected() {
        let mut store = Store::new();
        let err = store
            .create_rate(rate_draft(1, 10, 5, dec!(1)))
            .expect_err("to <= from");
        assert!(matches!(err, StoreError::Invalid(ref e) if e[0].field == "to"));
        assert_eq!(store.rates().count(), 0);
    }

    #[test]
    fn update_of_missing_rate_is_not_found() {
        let mut store = Store::new();
        let err = store
            .update_rate(42, rate_draft(1, 0, 5, dec!(1)))
            .expect_err("no rate 42");
        assert_eq!(err, StoreError::NotFound { kind: "rate", id: 42 });
    }

    #[test]
    fn reading_requires_existing_contract() {
        let mut store = Store::new();
        let err = store
            .create_reading(reading_draft(9, date(2024, 5, 1), 10), IndexPolicy::default())
            .expect_err("contract 9 is unknown");
        assert_eq!(err, StoreError::NotFound { kind: "contract", id: 9 });
    }

    #[test]
    fn previous_index_comes_from_latest_earlier_reading() {
        let mut store = Store::new();
        let c = store.create_contract(contract_draft()).expect("valid contract");
        store
            .create_reading(reading_draft(c.id, date(2024, 4, 30), 1000), IndexPolicy::default())
            .expect("first reading");
        store
            .create_reading(reading_draft(c.id, date(2024, 6, 30), 1500), IndexPolicy::default())
            .expect("later reading");

        let may = store
            .create_reading(reading_draft(c.id, date(2024, 5, 31), 1200), IndexPolicy::default())
            .expect("back-filled reading");
        assert_eq!(may.previous_index, 1000);
        assert_eq!(may.consumption, 200);

        let june = store.reading(2).expect("june reading");
        assert_eq!(june.previous_index, 1200);
        assert_eq!(june.consumption, 300);
        assert_eq!(june.total, dec!(900000));
    }

    #[test]
    fn backfilled_month_does_not_double_count() {
        let mut store = Store::new();
        let c = store.create_contract(contract_draft()).expect("valid contract");
        for (on, index) in [(date(2024, 4, 30), 1000), (date(2024, 6, 30), 1500), (date(2024, 5, 31), 1200)] {
            store
                .create_reading(reading_draft(c.id, on, index), IndexPolicy::default())
                .expect("reading");
        }
        let may = Period::new(2024, 5).expect("valid period");
        let june = Period::new(2024, 6).expect("valid period");
        let billed: i64 = [may, june]
            .into_iter()
            .map(|p| store.generate_bill(c.id, p, Utc::now()).expect("bill").lines[0].consumption)
            .sum();
        assert_eq!(billed, 500);
    }

    #[test]
    fn editing_a_reading_moves_the_next_inferred_one() {
        let mut store = Store::new();
        let c = store.create_contract(contract_draft()).expect("valid contract");
        store
            .create_reading(reading_draft(c.id, date(2024, 4, 30), 1000), IndexPolicy::default())
            .expect("april");
        let mut explicit = reading_draft(c.id, date(2024, 6, 30), 1600);
        explicit.previous_index = Some(1100);
        store.create_reading(explicit, IndexPolicy::default()).expect("june");
        store
            .create_reading(reading_draft(c.id, date(2024, 5, 31), 1100), IndexPolicy::default())
            .expect("may");

        store
            .update_reading(1, reading_draft(c.id, date(2024, 4, 30), 1050), IndexPolicy::default())
            .expect("april corrected");
        let may = store.reading(3).expect("may reading");
        assert_eq!(may.previous_index, 1050);
        assert_eq!(may.consumption, 50);
        // an explicit previous index is left alone
        assert_eq!(store.reading(2).map(|r| r.previous_index), Ok(1100));
    }

    #[test]
    fn deleting_a_reading_rebases_the_next_one() {
        let mut store = Store::new();
        let c = store.create_contract(contract_draft()).expect("valid contract");
        for (on, index) in [(date(2024, 4, 30), 1000), (date(2024, 5, 31), 1200), (date(2024, 6, 30), 1500)] {
            store
                .create_reading(reading_draft(c.id, on, index), IndexPolicy::default())
                .expect("reading");
        }
        store.delete_reading(2).expect("delete may");
        let june = store.reading(3).expect("june reading");
        assert_eq!(june.previous_index, 1000);
        assert_eq!(june.consumption, 500);
    }

    #[test]
    fn moving_a_reading_to_another_type_rebases_the_old_meter() {
        let mut store = Store::new();
        let c = store.create_contract(contract_draft()).expect("valid contract");
        for (on, index) in [(date(2024, 4, 30), 1000), (date(2024, 5, 31), 1200)] {
            store
                .create_reading(reading_draft(c.id, on, index), IndexPolicy::default())
                .expect("reading");
        }
        let mut as_water = reading_draft(c.id, date(2024, 4, 30), 10);
        as_water.utility_type = UtilityType::Water;
        store
            .update_reading(1, as_water, IndexPolicy::default())
            .expect("reading moved to water");
        let may = store.reading(2).expect("may reading");
        assert_eq!(may.previous_index, 0);
        assert_eq!(may.consumption, 1200);
    }

    #[test]
    fn strict_policy_rejects_backfill_above_next_reading() {
        let mut store = Store::new();
        let c = store.create_contract(contract_draft()).expect("valid contract");
        store
            .create_reading(reading_draft(c.id, date(2024, 6, 30), 1500), IndexPolicy::RejectDecrease)
            .expect("june");
        let err = store
            .create_reading(
                reading_draft(c.id, date(2024, 5, 31), 1700),
                IndexPolicy::RejectDecrease,
            )
            .expect_err("june would go down");
        match err {
            StoreError::Invalid(fields) => assert!(fields[0].message.contains("reading 1")),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(store.readings().count(), 1);
        assert_eq!(store.reading(1).map(|r| r.consumption), Ok(1500));
    }

    #[test]
    fn oversized_reading_is_rejected_not_panicking() {
        let mut store = Store::new();
        let c = store.create_contract(contract_draft()).expect("valid contract");
        let mut draft = reading_draft(c.id, date(2024, 5, 31), 10_000_000_000);
        draft.price = dec!(10000000000000000000);
        let err = store
            .create_reading(draft, IndexPolicy::default())
            .expect_err("price above the limit");
        assert!(matches!(err, StoreError::Invalid(ref e) if e[0].field == "price"));
        assert_eq!(store.readings().count(), 0);
    }

    #[test]
    fn month_of_maximal_readings_still_bills() {
        let mut store = Store::new();
        let c = store.create_contract(contract_draft()).expect("valid contract");
        for day in 1..=31 {
            let mut draft = reading_draft(c.id, date(2024, 5, day), MAX_METER_INDEX);
            draft.previous_index = Some(0);
            draft.price = MAX_UNIT_PRICE;
            store
                .create_reading(draft, IndexPolicy::default())
                .expect("reading at the limits");
        }
        let period = Period::new(2024, 5).expect("valid period");
        let bill = store.generate_bill(c.id, period, Utc::now()).expect("flat bill");
        assert_eq!(bill.lines[0].consumption, 31 * MAX_METER_INDEX);
        assert_eq!(bill.total, Decimal::from(31 * MAX_METER_INDEX) * MAX_UNIT_PRICE);
    }

    #[test]
    fn update_does_not_use_itself_as_previous() {
        let mut store = Store::new();
        let c = store.create_contract(contract_draft()).expect("valid contract");
        let r = store
            .create_reading(reading_draft(c.id, date(2024, 5, 31), 100), IndexPolicy::default())
            .expect("reading");
        let updated = store
            .update_reading(r.id, reading_draft(c.id, date(2024, 5, 31), 120), IndexPolicy::default())
            .expect("update");
        assert_eq!(updated.previous_index, 0);
        assert_eq!(updated.consumption, 120);
    }

    #[test]
    fn strict_policy_rejects_lower_index() {
        let mut store = Store::new();
        let c = store.create_contract(contract_draft()).expect("valid contract");
        store
            .create_reading(reading_draft(c.id, date(2024, 4, 30), 1000), IndexPolicy::default())
            .expect("first reading");
        let err = store
            .create_reading(
                reading_draft(c.id, date(2024, 5, 31), 900),
                IndexPolicy::RejectDecrease,
            )
            .expect_err("index went down");
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn regenerating_a_bill_replaces_it() {
        let mut store = Store::with_rates([rate_draft(1, 0, 1000, dec!(10))]).expect("valid rates");
        let c = store.create_contract(contract_draft()).expect("valid contract");
        store
            .create_reading(reading_draft(c.id, date(2024, 5, 15), 40), IndexPolicy::default())
            .expect("reading");
        let period = Period::new(2024, 5).expect("valid period");

        let first = store.generate_bill(c.id, period, Utc::now()).expect("bill");
        assert_eq!(first.total, dec!(400));
        assert_eq!(first.lines[0].pricing, Pricing::Tiered);

        store
            .create_reading(reading_draft(c.id, date(2024, 5, 31), 100), IndexPolicy::default())
            .expect("second reading");
        let second = store.generate_bill(c.id, period, Utc::now()).expect("bill");
        assert_eq!(second.id, first.id);
        assert_eq!(second.total, dec!(1000));
        assert_eq!(store.bills().count(), 1);
    }

    #[test]
    fn bill_for_unknown_contract_is_not_found() {
        let mut store = Store::new();
        let period = Period::new(2024, 5).expect("valid period");
        let err = store.generate_bill(5, period, Utc::now()).expect_err("no contract");
        assert_eq!(err, StoreError::NotFound { kind: "contract", id: 5 });
    }
}
