//! Records managed by the service: contracts, tiered utility rates, meter
//! readings, and the monthly bills generated from them.

pub mod bill;
pub mod contract;
pub mod period;
pub mod rate;
pub mod reading;
pub mod types;

pub use bill::{BillLine, BillStatement, Pricing, TierCharge, UtilityBill};
pub use contract::{Contract, ContractDraft, ContractStatus};
pub use period::{InvalidPeriod, Period};
pub use rate::{RateDraft, UtilityRate};
pub use reading::{IndexPolicy, ReadingDraft, UtilityReading};
pub use types::{
    FieldError, MAX_METER_INDEX, MAX_UNIT_PRICE, UnknownUtilityType, UtilityType, checked_sum,
    round_money,
};
