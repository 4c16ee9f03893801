//! Rental contracts referenced by readings and bills.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::FieldError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractStatus {
    Pending,
    #[default]
    Active,
    Terminated,
}

impl ContractStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Active => "Active",
            Self::Terminated => "Terminated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: u64,
    pub room_name: String,
    pub tenant_name: String,
    pub owner_name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub monthly_rent: Decimal,
    pub status: ContractStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDraft {
    pub room_name: String,
    pub tenant_name: String,
    #[serde(default)]
    pub owner_name: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub monthly_rent: Decimal,
    #[serde(default)]
    pub status: ContractStatus,
}

impl ContractDraft {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.room_name.trim().is_empty() {
            errors.push(FieldError::new("roomName", "must not be empty"));
        }
        if self.tenant_name.trim().is_empty() {
            errors.push(FieldError::new("tenantName", "must not be empty"));
        }
        if self.monthly_rent < Decimal::ZERO {
            errors.push(FieldError::new("monthlyRent", "must be >= 0"));
        }
        if let Some(end) = self.end_date {
            if end <= self.start_date {
                errors.push(FieldError::new("endDate", "must be after startDate"));
            }
        }

        errors
    }

    /// # Errors
    ///
    /// Returns the list of field errors when validation fails.
    pub fn into_contract(self, id: u64) -> Result<Contract, Vec<FieldError>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Contract {
            id,
            room_name: self.room_name.trim().to_string(),
            tenant_name: self.tenant_name.trim().to_string(),
            owner_name: self.owner_name.trim().to_string(),
            start_date: self.start_date,
            end_date: self.end_date,
            monthly_rent: self.monthly_rent,
            status: self.status,
        })
    }
}
