//! API query, request and response types.
//!
//! JSON field names are camelCase to match the record types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    FieldError, InvalidPeriod, Period, Pricing, TierCharge, UnknownUtilityType, UtilityType,
};
use crate::listing::ListRequest;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Per-field validation failures, when the request body was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

/// Query string accepted by list and export endpoints.
///
/// Filters that do not apply to an entity are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub utility_type: Option<String>,
    pub contract_id: Option<u64>,
    /// `YYYY-MM`.
    pub month: Option<String>,
    #[serde(rename = "$orderby", alias = "orderby")]
    pub order_by: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl ListQuery {
    pub fn list_request(&self) -> ListRequest<'_> {
        ListRequest {
            search: self.search.as_deref(),
            order_by: self.order_by.as_deref(),
            page: self.page,
            page_size: self.page_size,
        }
    }

    /// The `type` filter, parsed case-insensitively.
    pub fn utility_type(&self) -> Result<Option<UtilityType>, UnknownUtilityType> {
        self.utility_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(str::parse)
            .transpose()
    }

    pub fn period(&self) -> Result<Option<Period>, InvalidPeriod> {
        parse_month(self.month.as_deref())
    }
}

/// `?month=YYYY-MM`, defaulting to the current month.
#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
}

impl MonthQuery {
    pub fn period_or(&self, today: NaiveDate) -> Result<Period, InvalidPeriod> {
        Ok(parse_month(self.month.as_deref())?.unwrap_or_else(|| Period::of(today)))
    }
}

fn parse_month(month: Option<&str>) -> Result<Option<Period>, InvalidPeriod> {
    month
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::parse)
        .transpose()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(rename = "type")]
    pub utility_type: UtilityType,
    pub consumption: i64,
}

/// Price of a consumption under the current rate table.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    #[serde(rename = "type")]
    pub utility_type: UtilityType,
    pub consumption: i64,
    pub pricing: Pricing,
    pub charges: Vec<TierCharge>,
    pub amount: Decimal,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Parses the query string the same way the `Query` extractor does.
    fn query(raw: &str) -> ListQuery {
        let uri = format!("/x?{raw}").parse().unwrap();
        axum::extract::Query::<ListQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn orderby_accepts_dollar_and_plain_names() {
        assert_eq!(query("$orderby=total%20desc").order_by.as_deref(), Some("total desc"));
        assert_eq!(query("orderby=id").order_by.as_deref(), Some("id"));
    }

    #[test]
    fn camel_case_filters_parse() {
        let q = query("type=water&contractId=4&month=2024-05&pageSize=5");
        assert_eq!(q.utility_type().unwrap(), Some(UtilityType::Water));
        assert_eq!(q.contract_id, Some(4));
        assert_eq!(q.period().unwrap(), Period::new(2024, 5));
        assert_eq!(q.page_size, Some(5));
    }

    #[test]
    fn blank_filters_are_ignored() {
        let q = query("type=&month=");
        assert_eq!(q.utility_type().unwrap(), None);
        assert_eq!(q.period().unwrap(), None);
    }

    #[test]
    fn month_defaults_to_today() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let period = MonthQuery::default().period_or(today).unwrap();
        assert_eq!(period, Period::new(2024, 2).unwrap());
        assert!(MonthQuery { month: Some("2024-13".into()) }.period_or(today).is_err());
    }
}
