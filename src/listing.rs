//! Search filtering, `$orderby` sorting and page clamping for list views.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::Serialize;

use crate::config::ListingConfig;
use crate::domain::{Contract, UtilityBill, UtilityRate, UtilityReading};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListingError {
    #[error("invalid $orderby \"{0}\", expected \"<field> [asc|desc]\"")]
    InvalidOrderBy(String),
    #[error("cannot sort by \"{field}\", sortable fields: {allowed}")]
    UnknownSortField { field: String, allowed: String },
}

/// A record that list endpoints can search and sort.
pub trait Listable {
    /// Field names accepted by `$orderby`, in camelCase.
    const SORT_FIELDS: &'static [&'static str];

    /// Text matched against the search query.
    fn search_text(&self) -> String;

    /// Compares two records on one of [`Self::SORT_FIELDS`].
    fn compare_on(&self, other: &Self, field: &str) -> Ordering;
}

/// Parsed `$orderby` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl FromStr for OrderBy {
    type Err = ListingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ListingError::InvalidOrderBy(s.to_string());
        let mut parts = s.split_whitespace();
        let field = parts.next().ok_or_else(invalid)?.to_string();
        let descending = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => false,
            Some("desc") => true,
            Some(_) => return Err(invalid()),
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self { field, descending })
    }
}

/// One page of a filtered list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number, clamped to `[1, total_pages]`.
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    /// Always at least 1, so an empty list still has a valid current page.
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// True when the filter matched nothing ("no results" state).
    pub fn is_empty(&self) -> bool {
        self.total_items == 0
    }
}

/// Keeps the records whose search text contains `query`, ignoring case.
///
/// A missing or blank query keeps everything.
pub fn filter_search<'a, T: Listable>(
    items: impl IntoIterator<Item = &'a T>,
    query: Option<&str>,
) -> Vec<&'a T>
where
    T: 'a,
{
    let needle = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);
    items
        .into_iter()
        .filter(|item| {
            needle
                .as_deref()
                .is_none_or(|n| item.search_text().to_lowercase().contains(n))
        })
        .collect()
}

/// Sorts records in place by an `$orderby` clause.
///
/// # Errors
///
/// Returns an error when the clause is malformed or names an unknown field.
pub fn sort_by<T: Listable>(items: &mut [&T], order_by: &str) -> Result<(), ListingError> {
    let order: OrderBy = order_by.parse()?;
    let field = T::SORT_FIELDS
        .iter()
        .find(|f| f.eq_ignore_ascii_case(&order.field))
        .ok_or_else(|| ListingError::UnknownSortField {
            field: order.field.clone(),
            allowed: T::SORT_FIELDS.join(", "),
        })?;

    items.sort_by(|a, b| {
        let ord = a.compare_on(b, field);
        if order.descending { ord.reverse() } else { ord }
    });
    Ok(())
}

/// Cuts one page out of `items`.
///
/// `page_size` falls back to the configured default and is clamped to
/// `[1, max_page_size]`; `page` is clamped to `[1, total_pages]`.
pub fn paginate<T: Clone>(
    items: &[&T],
    page: Option<usize>,
    page_size: Option<usize>,
    limits: &ListingConfig,
) -> Page<T> {
    let page_size = page_size
        .unwrap_or(limits.default_page_size)
        .clamp(1, limits.max_page_size.max(1));
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.unwrap_or(1).clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let items = items
        .iter()
        .skip(start)
        .take(page_size)
        .map(|item| (*item).clone())
        .collect();

    Page {
        items,
        page,
        page_size,
        total_items,
        total_pages,
    }
}

/// List parameters shared by every list endpoint.
#[derive(Debug, Clone, Default)]
pub struct ListRequest<'a> {
    pub search: Option<&'a str>,
    pub order_by: Option<&'a str>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// Search, sort, then paginate.
///
/// # Errors
///
/// Propagates `$orderby` errors from [`sort_by`].
pub fn list<'a, T: Listable + Clone + 'a>(
    items: impl IntoIterator<Item = &'a T>,
    request: &ListRequest<'_>,
    limits: &ListingConfig,
) -> Result<Page<T>, ListingError> {
    let mut matched = filter_search(items, request.search);
    if let Some(order_by) = request.order_by.filter(|o| !o.trim().is_empty()) {
        sort_by(&mut matched, order_by)?;
    }
    Ok(paginate(&matched, request.page, request.page_size, limits))
}

impl Listable for UtilityRate {
    const SORT_FIELDS: &'static [&'static str] = &["id", "type", "tier", "from", "price"];

    fn search_text(&self) -> String {
        format!(
            "{} tier {} {}-{} {}",
            self.utility_type, self.tier, self.from, self.to, self.price
        )
    }

    fn compare_on(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "type" => self.utility_type.cmp(&other.utility_type),
            "tier" => self.tier.cmp(&other.tier),
            "from" => self.from.cmp(&other.from),
            "price" => self.price.cmp(&other.price),
            _ => self.id.cmp(&other.id),
        }
    }
}

impl Listable for Contract {
    const SORT_FIELDS: &'static [&'static str] = &[
        "id",
        "roomName",
        "tenantName",
        "startDate",
        "monthlyRent",
    ];

    fn search_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.room_name,
            self.tenant_name,
            self.owner_name,
            self.status.as_str()
        )
    }

    fn compare_on(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "roomName" => self.room_name.cmp(&other.room_name),
            "tenantName" => self.tenant_name.cmp(&other.tenant_name),
            "startDate" => self.start_date.cmp(&other.start_date),
            "monthlyRent" => self.monthly_rent.cmp(&other.monthly_rent),
            _ => self.id.cmp(&other.id),
        }
    }
}

impl Listable for UtilityReading {
    const SORT_FIELDS: &'static [&'static str] = &[
        "id",
        "contractId",
        "readingDate",
        "consumption",
        "total",
    ];

    fn search_text(&self) -> String {
        format!(
            "{} contract {} {} {}",
            self.utility_type,
            self.contract_id,
            self.reading_date,
            self.note.as_deref().unwrap_or("")
        )
    }

    fn compare_on(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "contractId" => self.contract_id.cmp(&other.contract_id),
            "readingDate" => self.reading_date.cmp(&other.reading_date),
            "consumption" => self.consumption.cmp(&other.consumption),
            "total" => self.total.cmp(&other.total),
            _ => self.id.cmp(&other.id),
        }
    }
}

impl Listable for UtilityBill {
    const SORT_FIELDS: &'static [&'static str] = &["id", "contractId", "period", "total"];

    fn search_text(&self) -> String {
        format!("{} contract {}", self.period, self.contract_id)
    }

    fn compare_on(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "contractId" => self.contract_id.cmp(&other.contract_id),
            "period" => self.period.cmp(&other.period),
            "total" => self.total.cmp(&other.total),
            _ => self.id.cmp(&other.id),
        }
    }
}
