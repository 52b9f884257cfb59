#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use chrono::NaiveDate;
use ol_table::OrderTable;
use ol_types::Order;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// Inclusive range of calendar days.
///
/// Membership is decided on the order's calendar date, so every timestamp on
/// `end` falls inside the range regardless of its time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = FilterError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FilterError> {
        if start > end {
            return Err(FilterError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    #[must_use]
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Conjunction of the three dashboard predicates.
///
/// `products: None` disables product filtering; `Some` of an empty set
/// selects nothing, as does an empty `cities` set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSpec {
    pub date_range: DateRange,
    pub cities: BTreeSet<String>,
    #[serde(default)]
    pub products: Option<BTreeSet<String>>,
}

impl FilterSpec {
    #[must_use]
    pub fn new(
        date_range: DateRange,
        cities: BTreeSet<String>,
        products: Option<BTreeSet<String>>,
    ) -> Self {
        Self {
            date_range,
            cities,
            products,
        }
    }

    /// The selection that keeps every row: full date extent, every city,
    /// no product filter. `None` for an empty table.
    #[must_use]
    pub fn covering(table: &OrderTable) -> Option<Self> {
        let (start, end) = table.date_bounds()?;
        Some(Self {
            date_range: DateRange { start, end },
            cities: table.distinct_cities(),
            products: None,
        })
    }

    #[must_use]
    pub fn with_products(mut self, products: BTreeSet<String>) -> Self {
        self.products = Some(products);
        self
    }

    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        self.date_range.contains(order.order_day())
            && self.cities.contains(&order.city)
            && self
                .products
                .as_ref()
                .is_none_or(|products| products.contains(&order.product))
    }
}

pub fn filter_orders(table: &OrderTable, spec: &FilterSpec) -> OrderTable {
    let out = if spec.cities.is_empty() || spec.products.as_ref().is_some_and(BTreeSet::is_empty)
    {
        OrderTable::empty()
    } else {
        table.select(|order| spec.matches(order))
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(
        input_rows = table.len(),
        output_rows = out.len(),
        start = %spec.date_range.start(),
        end = %spec.date_range.end(),
        cities = spec.cities.len(),
        product_filter = spec.products.is_some(),
        "filter applied"
    );

    out
}

pub fn filter(
    table: &OrderTable,
    start: NaiveDate,
    end: NaiveDate,
    cities: &BTreeSet<String>,
    products: Option<&BTreeSet<String>>,
) -> Result<OrderTable, FilterError> {
    let spec = FilterSpec::new(DateRange::new(start, end)?, cities.clone(), products.cloned());
    Ok(filter_orders(table, &spec))
}
