#![forbid(unsafe_code)]

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Columns of the order schema, in the order they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderColumn {
    OrderId,
    Product,
    OrderDate,
    City,
    Quantity,
    Sales,
    DeliveryTimeMinutes,
}

impl OrderColumn {
    pub const ALL: [Self; 7] = [
        Self::OrderId,
        Self::Product,
        Self::OrderDate,
        Self::City,
        Self::Quantity,
        Self::Sales,
        Self::DeliveryTimeMinutes,
    ];

    #[must_use]
    pub fn header(self) -> &'static str {
        match self {
            Self::OrderId => "Order_ID",
            Self::Product => "Product",
            Self::OrderDate => "Order_Date",
            Self::City => "City",
            Self::Quantity => "Quantity",
            Self::Sales => "Sales",
            Self::DeliveryTimeMinutes => "Delivery_Time_min",
        }
    }

    #[must_use]
    pub fn from_header(header: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|column| column.header() == header.trim())
    }
}

impl fmt::Display for OrderColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// First-of-month calendar key derived from an order timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderMonth(NaiveDate);

impl OrderMonth {
    #[must_use]
    pub fn of_date(date: NaiveDate) -> Self {
        Self(date.with_day(1).unwrap_or(date))
    }

    #[must_use]
    pub fn of_timestamp(ts: NaiveDateTime) -> Self {
        Self::of_date(ts.date())
    }

    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        self.0
    }

    #[must_use]
    pub fn year(self) -> i32 {
        self.0.year()
    }

    #[must_use]
    pub fn month(self) -> u32 {
        self.0.month()
    }
}

impl fmt::Display for OrderMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub product: String,
    pub order_date: NaiveDateTime,
    pub city: String,
    pub quantity: i64,
    pub sales: f64,
    pub delivery_time_minutes: i64,
}

impl Order {
    #[must_use]
    pub fn order_month(&self) -> OrderMonth {
        OrderMonth::of_timestamp(self.order_date)
    }

    #[must_use]
    pub fn order_day(&self) -> NaiveDate {
        self.order_date.date()
    }

    /// Checks the per-row invariants. Uniqueness of `order_id` is a table
    /// level property and is checked by the table, not here.
    pub fn check_invariants(&self) -> Result<(), SchemaError> {
        if self.order_id.trim().is_empty() {
            return Err(SchemaError::EmptyOrderId);
        }
        if !self.sales.is_finite() || self.sales < 0.0 {
            return Err(SchemaError::InvalidSales {
                order_id: self.order_id.clone(),
                value: self.sales,
            });
        }
        if self.quantity < 1 {
            return Err(SchemaError::NonPositiveQuantity {
                order_id: self.order_id.clone(),
                value: self.quantity,
            });
        }
        if self.delivery_time_minutes < 1 {
            return Err(SchemaError::NonPositiveDeliveryTime {
                order_id: self.order_id.clone(),
                value: self.delivery_time_minutes,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("required column {column} is missing from the input header")]
    MissingColumn { column: OrderColumn },
    #[error("row {row}: value {value:?} in column {column} cannot be coerced")]
    NonCoercible {
        row: usize,
        column: OrderColumn,
        value: String,
    },
    #[error("row {row}: expected {expected} fields, found {found}")]
    FieldCount {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("order id must not be empty")]
    EmptyOrderId,
    #[error("order {order_id:?} has duplicate id")]
    DuplicateOrderId { order_id: String },
    #[error("order {order_id:?} has invalid sales amount {value}")]
    InvalidSales { order_id: String, value: f64 },
    #[error("order {order_id:?} has non-positive quantity {value}")]
    NonPositiveQuantity { order_id: String, value: i64 },
    #[error("order {order_id:?} has non-positive delivery time {value}")]
    NonPositiveDeliveryTime { order_id: String, value: i64 },
}
