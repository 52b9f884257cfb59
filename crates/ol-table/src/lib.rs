#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDate;
use ol_types::{Order, SchemaError};
use serde::{Deserialize, Serialize};

/// Ordered, immutable sequence of orders.
///
/// Every transformation returns a fresh table; nothing mutates in place, so a
/// loaded table can be shared by any number of concurrent readers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderTable {
    orders: Vec<Order>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowViolation {
    pub row: usize,
    pub error: SchemaError,
}

impl OrderTable {
    #[must_use]
    pub fn new(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Order> {
        self.orders.iter()
    }

    #[must_use]
    pub fn into_orders(self) -> Vec<Order> {
        self.orders
    }

    /// Copies the rows matching `predicate` into a new table, keeping input order.
    #[must_use]
    pub fn select<P>(&self, mut predicate: P) -> Self
    where
        P: FnMut(&Order) -> bool,
    {
        Self::new(
            self.orders
                .iter()
                .filter(|order| predicate(order))
                .cloned()
                .collect(),
        )
    }

    /// Partitions rows by `key_fn`. Groups come back in ascending key order
    /// and rows inside a group keep their table order.
    #[must_use]
    pub fn group_by<K, F>(&self, mut key_fn: F) -> BTreeMap<K, Vec<&Order>>
    where
        K: Ord,
        F: FnMut(&Order) -> K,
    {
        let mut groups = BTreeMap::<K, Vec<&Order>>::new();
        for order in &self.orders {
            groups.entry(key_fn(order)).or_default().push(order);
        }
        groups
    }

    #[must_use]
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut days = self.orders.iter().map(Order::order_day);
        let first = days.next()?;
        Some(days.fold((first, first), |(lo, hi), day| (lo.min(day), hi.max(day))))
    }

    #[must_use]
    pub fn distinct_cities(&self) -> BTreeSet<String> {
        self.orders.iter().map(|order| order.city.clone()).collect()
    }

    #[must_use]
    pub fn distinct_products(&self) -> BTreeSet<String> {
        self.orders
            .iter()
            .map(|order| order.product.clone())
            .collect()
    }

    /// Newest first; ties keep table order.
    #[must_use]
    pub fn sorted_by_date_desc(&self) -> Self {
        let mut orders = self.orders.clone();
        orders.sort_by(|left, right| right.order_date.cmp(&left.order_date));
        Self::new(orders)
    }

    /// Reports every row that breaks the schema invariants, including
    /// duplicate ids. The table itself is left untouched.
    #[must_use]
    pub fn validate(&self) -> Vec<RowViolation> {
        let mut seen = HashSet::<&str>::with_capacity(self.orders.len());
        let mut violations = Vec::new();
        for (row, order) in self.orders.iter().enumerate() {
            if let Err(error) = order.check_invariants() {
                violations.push(RowViolation { row, error });
                continue;
            }
            if !seen.insert(order.order_id.as_str()) {
                violations.push(RowViolation {
                    row,
                    error: SchemaError::DuplicateOrderId {
                        order_id: order.order_id.clone(),
                    },
                });
            }
        }
        violations
    }
}

impl From<Vec<Order>> for OrderTable {
    fn from(orders: Vec<Order>) -> Self {
        Self::new(orders)
    }
}

impl FromIterator<Order> for OrderTable {
    fn from_iter<I: IntoIterator<Item = Order>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a OrderTable {
    type Item = &'a Order;
    type IntoIter = std::slice::Iter<'a, Order>;

    fn into_iter(self) -> Self::IntoIter {
        self.orders.iter()
    }
}

/// Numeric order attributes that reducers can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Sales,
    Quantity,
    DeliveryTimeMinutes,
}

impl Measure {
    #[must_use]
    pub fn value(self, order: &Order) -> f64 {
        match self {
            Self::Sales => order.sales,
            Self::Quantity => order.quantity as f64,
            Self::DeliveryTimeMinutes => order.delivery_time_minutes as f64,
        }
    }
}

pub trait Reducer {
    type Output;

    fn reduce(&self, rows: &[&Order]) -> Self::Output;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sum(pub Measure);

/// Arithmetic mean; an empty group reduces to `0.0` rather than NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mean(pub Measure);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Count;

impl Reducer for Sum {
    type Output = f64;

    fn reduce(&self, rows: &[&Order]) -> f64 {
        // `Iterator::sum` over no floats yields -0.0
        rows.iter()
            .map(|order| self.0.value(order))
            .fold(0.0, |acc, value| acc + value)
    }
}

impl Reducer for Mean {
    type Output = f64;

    fn reduce(&self, rows: &[&Order]) -> f64 {
        if rows.is_empty() {
            return 0.0;
        }
        Sum(self.0).reduce(rows) / rows.len() as f64
    }
}

impl Reducer for Count {
    type Output = usize;

    fn reduce(&self, rows: &[&Order]) -> usize {
        rows.len()
    }
}

impl<A: Reducer, B: Reducer> Reducer for (A, B) {
    type Output = (A::Output, B::Output);

    fn reduce(&self, rows: &[&Order]) -> Self::Output {
        (self.0.reduce(rows), self.1.reduce(rows))
    }
}

impl<A: Reducer, B: Reducer, C: Reducer> Reducer for (A, B, C) {
    type Output = (A::Output, B::Output, C::Output);

    fn reduce(&self, rows: &[&Order]) -> Self::Output {
        (self.0.reduce(rows), self.1.reduce(rows), self.2.reduce(rows))
    }
}

pub fn aggregate<R: Reducer>(group: &[&Order], reducer: R) -> R::Output {
    reducer.reduce(group)
}
