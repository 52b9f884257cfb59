#![forbid(unsafe_code)]

use chrono::{DateTime, NaiveDate};
use ol_table::OrderTable;
use ol_types::Order;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PRODUCTS: [&str; 15] = [
    "Milk",
    "Bread",
    "Eggs",
    "Bananas",
    "Rice",
    "Oil",
    "Maggi",
    "Curd",
    "Toothpaste",
    "Soap",
    "Detergent",
    "Chicken",
    "Paneer",
    "Butter",
    "Soda",
];

/// City, sampling weight, and mean delivery time in minutes.
pub const CITIES: [(&str, f64, f64); 8] = [
    ("Mumbai", 0.18, 30.0),
    ("Delhi", 0.16, 35.0),
    ("Bengaluru", 0.15, 28.0),
    ("Hyderabad", 0.12, 32.0),
    ("Kolkata", 0.11, 40.0),
    ("Chennai", 0.10, 33.0),
    ("Pune", 0.10, 27.0),
    ("Ahmedabad", 0.08, 36.0),
];

const FIRST_ORDER_NUMBER: usize = 100_000;
const DELIVERY_STD_DEV: f64 = 8.0;
const MIN_DELIVERY_MINUTES: i64 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub rows: usize,
    pub seed: u64,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            rows: 15_000,
            seed: 42,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2025, 8, 31).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("synthetic window is empty: start {start} is not before end {end}")]
    EmptyWindow { start: NaiveDate, end: NaiveDate },
    #[error("sampled timestamp {secs} is outside the representable range")]
    TimestampOutOfRange { secs: i64 },
    #[error("invalid sampling distribution: {0}")]
    Distribution(String),
}

#[must_use]
pub fn base_price(product_idx: usize) -> f64 {
    20.0 + 10.0 * product_idx as f64
}

/// Generates `config.rows` orders sorted by timestamp. The same config always
/// yields the same table.
pub fn generate_orders(config: &SynthConfig) -> Result<OrderTable, SynthError> {
    if config.start >= config.end {
        return Err(SynthError::EmptyWindow {
            start: config.start,
            end: config.end,
        });
    }
    let start_secs = config.start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
    let end_secs = config.end.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();

    let city_picker = WeightedIndex::new(CITIES.iter().map(|(_, weight, _)| *weight))
        .map_err(|err| SynthError::Distribution(err.to_string()))?;
    let delivery = CITIES
        .iter()
        .map(|(_, _, mean)| Normal::new(*mean, DELIVERY_STD_DEV))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| SynthError::Distribution(err.to_string()))?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut orders = Vec::with_capacity(config.rows);

    for i in 0..config.rows {
        let secs = rng.random_range(start_secs..end_secs);
        let order_date = DateTime::from_timestamp(secs, 0)
            .map(|ts| ts.naive_utc())
            .ok_or(SynthError::TimestampOutOfRange { secs })?;
        let product_idx = rng.random_range(0..PRODUCTS.len());
        let city_idx = city_picker.sample(&mut rng);
        let quantity = rng.random_range(1..5_i64);
        let markup = rng.random_range(0.85..1.3);
        let sales = (base_price(product_idx) * quantity as f64 * markup * 100.0).round() / 100.0;
        let minutes = delivery[city_idx].sample(&mut rng).trunc() as i64;

        orders.push(Order {
            order_id: format!("ORD{}", FIRST_ORDER_NUMBER + i),
            product: PRODUCTS[product_idx].to_owned(),
            order_date,
            city: CITIES[city_idx].0.to_owned(),
            quantity,
            sales,
            delivery_time_minutes: minutes.max(MIN_DELIVERY_MINUTES),
        });
    }

    orders.sort_by_key(|order| order.order_date);
    Ok(OrderTable::new(orders))
}
