#![forbid(unsafe_code)]

use ol_table::{Count, Mean, Measure, OrderTable, Sum, aggregate};
use ol_types::OrderMonth;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthRollup {
    pub month: OrderMonth,
    pub total_sales: f64,
    pub avg_delivery: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRollup {
    pub city: String,
    pub total_sales: f64,
    pub avg_delivery: f64,
    pub order_count: usize,
}

/// One point of the sales-vs-delivery scatter: x is mean delivery time,
/// y is total sales, marker size is order count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeoffPoint {
    pub city: String,
    pub avg_delivery: f64,
    pub total_sales: f64,
    pub order_count: usize,
}

impl From<&CityRollup> for TradeoffPoint {
    fn from(rollup: &CityRollup) -> Self {
        Self {
            city: rollup.city.clone(),
            avg_delivery: rollup.avg_delivery,
            total_sales: rollup.total_sales,
            order_count: rollup.order_count,
        }
    }
}

/// One row per month present, strictly ascending by month.
#[must_use]
pub fn rollup_by_month(table: &OrderTable) -> Vec<MonthRollup> {
    let groups = table.group_by(|order| order.order_month());

    #[cfg(feature = "tracing")]
    tracing::debug!(rows = table.len(), months = groups.len(), "month rollup");

    groups
        .into_iter()
        .map(|(month, rows)| {
            let (total_sales, avg_delivery) = aggregate(
                &rows,
                (Sum(Measure::Sales), Mean(Measure::DeliveryTimeMinutes)),
            );
            MonthRollup {
                month,
                total_sales,
                avg_delivery,
            }
        })
        .collect()
}

/// One row per city present, descending by total sales. Equal totals fall
/// back to ascending city label so repeated calls agree bit for bit.
#[must_use]
pub fn rollup_by_city(table: &OrderTable) -> Vec<CityRollup> {
    let groups = table.group_by(|order| order.city.clone());

    #[cfg(feature = "tracing")]
    tracing::debug!(rows = table.len(), cities = groups.len(), "city rollup");

    let mut out = groups
        .into_iter()
        .map(|(city, rows)| {
            let (total_sales, avg_delivery, order_count) = aggregate(
                &rows,
                (
                    Sum(Measure::Sales),
                    Mean(Measure::DeliveryTimeMinutes),
                    Count,
                ),
            );
            CityRollup {
                city,
                total_sales,
                avg_delivery,
                order_count,
            }
        })
        .collect::<Vec<_>>();

    // groups arrive in ascending city order and the sort is stable
    out.sort_by(|left, right| right.total_sales.total_cmp(&left.total_sales));
    out
}

#[must_use]
pub fn tradeoff_points(rollups: &[CityRollup]) -> Vec<TradeoffPoint> {
    rollups.iter().map(TradeoffPoint::from).collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use ol_table::OrderTable;
    use ol_types::{Order, OrderMonth};

    use super::{rollup_by_city, rollup_by_month, tradeoff_points};

    fn order(id: &str, city: &str, month: u32, sales: f64, delivery: i64) -> Order {
        Order {
            order_id: id.to_owned(),
            product: "Rice".to_owned(),
            order_date: NaiveDate::from_ymd_opt(2024, month, 10)
                .expect("date")
                .and_hms_opt(14, 30, 0)
                .expect("time"),
            city: city.to_owned(),
            quantity: 2,
            sales,
            delivery_time_minutes: delivery,
        }
    }

    fn month(m: u32) -> OrderMonth {
        OrderMonth::of_date(NaiveDate::from_ymd_opt(2024, m, 1).expect("date"))
    }

    #[test]
    fn month_rollup_is_ascending_and_deduplicated() {
        let table = OrderTable::new(vec![
            order("1", "Pune", 3, 100.0, 20),
            order("2", "Pune", 1, 50.0, 30),
            order("3", "Delhi", 3, 25.0, 40),
        ]);
        let rollup = rollup_by_month(&table);

        let months = rollup.iter().map(|row| row.month).collect::<Vec<_>>();
        assert_eq!(months, vec![month(1), month(3)]);
        assert_eq!(rollup[1].total_sales, 125.0);
        assert_eq!(rollup[1].avg_delivery, 30.0);
    }

    #[test]
    fn empty_table_yields_empty_rollups() {
        assert!(rollup_by_month(&OrderTable::empty()).is_empty());
        assert!(rollup_by_city(&OrderTable::empty()).is_empty());
    }

    #[test]
    fn city_rollup_sorts_by_sales_then_city() {
        let table = OrderTable::new(vec![
            order("1", "Pune", 1, 40.0, 20),
            order("2", "Delhi", 1, 90.0, 30),
            order("3", "Agra", 1, 40.0, 50),
            order("4", "Delhi", 2, 10.0, 40),
        ]);
        let rollup = rollup_by_city(&table);

        let cities = rollup
            .iter()
            .map(|row| row.city.as_str())
            .collect::<Vec<_>>();
        assert_eq!(cities, vec!["Delhi", "Agra", "Pune"]);
        assert_eq!(rollup[0].total_sales, 100.0);
        assert_eq!(rollup[0].avg_delivery, 35.0);
        assert_eq!(rollup[0].order_count, 2);
    }

    #[test]
    fn city_rollup_is_reproducible() {
        let table = OrderTable::new(vec![
            order("1", "B", 1, 5.0, 20),
            order("2", "A", 1, 5.0, 20),
            order("3", "C", 1, 5.0, 20),
        ]);
        assert_eq!(rollup_by_city(&table), rollup_by_city(&table));
        assert_eq!(rollup_by_city(&table)[0].city, "A");
    }

    #[test]
    fn tradeoff_projection_copies_city_fields() {
        let table = OrderTable::new(vec![order("1", "Pune", 1, 12.0, 18)]);
        let points = tradeoff_points(&rollup_by_city(&table));
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].city, "Pune");
        assert_eq!(points[0].avg_delivery, 18.0);
        assert_eq!(points[0].total_sales, 12.0);
        assert_eq!(points[0].order_count, 1);
    }
}
