#![forbid(unsafe_code)]

use ol_rollup::rollup_by_month;
use ol_table::{Count, Mean, Measure, OrderTable, Sum, aggregate};
use ol_types::OrderMonth;
use serde::{Deserialize, Serialize};

/// Headline numbers for a filtered view. Every field is defined (zero) for an
/// empty view.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Kpis {
    pub total_sales: f64,
    pub avg_delivery: f64,
    pub order_count: usize,
    pub mom_delta_pct: f64,
}

/// The two most recent months present in a view and their sales totals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MomComparison {
    pub last_month: Option<OrderMonth>,
    pub prev_month: Option<OrderMonth>,
    pub last_sales: f64,
    pub prev_sales: f64,
}

impl MomComparison {
    /// Percentage change from `prev_sales` to `last_sales`; `0.0` unless
    /// the previous month has positive sales.
    #[must_use]
    pub fn delta_pct(&self) -> f64 {
        if self.prev_sales > 0.0 {
            (self.last_sales - self.prev_sales) / self.prev_sales * 100.0
        } else {
            0.0
        }
    }
}

/// Compares the latest month present in `table` with the month present just
/// before it. Gaps between them are skipped, not treated as zero months.
#[must_use]
pub fn month_over_month(table: &OrderTable) -> MomComparison {
    let monthly = rollup_by_month(table);
    let mut recent = monthly.iter().rev();
    let last = recent.next();
    let prev = recent.next();

    MomComparison {
        last_month: last.map(|row| row.month),
        prev_month: prev.map(|row| row.month),
        last_sales: last.map_or(0.0, |row| row.total_sales),
        prev_sales: prev.map_or(0.0, |row| row.total_sales),
    }
}

#[must_use]
pub fn compute_kpis(table: &OrderTable) -> Kpis {
    let rows = table.iter().collect::<Vec<_>>();
    let (total_sales, avg_delivery, order_count) = aggregate(
        &rows,
        (
            Sum(Measure::Sales),
            Mean(Measure::DeliveryTimeMinutes),
            Count,
        ),
    );

    Kpis {
        total_sales,
        avg_delivery,
        order_count,
        mom_delta_pct: month_over_month(table).delta_pct(),
    }
}
