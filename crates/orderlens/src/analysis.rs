use std::collections::BTreeSet;
use std::fmt::Write as _;

use chrono::NaiveDate;
use ol_filter::{DateRange, FilterError, FilterSpec, filter_orders};
use ol_kpi::{Kpis, MomComparison, compute_kpis, month_over_month};
use ol_rollup::{
    CityRollup, MonthRollup, TradeoffPoint, rollup_by_city, rollup_by_month, tradeoff_points,
};
use ol_table::OrderTable;
use serde::Serialize;

const RECENT_ROWS: usize = 10;

/// Everything the dashboard shows for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub spec: FilterSpec,
    pub filtered: OrderTable,
    pub kpis: Kpis,
    pub mom: MomComparison,
    pub monthly: Vec<MonthRollup>,
    pub cities: Vec<CityRollup>,
    pub tradeoff: Vec<TradeoffPoint>,
}

/// `Analysis` without the filtered rows, for compact JSON output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary<'a> {
    pub spec: &'a FilterSpec,
    pub filtered_rows: usize,
    pub kpis: &'a Kpis,
    pub mom: &'a MomComparison,
    pub monthly: &'a [MonthRollup],
    pub cities: &'a [CityRollup],
}

#[must_use]
pub fn analyze(table: &OrderTable, spec: &FilterSpec) -> Analysis {
    build(spec.clone(), filter_orders(table, spec))
}

/// Same as [`analyze`] but from raw filter parameters, failing on an
/// inverted date range.
pub fn analyze_range(
    table: &OrderTable,
    start: NaiveDate,
    end: NaiveDate,
    cities: &BTreeSet<String>,
    products: Option<&BTreeSet<String>>,
) -> Result<Analysis, FilterError> {
    let spec = FilterSpec::new(
        DateRange::new(start, end)?,
        cities.clone(),
        products.cloned(),
    );
    let filtered = filter_orders(table, &spec);
    Ok(build(spec, filtered))
}

fn build(spec: FilterSpec, filtered: OrderTable) -> Analysis {
    let kpis = compute_kpis(&filtered);
    let mom = month_over_month(&filtered);
    let monthly = rollup_by_month(&filtered);
    let cities = rollup_by_city(&filtered);
    let tradeoff = tradeoff_points(&cities);
    Analysis {
        spec,
        filtered,
        kpis,
        mom,
        monthly,
        cities,
        tradeoff,
    }
}

impl Analysis {
    #[must_use]
    pub fn summary(&self) -> AnalysisSummary<'_> {
        AnalysisSummary {
            spec: &self.spec,
            filtered_rows: self.filtered.len(),
            kpis: &self.kpis,
            mom: &self.mom,
            monthly: &self.monthly,
            cities: &self.cities,
        }
    }

    /// The newest `limit` filtered orders, newest first.
    #[must_use]
    pub fn latest_orders(&self, limit: usize) -> OrderTable {
        self.filtered
            .sorted_by_date_desc()
            .into_orders()
            .into_iter()
            .take(limit)
            .collect()
    }

    #[must_use]
    pub fn render_plain(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "range {} .. {}  cities={}  products={}",
            self.spec.date_range.start(),
            self.spec.date_range.end(),
            self.spec.cities.len(),
            self.spec
                .products
                .as_ref()
                .map_or_else(|| "all".to_owned(), |set| set.len().to_string())
        );
        let _ = writeln!(
            out,
            "total_sales={}  avg_delivery_min={:.1}  orders={}  mom_delta={:.1}%",
            group_thousands(self.kpis.total_sales),
            self.kpis.avg_delivery,
            self.kpis.order_count,
            self.kpis.mom_delta_pct
        );

        if self.monthly.is_empty() {
            out.push_str("no data for selected filters\n");
            return out;
        }

        out.push_str("\nmonth     sales          avg_delivery\n");
        for row in &self.monthly {
            let _ = writeln!(
                out,
                "{}   {:>12}   {:>6.1}",
                row.month,
                group_thousands(row.total_sales),
                row.avg_delivery
            );
        }

        out.push_str("\ncity          sales          avg_delivery  orders\n");
        for row in &self.cities {
            let _ = writeln!(
                out,
                "{:<12}  {:>12}   {:>6.1}        {}",
                row.city,
                group_thousands(row.total_sales),
                row.avg_delivery,
                row.order_count
            );
        }

        let _ = writeln!(out, "\nlatest orders (of {})", self.filtered.len());
        for order in &self.latest_orders(RECENT_ROWS) {
            let _ = writeln!(
                out,
                "{}  {}  {:<12}  {:<16}  qty={}  sales={:.2}  delivery={}m",
                order.order_date.format("%Y-%m-%d %H:%M"),
                order.order_id,
                order.city,
                order.product,
                order.quantity,
                order.sales,
                order.delivery_time_minutes
            );
        }
        out
    }
}

/// Rounds to whole units and inserts `,` between thousands.
fn group_thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3 + 1);
    for (idx, ch) in rounded.chars().enumerate() {
        if idx > 0 && (rounded.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0.0 && rounded != "0" {
        grouped.insert(0, '-');
    }
    grouped
}
