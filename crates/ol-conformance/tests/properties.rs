use std::collections::BTreeSet;

use chrono::{Days, NaiveDate, NaiveTime};
use ol_filter::{DateRange, FilterSpec, filter_orders};
use ol_kpi::{Kpis, compute_kpis};
use ol_rollup::{rollup_by_city, rollup_by_month};
use ol_table::OrderTable;
use ol_types::Order;
use proptest::prelude::*;

const CITIES: [&str; 4] = ["Delhi", "Kolkata", "Mumbai", "Pune"];
const PRODUCTS: [&str; 3] = ["Bread", "Curd", "Soda"];
const WINDOW_DAYS: u64 = 200;

fn base_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("date")
}

fn day_at(offset: u64) -> NaiveDate {
    base_day().checked_add_days(Days::new(offset)).expect("in range")
}

fn order_strategy() -> impl Strategy<Value = Order> {
    (
        0..CITIES.len(),
        0..PRODUCTS.len(),
        0..WINDOW_DAYS,
        0_u32..86_400,
        1_i64..5,
        0_u32..400,
        1_i64..90,
    )
        .prop_map(|(city, product, day, secs, quantity, quarters, delivery)| Order {
            order_id: String::new(),
            product: PRODUCTS[product].to_owned(),
            order_date: day_at(day).and_time(
                NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).expect("time"),
            ),
            city: CITIES[city].to_owned(),
            quantity,
            // quarter units keep every partial sum exact in f64
            sales: f64::from(quarters) * 0.25,
            delivery_time_minutes: delivery,
        })
}

fn table_strategy() -> impl Strategy<Value = OrderTable> {
    prop::collection::vec(order_strategy(), 0..60).prop_map(|orders| {
        orders
            .into_iter()
            .enumerate()
            .map(|(idx, mut order)| {
                order.order_id = format!("ORD{idx}");
                order
            })
            .collect()
    })
}

fn spec_strategy() -> impl Strategy<Value = FilterSpec> {
    (
        0..WINDOW_DAYS,
        0..WINDOW_DAYS,
        prop::sample::subsequence(CITIES.to_vec(), 0..=CITIES.len()),
        prop::option::of(prop::sample::subsequence(
            PRODUCTS.to_vec(),
            0..=PRODUCTS.len(),
        )),
    )
        .prop_map(|(a, b, cities, products)| {
            let range = DateRange::new(day_at(a.min(b)), day_at(a.max(b))).expect("ordered");
            FilterSpec::new(
                range,
                cities.into_iter().map(str::to_owned).collect(),
                products.map(|items| items.into_iter().map(str::to_owned).collect()),
            )
        })
}

fn close(left: f64, right: f64) -> bool {
    (left - right).abs() <= 1e-9 * left.abs().max(1.0)
}

proptest! {
    #[test]
    fn filtered_rows_are_matching_subset(table in table_strategy(), spec in spec_strategy()) {
        let view = filter_orders(&table, &spec);
        prop_assert!(view.len() <= table.len());
        for order in &view {
            prop_assert!(table.orders().contains(order));
            prop_assert!(spec.date_range.contains(order.order_day()));
            prop_assert!(spec.cities.contains(&order.city));
            if let Some(products) = &spec.products {
                prop_assert!(products.contains(&order.product));
            }
        }
        let expected = table.iter().filter(|order| spec.matches(order)).count();
        prop_assert_eq!(view.len(), expected);
    }

    #[test]
    fn filter_is_idempotent(table in table_strategy(), spec in spec_strategy()) {
        let once = filter_orders(&table, &spec);
        let twice = filter_orders(&once, &spec);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn city_rollup_conserves_totals(table in table_strategy(), spec in spec_strategy()) {
        let view = filter_orders(&table, &spec);
        let kpis = compute_kpis(&view);
        let cities = rollup_by_city(&view);

        let city_sales: f64 = cities.iter().map(|row| row.total_sales).sum();
        let city_orders: usize = cities.iter().map(|row| row.order_count).sum();
        prop_assert!(close(kpis.total_sales, city_sales));
        prop_assert_eq!(kpis.order_count, city_orders);

        let labels = cities.iter().map(|row| row.city.as_str()).collect::<BTreeSet<_>>();
        prop_assert_eq!(labels.len(), cities.len());
        let all_present = cities.iter().all(|row| row.order_count > 0);
        prop_assert!(all_present);
        let sorted = cities.windows(2).all(|pair| {
            pair[0].total_sales > pair[1].total_sales
                || (pair[0].total_sales == pair[1].total_sales && pair[0].city < pair[1].city)
        });
        prop_assert!(sorted);
    }

    #[test]
    fn month_rollup_is_strictly_ascending(table in table_strategy(), spec in spec_strategy()) {
        let view = filter_orders(&table, &spec);
        let months = rollup_by_month(&view);
        let ascending = months.windows(2).all(|pair| pair[0].month < pair[1].month);
        prop_assert!(ascending);
        let month_sales: f64 = months.iter().map(|row| row.total_sales).sum();
        prop_assert!(close(compute_kpis(&view).total_sales, month_sales));
    }

    #[test]
    fn empty_city_set_selects_nothing(table in table_strategy(), spec in spec_strategy()) {
        let spec = FilterSpec { cities: BTreeSet::new(), ..spec };
        let view = filter_orders(&table, &spec);
        prop_assert!(view.is_empty());
        prop_assert_eq!(compute_kpis(&view), Kpis::default());
    }

    #[test]
    fn absent_product_filter_equals_all_present_products(
        table in table_strategy(),
        spec in spec_strategy(),
    ) {
        let unfiltered = FilterSpec { products: None, ..spec };
        let date_city_view = filter_orders(&table, &unfiltered);
        let every_product = FilterSpec {
            products: Some(date_city_view.distinct_products()),
            ..unfiltered
        };
        prop_assert_eq!(date_city_view, filter_orders(&table, &every_product));
    }

    #[test]
    fn analysis_is_reproducible(table in table_strategy(), spec in spec_strategy()) {
        let view = filter_orders(&table, &spec);
        prop_assert_eq!(rollup_by_city(&view), rollup_by_city(&view));
        prop_assert_eq!(rollup_by_month(&view), rollup_by_month(&view));
        prop_assert_eq!(compute_kpis(&view), compute_kpis(&view));
    }
}

#[test]
fn kpis_of_empty_table_are_zero() {
    assert_eq!(
        compute_kpis(&OrderTable::empty()),
        Kpis {
            total_sales: 0.0,
            avg_delivery: 0.0,
            order_count: 0,
            mom_delta_pct: 0.0,
        }
    );
}
