use std::collections::BTreeSet;
use std::fs;

use chrono::NaiveDate;
use orderlens::{
    DashboardConfig, FilterSpec, IngestPolicy, OrderlensError, Session, SynthConfig,
    analyze_range, load_table, read_orders_csv_path, write_orders_csv_path,
};

const ORDERS_CSV: &str = "\
Order_ID,Product,Order_Date,City,Quantity,Sales,Delivery_Time_min
ORD1,Milk,2024-01-05 09:00:00,Pune,2,500.0,20
ORD2,Bread,2024-01-20 18:30:00,Delhi,1,500.0,40
ORD3,Milk,2024-02-02 07:15:00,Pune,3,900.0,25
ORD4,Eggs,2024-02-29 23:59:00,Delhi,1,600.0,35
";

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("date")
}

fn cities(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| (*name).to_owned()).collect()
}

#[test]
fn csv_config_drives_full_analysis() {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv_path = dir.path().join("orders.csv");
    fs::write(&csv_path, ORDERS_CSV).expect("write csv");

    let config = DashboardConfig::from_yaml_str(&format!("csv_path: {}\n", csv_path.display()))
        .expect("config");
    let loaded = load_table(&config).expect("load");
    assert_eq!(loaded.table.len(), 4);

    let analysis = analyze_range(
        &loaded.table,
        day(2024, 1, 1),
        day(2024, 2, 29),
        &cities(&["Delhi", "Pune"]),
        None,
    )
    .expect("analysis");

    assert_eq!(analysis.kpis.order_count, 4);
    assert_eq!(analysis.kpis.total_sales, 2500.0);
    assert_eq!(analysis.kpis.avg_delivery, 30.0);
    assert_eq!(analysis.kpis.mom_delta_pct, 50.0);
    assert_eq!(analysis.cities[0].city, "Pune");
    assert_eq!(analysis.cities[1].city, "Delhi");
    assert_eq!(analysis.monthly.len(), 2);
}

#[test]
fn exported_selection_reloads_identically() {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv_path = dir.path().join("orders.csv");
    let export_path = dir.path().join("filtered.csv");
    fs::write(&csv_path, ORDERS_CSV).expect("write csv");

    let loaded = read_orders_csv_path(&csv_path, &IngestPolicy::strict()).expect("load");
    let analysis = analyze_range(
        &loaded.table,
        day(2024, 2, 1),
        day(2024, 2, 29),
        &cities(&["Delhi", "Pune"]),
        Some(&cities(&["Eggs", "Milk"])),
    )
    .expect("analysis");
    write_orders_csv_path(&analysis.filtered, &export_path).expect("export");

    let reloaded = read_orders_csv_path(&export_path, &IngestPolicy::strict()).expect("reload");
    assert_eq!(reloaded.table, analysis.filtered);
    let ids = reloaded
        .table
        .iter()
        .map(|order| order.order_id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, ["ORD3", "ORD4"]);
}

#[test]
fn strict_config_rejects_bad_rows_and_hardened_drops_them() {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv_path = dir.path().join("orders.csv");
    fs::write(
        &csv_path,
        format!("{ORDERS_CSV}ORD5,Milk,not-a-date,Pune,1,10.0,20\n"),
    )
    .expect("write csv");

    let mut config = DashboardConfig {
        csv_path: Some(csv_path),
        ..DashboardConfig::default()
    };
    assert!(matches!(load_table(&config), Err(OrderlensError::Io(_))));

    config.ingest = IngestPolicy::hardened(Some(1));
    let loaded = load_table(&config).expect("hardened load");
    assert_eq!(loaded.table.len(), 4);
    assert_eq!(loaded.ledger.dropped_rows(), 1);
}

#[test]
fn session_memoises_synthetic_analysis() {
    let config = DashboardConfig {
        synthetic: SynthConfig {
            rows: 300,
            ..SynthConfig::default()
        },
        ..DashboardConfig::default()
    };
    let table = load_table(&config).expect("generate").table;
    let spec = FilterSpec::covering(&table).expect("non-empty");

    let mut session = Session::new(table);
    let first = session.analyze(&spec);
    let second = session.analyze(&spec);
    assert_eq!(first.kpis.order_count, 300);
    assert_eq!(first, second);
    assert_eq!(session.cached_selections(), 1);
}

#[test]
fn config_file_round_trips_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("dashboard.yaml");
    fs::write(
        &path,
        "ingest:\n  mode: hardened\n  max_dropped_rows: 3\nsynthetic:\n  rows: 10\n  seed: 7\n",
    )
    .expect("write yaml");

    let config = DashboardConfig::from_path(&path).expect("config");
    assert_eq!(config.ingest, IngestPolicy::hardened(Some(3)));
    assert_eq!(config.synthetic.seed, 7);
    assert_eq!(load_table(&config).expect("generate").table.len(), 10);
}
