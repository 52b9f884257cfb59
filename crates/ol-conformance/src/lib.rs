#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use ol_filter::filter;
use ol_kpi::{Kpis, compute_kpis};
use ol_rollup::{CityRollup, MonthRollup, rollup_by_city, rollup_by_month};
use ol_table::OrderTable;
use ol_types::Order;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub fixture_root: PathBuf,
    pub tolerance: f64,
}

impl HarnessConfig {
    #[must_use]
    pub fn default_paths() -> Self {
        Self {
            fixture_root: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures"),
            tolerance: 1e-9,
        }
    }

    #[must_use]
    pub fn case_fixture_root(&self) -> PathBuf {
        self.fixture_root.join("cases")
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureOperation {
    Filter,
    ComputeKpis,
    RollupByMonth,
    RollupByCity,
}

/// Filter parameters as raw dates, so fixtures can describe inverted ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureFilter {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub cities: BTreeSet<String>,
    #[serde(default)]
    pub products: Option<BTreeSet<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFixture {
    pub case_id: String,
    pub operation: FixtureOperation,
    pub orders: Vec<Order>,
    #[serde(default)]
    pub filter: Option<FixtureFilter>,
    #[serde(default)]
    pub expected_error: Option<String>,
    #[serde(default)]
    pub expected_ids: Option<Vec<String>>,
    #[serde(default)]
    pub expected_kpis: Option<Kpis>,
    #[serde(default)]
    pub expected_months: Option<Vec<MonthRollup>>,
    #[serde(default)]
    pub expected_cities: Option<Vec<CityRollup>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub case_id: String,
    pub operation: FixtureOperation,
    pub status: CaseStatus,
    pub mismatch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub suite: String,
    pub fixture_count: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<CaseResult>,
}

impl SuiteReport {
    #[must_use]
    pub fn is_green(&self) -> bool {
        self.failed == 0 && self.fixture_count > 0
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("fixture {case_id} is malformed: {detail}")]
    FixtureFormat { case_id: String, detail: String },
}

pub fn run_fixture_suite(config: &HarnessConfig) -> Result<SuiteReport, HarnessError> {
    let fixtures = load_fixtures(&config.case_fixture_root())?;
    let mut results = Vec::with_capacity(fixtures.len());
    for fixture in &fixtures {
        results.push(run_fixture(fixture, config.tolerance)?);
    }

    let passed = results
        .iter()
        .filter(|result| result.status == CaseStatus::Pass)
        .count();
    Ok(SuiteReport {
        suite: "order_cases".to_owned(),
        fixture_count: results.len(),
        passed,
        failed: results.len() - passed,
        results,
    })
}

pub fn run_fixture(fixture: &OrderFixture, tolerance: f64) -> Result<CaseResult, HarnessError> {
    let mismatch = evaluate(fixture, tolerance)?;
    Ok(CaseResult {
        case_id: fixture.case_id.clone(),
        operation: fixture.operation,
        status: if mismatch.is_none() {
            CaseStatus::Pass
        } else {
            CaseStatus::Fail
        },
        mismatch,
    })
}

fn evaluate(fixture: &OrderFixture, tolerance: f64) -> Result<Option<String>, HarnessError> {
    let table = OrderTable::new(fixture.orders.clone());
    let view = match &fixture.filter {
        None => table,
        Some(spec) => match filter(
            &table,
            spec.start,
            spec.end,
            &spec.cities,
            spec.products.as_ref(),
        ) {
            Ok(view) => view,
            Err(err) => {
                let actual = err.to_string();
                return Ok(match &fixture.expected_error {
                    Some(expected) if *expected == actual => None,
                    Some(expected) => Some(format!("expected error {expected:?}, got {actual:?}")),
                    None => Some(format!("unexpected error {actual:?}")),
                });
            }
        },
    };

    if let Some(expected) = &fixture.expected_error {
        return Ok(Some(format!("expected error {expected:?}, operation succeeded")));
    }

    let missing = |what: &str| HarnessError::FixtureFormat {
        case_id: fixture.case_id.clone(),
        detail: format!("operation needs {what}"),
    };

    let mismatch = match fixture.operation {
        FixtureOperation::Filter => {
            let expected = fixture
                .expected_ids
                .as_ref()
                .ok_or_else(|| missing("expected_ids"))?;
            let actual = view
                .iter()
                .map(|order| order.order_id.clone())
                .collect::<Vec<_>>();
            (actual != *expected).then(|| format!("ids: expected {expected:?}, got {actual:?}"))
        }
        FixtureOperation::ComputeKpis => {
            let expected = fixture
                .expected_kpis
                .ok_or_else(|| missing("expected_kpis"))?;
            compare_kpis(&expected, &compute_kpis(&view), tolerance)
        }
        FixtureOperation::RollupByMonth => {
            let expected = fixture
                .expected_months
                .as_ref()
                .ok_or_else(|| missing("expected_months"))?;
            compare_months(expected, &rollup_by_month(&view), tolerance)
        }
        FixtureOperation::RollupByCity => {
            let expected = fixture
                .expected_cities
                .as_ref()
                .ok_or_else(|| missing("expected_cities"))?;
            compare_cities(expected, &rollup_by_city(&view), tolerance)
        }
    };
    Ok(mismatch)
}

fn close(expected: f64, actual: f64, tolerance: f64) -> bool {
    (expected - actual).abs() <= tolerance * expected.abs().max(1.0)
}

fn compare_kpis(expected: &Kpis, actual: &Kpis, tolerance: f64) -> Option<String> {
    let same = close(expected.total_sales, actual.total_sales, tolerance)
        && close(expected.avg_delivery, actual.avg_delivery, tolerance)
        && expected.order_count == actual.order_count
        && close(expected.mom_delta_pct, actual.mom_delta_pct, tolerance);
    (!same).then(|| format!("kpis: expected {expected:?}, got {actual:?}"))
}

fn compare_months(
    expected: &[MonthRollup],
    actual: &[MonthRollup],
    tolerance: f64,
) -> Option<String> {
    let same = expected.len() == actual.len()
        && expected.iter().zip(actual).all(|(e, a)| {
            e.month == a.month
                && close(e.total_sales, a.total_sales, tolerance)
                && close(e.avg_delivery, a.avg_delivery, tolerance)
        });
    (!same).then(|| format!("months: expected {expected:?}, got {actual:?}"))
}

fn compare_cities(
    expected: &[CityRollup],
    actual: &[CityRollup],
    tolerance: f64,
) -> Option<String> {
    let same = expected.len() == actual.len()
        && expected.iter().zip(actual).all(|(e, a)| {
            e.city == a.city
                && e.order_count == a.order_count
                && close(e.total_sales, a.total_sales, tolerance)
                && close(e.avg_delivery, a.avg_delivery, tolerance)
        });
    (!same).then(|| format!("cities: expected {expected:?}, got {actual:?}"))
}

/// Loads every `*.json` fixture under `root`, ordered by case id.
pub fn load_fixtures(root: &Path) -> Result<Vec<OrderFixture>, HarnessError> {
    let mut fixtures = Vec::new();
    for path in list_fixture_files(root)? {
        let body = fs::read_to_string(&path)?;
        fixtures.push(serde_json::from_str::<OrderFixture>(&body)?);
    }
    fixtures.sort_by(|a, b| a.case_id.cmp(&b.case_id));
    Ok(fixtures)
}

fn list_fixture_files(root: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(current)? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
