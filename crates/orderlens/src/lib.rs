#![forbid(unsafe_code)]

pub mod analysis;
pub mod config;
pub mod session;

pub use analysis::{Analysis, AnalysisSummary, analyze, analyze_range};
pub use config::{ConfigError, DashboardConfig, load_table};
pub use ol_filter::{DateRange, FilterError, FilterSpec, filter, filter_orders};
pub use ol_io::{
    IoError, LoadedTable, read_orders_csv, read_orders_csv_path, read_orders_csv_str,
    write_orders_csv, write_orders_csv_path, write_orders_csv_string,
};
pub use ol_kpi::{Kpis, MomComparison, compute_kpis, month_over_month};
pub use ol_rollup::{
    CityRollup, MonthRollup, TradeoffPoint, rollup_by_city, rollup_by_month, tradeoff_points,
};
pub use ol_runtime::{DecisionAction, IngestLedger, IngestPolicy, RuntimeMode};
pub use ol_synth::{SynthConfig, SynthError, generate_orders};
pub use ol_table::OrderTable;
pub use ol_types::{Order, OrderColumn, OrderMonth, SchemaError};
pub use session::Session;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderlensError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Synth(#[from] SynthError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
