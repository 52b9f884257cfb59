use std::fs;
use std::path::{Path, PathBuf};

use ol_io::{LoadedTable, read_orders_csv_path};
use ol_runtime::{IngestLedger, IngestPolicy};
use ol_synth::{SynthConfig, generate_orders};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::OrderlensError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Where the order table comes from and how bad rows are treated.
///
/// With no `csv_path` the table is generated from `synthetic`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub csv_path: Option<PathBuf>,
    pub ingest: IngestPolicy,
    pub synthetic: SynthConfig,
    pub export_path: Option<PathBuf>,
}

impl DashboardConfig {
    pub fn from_yaml_str(body: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(body)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_yaml_str(&fs::read_to_string(path)?)
    }
}

pub fn load_table(config: &DashboardConfig) -> Result<LoadedTable, OrderlensError> {
    match &config.csv_path {
        Some(path) => Ok(read_orders_csv_path(path, &config.ingest)?),
        None => Ok(LoadedTable {
            table: generate_orders(&config.synthetic)?,
            ledger: IngestLedger::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use ol_runtime::{IngestPolicy, RuntimeMode};

    use super::{DashboardConfig, load_table};

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = DashboardConfig::from_yaml_str("{}").expect("parse");
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.ingest, IngestPolicy::strict());
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let config = DashboardConfig::from_yaml_str(
            "csv_path: data/orders.csv\ningest:\n  mode: hardened\nsynthetic:\n  rows: 50\n",
        )
        .expect("parse");
        assert_eq!(config.csv_path, Some(PathBuf::from("data/orders.csv")));
        assert_eq!(config.ingest.mode, RuntimeMode::Hardened);
        assert_eq!(config.ingest.max_dropped_rows, None);
        assert_eq!(config.synthetic.rows, 50);
        assert_eq!(config.synthetic.seed, 42);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(DashboardConfig::from_yaml_str("ingest:\n  mode: lenient\n").is_err());
    }

    #[test]
    fn synthetic_source_is_used_without_csv_path() {
        let mut config = DashboardConfig::default();
        config.synthetic.rows = 25;
        let loaded = load_table(&config).expect("generate");
        assert_eq!(loaded.table.len(), 25);
        assert!(loaded.ledger.is_empty());
    }
}
