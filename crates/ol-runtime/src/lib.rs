#![forbid(unsafe_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use ol_types::SchemaError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeMode {
    #[default]
    Strict,
    Hardened,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    /// The load fails at this row.
    Reject,
    /// The row is left out of the table and the load continues.
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    NonCoercible,
    InvariantBreach,
    DuplicateId,
}

impl IssueKind {
    #[must_use]
    pub fn of(error: &SchemaError) -> Self {
        match error {
            SchemaError::MissingColumn { .. }
            | SchemaError::NonCoercible { .. }
            | SchemaError::FieldCount { .. } => Self::NonCoercible,
            SchemaError::DuplicateOrderId { .. } => Self::DuplicateId,
            SchemaError::EmptyOrderId
            | SchemaError::InvalidSales { .. }
            | SchemaError::NonPositiveQuantity { .. }
            | SchemaError::NonPositiveDeliveryTime { .. } => Self::InvariantBreach,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestIssue {
    pub kind: IssueKind,
    pub row: usize,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub ts_unix_ms: u64,
    pub mode: RuntimeMode,
    pub action: DecisionAction,
    pub issue: IngestIssue,
}

/// Append-only log of every row-level decision taken during one load.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestLedger {
    records: Vec<DecisionRecord>,
}

impl IngestLedger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: DecisionRecord) {
        self.records.push(record);
    }

    #[must_use]
    pub fn records(&self) -> &[DecisionRecord] {
        &self.records
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn dropped_rows(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.action == DecisionAction::Drop)
            .count()
    }

    #[must_use]
    pub fn render_plain(&self) -> String {
        self.records
            .iter()
            .map(|record| {
                format!(
                    "row {} {:?}/{:?}: {}",
                    record.issue.row, record.issue.kind, record.action, record.issue.detail
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// How ingestion treats rows that violate the order schema.
///
/// Strict rejects the load on the first bad row. Hardened drops bad rows and
/// records them, up to an optional cap after which the load is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestPolicy {
    #[serde(default)]
    pub mode: RuntimeMode,
    #[serde(default)]
    pub max_dropped_rows: Option<usize>,
}

impl IngestPolicy {
    #[must_use]
    pub fn strict() -> Self {
        Self {
            mode: RuntimeMode::Strict,
            max_dropped_rows: None,
        }
    }

    #[must_use]
    pub fn hardened(max_dropped_rows: Option<usize>) -> Self {
        Self {
            mode: RuntimeMode::Hardened,
            max_dropped_rows,
        }
    }

    pub fn decide_row_violation(
        &self,
        row: usize,
        error: &SchemaError,
        ledger: &mut IngestLedger,
    ) -> DecisionAction {
        let action = match self.mode {
            RuntimeMode::Strict => DecisionAction::Reject,
            RuntimeMode::Hardened => {
                let cap = self.max_dropped_rows.unwrap_or(usize::MAX);
                if ledger.dropped_rows() >= cap {
                    DecisionAction::Reject
                } else {
                    DecisionAction::Drop
                }
            }
        };

        #[cfg(feature = "tracing")]
        tracing::warn!(row, ?action, mode = ?self.mode, %error, "row violates order schema");

        ledger.push(DecisionRecord {
            ts_unix_ms: now_unix_ms().unwrap_or_default(),
            mode: self.mode,
            action,
            issue: IngestIssue {
                kind: IssueKind::of(error),
                row,
                detail: error.to_string(),
            },
        });
        action
    }
}

impl Default for IngestPolicy {
    fn default() -> Self {
        Self::strict()
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("system clock is before UNIX_EPOCH")]
    ClockSkew,
}

fn now_unix_ms() -> Result<u64, RuntimeError> {
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| RuntimeError::ClockSkew)?
        .as_millis();
    Ok(ms as u64)
}
