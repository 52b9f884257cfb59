#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use ol_runtime::{DecisionAction, IngestLedger, IngestPolicy};
use ol_table::OrderTable;
use ol_types::{Order, OrderColumn, SchemaError};
use thiserror::Error;

const EXPORT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// Month-first forms come before their day-first twins, so an ambiguous
// `03/09/2024` is March 9 and only `31/12/2024` style values read day first.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%m-%d-%Y", "%d-%m-%Y"];

#[derive(Debug, Error)]
pub enum IoError {
    #[error("csv input has no headers")]
    MissingHeaders,
    #[error("row {row} rejected by ingest policy: {error}")]
    RowRejected { row: usize, error: SchemaError },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// A freshly ingested table together with the decisions taken on bad rows.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTable {
    pub table: OrderTable,
    pub ledger: IngestLedger,
}

pub fn read_orders_csv_str(input: &str, policy: &IngestPolicy) -> Result<LoadedTable, IoError> {
    read_orders_csv(input.as_bytes(), policy)
}

pub fn read_orders_csv_path(
    path: impl AsRef<Path>,
    policy: &IngestPolicy,
) -> Result<LoadedTable, IoError> {
    read_orders_csv(File::open(path)?, policy)
}

/// Reads header-named order columns from `input`. Extra columns are ignored;
/// a missing required column fails the whole load regardless of policy.
/// Row numbers in errors and ledger entries are 1-based data rows.
pub fn read_orders_csv<R: Read>(input: R, policy: &IngestPolicy) -> Result<LoadedTable, IoError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    let headers = reader.headers().cloned().map_err(IoError::from)?;
    if headers.is_empty() {
        return Err(IoError::MissingHeaders);
    }
    let positions = locate_columns(&headers)?;

    let mut ledger = IngestLedger::new();
    let mut seen = HashSet::<String>::new();
    let mut orders = Vec::new();

    for (offset, record) in reader.records().enumerate() {
        let record = record?;
        let row = offset + 1;

        let outcome = check_field_count(&record, headers.len(), row)
            .and_then(|()| parse_order(&record, &positions, row))
            .and_then(|order| {
                order.check_invariants()?;
                if seen.contains(&order.order_id) {
                    return Err(SchemaError::DuplicateOrderId {
                        order_id: order.order_id,
                    });
                }
                Ok(order)
            });

        match outcome {
            Ok(order) => {
                seen.insert(order.order_id.clone());
                orders.push(order);
            }
            Err(error) => match policy.decide_row_violation(row, &error, &mut ledger) {
                DecisionAction::Reject => return Err(IoError::RowRejected { row, error }),
                DecisionAction::Drop => {}
            },
        }
    }

    #[cfg(feature = "tracing")]
    {
        tracing::info!(rows = orders.len(), "orders loaded from csv");
        if !ledger.is_empty() {
            tracing::warn!(dropped = ledger.dropped_rows(), "rows dropped during ingest");
        }
    }

    Ok(LoadedTable {
        table: OrderTable::new(orders),
        ledger,
    })
}

pub fn write_orders_csv<W: Write>(table: &OrderTable, output: W) -> Result<(), IoError> {
    let mut writer = WriterBuilder::new().from_writer(output);
    writer.write_record(OrderColumn::ALL.map(OrderColumn::header))?;

    for order in table {
        writer.write_record([
            order.order_id.clone(),
            order.product.clone(),
            order.order_date.format(EXPORT_DATE_FORMAT).to_string(),
            order.city.clone(),
            order.quantity.to_string(),
            order.sales.to_string(),
            order.delivery_time_minutes.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Serializes with exactly the ingest column set and order, so the output
/// reads back into an identical table.
pub fn write_orders_csv_string(table: &OrderTable) -> Result<String, IoError> {
    let mut bytes = Vec::new();
    write_orders_csv(table, &mut bytes)?;
    Ok(String::from_utf8(bytes)?)
}

pub fn write_orders_csv_path(table: &OrderTable, path: impl AsRef<Path>) -> Result<(), IoError> {
    write_orders_csv(table, File::create(path)?)
}

/// Accepts ISO dates and timestamps, RFC 3339 (wall-clock time kept), and
/// `MM/DD/YYYY` forms, falling back to `DD/MM/YYYY` when the leading field
/// cannot be a month. Date-only values land at midnight.
#[must_use]
pub fn parse_order_date(field: &str) -> Option<NaiveDateTime> {
    let trimmed = field.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.naive_local());
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ts);
        }
    }
    DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(trimmed, format)
            .ok()
            .and_then(|day| day.and_hms_opt(0, 0, 0))
    })
}

fn locate_columns(headers: &StringRecord) -> Result<[usize; 7], SchemaError> {
    let mut positions = [0_usize; 7];
    for (slot, column) in positions.iter_mut().zip(OrderColumn::ALL) {
        *slot = headers
            .iter()
            .position(|header| OrderColumn::from_header(header) == Some(column))
            .ok_or(SchemaError::MissingColumn { column })?;
    }
    Ok(positions)
}

fn check_field_count(record: &StringRecord, expected: usize, row: usize) -> Result<(), SchemaError> {
    if record.len() == expected {
        return Ok(());
    }
    Err(SchemaError::FieldCount {
        row,
        expected,
        found: record.len(),
    })
}

fn parse_order(
    record: &StringRecord,
    positions: &[usize; 7],
    row: usize,
) -> Result<Order, SchemaError> {
    let field = |column: OrderColumn| field_at(record, positions, column);
    let non_coercible = |column: OrderColumn| SchemaError::NonCoercible {
        row,
        column,
        value: field(column).to_owned(),
    };

    let order_date = parse_order_date(field(OrderColumn::OrderDate))
        .ok_or_else(|| non_coercible(OrderColumn::OrderDate))?;
    let quantity = parse_whole(field(OrderColumn::Quantity))
        .ok_or_else(|| non_coercible(OrderColumn::Quantity))?;
    let sales = field(OrderColumn::Sales)
        .parse::<f64>()
        .map_err(|_| non_coercible(OrderColumn::Sales))?;
    let delivery_time_minutes = parse_whole(field(OrderColumn::DeliveryTimeMinutes))
        .ok_or_else(|| non_coercible(OrderColumn::DeliveryTimeMinutes))?;

    Ok(Order {
        order_id: field(OrderColumn::OrderId).to_owned(),
        product: field(OrderColumn::Product).to_owned(),
        order_date,
        city: field(OrderColumn::City).to_owned(),
        quantity,
        sales,
        delivery_time_minutes,
    })
}

fn field_at<'r>(record: &'r StringRecord, positions: &[usize; 7], column: OrderColumn) -> &'r str {
    record.get(positions[column as usize]).unwrap_or_default()
}

/// Integer, or a float with no fractional part (`"3.0"` from spreadsheet exports).
fn parse_whole(field: &str) -> Option<i64> {
    if let Ok(value) = field.parse::<i64>() {
        return Some(value);
    }
    let value = field.parse::<f64>().ok()?;
    if !value.is_finite() || value != value.trunc() {
        return None;
    }
    if value < i64::MIN as f64 || value > i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}
