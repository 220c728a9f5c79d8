//! Turns enriched rows into a typed, deduplicated, outlier-filtered table.
//!
//! Steps run in a fixed order: empty-key filter, consistency filter,
//! last-row-wins deduplication by natural key, numeric coercion, then the
//! outlier rules one after another on the survivors.

pub mod schema;
pub mod stats;
pub mod summary;

pub use schema::{ConsistencyPair, NumericColumn, OutlierRule, TableSchema};
pub use summary::{summarize, Segment, SegmentSummary};

use crate::common::error::{Result, ScraperError};
use crate::common::types::{EnrichedRow, Fields};
use crate::observability::metrics::{self, MetricName};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument};

/// One typed value of the normalized table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Rendering used by the delimited output; missing is the empty string.
    pub fn render(&self) -> String {
        match self {
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Missing => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub key: String,
    pub cells: BTreeMap<String, Cell>,
}

impl NormalizedRow {
    pub fn number(&self, column: &str) -> Option<f64> {
        self.cells.get(column).and_then(Cell::as_number)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.cells.get(column).and_then(Cell::as_text)
    }

    pub fn cell(&self, column: &str) -> &Cell {
        self.cells.get(column).unwrap_or(&Cell::Missing)
    }
}

/// Rows are ordered by natural key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTable {
    pub key_column: String,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub rows: Vec<NormalizedRow>,
}

impl NormalizedTable {
    /// Key column, then numeric columns in schema order, then the rest sorted.
    pub fn header(&self) -> Vec<String> {
        std::iter::once(self.key_column.clone())
            .chain(self.numeric_columns.iter().cloned())
            .chain(self.categorical_columns.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&NormalizedRow> {
        self.rows.iter().find(|r| r.key == key)
    }

    /// Present values of a numeric column, in row order.
    pub fn numbers(&self, column: &str) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.number(column)).collect()
    }
}

pub struct Normalizer {
    schema: TableSchema,
}

impl Normalizer {
    pub fn new(schema: TableSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    #[instrument(skip_all, fields(rows = rows.len(), key = %self.schema.key_column))]
    pub fn normalize(&self, rows: &[EnrichedRow]) -> Result<NormalizedTable> {
        metrics::increment_by(MetricName::NormalizeRowsIn, rows.len() as u64);
        let key_column = self.schema.key_column.as_str();

        let keyed: Vec<(&str, &Fields)> = rows
            .iter()
            .filter_map(|row| {
                let key = row.value(key_column)?.trim();
                (!key.is_empty()).then_some((key, &row.fields))
            })
            .collect();
        report_dropped("empty_key", rows.len(), keyed.len());

        let consistent: Vec<(&str, &Fields)> = keyed
            .iter()
            .copied()
            .filter(|(_, fields)| self.is_consistent(fields))
            .collect();
        report_dropped("consistency", keyed.len(), consistent.len());

        // later rows overwrite earlier ones; BTreeMap keeps keys ordered
        let mut by_key: BTreeMap<&str, &Fields> = BTreeMap::new();
        for &(key, fields) in &consistent {
            by_key.insert(key, fields);
        }
        report_dropped("duplicate_key", consistent.len(), by_key.len());

        let numeric_columns: Vec<String> = self
            .schema
            .numeric_columns
            .iter()
            .map(|c| c.name.clone())
            .filter(|c| c != key_column && !self.schema.is_dropped(c))
            .collect();
        let categorical_columns: Vec<String> = by_key
            .values()
            .flat_map(|fields| fields.keys())
            .filter(|name| {
                name.as_str() != key_column
                    && !self.schema.is_dropped(name)
                    && self.schema.numeric(name).is_none()
            })
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut table_rows = Vec::with_capacity(by_key.len());
        for (key, fields) in by_key {
            table_rows.push(self.coerce_row(key, fields, &numeric_columns, &categorical_columns)?);
        }

        for rule in &self.schema.outlier_rules {
            let before = table_rows.len();
            table_rows = apply_outlier_rule(table_rows, rule);
            report_dropped("outlier", before, table_rows.len());
        }

        metrics::increment_by(MetricName::NormalizeRowsOut, table_rows.len() as u64);
        info!(rows_in = rows.len(), rows_out = table_rows.len(), "normalized table");
        Ok(NormalizedTable {
            key_column: key_column.to_string(),
            numeric_columns,
            categorical_columns,
            rows: table_rows,
        })
    }

    fn is_consistent(&self, fields: &Fields) -> bool {
        self.schema.consistency.iter().all(|pair| {
            let left = fields.get(&pair.left).and_then(|v| v.as_deref());
            let right = fields.get(&pair.right).and_then(|v| v.as_deref());
            match (left, right) {
                (Some(l), Some(r)) => l.trim() == r.trim(),
                _ => true,
            }
        })
    }

    fn coerce_row(
        &self,
        key: &str,
        fields: &Fields,
        numeric_columns: &[String],
        categorical_columns: &[String],
    ) -> Result<NormalizedRow> {
        let mut cells = BTreeMap::new();
        for column in numeric_columns {
            let raw = fields.get(column).and_then(|v| v.as_deref()).map(str::trim);
            let cell = match raw {
                None | Some("") => Cell::Missing,
                Some(text) => match text.parse::<f64>() {
                    Ok(n) if n.is_finite() => Cell::Number(n),
                    _ => {
                        let required = self.schema.numeric(column).map_or(true, |c| c.required);
                        if required {
                            return Err(ScraperError::Coercion {
                                column: column.clone(),
                                key: key.to_string(),
                                value: text.to_string(),
                            });
                        }
                        debug!(column = %column, key, value = text, "optional column not numeric");
                        Cell::Missing
                    }
                },
            };
            cells.insert(column.clone(), cell);
        }
        for column in categorical_columns {
            let cell = match fields.get(column).and_then(|v| v.as_deref()) {
                Some(text) if !text.trim().is_empty() => Cell::Text(text.trim().to_string()),
                _ => Cell::Missing,
            };
            cells.insert(column.clone(), cell);
        }
        Ok(NormalizedRow {
            key: key.to_string(),
            cells,
        })
    }
}

/// Keep rows at or below `mean(column) + k * std(spread column)`. Rows with
/// no value in `column` are kept; with fewer than two values the rule is
/// skipped.
pub fn apply_outlier_rule(rows: Vec<NormalizedRow>, rule: &OutlierRule) -> Vec<NormalizedRow> {
    let values: Vec<f64> = rows.iter().filter_map(|r| r.number(&rule.column)).collect();
    let spread: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.number(rule.spread_column()))
        .collect();
    let (Some(mean), Some(std)) = (stats::mean(&values), stats::sample_std(&spread)) else {
        debug!(column = %rule.column, "too few values, outlier rule skipped");
        return rows;
    };
    if values.len() < 2 {
        return rows;
    }
    let threshold = mean + rule.k * std;
    debug!(column = %rule.column, spread_from = rule.spread_column(), mean, std, threshold, "outlier threshold");
    rows.into_iter()
        .filter(|r| r.number(&rule.column).map_or(true, |v| v <= threshold))
        .collect()
}

fn report_dropped(step: &'static str, before: usize, after: usize) {
    let dropped = before.saturating_sub(after);
    if dropped > 0 {
        info!(step, dropped, remaining = after, "rows dropped");
        metrics::rows_dropped(step, dropped);
    }
}
