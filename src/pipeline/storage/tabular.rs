//! Delimited files at the pipeline boundaries.
//!
//! Row files carry a header that is the sorted union of every row's field
//! names, one record per row in input order. A missing value is written as
//! an empty cell and read back as missing.

use crate::common::constants::FIELD_DETAILS_PATH;
use crate::common::error::Result;
use crate::common::types::{EnrichedRow, Fields, ListingRow};
use crate::pipeline::processing::normalize::{Cell, NormalizedRow, NormalizedTable, TableSchema};
use csv::{ReaderBuilder, Writer};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Write field maps with a sorted-union header. Returns the record count.
pub fn write_field_rows<'a, I>(path: &Path, rows: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a Fields>,
    I::IntoIter: Clone,
{
    let rows = rows.into_iter();
    let header: Vec<&str> = rows
        .clone()
        .flat_map(|fields| fields.keys().map(String::as_str))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    ensure_parent(path)?;
    let mut writer = Writer::from_path(path)?;
    writer.write_record(&header)?;
    let mut count = 0;
    for fields in rows {
        let record = header
            .iter()
            .map(|name| fields.get(*name).and_then(|v| v.as_deref()).unwrap_or(""));
        writer.write_record(record)?;
        count += 1;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = count, columns = header.len(), "wrote rows");
    Ok(count)
}

pub fn write_listing(path: &Path, rows: &[ListingRow]) -> Result<usize> {
    write_field_rows(path, rows.iter().map(|r| &r.fields))
}

pub fn write_enriched(path: &Path, rows: &[EnrichedRow]) -> Result<usize> {
    write_field_rows(path, rows.iter().map(|r| &r.fields))
}

/// Read field maps. With `head = Some(n)` only the first `n + 1` records
/// are kept.
pub fn read_field_rows(path: &Path, head: Option<usize>) -> Result<Vec<Fields>> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let fields: Fields = header
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let value = record.get(i).filter(|v| !v.is_empty()).map(str::to_string);
                (name.clone(), value)
            })
            .collect();
        rows.push(fields);
        if head.is_some_and(|n| rows.len() > n) {
            debug!(head = ?head, "stopping at head limit");
            break;
        }
    }
    info!(path = %path.display(), rows = rows.len(), "read rows");
    Ok(rows)
}

pub fn read_listing(path: &Path, head: Option<usize>) -> Result<Vec<ListingRow>> {
    Ok(read_field_rows(path, head)?
        .into_iter()
        .map(|fields| {
            let detail_locator = fields
                .get(FIELD_DETAILS_PATH)
                .and_then(|v| v.clone())
                .unwrap_or_default();
            ListingRow {
                fields,
                detail_locator,
            }
        })
        .collect())
}

/// Load index is the record position in the file.
pub fn read_enriched(path: &Path) -> Result<Vec<EnrichedRow>> {
    Ok(read_field_rows(path, None)?
        .into_iter()
        .enumerate()
        .map(|(load_index, fields)| EnrichedRow { load_index, fields })
        .collect())
}

pub fn write_table(path: &Path, table: &NormalizedTable) -> Result<usize> {
    ensure_parent(path)?;
    let header = table.header();
    let mut writer = Writer::from_path(path)?;
    writer.write_record(&header)?;
    for row in &table.rows {
        let record = std::iter::once(row.key.clone()).chain(
            header[1..].iter().map(|column| row.cell(column).render()),
        );
        writer.write_record(record)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = table.len(), "wrote normalized table");
    Ok(table.len())
}

/// Read a table written by [`write_table`]. Schema numeric columns become
/// numbers, everything else text; unreadable numbers are missing.
pub fn read_table(path: &Path, schema: &TableSchema) -> Result<NormalizedTable> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let key_column = header
        .first()
        .cloned()
        .unwrap_or_else(|| schema.key_column.clone());

    let (numeric_columns, categorical_columns): (Vec<String>, Vec<String>) = header
        .iter()
        .skip(1)
        .cloned()
        .partition(|c| schema.numeric(c).is_some());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let key = record.get(0).unwrap_or_default().to_string();
        let mut cells = BTreeMap::new();
        for (i, column) in header.iter().enumerate().skip(1) {
            let raw = record.get(i).unwrap_or_default().trim();
            let cell = if raw.is_empty() {
                Cell::Missing
            } else if schema.numeric(column).is_some() {
                raw.parse::<f64>().map_or(Cell::Missing, Cell::Number)
            } else {
                Cell::Text(raw.to_string())
            };
            cells.insert(column.clone(), cell);
        }
        rows.push(NormalizedRow { key, cells });
    }

    Ok(NormalizedTable {
        key_column,
        numeric_columns,
        categorical_columns,
        rows,
    })
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    info!(path = %path.display(), "wrote json");
    Ok(())
}
