use super::stats::Describe;
use super::NormalizedTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Strict numeric bounds on one column; a missing value never matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericBound {
    pub column: String,
    #[serde(default)]
    pub above: Option<f64>,
    #[serde(default)]
    pub below: Option<f64>,
}

impl NumericBound {
    fn matches(&self, value: Option<f64>) -> bool {
        let Some(v) = value else {
            return false;
        };
        self.above.map_or(true, |a| v > a) && self.below.map_or(true, |b| v < b)
    }
}

/// Substring match on a categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMatch {
    pub column: String,
    pub contains: String,
}

/// A named slice of the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    #[serde(default)]
    pub bounds: Vec<NumericBound>,
    #[serde(default)]
    pub text: Option<TextMatch>,
}

impl Segment {
    /// Large vessels (under 400 m, over 80000 t gross) whose type mentions `needle`.
    pub fn large_vessels(name: &str, needle: &str) -> Self {
        Self {
            name: name.to_string(),
            bounds: vec![
                NumericBound {
                    column: "Length".into(),
                    above: None,
                    below: Some(400.0),
                },
                NumericBound {
                    column: "Gross Tonnage".into(),
                    above: Some(80000.0),
                    below: None,
                },
            ],
            text: Some(TextMatch {
                column: "Ship type".into(),
                contains: needle.to_string(),
            }),
        }
    }
}

pub fn default_segments() -> Vec<Segment> {
    vec![
        Segment::large_vessels("oil", "Oil"),
        Segment::large_vessels("lng", "LNG"),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub name: String,
    pub rows: usize,
    pub columns: Vec<(String, Describe)>,
}

/// Row count and per-numeric-column statistics for each segment.
pub fn summarize(table: &NormalizedTable, segments: &[Segment]) -> Vec<SegmentSummary> {
    segments
        .iter()
        .map(|segment| {
            let selected: Vec<_> = table
                .rows
                .iter()
                .filter(|row| {
                    segment.bounds.iter().all(|b| b.matches(row.number(&b.column)))
                        && segment.text.as_ref().map_or(true, |t| {
                            row.text(&t.column).is_some_and(|v| v.contains(&t.contains))
                        })
                })
                .collect();

            let mut by_column: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
            for row in &selected {
                for column in &table.numeric_columns {
                    let entry = by_column.entry(column.as_str()).or_default();
                    if let Some(v) = row.number(column) {
                        entry.push(v);
                    }
                }
            }
            let columns = table
                .numeric_columns
                .iter()
                .map(|c| {
                    let values = by_column.get(c.as_str()).map(Vec::as_slice).unwrap_or(&[]);
                    (c.clone(), Describe::of(values))
                })
                .collect();

            SegmentSummary {
                name: segment.name.clone(),
                rows: selected.len(),
                columns,
            }
        })
        .collect()
}

fn opt(v: Option<f64>) -> String {
    v.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".into())
}

impl fmt::Display for SegmentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} rows)", self.name, self.rows)?;
        writeln!(
            f,
            "  {:<18} {:>6} {:>12} {:>12} {:>12} {:>12}",
            "column", "count", "mean", "std", "min", "max"
        )?;
        for (column, d) in &self.columns {
            writeln!(
                f,
                "  {:<18} {:>6} {:>12} {:>12} {:>12} {:>12}",
                column,
                d.count,
                opt(d.mean),
                opt(d.std),
                opt(d.min),
                opt(d.max)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::{Cell, NormalizedRow};

    fn vessel(key: &str, length: f64, gt: Option<f64>, kind: &str) -> NormalizedRow {
        let mut cells = BTreeMap::new();
        cells.insert("Length".to_string(), Cell::Number(length));
        cells.insert(
            "Gross Tonnage".to_string(),
            gt.map_or(Cell::Missing, Cell::Number),
        );
        cells.insert("Ship type".to_string(), Cell::Text(kind.to_string()));
        NormalizedRow {
            key: key.to_string(),
            cells,
        }
    }

    fn table() -> NormalizedTable {
        NormalizedTable {
            key_column: "IMO".into(),
            numeric_columns: vec!["Length".into(), "Gross Tonnage".into()],
            categorical_columns: vec!["Ship type".into()],
            rows: vec![
                vessel("1", 330.0, Some(160000.0), "Crude Oil Tanker"),
                vessel("2", 250.0, Some(60000.0), "Oil Products Tanker"),
                vessel("3", 290.0, Some(100000.0), "LNG Tanker"),
                vessel("4", 450.0, Some(200000.0), "Crude Oil Tanker"),
                vessel("5", 300.0, None, "Crude Oil Tanker"),
                vessel("6", 280.0, Some(90000.0), "Crude Oil Tanker"),
            ],
        }
    }

    #[test]
    fn segments_apply_bounds_and_type_match() {
        let summaries = summarize(&table(), &default_segments());
        assert_eq!(summaries.len(), 2);

        let oil = &summaries[0];
        assert_eq!(oil.name, "oil");
        assert_eq!(oil.rows, 2);
        let (name, length) = &oil.columns[0];
        assert_eq!(name, "Length");
        assert_eq!(length.mean, Some(305.0));
        assert_eq!(length.max, Some(330.0));

        assert_eq!(summaries[1].rows, 1);
    }

    #[test]
    fn summary_renders_a_row_per_column() {
        let summaries = summarize(&table(), &default_segments());
        let text = summaries[1].to_string();
        assert!(text.starts_with("lng (1 rows)"));
        assert!(text.contains("Gross Tonnage"));
        assert_eq!(text.lines().count(), 4);
    }
}
