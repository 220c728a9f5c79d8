use crate::common::constants::{DEFAULT_OUTLIER_K, FIELD_COUNTRY_OWNER};
use serde::{Deserialize, Serialize};

/// A column coerced to a number during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub name: String,
    /// Unparsable text in a required column fails the whole table; in an
    /// optional column it becomes missing.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl NumericColumn {
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: false,
        }
    }
}

/// Two columns that must agree for a row to be kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyPair {
    pub left: String,
    pub right: String,
}

/// Drop rows whose `column` exceeds `mean + k * std`.
///
/// The standard deviation is taken from `spread_from` when set, otherwise
/// from `column` itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierRule {
    pub column: String,
    #[serde(default = "default_k")]
    pub k: f64,
    #[serde(default)]
    pub spread_from: Option<String>,
}

fn default_k() -> f64 {
    DEFAULT_OUTLIER_K
}

impl OutlierRule {
    pub fn new(column: &str, k: f64) -> Self {
        Self {
            column: column.to_string(),
            k,
            spread_from: None,
        }
    }

    pub fn spread_from(mut self, column: &str) -> Self {
        self.spread_from = Some(column.to_string());
        self
    }

    pub fn spread_column(&self) -> &str {
        self.spread_from.as_deref().unwrap_or(&self.column)
    }
}

/// Shape of the normalized table and the filters applied to get there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSchema {
    pub key_column: String,
    pub numeric_columns: Vec<NumericColumn>,
    pub dropped_columns: Vec<String>,
    pub consistency: Vec<ConsistencyPair>,
    pub outlier_rules: Vec<OutlierRule>,
}

impl Default for TableSchema {
    fn default() -> Self {
        let required = [
            "Course",
            "Current draught",
            "Draught",
            "Width",
            "Length",
            "Deadweight",
            "Gross Tonnage",
            "Net Tonnage",
            "Speed",
        ];
        let mut numeric_columns: Vec<NumericColumn> =
            required.iter().map(|c| NumericColumn::required(c)).collect();
        numeric_columns.push(NumericColumn::optional("Built"));

        Self {
            key_column: "IMO".to_string(),
            numeric_columns,
            dropped_columns: ["GT", "Size", "Course/Speed", "Crude (bbl)"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            consistency: vec![ConsistencyPair {
                left: FIELD_COUNTRY_OWNER.to_string(),
                right: "Flag".to_string(),
            }],
            outlier_rules: vec![
                OutlierRule::new("Width", DEFAULT_OUTLIER_K),
                OutlierRule::new("Length", DEFAULT_OUTLIER_K).spread_from("Width"),
            ],
        }
    }
}

impl TableSchema {
    pub fn numeric(&self, name: &str) -> Option<&NumericColumn> {
        self.numeric_columns.iter().find(|c| c.name == name)
    }

    pub fn is_dropped(&self, name: &str) -> bool {
        self.dropped_columns.iter().any(|c| c == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_vessel_table() {
        let schema = TableSchema::default();
        assert_eq!(schema.key_column, "IMO");
        assert!(schema.numeric("Width").unwrap().required);
        assert!(!schema.numeric("Built").unwrap().required);
        assert!(schema.is_dropped("Course/Speed"));
        assert_eq!(schema.outlier_rules[1].spread_column(), "Width");
        assert_eq!(schema.outlier_rules[0].spread_column(), "Width");
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let schema: TableSchema = toml::from_str(
            r#"
            key_column = "MMSI"

            [[outlier_rules]]
            column = "Length"
            "#,
        )
        .unwrap();
        assert_eq!(schema.key_column, "MMSI");
        assert_eq!(schema.outlier_rules.len(), 1);
        assert_eq!(schema.outlier_rules[0].k, 6.0);
        assert_eq!(schema.outlier_rules[0].spread_from, None);
        assert_eq!(schema.numeric_columns.len(), 10);
    }
}
