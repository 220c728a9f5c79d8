use crate::common::constants::PLACEHOLDER_TOKENS;
use crate::common::types::Fields;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(-?[0-9]+(?:\.[0-9]+)?)").expect("valid regex"));

/// A field whose value carries a unit suffix, e.g. `"1234 t"`.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitField {
    pub name: String,
    pub suffix: String,
}

impl UnitField {
    pub fn new(name: &str, suffix: &str) -> Self {
        Self {
            name: name.to_string(),
            suffix: suffix.to_string(),
        }
    }
}

/// A combined `"a <sep> b"` field split into two numeric fields.
#[derive(Debug, Clone, Deserialize)]
pub struct CompositeField {
    pub source: String,
    pub separator: String,
    pub first: String,
    pub second: String,
}

impl CompositeField {
    pub fn new(source: &str, separator: &str, first: &str, second: &str) -> Self {
        Self {
            source: source.to_string(),
            separator: separator.to_string(),
            first: first.to_string(),
            second: second.to_string(),
        }
    }
}

/// Turns raw merged-row values into clean ones. Each value is adapted
/// exactly once, after listing and detail fields are overlaid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldAdapter {
    pub unit_fields: Vec<UnitField>,
    pub composites: Vec<CompositeField>,
}

impl Default for FieldAdapter {
    fn default() -> Self {
        Self {
            unit_fields: vec![
                UnitField::new("Current draught", " m"),
                UnitField::new("Draught", " m"),
                UnitField::new("Deadweight", " t"),
                UnitField::new("Gross Tonnage", " t"),
                UnitField::new("Net Tonnage", " t"),
                UnitField::new("GT", " t"),
            ],
            composites: vec![
                CompositeField::new("Course/Speed", "/", "Course", "Speed"),
                CompositeField::new("Size", "x", "Length", "Width"),
            ],
        }
    }
}

impl FieldAdapter {
    /// Clean every value, strip units and derive composite columns.
    pub fn adapt(&self, raw: &Fields) -> Fields {
        let mut out: Fields = raw
            .iter()
            .map(|(name, value)| (name.clone(), clean_value(value.as_deref())))
            .collect();

        for unit in &self.unit_fields {
            if let Some(value) = out.get_mut(&unit.name) {
                *value = strip_unit(value.as_deref(), &unit.suffix);
            }
        }

        for composite in &self.composites {
            let Some(source) = out.get(&composite.source) else {
                continue;
            };
            let (first, second) = split_composite(source.as_deref(), &composite.separator);
            out.insert(composite.first.clone(), first);
            out.insert(composite.second.clone(), second);
        }
        out
    }

    /// Column names `adapt` produces for `raw`: its own names plus the
    /// halves of every composite whose source it carries.
    pub fn output_names<'a>(&'a self, raw: &'a Fields) -> impl Iterator<Item = &'a str> {
        let derived = self
            .composites
            .iter()
            .filter(|c| raw.contains_key(&c.source))
            .flat_map(|c| [c.first.as_str(), c.second.as_str()]);
        raw.keys().map(String::as_str).chain(derived)
    }
}

pub fn is_placeholder(value: &str) -> bool {
    PLACEHOLDER_TOKENS
        .iter()
        .any(|token| value.eq_ignore_ascii_case(token))
}

/// Trim; empty strings and placeholder tokens become missing.
pub fn clean_value(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() || is_placeholder(trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// `"1234 t"` with suffix `" t"` gives `"1234"`. Anything not ending in the
/// suffix, or whose remainder is not a number, is missing.
pub fn strip_unit(value: Option<&str>, suffix: &str) -> Option<String> {
    let value = clean_value(value)?;
    let bare = value.strip_suffix(suffix)?.trim().replace(',', "");
    if !bare.is_empty() && bare.parse::<f64>().is_ok() {
        Some(bare)
    } else {
        None
    }
}

/// `"120 / 45"` gives `("120", "45")`. Both halves are missing unless the
/// separator is present and each side starts with a number.
pub fn split_composite(value: Option<&str>, separator: &str) -> (Option<String>, Option<String>) {
    let Some(value) = clean_value(value) else {
        return (None, None);
    };
    let Some((left, right)) = value.split_once(separator) else {
        return (None, None);
    };
    match (leading_number(left), leading_number(right)) {
        (Some(a), Some(b)) => (Some(a), Some(b)),
        _ => (None, None),
    }
}

fn leading_number(s: &str) -> Option<String> {
    LEADING_NUMBER
        .captures(s)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
