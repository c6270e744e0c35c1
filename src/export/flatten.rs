//! Record flattening
//!
//! Turns one primary record plus its batch lookup maps into one output row.
//! Flattening is a pure function of its inputs. Absent or unresolved values
//! become empty strings; all text goes through NFC composition and trimming.

use serde_json::Number;
use unicode_normalization::UnicodeNormalization;

use super::resolver::LookupMaps;
use super::schema::Schema;
use crate::model::{PrimaryRecord, Reference};

/// Separator between tag labels in the tags column
pub const TAG_SEPARATOR: &str = " | ";

/// Significant digits used for the probability column
pub const PROBABILITY_DIGITS: usize = 10;

/// One flattened row, ordered like the schema header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow(pub Vec<String>);

impl OutputRow {
    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Maps records to rows following one schema version
#[derive(Debug, Clone, Copy)]
pub struct Flattener {
    schema: &'static Schema,
}

impl Flattener {
    pub fn new(schema: &'static Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Header row matching the cells produced by [`Flattener::flatten`]
    pub fn header(&self) -> Vec<&'static str> {
        self.schema.headers()
    }

    /// Flatten one record
    pub fn flatten(&self, record: &PrimaryRecord, lookups: &LookupMaps) -> OutputRow {
        OutputRow(
            self.schema
                .columns
                .iter()
                .map(|column| (column.extract)(record, lookups))
                .collect(),
        )
    }

    /// Flatten a whole batch, preserving record order
    pub fn flatten_batch(&self, records: &[PrimaryRecord], lookups: &LookupMaps) -> Vec<OutputRow> {
        records.iter().map(|r| self.flatten(r, lookups)).collect()
    }
}

/// Canonical composition (NFC) followed by whitespace trimming
pub fn normalize_text(value: &str) -> String {
    let composed: String = value.nfc().collect();
    composed.trim().to_string()
}

/// Optional text cell
pub fn text(value: Option<&str>) -> String {
    value.map(normalize_text).unwrap_or_default()
}

/// Label embedded in a singular reference
pub fn label(reference: Option<&Reference>) -> String {
    reference
        .map(|r| normalize_text(&r.label))
        .unwrap_or_default()
}

/// Id of a singular reference
pub fn reference_id(reference: Option<&Reference>) -> String {
    reference.map(|r| r.id.to_string()).unwrap_or_default()
}

/// Boolean cell, rendered the way spreadsheet imports recognize it
pub fn boolean(value: bool) -> String {
    let literal = if value { "True" } else { "False" };
    literal.to_string()
}

/// Numeric cell in its wire representation
pub fn number(value: Option<&Number>) -> String {
    value.map(Number::to_string).unwrap_or_default()
}

/// Integer cell
pub fn integer(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Probability cell: at most ten significant digits, no trailing zeros
pub fn probability(value: Option<f64>) -> String {
    value
        .map(|v| format_significant(v, PROBABILITY_DIGITS))
        .unwrap_or_default()
}

/// Join the labels of `ids` in order; unresolved ids leave an empty segment
pub fn join_labels<'a, F>(ids: &[i64], lookup: F) -> String
where
    F: Fn(i64) -> Option<&'a str>,
{
    ids.iter()
        .map(|id| lookup(*id).map(normalize_text).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(TAG_SEPARATOR)
}

/// Format like C's `%.<digits>g`: fixed notation for moderate exponents,
/// scientific otherwise, insignificant trailing zeros removed
pub fn format_significant(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let digits = digits.max(1);
    let scientific = format!("{:.*e}", digits - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}"))
    }
}

fn trim_fraction(value: &str) -> String {
    if value.contains('.') {
        value.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        value.to_string()
    }
}
