//! Row parsing: flat tabular rows into typed records.
//!
//! Rows arrive as string-keyed objects, either straight from `d3.csvParse`
//! (every field a string) or from a JSON dataset (numbers allowed). Each row
//! carries an `@`-delimited path, a primary intensity, and optionally one
//! column whose header and cells are both `;`-delimited lists of per-sample
//! intensities.
//!
//! Intensity coercion is lenient: anything that is not a finite, non-negative
//! number becomes 0. Structural problems (missing path, sample count mismatch)
//! are errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::rank::PATH_SEPARATOR;
use crate::error::{Result, TaxonomyError};

/// Separator used inside the sample column.
pub const SAMPLE_SEPARATOR: char = ';';

/// One cell of a raw row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawField {
    Number(f64),
    Text(String),
    Empty,
}

impl RawField {
    fn as_text(&self) -> Option<String> {
        match self {
            RawField::Text(text) => Some(text.clone()),
            RawField::Number(n) => Some(n.to_string()),
            RawField::Empty => None,
        }
    }

    fn intensity(&self) -> f64 {
        match self {
            RawField::Number(n) => sanitize(*n),
            RawField::Text(text) => coerce_intensity(text),
            RawField::Empty => 0.0,
        }
    }
}

impl From<&str> for RawField {
    fn from(text: &str) -> Self {
        RawField::Text(text.to_string())
    }
}

impl From<f64> for RawField {
    fn from(n: f64) -> Self {
        RawField::Number(n)
    }
}

/// A raw row keyed by column header.
pub type RawRow = BTreeMap<String, RawField>;

/// Parse an intensity cell, defaulting to 0.
pub fn coerce_intensity(text: &str) -> f64 {
    text.trim().parse::<f64>().map(sanitize).unwrap_or(0.0)
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value >= 0.0 { value } else { 0.0 }
}

/// `10 * log10(value)` for positive values, 0 otherwise.
pub fn log_intensity(value: f64) -> f64 {
    if value > 0.0 { value.log10() * 10.0 } else { 0.0 }
}

/// Strip "Intensity " style prefixes from a sample header entry.
///
/// Every case-insensitive `intensity` followed by one more character is
/// removed, then the result is trimmed.
pub fn clean_sample_name(raw: &str) -> String {
    const MARKER: &str = "intensity";

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(ch) = rest.chars().next() {
        let marked = rest
            .get(..MARKER.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(MARKER));
        if marked {
            let tail = &rest[MARKER.len()..];
            if let Some(next) = tail.chars().next().filter(|&c| c != '\n') {
                rest = &tail[next.len_utf8()..];
                continue;
            }
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out.trim().to_string()
}

/// Per-sample intensities of one record, in header order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleValues(Vec<(String, f64)>);

impl SampleValues {
    pub fn new(values: Vec<(String, f64)>) -> Self {
        Self(values)
    }

    /// Get the intensity of one sample.
    pub fn get(&self, sample: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(name, _)| name == sample)
            .map(|&(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A validated input record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// `@`-delimited ancestor chain ending in the node's own taxon.
    pub path: String,
    /// Primary (summed) intensity.
    pub value: f64,
    /// Log-transformed intensity, `10 * log10(value)`.
    pub log_intensity: f64,
    /// Per-sample intensities when the dataset has a sample column.
    pub samples: Option<SampleValues>,
}

/// Column names the parser reads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParserConfig {
    /// Column holding the `@`-delimited path.
    pub id_field: String,
    /// Column holding the primary intensity.
    pub value_field: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            value_field: "value".to_string(),
        }
    }
}

/// Output of [`RowParser::parse`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRows {
    pub records: Vec<Record>,
    /// Cleaned sample names in header order (empty without a sample column).
    pub sample_names: Vec<String>,
}

/// Validates raw rows into [`Record`]s.
#[derive(Debug, Clone)]
pub struct RowParser {
    config: ParserConfig,
}

impl RowParser {
    /// Create a parser reading the configured columns.
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Create a parser for the `id` and `value` columns.
    pub fn with_defaults() -> Self {
        Self::new(ParserConfig::default())
    }

    /// Get the column configuration.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse all rows.
    ///
    /// The sample column is detected from the first row's headers: the first
    /// header (in sorted order) containing `;`.
    pub fn parse(&self, rows: &[RawRow]) -> Result<ParsedRows> {
        let Some(first) = rows.first() else {
            return Ok(ParsedRows::default());
        };

        let sample_column = Self::detect_sample_column(first);
        let sample_names = match sample_column {
            Some(header) => Self::sample_names(header)?,
            None => Vec::new(),
        };

        let mut coerced = 0usize;
        let mut records = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let path = self.parse_path(index, row)?;

            let value = match row.get(&self.config.value_field) {
                Some(field) => {
                    let value = field.intensity();
                    if value == 0.0 && !matches!(field, RawField::Number(_)) {
                        coerced += 1;
                    }
                    value
                }
                None => {
                    coerced += 1;
                    0.0
                }
            };

            let samples = match sample_column {
                Some(header) => Some(Self::parse_samples(index, row, header, &sample_names)?),
                None => None,
            };

            records.push(Record {
                path,
                value,
                log_intensity: log_intensity(value),
                samples,
            });
        }

        if coerced > 0 {
            log::debug!("{coerced} rows had a missing or non-numeric intensity, using 0");
        }

        Ok(ParsedRows {
            records,
            sample_names,
        })
    }

    fn detect_sample_column(row: &RawRow) -> Option<&str> {
        let mut candidates = row
            .keys()
            .filter(|header| header.contains(SAMPLE_SEPARATOR))
            .map(String::as_str);
        let column = candidates.next();
        if column.is_some() && candidates.next().is_some() {
            log::warn!("several sample columns found, using '{}'", column.unwrap_or_default());
        }
        column
    }

    fn sample_names(header: &str) -> Result<Vec<String>> {
        let names: Vec<String> = header.split(SAMPLE_SEPARATOR).map(clean_sample_name).collect();
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(TaxonomyError::MalformedRow {
                    row: 0,
                    reason: format!("duplicate sample name '{name}' in header '{header}'"),
                });
            }
        }
        Ok(names)
    }

    fn parse_path(&self, index: usize, row: &RawRow) -> Result<String> {
        let path = row
            .get(&self.config.id_field)
            .and_then(RawField::as_text)
            .unwrap_or_default();

        if path.is_empty() {
            return Err(TaxonomyError::MalformedRow {
                row: index,
                reason: format!("empty '{}' field", self.config.id_field),
            });
        }
        if path.split(PATH_SEPARATOR).any(str::is_empty) {
            return Err(TaxonomyError::MalformedRow {
                row: index,
                reason: format!("path '{path}' has an empty segment"),
            });
        }
        Ok(path)
    }

    fn parse_samples(
        index: usize,
        row: &RawRow,
        header: &str,
        names: &[String],
    ) -> Result<SampleValues> {
        let cell = row
            .get(header)
            .and_then(RawField::as_text)
            .ok_or_else(|| TaxonomyError::MalformedRow {
                row: index,
                reason: format!("missing sample column '{header}'"),
            })?;

        let values: Vec<f64> = cell.split(SAMPLE_SEPARATOR).map(coerce_intensity).collect();
        if values.len() != names.len() {
            return Err(TaxonomyError::MalformedRow {
                row: index,
                reason: format!(
                    "{} sample values but the header lists {} samples",
                    values.len(),
                    names.len()
                ),
            });
        }

        Ok(SampleValues::new(names.iter().cloned().zip(values).collect()))
    }
}
