//! Set-level integrity checks: mandatory fields, duplicate keys, empty categories.

use std::collections::HashMap;

use feed_model::{IntegrityFinding, RecordSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fields every product feed is expected to carry.
pub const DEFAULT_MANDATORY_FIELDS: [&str; 3] = ["name", "SKU", "price"];
pub const DEFAULT_DUPLICATE_KEY: &str = "SKU";
pub const DEFAULT_CATEGORY_FIELD: &str = "category";

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|value| value.trim().is_empty())
}

/// One finding per mandatory field absent from the field universe.
pub fn check_mandatory_fields(records: &RecordSet, fields: &[String]) -> Vec<IntegrityFinding> {
    fields
        .iter()
        .filter(|field| !records.has_field(field))
        .map(|field| IntegrityFinding::MissingMandatoryField {
            field: field.clone(),
        })
        .collect()
}

/// One finding per present mandatory field that is null or blank somewhere.
pub fn check_blank_mandatory_values(
    records: &RecordSet,
    fields: &[String],
) -> Vec<IntegrityFinding> {
    fields
        .iter()
        .filter(|field| records.has_field(field))
        .filter_map(|field| {
            let indices = blank_indices(records, field);
            (!indices.is_empty()).then(|| IntegrityFinding::BlankMandatoryValue {
                field: field.clone(),
                indices,
            })
        })
        .collect()
}

/// One finding per key value shared by two or more records, listing every
/// record that carries it. Blank keys are ignored.
///
/// Findings are ordered by the first record carrying each key.
pub fn check_duplicate_keys(records: &RecordSet, key: &str) -> Vec<IntegrityFinding> {
    if !records.has_field(key) {
        return Vec::new();
    }
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, value) in records.column_values(key) {
        let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
            continue;
        };
        let group = groups.entry(value).or_default();
        if group.is_empty() {
            order.push(value);
        }
        group.push(index);
    }
    order
        .into_iter()
        .filter_map(|value| {
            let indices = groups.remove(value)?;
            (indices.len() > 1).then(|| IntegrityFinding::DuplicateKey {
                field: key.to_string(),
                key: value.to_string(),
                indices,
            })
        })
        .collect()
}

/// A single finding listing every record whose category is null or blank.
///
/// A set without the category field yields no finding; the mandatory-field
/// check reports absence.
pub fn check_empty_categories(records: &RecordSet, field: &str) -> Vec<IntegrityFinding> {
    if !records.has_field(field) {
        return Vec::new();
    }
    let indices = blank_indices(records, field);
    if indices.is_empty() {
        return Vec::new();
    }
    vec![IntegrityFinding::EmptyCategory {
        field: field.to_string(),
        indices,
    }]
}

fn blank_indices(records: &RecordSet, field: &str) -> Vec<usize> {
    records
        .column_values(field)
        .into_iter()
        .filter(|(_, value)| is_blank(*value))
        .map(|(index, _)| index)
        .collect()
}

/// Which integrity checks to run and on which fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityConfig {
    pub mandatory_fields: Vec<String>,
    /// Field whose values must be unique; `None` disables the check.
    pub duplicate_key: Option<String>,
    /// Field that must not be blank; `None` disables the check.
    pub category_field: Option<String>,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            mandatory_fields: DEFAULT_MANDATORY_FIELDS
                .iter()
                .map(ToString::to_string)
                .collect(),
            duplicate_key: Some(DEFAULT_DUPLICATE_KEY.to_string()),
            category_field: Some(DEFAULT_CATEGORY_FIELD.to_string()),
        }
    }
}

impl IntegrityConfig {
    /// Configuration with every check disabled.
    pub fn none() -> Self {
        Self {
            mandatory_fields: Vec::new(),
            duplicate_key: None,
            category_field: None,
        }
    }

    /// Run the configured checks: mandatory fields, blank mandatory values,
    /// duplicate keys, then empty categories.
    pub fn run(&self, records: &RecordSet) -> Vec<IntegrityFinding> {
        let mut findings = check_mandatory_fields(records, &self.mandatory_fields);
        findings.extend(check_blank_mandatory_values(
            records,
            &self.mandatory_fields,
        ));
        if let Some(key) = &self.duplicate_key {
            findings.extend(check_duplicate_keys(records, key));
        }
        if let Some(field) = &self.category_field {
            findings.extend(check_empty_categories(records, field));
        }
        debug!(findings = findings.len(), "integrity checks finished");
        findings
    }
}
