use serde::{Deserialize, Serialize};

use crate::rule::Rule;

/// Which check of a rule a value failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Value is null or blank.
    MissingValue,
    /// Value cannot be read as the declared kind.
    TypeMismatch,
    BelowMinimum,
    AboveMaximum,
    NotMultiple,
    PrecisionExceeded,
    TooShort,
    TooLong,
    DisallowedCharacters,
    NotAllowedValue,
    PatternMismatch,
    DateFormatMismatch,
    DateOutOfRange,
}

impl ViolationKind {
    pub fn description(self) -> &'static str {
        match self {
            ViolationKind::MissingValue => "value is missing",
            ViolationKind::TypeMismatch => "value does not match the declared kind",
            ViolationKind::BelowMinimum => "value is below the minimum",
            ViolationKind::AboveMaximum => "value is above the maximum",
            ViolationKind::NotMultiple => "value is not a multiple of the step",
            ViolationKind::PrecisionExceeded => "too many digits after the decimal separator",
            ViolationKind::TooShort => "value is shorter than the minimum length",
            ViolationKind::TooLong => "value is longer than the maximum length",
            ViolationKind::DisallowedCharacters => "value contains disallowed characters",
            ViolationKind::NotAllowedValue => "value is not one of the allowed values",
            ViolationKind::PatternMismatch => "value does not match the pattern",
            ViolationKind::DateFormatMismatch => "value does not match the date format",
            ViolationKind::DateOutOfRange => "date is outside the allowed range",
        }
    }
}

/// A single rule failure tied to one record and field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub record_index: usize,
    pub field: String,
    pub raw_value: Option<String>,
    pub rule: Rule,
    pub kind: ViolationKind,
}

impl Violation {
    pub fn message(&self) -> String {
        format!("{} ({})", self.kind.description(), self.rule.summary())
    }
}

/// Set-level finding produced by an integrity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum IntegrityFinding {
    /// A mandatory field is absent from the whole record set.
    MissingMandatoryField { field: String },
    /// A mandatory field is present but null or blank in some records.
    BlankMandatoryValue { field: String, indices: Vec<usize> },
    /// Records sharing the same key value.
    DuplicateKey {
        field: String,
        key: String,
        indices: Vec<usize>,
    },
    /// Records whose category is null or blank.
    EmptyCategory { field: String, indices: Vec<usize> },
}

impl IntegrityFinding {
    pub fn field(&self) -> &str {
        match self {
            IntegrityFinding::MissingMandatoryField { field }
            | IntegrityFinding::BlankMandatoryValue { field, .. }
            | IntegrityFinding::DuplicateKey { field, .. }
            | IntegrityFinding::EmptyCategory { field, .. } => field,
        }
    }

    pub fn indices(&self) -> &[usize] {
        match self {
            IntegrityFinding::MissingMandatoryField { .. } => &[],
            IntegrityFinding::BlankMandatoryValue { indices, .. }
            | IntegrityFinding::DuplicateKey { indices, .. }
            | IntegrityFinding::EmptyCategory { indices, .. } => indices,
        }
    }

    pub fn check_name(&self) -> &'static str {
        match self {
            IntegrityFinding::MissingMandatoryField { .. } => "missing_mandatory_field",
            IntegrityFinding::BlankMandatoryValue { .. } => "blank_mandatory_value",
            IntegrityFinding::DuplicateKey { .. } => "duplicate_key",
            IntegrityFinding::EmptyCategory { .. } => "empty_category",
        }
    }

    pub fn message(&self) -> String {
        match self {
            IntegrityFinding::MissingMandatoryField { field } => {
                format!("mandatory field '{field}' is missing")
            }
            IntegrityFinding::BlankMandatoryValue { field, indices } => {
                format!("mandatory field '{field}' is blank in {} records", indices.len())
            }
            IntegrityFinding::DuplicateKey {
                field,
                key,
                indices,
            } => format!(
                "{field} '{key}' is shared by {} records: {}",
                indices.len(),
                join_indices(indices)
            ),
            IntegrityFinding::EmptyCategory { field, indices } => {
                format!("'{field}' is empty in {} records", indices.len())
            }
        }
    }
}

fn join_indices(indices: &[usize]) -> String {
    indices
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// How a cell value was replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CorrectionMethod {
    /// The rule's default, coerced to the field kind.
    Default,
    /// No default configured; the kind's zero value was used.
    KindZero,
    /// The configured default could not be coerced; the kind's zero value was used.
    ZeroFallback { rejected_default: String },
    /// Value wrapped in review markers for a human to resolve.
    ManualReview,
    /// Date re-rendered in the canonical format.
    DateNormalized,
    /// Unparseable date replaced by null.
    DateCleared,
    /// Null or blank value replaced by a fill value.
    BlankFilled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub record_index: usize,
    pub field: String,
    pub before: Option<String>,
    pub after: Option<String>,
    #[serde(flatten)]
    pub method: CorrectionMethod,
}

impl Correction {
    /// True when a configured default was rejected.
    pub fn is_fallback(&self) -> bool {
        matches!(self.method, CorrectionMethod::ZeroFallback { .. })
    }
}
