//! Per-field validation rules.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used when a date rule does not name one.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Declared kind of a field, without constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Integer,
    Real,
    String,
    Date,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Real => "real",
            FieldKind::String => "string",
            FieldKind::Date => "date",
        }
    }

    /// Value substituted when no usable default exists.
    ///
    /// Dates have none: an empty cell never satisfies a date rule.
    pub fn zero_value(self) -> Option<&'static str> {
        match self {
            FieldKind::Integer => Some("0"),
            FieldKind::Real => Some("0.0"),
            FieldKind::String => Some(""),
            FieldKind::Date => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape constraint for string values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "syntax", content = "value", rename_all = "snake_case")]
pub enum TextPattern {
    /// Regular expression that must match the whole value.
    Regex(String),
    /// Input mask: `\d` digit, `\D` letter, `\w` letter or digit, `\s` space,
    /// `[..]` character set, anything else literal.
    Mask(String),
}

impl TextPattern {
    pub fn source(&self) -> &str {
        match self {
            TextPattern::Regex(source) | TextPattern::Mask(source) => source,
        }
    }
}

/// Rule kind with its kind-specific constraints. Absent constraints are unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    Integer {
        min: Option<i64>,
        max: Option<i64>,
        multiple_of: Option<i64>,
    },
    Real {
        min: Option<f64>,
        max: Option<f64>,
        /// Maximum number of digits after the decimal separator.
        precision: Option<u32>,
    },
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
        allowed_characters: Option<String>,
        allowed_values: Option<Vec<String>>,
        pattern: Option<TextPattern>,
    },
    Date {
        format: String,
        min: Option<NaiveDate>,
        max: Option<NaiveDate>,
    },
}

impl RuleKind {
    /// Unconstrained string rule.
    pub fn string() -> Self {
        RuleKind::String {
            min_length: None,
            max_length: None,
            allowed_characters: None,
            allowed_values: None,
            pattern: None,
        }
    }

    pub fn field_kind(&self) -> FieldKind {
        match self {
            RuleKind::Integer { .. } => FieldKind::Integer,
            RuleKind::Real { .. } => FieldKind::Real,
            RuleKind::String { .. } => FieldKind::String,
            RuleKind::Date { .. } => FieldKind::Date,
        }
    }

    /// Constraint list rendered for reports, e.g. `min 0, max 100`.
    pub fn constraint_summary(&self) -> Vec<String> {
        let mut parts = Vec::new();
        match self {
            RuleKind::Integer {
                min,
                max,
                multiple_of,
            } => {
                push_opt(&mut parts, "min", min.as_ref());
                push_opt(&mut parts, "max", max.as_ref());
                push_opt(&mut parts, "multiple of", multiple_of.as_ref());
            }
            RuleKind::Real {
                min,
                max,
                precision,
            } => {
                push_opt(&mut parts, "min", min.as_ref());
                push_opt(&mut parts, "max", max.as_ref());
                push_opt(&mut parts, "precision", precision.as_ref());
            }
            RuleKind::String {
                min_length,
                max_length,
                allowed_characters,
                allowed_values,
                pattern,
            } => {
                push_opt(&mut parts, "min length", min_length.as_ref());
                push_opt(&mut parts, "max length", max_length.as_ref());
                if let Some(chars) = allowed_characters {
                    parts.push(format!("allowed characters \"{chars}\""));
                }
                if let Some(values) = allowed_values {
                    parts.push(format!("one of [{}]", values.join(", ")));
                }
                match pattern {
                    Some(TextPattern::Regex(source)) => parts.push(format!("pattern {source}")),
                    Some(TextPattern::Mask(source)) => parts.push(format!("mask {source}")),
                    None => {}
                }
            }
            RuleKind::Date { format, min, max } => {
                parts.push(format!("format {format}"));
                push_opt(&mut parts, "from", min.as_ref());
                push_opt(&mut parts, "to", max.as_ref());
            }
        }
        parts
    }
}

fn push_opt<T: fmt::Display>(parts: &mut Vec<String>, label: &str, value: Option<&T>) {
    if let Some(value) = value {
        parts.push(format!("{label} {value}"));
    }
}

/// Validation and correction intent for a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub field: String,
    #[serde(flatten)]
    pub kind: RuleKind,
    /// Replacement used by automatic correction.
    pub default: Option<String>,
}

impl Rule {
    pub fn new(field: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            field: field.into(),
            kind,
            default: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn field_kind(&self) -> FieldKind {
        self.kind.field_kind()
    }

    /// One-line description, e.g. `real (min 0, max 100)`.
    pub fn summary(&self) -> String {
        let constraints = self.kind.constraint_summary();
        if constraints.is_empty() {
            self.field_kind().to_string()
        } else {
            format!("{} ({})", self.field_kind(), constraints.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_constraints() {
        let rule = Rule::new(
            "price",
            RuleKind::Real {
                min: Some(0.0),
                max: None,
                precision: Some(2),
            },
        );
        assert_eq!(rule.summary(), "real (min 0, precision 2)");
        assert_eq!(Rule::new("name", RuleKind::string()).summary(), "string");
    }

    #[test]
    fn zero_values_per_kind() {
        assert_eq!(FieldKind::Integer.zero_value(), Some("0"));
        assert_eq!(FieldKind::Real.zero_value(), Some("0.0"));
        assert_eq!(FieldKind::String.zero_value(), Some(""));
        assert_eq!(FieldKind::Date.zero_value(), None);
    }
}
