//! Violation-driven correction of record values.

use std::collections::HashSet;

use feed_model::coerce::{format_real_within, parse_integer, parse_real};
use feed_model::{Correction, CorrectionMethod, RecordSet, Rule, RuleKind, Violation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dates::parse_with_fallback;

/// Sentinel wrapped around values that need a human decision.
pub const REVIEW_MARKER: &str = "№-№-№-№-№-№-№";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionMode {
    /// Replace the value with the rule's default or the kind's zero value.
    #[default]
    Automatic,
    /// Keep the value, wrapped in [`REVIEW_MARKER`] on both sides.
    ManualReview,
}

/// Apply one correction per violating cell and return what was changed.
///
/// Cells are visited in violation order; later violations on a cell that was
/// already corrected are ignored. Violations for records or fields missing
/// from `records` are skipped. In automatic mode a cell is left untouched,
/// and its violation unresolved, when the rule offers no replacement or the
/// replacement equals the current value.
pub fn correct(
    records: &mut RecordSet,
    violations: &[Violation],
    mode: CorrectionMode,
) -> Vec<Correction> {
    let mut visited: HashSet<(usize, &str)> = HashSet::new();
    let mut corrections = Vec::new();
    for violation in violations {
        if !visited.insert((violation.record_index, violation.field.as_str())) {
            continue;
        }
        let Some(cell) = records.get_mut(violation.record_index, &violation.field) else {
            debug!(
                record = violation.record_index,
                field = %violation.field,
                "violation target no longer exists"
            );
            continue;
        };
        let before = cell.clone();
        let (after, method) = match mode {
            CorrectionMode::Automatic => {
                let Some((after, method)) = replacement(&violation.rule) else {
                    warn!(
                        record = violation.record_index,
                        field = %violation.field,
                        kind = %violation.rule.field_kind(),
                        default = ?violation.rule.default,
                        "no usable default and no zero value; value left unresolved"
                    );
                    continue;
                };
                if before.as_deref().map(str::trim).unwrap_or_default() == after {
                    debug!(
                        record = violation.record_index,
                        field = %violation.field,
                        "replacement equals the current value; left unresolved"
                    );
                    continue;
                }
                (after, method)
            }
            CorrectionMode::ManualReview => (
                wrap_for_review(before.as_deref().unwrap_or_default()),
                CorrectionMethod::ManualReview,
            ),
        };
        if let CorrectionMethod::ZeroFallback { rejected_default } = &method {
            warn!(
                record = violation.record_index,
                field = %violation.field,
                kind = %violation.rule.field_kind(),
                rejected_default = %rejected_default,
                "default does not fit the field kind; using zero value"
            );
        }
        *cell = Some(after.clone());
        corrections.push(Correction {
            record_index: violation.record_index,
            field: violation.field.clone(),
            before,
            after: Some(after),
            method,
        });
    }
    debug!(
        mode = ?mode,
        corrections = corrections.len(),
        "corrections applied"
    );
    corrections
}

/// Value substituted by automatic correction, and how it was chosen.
///
/// `None` when neither the default nor a zero value fits the kind.
pub fn replacement(rule: &Rule) -> Option<(String, CorrectionMethod)> {
    let zero = zero_value(&rule.kind);
    let Some(default) = rule.default.as_deref() else {
        return zero.map(|zero| (zero, CorrectionMethod::KindZero));
    };
    match coerce_default(&rule.kind, default) {
        Some(value) => Some((value, CorrectionMethod::Default)),
        None => zero.map(|zero| {
            (
                zero,
                CorrectionMethod::ZeroFallback {
                    rejected_default: default.to_string(),
                },
            )
        }),
    }
}

fn zero_value(kind: &RuleKind) -> Option<String> {
    match kind {
        RuleKind::Real { precision, .. } => Some(format_real_within(0.0, *precision)),
        _ => kind.field_kind().zero_value().map(str::to_string),
    }
}

fn coerce_default(kind: &RuleKind, default: &str) -> Option<String> {
    match kind {
        RuleKind::Integer { .. } => parse_integer(default).map(|value| value.to_string()),
        RuleKind::Real { precision, .. } => {
            parse_real(default).map(|value| format_real_within(value, *precision))
        }
        RuleKind::String { .. } => Some(default.to_string()),
        RuleKind::Date { format, .. } => {
            parse_with_fallback(default, format).map(|date| date.format(format).to_string())
        }
    }
}

pub fn wrap_for_review(value: &str) -> String {
    format!("{REVIEW_MARKER}{value}{REVIEW_MARKER}")
}

/// The value inside a review marker pair, if `value` is wrapped.
pub fn unwrap_review(value: &str) -> Option<&str> {
    value
        .strip_prefix(REVIEW_MARKER)?
        .strip_suffix(REVIEW_MARKER)
}

/// Remove review markers from every cell, restoring the wrapped values.
///
/// An empty wrapped value becomes null. Returns the number of cells changed.
pub fn strip_review_markers(records: &mut RecordSet) -> usize {
    let fields: Vec<String> = records.field_names().map(str::to_string).collect();
    let indices: Vec<usize> = records.records().iter().map(|record| record.index).collect();
    let mut stripped = 0;
    for index in indices {
        for field in &fields {
            let Some(cell) = records.get_mut(index, field) else {
                continue;
            };
            let Some(inner) = cell.as_deref().and_then(unwrap_review) else {
                continue;
            };
            *cell = (!inner.is_empty()).then(|| inner.to_string());
            stripped += 1;
        }
    }
    stripped
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_model::{Field, ViolationKind};

    fn integer_rule() -> Rule {
        Rule::new(
            "stock",
            RuleKind::Integer {
                min: Some(0),
                max: None,
                multiple_of: None,
            },
        )
    }

    fn violation(index: usize, rule: &Rule, raw: Option<&str>, kind: ViolationKind) -> Violation {
        Violation {
            record_index: index,
            field: rule.field.clone(),
            raw_value: raw.map(str::to_string),
            rule: rule.clone(),
            kind,
        }
    }

    fn stock(values: &[Option<&str>]) -> RecordSet {
        RecordSet::from_rows(
            vec![Field::column("stock")],
            values
                .iter()
                .map(|value| vec![value.map(str::to_string)])
                .collect(),
        )
    }

    #[test]
    fn defaults_are_coerced_to_the_kind() {
        assert_eq!(
            replacement(&integer_rule().with_default(" 7 ")),
            Some(("7".to_string(), CorrectionMethod::Default))
        );
        let price = Rule::new(
            "price",
            RuleKind::Real {
                min: None,
                max: None,
                precision: None,
            },
        );
        assert_eq!(
            replacement(&price.clone().with_default("5")),
            Some(("5.0".to_string(), CorrectionMethod::Default))
        );
        assert_eq!(
            replacement(&price),
            Some(("0.0".to_string(), CorrectionMethod::KindZero))
        );
    }

    #[test]
    fn real_replacements_respect_precision() {
        let whole = Rule::new(
            "price",
            RuleKind::Real {
                min: Some(1.0),
                max: None,
                precision: Some(0),
            },
        );
        assert_eq!(
            replacement(&whole.clone().with_default("5")),
            Some(("5".to_string(), CorrectionMethod::Default))
        );
        assert_eq!(
            replacement(&whole),
            Some(("0".to_string(), CorrectionMethod::KindZero))
        );
    }

    #[test]
    fn dates_without_a_usable_default_stay_unresolved() {
        let rule = Rule::new(
            "updated",
            RuleKind::Date {
                format: "%Y-%m-%d".into(),
                min: None,
                max: None,
            },
        );
        assert_eq!(replacement(&rule), None);
        assert_eq!(replacement(&rule.clone().with_default("someday")), None);

        let mut records = RecordSet::from_rows(
            vec![Field::column("updated")],
            vec![vec![Some("soon".into())]],
        );
        let violations = [violation(0, &rule, Some("soon"), ViolationKind::DateFormatMismatch)];
        assert!(correct(&mut records, &violations, CorrectionMode::Automatic).is_empty());
        assert_eq!(records.get(0, "updated"), Some("soon"));
    }

    #[test]
    fn non_numeric_integer_default_falls_back_to_zero() {
        let rule = integer_rule().with_default("plenty");
        let mut records = stock(&[Some("-3")]);
        let violations = [violation(0, &rule, Some("-3"), ViolationKind::BelowMinimum)];
        let corrections = correct(&mut records, &violations, CorrectionMode::Automatic);
        assert_eq!(records.get(0, "stock"), Some("0"));
        assert_eq!(corrections.len(), 1);
        assert!(corrections[0].is_fallback());
        assert_eq!(
            corrections[0].method,
            CorrectionMethod::ZeroFallback {
                rejected_default: "plenty".into()
            }
        );
    }

    #[test]
    fn each_cell_is_corrected_once() {
        let rule = integer_rule();
        let mut records = stock(&[Some("x"), Some("-1")]);
        let violations = [
            violation(0, &rule, Some("x"), ViolationKind::TypeMismatch),
            violation(0, &rule, Some("x"), ViolationKind::BelowMinimum),
            violation(1, &rule, Some("-1"), ViolationKind::BelowMinimum),
        ];
        let corrections = correct(&mut records, &violations, CorrectionMode::Automatic);
        assert_eq!(corrections.len(), 2);
        assert_eq!(records.get(1, "stock"), Some("0"));
    }

    #[test]
    fn review_mode_wraps_and_strip_restores() {
        let rule = integer_rule();
        let mut records = stock(&[Some("-1"), None]);
        let violations = [
            violation(0, &rule, Some("-1"), ViolationKind::BelowMinimum),
            violation(1, &rule, None, ViolationKind::MissingValue),
        ];
        correct(&mut records, &violations, CorrectionMode::ManualReview);
        assert_eq!(records.get(0, "stock"), Some("№-№-№-№-№-№-№-1№-№-№-№-№-№-№"));
        assert_eq!(records.get(1, "stock"), Some("№-№-№-№-№-№-№№-№-№-№-№-№-№"));

        assert_eq!(strip_review_markers(&mut records), 2);
        assert_eq!(records.get(0, "stock"), Some("-1"));
        assert_eq!(records.get(1, "stock"), None);
    }

    #[test]
    fn missing_targets_are_skipped() {
        let rule = integer_rule();
        let mut records = stock(&[Some("1")]);
        let violations = [violation(9, &rule, Some("-1"), ViolationKind::BelowMinimum)];
        assert!(correct(&mut records, &violations, CorrectionMode::Automatic).is_empty());
    }
}
