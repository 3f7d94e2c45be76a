//! Per-field rule evaluation.

use chrono::NaiveDate;
use feed_model::coerce::{decimal_places, parse_integer, parse_real};
use feed_model::{RecordSet, Rule, RuleKind, Violation, ViolationKind};
use tracing::debug;

use crate::error::ConfigError;
use crate::rules::{CompiledRule, RuleModel};

/// Evaluate every rule against every record.
///
/// Violations come out ordered by record index, then rule declaration order,
/// then check order. Fields without a rule are never checked; rules whose
/// field is absent from the set are skipped.
pub fn validate(records: &RecordSet, model: &RuleModel) -> Vec<Violation> {
    let active: Vec<(usize, &CompiledRule)> = model
        .compiled()
        .iter()
        .filter_map(|compiled| {
            let position = records.field_position(&compiled.rule.field);
            if position.is_none() {
                debug!(field = %compiled.rule.field, "rule field absent from record set");
            }
            position.map(|position| (position, compiled))
        })
        .collect();

    let mut violations = Vec::new();
    for record in records.records() {
        for (position, compiled) in &active {
            let raw = record.value_at(*position);
            for kind in check_value(compiled, raw) {
                violations.push(Violation {
                    record_index: record.index,
                    field: compiled.rule.field.clone(),
                    raw_value: raw.map(str::to_string),
                    rule: compiled.rule.clone(),
                    kind,
                });
            }
        }
    }
    debug!(
        records = records.len(),
        rules = active.len(),
        violations = violations.len(),
        "validation finished"
    );
    violations
}

/// Failed checks for a single value, in check order.
///
/// A null or blank value is `MissingValue` for numeric and date rules. String
/// rules check it as the empty string, so it only fails constraints that
/// require content.
pub fn check_value(compiled: &CompiledRule, raw: Option<&str>) -> Vec<ViolationKind> {
    let rule = &compiled.rule;
    let value = raw.map(str::trim).unwrap_or_default();
    if value.is_empty() && !matches!(rule.kind, RuleKind::String { .. }) {
        return vec![ViolationKind::MissingValue];
    }
    let mut failed = Vec::new();
    match &rule.kind {
        RuleKind::Integer {
            min,
            max,
            multiple_of,
        } => {
            let Some(number) = parse_integer(value) else {
                return vec![ViolationKind::TypeMismatch];
            };
            check_bounds(&mut failed, number, *min, *max);
            if let Some(step) = multiple_of
                && *step != 0
                && number % step != 0
            {
                failed.push(ViolationKind::NotMultiple);
            }
        }
        RuleKind::Real {
            min,
            max,
            precision,
        } => {
            let Some(number) = parse_real(value) else {
                return vec![ViolationKind::TypeMismatch];
            };
            check_bounds(&mut failed, number, *min, *max);
            if let Some(precision) = precision
                && decimal_places(value) > *precision as usize
            {
                failed.push(ViolationKind::PrecisionExceeded);
            }
        }
        RuleKind::String {
            min_length,
            max_length,
            allowed_characters,
            allowed_values,
            ..
        } => {
            let length = value.chars().count();
            if min_length.is_some_and(|min| length < min) {
                failed.push(ViolationKind::TooShort);
            }
            if max_length.is_some_and(|max| length > max) {
                failed.push(ViolationKind::TooLong);
            }
            if let Some(allowed) = allowed_characters
                && value.chars().any(|ch| !allowed.contains(ch))
            {
                failed.push(ViolationKind::DisallowedCharacters);
            }
            if let Some(values) = allowed_values
                && !values.iter().any(|allowed| allowed == value)
            {
                failed.push(ViolationKind::NotAllowedValue);
            }
            if !compiled.matches_pattern(value) {
                failed.push(ViolationKind::PatternMismatch);
            }
        }
        RuleKind::Date { format, min, max } => {
            let Some(date) = parse_date(value, format) else {
                return vec![ViolationKind::DateFormatMismatch];
            };
            if min.is_some_and(|min| date < min) || max.is_some_and(|max| date > max) {
                failed.push(ViolationKind::DateOutOfRange);
            }
        }
    }
    failed
}

/// Validate a single raw value against a bare rule.
///
/// # Errors
///
/// Fails when the rule's pattern does not compile.
pub fn check_rule(rule: &Rule, raw: Option<&str>) -> Result<Vec<ViolationKind>, ConfigError> {
    let model = RuleModel::new(vec![rule.clone()])?;
    Ok(model
        .compiled()
        .first()
        .map(|compiled| check_value(compiled, raw))
        .unwrap_or_default())
}

fn check_bounds<T: PartialOrd>(
    failed: &mut Vec<ViolationKind>,
    value: T,
    min: Option<T>,
    max: Option<T>,
) {
    if min.is_some_and(|min| value < min) {
        failed.push(ViolationKind::BelowMinimum);
    }
    if max.is_some_and(|max| value > max) {
        failed.push(ViolationKind::AboveMaximum);
    }
}

/// Strict parse against `format`; date-time formats keep only the date.
pub(crate) fn parse_date(value: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, format).ok().or_else(|| {
        chrono::NaiveDateTime::parse_from_str(value, format)
            .ok()
            .map(|datetime| datetime.date())
    })
}
