//! Report assembly and plain-text rendering.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use feed_model::{
    Correction, IntegrityFinding, RecordSet, ReportEntry, ReportSummary, ValidationReport,
    Violation,
};

/// Default identifying field of a record (the offer `id` attribute).
pub const DEFAULT_ID_FIELD: &str = "id";

/// Collect the outputs of one run into a report.
///
/// `id_field` names the field whose value identifies a record in the report;
/// records without it are identified by index only.
pub fn build_report(
    source: &str,
    records: &RecordSet,
    violations: &[Violation],
    findings: &[IntegrityFinding],
    corrections: &[Correction],
    id_field: Option<&str>,
) -> ValidationReport {
    let flagged: BTreeSet<usize> = violations
        .iter()
        .map(|violation| violation.record_index)
        .collect();
    let total_records = records.len();
    let records_with_violations = flagged.len();
    let entries = violations
        .iter()
        .map(|violation| {
            let record_id = id_field
                .and_then(|field| records.get(violation.record_index, field))
                .map(str::to_string);
            ReportEntry::from_violation(violation, record_id)
        })
        .collect();

    ValidationReport {
        source: source.to_string(),
        summary: ReportSummary {
            total_records,
            records_with_violations,
            records_clean: total_records.saturating_sub(records_with_violations),
        },
        entries,
        findings: findings.to_vec(),
        corrections: corrections.to_vec(),
    }
}

/// Human-readable report: totals, then violations grouped by record, then
/// integrity findings and corrections.
pub fn render_text(report: &ValidationReport) -> String {
    let mut out = String::new();
    let summary = &report.summary;
    let _ = writeln!(out, "Validation results for {}", report.source);
    let _ = writeln!(out, "Records checked: {}", summary.total_records);
    let _ = writeln!(out, "Records with errors: {}", summary.records_with_violations);
    let _ = writeln!(out, "Records without errors: {}", summary.records_clean);

    if report.entries.is_empty() {
        let _ = writeln!(out, "\nAll records satisfy the configured rules.");
    } else {
        let _ = writeln!(out, "\nViolations:");
        let mut current = None;
        for entry in &report.entries {
            if current != Some(entry.record_index) {
                current = Some(entry.record_index);
                match &entry.record_id {
                    Some(id) => {
                        let _ = writeln!(out, "\nRecord {} (ID: {id}):", entry.record_index);
                    }
                    None => {
                        let _ = writeln!(out, "\nRecord {}:", entry.record_index);
                    }
                }
            }
            let raw = entry
                .raw_value
                .as_deref()
                .map_or_else(|| "null".to_string(), |value| format!("'{value}'"));
            let _ = writeln!(
                out,
                "  - {}: {} {} [{}]",
                entry.field, raw, entry.message, entry.rule_summary
            );
        }
    }

    if !report.findings.is_empty() {
        let _ = writeln!(out, "\nIntegrity findings:");
        for finding in &report.findings {
            let _ = writeln!(out, "  - {}", finding.message());
        }
    }

    if !report.corrections.is_empty() {
        let _ = writeln!(out, "\nCorrections ({}):", report.corrections.len());
        for correction in &report.corrections {
            let before = correction.before.as_deref().unwrap_or("null");
            let after = correction.after.as_deref().unwrap_or("null");
            let flag = if correction.is_fallback() {
                " (default rejected)"
            } else {
                ""
            };
            let _ = writeln!(
                out,
                "  - record {} {}: '{before}' -> '{after}'{flag}",
                correction.record_index, correction.field
            );
        }
    }
    out
}

/// Report as pretty-printed JSON.
pub fn render_json(report: &ValidationReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_model::{CorrectionMethod, Field, Rule, RuleKind, ViolationKind};

    fn sample() -> ValidationReport {
        let records = RecordSet::from_rows(
            vec![Field::attribute("id"), Field::tag("price")],
            vec![
                vec![Some("101".into()), Some("-5".into())],
                vec![Some("102".into()), Some("3".into())],
            ],
        );
        let rule = Rule::new(
            "price",
            RuleKind::Real {
                min: Some(0.0),
                max: None,
                precision: None,
            },
        );
        let violations = vec![Violation {
            record_index: 0,
            field: "price".into(),
            raw_value: Some("-5".into()),
            rule,
            kind: ViolationKind::BelowMinimum,
        }];
        let findings = vec![IntegrityFinding::MissingMandatoryField {
            field: "SKU".into(),
        }];
        let corrections = vec![Correction {
            record_index: 0,
            field: "price".into(),
            before: Some("-5".into()),
            after: Some("0.0".into()),
            method: CorrectionMethod::KindZero,
        }];
        build_report(
            "feed.xml",
            &records,
            &violations,
            &findings,
            &corrections,
            Some(DEFAULT_ID_FIELD),
        )
    }

    #[test]
    fn summary_counts_records() {
        let report = sample();
        assert_eq!(
            report.summary,
            ReportSummary {
                total_records: 2,
                records_with_violations: 1,
                records_clean: 1
            }
        );
        assert_eq!(report.entries[0].record_id.as_deref(), Some("101"));
    }

    #[test]
    fn text_report() {
        insta::assert_snapshot!(render_text(&sample()), @r"
        Validation results for feed.xml
        Records checked: 2
        Records with errors: 1
        Records without errors: 1

        Violations:

        Record 0 (ID: 101):
          - price: '-5' value is below the minimum [real (min 0)]

        Integrity findings:
          - mandatory field 'SKU' is missing

        Corrections (1):
          - record 0 price: '-5' -> '0.0'
        ");
    }
}
