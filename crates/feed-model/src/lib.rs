pub mod coerce;
pub mod error;
pub mod record;
pub mod report;
pub mod rule;
pub mod violation;

pub use error::{ModelError, Result};
pub use record::{Field, FieldOrigin, Record, RecordSet, Value, synthesized_field_name};
pub use report::{ReportEntry, ReportSummary, ValidationReport};
pub use rule::{DEFAULT_DATE_FORMAT, FieldKind, Rule, RuleKind, TextPattern};
pub use violation::{Correction, CorrectionMethod, IntegrityFinding, Violation, ViolationKind};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts() {
        let report = ValidationReport {
            source: "feed.xml".to_string(),
            summary: ReportSummary {
                total_records: 2,
                records_with_violations: 1,
                records_clean: 1,
            },
            entries: vec![ReportEntry {
                record_index: 0,
                record_id: Some("101".to_string()),
                field: "price".to_string(),
                raw_value: Some("-5".to_string()),
                rule_summary: "real (min 0)".to_string(),
                message: "value is below the minimum".to_string(),
            }],
            findings: vec![IntegrityFinding::MissingMandatoryField {
                field: "SKU".to_string(),
            }],
            corrections: vec![Correction {
                record_index: 0,
                field: "price".to_string(),
                before: Some("-5".to_string()),
                after: Some("0.0".to_string()),
                method: CorrectionMethod::ZeroFallback {
                    rejected_default: "free".to_string(),
                },
            }],
        };
        assert_eq!(report.violation_count(), 1);
        assert_eq!(report.finding_count(), 1);
        assert_eq!(report.fallback_count(), 1);
        assert!(report.has_errors());
    }

    #[test]
    fn report_serializes() {
        let report = ValidationReport {
            source: "feed.csv".to_string(),
            ..ValidationReport::default()
        };
        let json = serde_json::to_string(&report).expect("serialize report");
        let round: ValidationReport = serde_json::from_str(&json).expect("deserialize report");
        assert_eq!(round.source, "feed.csv");
        assert!(!round.has_errors());
    }

    #[test]
    fn rule_serializes_with_flat_kind() {
        let rule = Rule::new(
            "count",
            RuleKind::Integer {
                min: Some(1),
                max: None,
                multiple_of: None,
            },
        )
        .with_default("1");
        let json = serde_json::to_value(&rule).expect("serialize rule");
        assert_eq!(json["kind"], "integer");
        assert_eq!(json["min"], 1);
        assert_eq!(json["default"], "1");
    }
}
