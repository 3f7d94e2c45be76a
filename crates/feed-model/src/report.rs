use serde::{Deserialize, Serialize};

use crate::violation::{Correction, IntegrityFinding, Violation};

/// Record counts for one validated source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_records: usize,
    pub records_with_violations: usize,
    pub records_clean: usize,
}

/// One violation as shown to a reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub record_index: usize,
    /// Value of the record's identifying field (e.g. the offer `id`), if any.
    pub record_id: Option<String>,
    pub field: String,
    pub raw_value: Option<String>,
    pub rule_summary: String,
    pub message: String,
}

impl ReportEntry {
    pub fn from_violation(violation: &Violation, record_id: Option<String>) -> Self {
        Self {
            record_index: violation.record_index,
            record_id,
            field: violation.field.clone(),
            raw_value: violation.raw_value.clone(),
            rule_summary: violation.rule.summary(),
            message: violation.kind.description().to_string(),
        }
    }
}

/// Validation report for a single source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub source: String,
    pub summary: ReportSummary,
    pub entries: Vec<ReportEntry>,
    pub findings: Vec<IntegrityFinding>,
    pub corrections: Vec<Correction>,
}

impl ValidationReport {
    pub fn violation_count(&self) -> usize {
        self.entries.len()
    }

    pub fn finding_count(&self) -> usize {
        self.findings.len()
    }

    pub fn fallback_count(&self) -> usize {
        self.corrections
            .iter()
            .filter(|correction| correction.is_fallback())
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.violation_count() > 0 || self.finding_count() > 0
    }
}
