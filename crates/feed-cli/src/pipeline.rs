//! The `check` pipeline: load, filter, prepare, integrity, validate,
//! correct, export.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use feed_ingest::{FileFetcher, LoadRequest, SourceFormat, load_blocking};
use feed_model::{Correction, RecordSet, ValidationReport, Violation};
use feed_report::{
    ExportFormat, XmlLayout, build_report, corrected_path, render_json, render_text, review_path,
    write_records,
};
use feed_transform::{CorrectionMode, correct, fill_blanks, normalize_dates};
use feed_validate::{IntegrityConfig, RuleConfig, RuleModel, validate};
use tracing::{debug, info, info_span, trace, warn};

use crate::logging::redact_value;

/// A `FIELD=VALUE` pair from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub field: String,
    pub value: String,
}

impl FromStr for FieldValue {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (field, value) = text
            .split_once('=')
            .ok_or_else(|| format!("expected FIELD=VALUE, got '{text}'"))?;
        let field = field.trim();
        if field.is_empty() {
            return Err(format!("missing field name in '{text}'"));
        }
        Ok(Self {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

/// Where and how to read a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub path: PathBuf,
    pub format: Option<SourceFormat>,
    pub container: Option<String>,
}

impl SourceSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: None,
            container: None,
        }
    }

    /// Parse the declared `--format` name, if any.
    pub fn with_declared_format(mut self, declared: Option<&str>) -> Result<Self> {
        self.format = declared
            .map(SourceFormat::from_declared)
            .transpose()
            .context("resolve --format")?;
        Ok(self)
    }

    pub fn with_container(mut self, container: Option<String>) -> Self {
        self.container = container;
        self
    }

    fn request(&self) -> LoadRequest {
        let location = self.path.display().to_string();
        let mut request = LoadRequest::new(location).with_delimiter(delimiter_for(&self.path));
        if let Some(format) = self.format {
            request = request.with_format(format);
        }
        if let Some(container) = &self.container {
            request = request.with_container(container.as_str());
        }
        request
    }
}

/// Tab for `.tsv`/`.tab` files, comma otherwise.
pub fn delimiter_for(path: &Path) -> u8 {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("tsv" | "tab") => b'\t',
        _ => b',',
    }
}

/// Date normalization applied before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateNormalization {
    pub field: String,
    pub format: String,
}

/// Everything one `check` run needs.
#[derive(Debug, Clone)]
pub struct CheckPlan {
    pub source: SourceSpec,
    pub rules: RuleModel,
    pub integrity: IntegrityConfig,
    /// `None` reports without touching the records.
    pub correction: Option<CorrectionMode>,
    pub dates: Option<DateNormalization>,
    pub fill_blanks: Vec<FieldValue>,
    pub filter: Option<FieldValue>,
    pub id_field: Option<String>,
    pub output: Option<PathBuf>,
}

impl CheckPlan {
    pub fn new(source: SourceSpec, rules: RuleModel) -> Self {
        Self {
            source,
            rules,
            integrity: IntegrityConfig::default(),
            correction: None,
            dates: None,
            fill_blanks: Vec::new(),
            filter: None,
            id_field: Some(feed_report::DEFAULT_ID_FIELD.to_string()),
            output: None,
        }
    }
}

#[derive(Debug)]
pub struct CheckOutcome {
    /// Records after preparation and correction.
    pub records: RecordSet,
    pub report: ValidationReport,
    /// Violations still present after correction.
    pub remaining: Vec<Violation>,
    /// Corrected (or prepared) feed written by the run.
    pub output: Option<PathBuf>,
    /// Manual-review artifact written by the run.
    pub review: Option<PathBuf>,
}

impl CheckOutcome {
    pub fn has_errors(&self) -> bool {
        !self.remaining.is_empty() || self.report.finding_count() > 0
    }
}

/// Load and normalize a feed from the local filesystem.
pub fn load_source(source: &SourceSpec) -> Result<RecordSet> {
    let request = source.request();
    load_blocking(&request, &FileFetcher)
        .with_context(|| format!("load {}", source.path.display()))
}

/// Load a rule configuration and compile it.
pub fn load_rules(path: &Path) -> Result<RuleModel> {
    let config = RuleConfig::load(path).with_context(|| format!("read rules {}", path.display()))?;
    config
        .into_model()
        .with_context(|| format!("compile rules {}", path.display()))
}

/// Blank filling, then date normalization.
pub fn prepare(
    records: &mut RecordSet,
    fills: &[FieldValue],
    dates: Option<&DateNormalization>,
) -> Vec<Correction> {
    let mut corrections = Vec::new();
    for fill in fills {
        if !records.has_field(&fill.field) {
            warn!(field = %fill.field, "fill target is not a field of the feed");
        }
        corrections.extend(fill_blanks(records, &fill.field, &fill.value));
    }
    if let Some(dates) = dates {
        corrections.extend(normalize_dates(records, &dates.field, &dates.format));
    }
    debug!(corrections = corrections.len(), "records prepared");
    corrections
}

pub fn run_check(plan: &CheckPlan) -> Result<CheckOutcome> {
    let location = plan.source.path.display().to_string();
    let span = info_span!("check", source = %location);
    let _guard = span.enter();
    let start = Instant::now();

    let mut records = info_span!("load").in_scope(|| load_source(&plan.source))?;
    if let Some(filter) = &plan.filter {
        if !records.has_field(&filter.field) {
            bail!("--where field '{}' is not a field of the feed", filter.field);
        }
        records = records.filter_eq(&filter.field, &filter.value);
        info!(
            field = %filter.field,
            records = records.len(),
            "records filtered"
        );
    }

    let mut corrections = info_span!("prepare")
        .in_scope(|| prepare(&mut records, &plan.fill_blanks, plan.dates.as_ref()));

    let findings = info_span!("integrity").in_scope(|| plan.integrity.run(&records));
    for finding in &findings {
        warn!(check = finding.check_name(), "{}", finding.message());
    }

    let violations = info_span!("validate").in_scope(|| validate(&records, &plan.rules));
    for violation in &violations {
        trace!(
            record = violation.record_index,
            field = %violation.field,
            value = redact_value(violation.raw_value.as_deref().unwrap_or_default()),
            kind = ?violation.kind,
            "violation"
        );
    }
    info!(
        records = records.len(),
        violations = violations.len(),
        findings = findings.len(),
        "validation complete"
    );

    let mut report = build_report(
        &location,
        &records,
        &violations,
        &findings,
        &corrections,
        plan.id_field.as_deref(),
    );

    let mut output = None;
    let mut review = None;
    let remaining = match plan.correction {
        Some(mode) => {
            let applied = info_span!("correct", mode = ?mode)
                .in_scope(|| correct(&mut records, &violations, mode));
            report.corrections.extend(applied.iter().cloned());
            corrections.extend(applied);
            match mode {
                CorrectionMode::Automatic => {
                    let target = plan
                        .output
                        .clone()
                        .unwrap_or_else(|| corrected_path(&plan.source.path));
                    export(&records, &target, plan.source.container.as_deref())?;
                    output = Some(target);
                }
                CorrectionMode::ManualReview => {
                    let base = plan.output.as_deref().unwrap_or(plan.source.path.as_path());
                    let target = review_path(base);
                    write_records(&records, &target, ExportFormat::Tsv, None)
                        .with_context(|| format!("write {}", target.display()))?;
                    review = Some(target);
                }
            }
            validate(&records, &plan.rules)
        }
        None => {
            if let Some(target) = &plan.output {
                export(&records, target, plan.source.container.as_deref())?;
                output = Some(target.clone());
            }
            violations
        }
    };

    info!(
        corrections = corrections.len(),
        remaining = remaining.len(),
        duration_ms = start.elapsed().as_millis(),
        "check complete"
    );
    Ok(CheckOutcome {
        records,
        report,
        remaining,
        output,
        review,
    })
}

/// Write records in the format implied by `target`'s extension.
pub fn export(records: &RecordSet, target: &Path, container: Option<&str>) -> Result<()> {
    let format = ExportFormat::from_extension(target)
        .with_context(|| format!("choose export format for {}", target.display()))?;
    let layout = container.map(XmlLayout::with_record);
    write_records(records, target, format, layout.as_ref())
        .with_context(|| format!("write {}", target.display()))
}

/// Write the report as JSON for `.json` paths and as text otherwise.
pub fn write_report(report: &ValidationReport, path: &Path) -> Result<()> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let contents = if is_json {
        render_json(report).context("serialize report")?
    } else {
        render_text(report)
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write report {}", path.display()))?;
    info!(path = %path.display(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_parsing() {
        assert_eq!(
            "category=Unknown".parse::<FieldValue>(),
            Ok(FieldValue {
                field: "category".into(),
                value: "Unknown".into()
            })
        );
        assert_eq!(
            "note=".parse::<FieldValue>().map(|pair| pair.value),
            Ok(String::new())
        );
        assert!("category".parse::<FieldValue>().is_err());
        assert!(" =x".parse::<FieldValue>().is_err());
    }

    #[test]
    fn delimiter_follows_extension() {
        assert_eq!(delimiter_for(Path::new("feed.TSV")), b'\t');
        assert_eq!(delimiter_for(Path::new("feed.csv")), b',');
        assert_eq!(delimiter_for(Path::new("feed")), b',');
    }

    #[test]
    fn declared_format_is_validated() {
        let spec = SourceSpec::new("feed.txt").with_declared_format(Some("csv"));
        assert_eq!(spec.ok().and_then(|spec| spec.format), Some(SourceFormat::Tabular));
        assert!(
            SourceSpec::new("feed.txt")
                .with_declared_format(Some("parquet"))
                .is_err()
        );
    }
}
