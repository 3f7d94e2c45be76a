use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use feed_model::{IntegrityFinding, ReportEntry};

use crate::types::CheckResult;

pub fn print_summary(result: &CheckResult) {
    let outcome = &result.outcome;
    let report = &outcome.report;
    println!("Source: {}", report.source);
    if let Some(path) = &outcome.output {
        println!("Output: {}", path.display());
    }
    if let Some(path) = &outcome.review {
        println!("Review file: {}", path.display());
    }
    if let Some(path) = &result.report_path {
        println!("Report: {}", path.display());
    }

    let summary = &report.summary;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Records"),
        header_cell("With errors"),
        header_cell("Clean"),
        header_cell("Violations"),
        header_cell("Findings"),
        header_cell("Corrections"),
        header_cell("Remaining"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 0..7 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    table.add_row(vec![
        Cell::new(summary.total_records).add_attribute(Attribute::Bold),
        count_cell(summary.records_with_violations, Color::Red),
        Cell::new(summary.records_clean).fg(Color::Green),
        count_cell(report.violation_count(), Color::Red),
        count_cell(report.finding_count(), Color::Yellow),
        count_cell(report.corrections.len(), Color::Cyan),
        count_cell(outcome.remaining.len(), Color::Red),
    ]);
    println!("{table}");

    print_violation_table(&report.entries);
    print_findings(&report.findings);
    let fallbacks = report.fallback_count();
    if fallbacks > 0 {
        eprintln!(
            "{fallbacks} configured default(s) did not fit their field kind; zero values were used"
        );
    }
}

fn print_violation_table(entries: &[ReportEntry]) {
    if entries.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Record"),
        header_cell("ID"),
        header_cell("Field"),
        header_cell("Value"),
        header_cell("Problem"),
        header_cell("Rule"),
    ]);
    apply_issue_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for entry in entries {
        table.add_row(vec![
            Cell::new(entry.record_index),
            entry
                .record_id
                .as_deref()
                .map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(&entry.field)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            entry
                .raw_value
                .as_deref()
                .map_or_else(|| dim_cell("null"), Cell::new),
            Cell::new(&entry.message).fg(Color::Red),
            dim_cell(&entry.rule_summary),
        ]);
    }
    println!();
    println!("Violations:");
    println!("{table}");
}

fn print_findings(findings: &[IntegrityFinding]) {
    if findings.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Check"),
        header_cell("Field"),
        header_cell("Records"),
        header_cell("Message"),
    ]);
    apply_table_style(&mut table);
    for finding in findings {
        let indices = finding.indices();
        let records = if indices.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(
                indices
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        };
        table.add_row(vec![
            Cell::new(finding.check_name()).fg(Color::Yellow),
            Cell::new(finding.field()),
            records,
            Cell::new(finding.message()),
        ]);
    }
    println!();
    println!("Integrity findings:");
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_issue_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(160);
    if table.column_count() >= 6 {
        table.set_constraints(vec![
            ColumnConstraint::LowerBoundary(Width::Fixed(6)),
            ColumnConstraint::UpperBoundary(Width::Fixed(16)),
            ColumnConstraint::UpperBoundary(Width::Fixed(24)),
            ColumnConstraint::UpperBoundary(Width::Percentage(25)),
            ColumnConstraint::UpperBoundary(Width::Percentage(30)),
            ColumnConstraint::UpperBoundary(Width::Percentage(25)),
        ]);
    }
}

pub fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
