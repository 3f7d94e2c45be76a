use anyhow::{Context, Result};
use comfy_table::{Cell, CellAlignment, Table};
use tracing::{info, info_span};

use feed_cli::pipeline::{
    CheckPlan, DateNormalization, SourceSpec, load_rules, load_source, run_check, write_report,
};
use feed_model::{Field, FieldOrigin, RecordSet};
use feed_validate::IntegrityConfig;

use crate::cli::{CheckArgs, RulesArgs, SourceArgs};
use crate::summary::{align_column, apply_table_style, dim_cell, header_cell};
use crate::types::CheckResult;

fn source_spec(args: &SourceArgs) -> Result<SourceSpec> {
    SourceSpec::new(&args.source)
        .with_declared_format(args.format.as_deref())
        .map(|spec| spec.with_container(args.container.clone()))
}

pub fn run_check_command(args: &CheckArgs) -> Result<CheckResult> {
    let rules = load_rules(&args.rules)?;
    info!(rules = rules.len(), path = %args.rules.display(), "rules loaded");

    let mut plan = CheckPlan::new(source_spec(&args.source)?, rules);
    plan.integrity = if args.no_integrity {
        IntegrityConfig::none()
    } else {
        IntegrityConfig {
            mandatory_fields: args
                .mandatory
                .iter()
                .map(|field| field.trim().to_string())
                .filter(|field| !field.is_empty())
                .collect(),
            duplicate_key: Some(args.key.clone()),
            category_field: Some(args.category_field.clone()),
        }
    };
    plan.correction = args.correct.mode();
    plan.dates = args.date_field.as_ref().map(|field| DateNormalization {
        field: field.clone(),
        format: args.date_format.clone(),
    });
    plan.fill_blanks = args.fill_blank.clone();
    plan.filter = args.filter.clone();
    plan.id_field = Some(args.id_field.clone());
    plan.output = args.output.clone();

    let outcome = run_check(&plan)?;
    if let Some(path) = &args.report {
        write_report(&outcome.report, path)?;
    }
    Ok(CheckResult {
        outcome,
        report_path: args.report.clone(),
    })
}

pub fn run_fields(args: &SourceArgs) -> Result<()> {
    let spec = source_spec(args)?;
    let records = info_span!("fields", source = %args.source.display())
        .in_scope(|| load_source(&spec))?;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Origin"),
        header_cell("Filled"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for (field, filled) in field_fill_counts(&records) {
        table.add_row(vec![
            Cell::new(&field.name),
            dim_cell(origin_label(&field.origin)),
            Cell::new(format!("{filled}/{}", records.len())),
        ]);
    }
    println!("{} records, {} fields", records.len(), records.fields().len());
    println!("{table}");
    Ok(())
}

pub fn run_rules(args: &RulesArgs) -> Result<()> {
    let model = load_rules(&args.rules)?;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Kind"),
        header_cell("Rule"),
        header_cell("Default"),
    ]);
    apply_table_style(&mut table);
    for rule in model.rules() {
        table.add_row(vec![
            Cell::new(&rule.field),
            Cell::new(rule.field_kind()),
            Cell::new(rule.summary()),
            rule.default
                .as_deref()
                .map_or_else(|| dim_cell("-"), Cell::new),
        ]);
    }
    println!("{} rules in {}", model.len(), args.rules.display());
    println!("{table}");
    let normalized = model
        .to_config()
        .to_json()
        .context("serialize rule configuration")?;
    println!("{normalized}");
    Ok(())
}

fn field_fill_counts(records: &RecordSet) -> Vec<(&Field, usize)> {
    records
        .fields()
        .iter()
        .map(|field| {
            let filled = records
                .column_values(&field.name)
                .into_iter()
                .filter(|(_, value)| value.is_some_and(|value| !value.trim().is_empty()))
                .count();
            (field, filled)
        })
        .collect()
}

fn origin_label(origin: &FieldOrigin) -> String {
    match origin {
        FieldOrigin::Attribute => "attribute".to_string(),
        FieldOrigin::Tag => "tag".to_string(),
        FieldOrigin::NamedParameter {
            tag,
            attribute,
            key,
        } => format!("<{tag} {attribute}=\"{key}\">"),
        FieldOrigin::Column => "column".to_string(),
    }
}
