//! Record export: delimited text via polars, XML via quick-xml, JSON via serde_json.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use feed_model::{FieldOrigin, RecordSet};
use polars::prelude::{Column, CsvWriter, DataFrame, IntoColumn, NamedFrom, SerWriter, Series};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde_json::{Map, Value as Json};
use tracing::{debug, info};

use crate::error::ExportError;

/// Element names used when writing records as XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlLayout {
    pub root: String,
    pub record: String,
}

impl XmlLayout {
    /// Layout matching the set's origin: `<offers><offer>` for hierarchical
    /// sources, `<products><product>` otherwise.
    pub fn for_records(records: &RecordSet) -> Self {
        if records
            .fields()
            .iter()
            .any(|field| field.origin.is_hierarchical())
        {
            Self::with_record("offer")
        } else {
            Self {
                root: "products".to_string(),
                record: "product".to_string(),
            }
        }
    }

    /// `<{record}s><{record}>`.
    pub fn with_record(record: &str) -> Self {
        Self {
            root: format!("{record}s"),
            record: record.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Tsv,
    Xml,
    Json,
}

impl ExportFormat {
    pub fn from_extension(path: &Path) -> Result<Self, ExportError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "tsv" | "tab" => Ok(ExportFormat::Tsv),
            "xml" | "yml" => Ok(ExportFormat::Xml),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ExportError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Xml => "xml",
            ExportFormat::Json => "json",
        }
    }
}

/// Serialize records in `format`.
pub fn render_records(
    records: &RecordSet,
    format: ExportFormat,
    layout: Option<&XmlLayout>,
) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => to_delimited(records, b','),
        ExportFormat::Tsv => to_delimited(records, b'\t'),
        ExportFormat::Xml => {
            let layout = layout
                .cloned()
                .unwrap_or_else(|| XmlLayout::for_records(records));
            to_xml(records, &layout)
        }
        ExportFormat::Json => to_json(records),
    }
}

/// Write records to `path`, creating parent directories as needed.
pub fn write_records(
    records: &RecordSet,
    path: &Path,
    format: ExportFormat,
    layout: Option<&XmlLayout>,
) -> Result<(), ExportError> {
    let bytes = render_records(records, format, layout)?;
    let io_error = |source| ExportError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, bytes).map_err(io_error)?;
    info!(
        path = %path.display(),
        format = format.extension(),
        records = records.len(),
        "records exported"
    );
    Ok(())
}

/// Delimited text with a header row; nulls are empty cells.
pub fn to_delimited(records: &RecordSet, separator: u8) -> Result<Vec<u8>, ExportError> {
    let columns: Vec<Column> = records
        .fields()
        .iter()
        .enumerate()
        .map(|(position, field)| {
            let values: Vec<Option<String>> = records
                .records()
                .iter()
                .map(|record| record.value_at(position).map(str::to_string))
                .collect();
            Series::new(field.name.as_str().into(), values).into_column()
        })
        .collect();
    let mut frame = DataFrame::new(columns)?;
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .with_separator(separator)
        .finish(&mut frame)?;
    debug!(rows = frame.height(), separator = %(separator as char), "delimited export rendered");
    Ok(buffer)
}

/// Records as a JSON array of objects in field order; nulls stay `null`.
pub fn to_json(records: &RecordSet) -> Result<Vec<u8>, ExportError> {
    let rows: Vec<Json> = records
        .records()
        .iter()
        .map(|record| {
            let object: Map<String, Json> = records
                .fields()
                .iter()
                .zip(record.values())
                .map(|(field, value)| {
                    let value = value.clone().map_or(Json::Null, Json::String);
                    (field.name.clone(), value)
                })
                .collect();
            Json::Object(object)
        })
        .collect();
    Ok(serde_json::to_vec_pretty(&rows)?)
}

/// Records as XML that normalizes back to the same fields.
///
/// Attribute fields become attributes of the record element, named
/// parameters become `<param name="key">` children and every other field a
/// child element. Null values are omitted.
pub fn to_xml(records: &RecordSet, layout: &XmlLayout) -> Result<Vec<u8>, ExportError> {
    let mut xml = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    xml.write_event(Event::Start(BytesStart::new(layout.root.as_str())))?;

    let fields = records.fields();
    for record in records.records() {
        let mut element = BytesStart::new(layout.record.as_str());
        for (field, value) in fields.iter().zip(record.values()) {
            if let (FieldOrigin::Attribute, Some(value)) = (&field.origin, value) {
                element.push_attribute((xml_name(&field.name).as_str(), value.as_str()));
            }
        }
        xml.write_event(Event::Start(element))?;

        for (field, value) in fields.iter().zip(record.values()) {
            let Some(value) = value else {
                continue;
            };
            match &field.origin {
                FieldOrigin::Attribute => {}
                FieldOrigin::NamedParameter {
                    tag,
                    attribute,
                    key,
                } => {
                    xml.create_element(tag.as_str())
                        .with_attribute((attribute.as_str(), key.as_str()))
                        .write_text_content(BytesText::new(value))?;
                }
                FieldOrigin::Tag | FieldOrigin::Column => {
                    xml.create_element(xml_name(&field.name).as_str())
                        .write_text_content(BytesText::new(value))?;
                }
            }
        }
        xml.write_event(Event::End(BytesEnd::new(layout.record.as_str())))?;
    }

    xml.write_event(Event::End(BytesEnd::new(layout.root.as_str())))?;
    Ok(xml.into_inner().into_inner())
}

/// A valid XML element name for `name`: invalid characters become `_`.
pub fn xml_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let starts_well = out
        .chars()
        .next()
        .is_some_and(|ch| ch.is_alphabetic() || ch == '_');
    if !starts_well {
        out.insert(0, '_');
    }
    out
}

/// `feed.csv` becomes `feed_new.csv`.
pub fn corrected_path(source: &Path) -> PathBuf {
    sibling_path(source, "_new", None)
}

/// `feed.xml` becomes `feed_review.tsv`.
pub fn review_path(source: &Path) -> PathBuf {
    sibling_path(source, "_review", Some("tsv"))
}

fn sibling_path(source: &Path, suffix: &str, extension: Option<&str>) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "feed".to_string());
    let extension = extension
        .map(str::to_string)
        .or_else(|| {
            source
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
        });
    let name = match extension {
        Some(extension) => format!("{stem}{suffix}.{extension}"),
        None => format!("{stem}{suffix}"),
    };
    source.with_file_name(name)
}
