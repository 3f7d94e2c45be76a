//! Source descriptions consumed by the normalizer.

use std::fmt;
use std::path::Path;

use crate::error::NormalizeError;

/// Default unit-of-record element for hierarchical feeds.
pub const DEFAULT_CONTAINER: &str = "offer";
/// Default repeatable named-parameter element.
pub const DEFAULT_PARAMETER_TAG: &str = "param";
/// Default attribute distinguishing named parameters.
pub const DEFAULT_PARAMETER_ATTRIBUTE: &str = "name";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// Delimited text (CSV, TSV).
    Tabular,
    /// Markup with repeated unit-of-record elements (YML/XML offers).
    Hierarchical,
    /// Pre-read spreadsheet cell grid.
    Spreadsheet,
    /// JSON documents of records.
    KeyValueDocument,
}

impl SourceFormat {
    /// Resolve a declared format name.
    pub fn from_declared(declared: &str) -> Result<Self, NormalizeError> {
        match declared.trim().to_ascii_lowercase().as_str() {
            "csv" | "tsv" | "tabular" => Ok(SourceFormat::Tabular),
            "xml" | "yml" | "hierarchical" => Ok(SourceFormat::Hierarchical),
            "xlsx" | "xls" | "spreadsheet" => Ok(SourceFormat::Spreadsheet),
            "json" | "key-value" | "key_value" | "keyvalue" => Ok(SourceFormat::KeyValueDocument),
            _ => Err(NormalizeError::UnsupportedFormat {
                declared: declared.to_string(),
            }),
        }
    }

    /// Resolve the format from a path or URL extension.
    pub fn from_path(location: &str) -> Result<Self, NormalizeError> {
        let path = location.split(['?', '#']).next().unwrap_or(location);
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| NormalizeError::UnsupportedFormat {
                declared: location.to_string(),
            })?;
        Self::from_declared(extension).map_err(|_| NormalizeError::UnsupportedFormat {
            declared: extension.to_string(),
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceFormat::Tabular => "tabular",
            SourceFormat::Hierarchical => "hierarchical",
            SourceFormat::Spreadsheet => "spreadsheet",
            SourceFormat::KeyValueDocument => "key-value",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where records live in a hierarchical document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyLayout {
    pub container: String,
    pub parameter_tag: String,
    pub parameter_attribute: String,
}

impl Default for HierarchyLayout {
    fn default() -> Self {
        Self {
            container: DEFAULT_CONTAINER.to_string(),
            parameter_tag: DEFAULT_PARAMETER_TAG.to_string(),
            parameter_attribute: DEFAULT_PARAMETER_ATTRIBUTE.to_string(),
        }
    }
}

impl HierarchyLayout {
    pub fn with_container(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            ..Self::default()
        }
    }
}

/// Already-fetched source content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    /// Cell grid produced by a spreadsheet reader; first row is the header.
    Grid(Vec<Vec<String>>),
}

impl Payload {
    pub fn size_hint(&self) -> usize {
        match self {
            Payload::Text(text) => text.len(),
            Payload::Grid(rows) => rows.iter().map(Vec::len).sum(),
        }
    }
}

/// A payload paired with everything needed to normalize it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Tabular { text: String, delimiter: u8 },
    Hierarchical { text: String, layout: HierarchyLayout },
    Spreadsheet { rows: Vec<Vec<String>> },
    KeyValue { text: String, container: Option<String> },
}

impl Source {
    pub fn csv(text: impl Into<String>) -> Self {
        Source::Tabular {
            text: text.into(),
            delimiter: b',',
        }
    }

    pub fn xml(text: impl Into<String>) -> Self {
        Source::Hierarchical {
            text: text.into(),
            layout: HierarchyLayout::default(),
        }
    }

    pub fn json(text: impl Into<String>) -> Self {
        Source::KeyValue {
            text: text.into(),
            container: None,
        }
    }

    /// Pair a fetched payload with its declared format.
    ///
    /// `container` names the unit-of-record element for hierarchical sources
    /// and the wrapping key for key-value documents.
    pub fn from_payload(
        format: SourceFormat,
        payload: Payload,
        container: &str,
        delimiter: u8,
    ) -> Result<Self, NormalizeError> {
        match (format, payload) {
            (SourceFormat::Tabular, Payload::Text(text)) => Ok(Source::Tabular { text, delimiter }),
            (SourceFormat::Hierarchical, Payload::Text(text)) => Ok(Source::Hierarchical {
                text,
                layout: HierarchyLayout::with_container(container),
            }),
            (SourceFormat::KeyValueDocument, Payload::Text(text)) => Ok(Source::KeyValue {
                text,
                container: Some(container.to_string()),
            }),
            (SourceFormat::Spreadsheet | SourceFormat::Tabular, Payload::Grid(rows)) => {
                Ok(Source::Spreadsheet { rows })
            }
            (SourceFormat::Spreadsheet, Payload::Text(_)) => Err(NormalizeError::parse(
                format.as_str(),
                "spreadsheet payloads must be supplied as a cell grid",
            )),
            (format, Payload::Grid(_)) => Err(NormalizeError::parse(
                format.as_str(),
                "cell grids are only accepted for tabular sources",
            )),
        }
    }

    pub fn format(&self) -> SourceFormat {
        match self {
            Source::Tabular { .. } => SourceFormat::Tabular,
            Source::Hierarchical { .. } => SourceFormat::Hierarchical,
            Source::Spreadsheet { .. } => SourceFormat::Spreadsheet,
            Source::KeyValue { .. } => SourceFormat::KeyValueDocument,
        }
    }
}
