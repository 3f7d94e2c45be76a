//! Validation report assembly and record export.

pub mod error;
pub mod export;
pub mod report;

pub use error::ExportError;
pub use export::{
    ExportFormat, XmlLayout, corrected_path, render_records, review_path, to_delimited, to_json,
    to_xml, write_records, xml_name,
};
pub use report::{DEFAULT_ID_FIELD, build_report, render_json, render_text};
