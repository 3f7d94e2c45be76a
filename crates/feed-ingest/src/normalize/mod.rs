//! Schema normalization: every supported source becomes a [`RecordSet`].

mod hierarchical;
mod key_value;
mod tabular;

use feed_model::RecordSet;
use tracing::{debug, info};

use crate::error::NormalizeError;
use crate::source::Source;

pub use hierarchical::normalize_hierarchical;
pub use key_value::normalize_key_value;
pub use tabular::{normalize_delimited, normalize_grid};

/// Normalize a source into a column-consistent record set.
///
/// # Errors
///
/// Returns [`NormalizeError::EmptyResult`] when the source parsed but held no
/// records, and [`NormalizeError::Parse`] when the payload is malformed.
pub fn normalize(source: &Source) -> Result<RecordSet, NormalizeError> {
    debug!(format = %source.format(), "normalizing source");
    let records = match source {
        Source::Tabular { text, delimiter } => normalize_delimited(text, *delimiter)?,
        Source::Hierarchical { text, layout } => normalize_hierarchical(text, layout)?,
        Source::Spreadsheet { rows } => normalize_grid(rows)?,
        Source::KeyValue { text, container } => normalize_key_value(text, container.as_deref())?,
    };
    info!(
        format = %source.format(),
        records = records.len(),
        fields = records.fields().len(),
        "source normalized"
    );
    Ok(records)
}
